//! Row types of the module tables.

use bitflags::bitflags;

use crate::{
    assembly::Instruction,
    metadata::{
        signatures::{MemberSignature, SignatureMethod, TypeSignature},
        token::Token,
    },
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Type definition flags (ECMA-335 II.23.1.15)
    pub struct TypeAttributes: u32 {
        /// Visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Nested type visible outside the assembly
        const NESTED_PUBLIC = 0x0000_0002;
        /// Interface
        const INTERFACE = 0x0000_0020;
        /// Cannot be instantiated
        const ABSTRACT = 0x0000_0080;
        /// Cannot be derived from
        const SEALED = 0x0000_0100;
        /// Name has special meaning
        const SPECIAL_NAME = 0x0000_0400;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Method definition flags (ECMA-335 II.23.1.10)
    pub struct MethodAttributes: u16 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by everyone
        const PUBLIC = 0x0006;
        /// Static method
        const STATIC = 0x0010;
        /// Cannot be overridden
        const FINAL = 0x0020;
        /// Virtual method
        const VIRTUAL = 0x0040;
        /// Hidden by name and signature
        const HIDE_BY_SIG = 0x0080;
        /// No implementation
        const ABSTRACT = 0x0400;
        /// Name has special meaning (accessors, operators)
        const SPECIAL_NAME = 0x0800;
        /// Runtime provided special name (`.ctor`, `.cctor`)
        const RT_SPECIAL_NAME = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Field definition flags (ECMA-335 II.23.1.5)
    pub struct FieldAttributes: u16 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by everyone
        const PUBLIC = 0x0006;
        /// Static field
        const STATIC = 0x0010;
        /// Only assignable in a constructor
        const INIT_ONLY = 0x0020;
        /// Compile time constant
        const LITERAL = 0x0040;
    }
}

/// Resolution scope of a [`TypeRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionScope {
    /// Defined in the referencing module itself
    CurrentModule,
    /// Defined in a referenced assembly, by `AssemblyRef` token
    AssemblyRef(Token),
}

/// A reference to a type by scope and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    /// Where the type is defined
    pub scope: ResolutionScope,
    /// Namespace, empty for the global namespace
    pub namespace: String,
    /// Type name including generic arity suffix (``List`1``)
    pub name: String,
}

impl TypeRef {
    /// `Namespace.Name`, or just `Name` in the global namespace.
    #[must_use]
    pub fn full_name(&self) -> String {
        join_name(&self.namespace, &self.name)
    }
}

/// A reference to a field or method of some type.
///
/// The declaring type is stored as a signature so that members of generic instances
/// (``List`1<string>::Add``) and arrays (`int[,]::Get`) can be referenced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    /// Declaring type
    pub parent: TypeSignature,
    /// Member name
    pub name: String,
    /// Field or method signature
    pub signature: MemberSignature,
}

impl MemberRef {
    /// Whether this references a field.
    #[must_use]
    pub fn is_field(&self) -> bool {
        self.signature.is_field()
    }

    /// Whether this references a constructor.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor" || self.name == ".cctor"
    }

    /// Whether this references an instance method.
    #[must_use]
    pub fn has_this(&self) -> bool {
        self.signature
            .as_method()
            .is_some_and(|method| method.has_this)
    }
}

/// An instantiation of a generic method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSpec {
    /// The generic method, a `MemberRef` or `MethodDef` token
    pub method: Token,
    /// Type arguments
    pub instantiation: Vec<TypeSignature>,
}

/// Compile time constant, used for default values of optional parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Boolean
    Bool(bool),
    /// Any integral value, narrowed to the parameter type on use
    Int(i64),
    /// Any floating point value, narrowed to the parameter type on use
    Float(f64),
    /// String
    String(String),
    /// `null`, or `default` of a reference type
    Null,
}

/// A method parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamDef {
    /// Parameter name
    pub name: String,
    /// Default value of an optional parameter
    pub default: Option<Constant>,
}

/// A field defined in this module.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Attributes
    pub flags: FieldAttributes,
    /// Field type
    pub signature: TypeSignature,
}

impl FieldDef {
    /// Whether this is a static field.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldAttributes::STATIC)
    }
}

/// A method defined in this module.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    /// Method name
    pub name: String,
    /// Attributes
    pub flags: MethodAttributes,
    /// Method signature
    pub signature: SignatureMethod,
    /// Parameters, positionally matching `signature.params`
    pub params: Vec<ParamDef>,
    /// Local variable types
    pub locals: Vec<TypeSignature>,
    /// Decoded body, empty for abstract and extern methods
    pub body: Vec<Instruction>,
}

impl MethodDef {
    /// Whether this is a static method.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodAttributes::STATIC)
    }

    /// Whether this is an instance or static constructor.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor" || self.name == ".cctor"
    }

    /// Number of trailing parameters that carry a default value.
    #[must_use]
    pub fn optional_param_count(&self) -> usize {
        self.params
            .iter()
            .rev()
            .take_while(|param| param.default.is_some())
            .count()
    }
}

/// A property defined in this module.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    /// Property name
    pub name: String,
    /// Property type
    pub signature: TypeSignature,
    /// Getter, as index into the declaring type's methods
    pub getter: Option<usize>,
    /// Setter, as index into the declaring type's methods
    pub setter: Option<usize>,
}

/// A type defined in this module.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    /// Namespace, empty for the global namespace
    pub namespace: String,
    /// Type name including generic arity suffix
    pub name: String,
    /// Attributes
    pub flags: TypeAttributes,
    /// Base type, `None` for interfaces and `System.Object`
    pub base: Option<TypeSignature>,
    /// Number of generic parameters
    pub generic_params: u32,
    /// Fields, in declaration order
    pub fields: Vec<FieldDef>,
    /// Methods, in declaration order
    pub methods: Vec<MethodDef>,
    /// Properties, in declaration order
    pub properties: Vec<PropertyDef>,
}

impl TypeDef {
    /// `Namespace.Name`, or just `Name` in the global namespace.
    #[must_use]
    pub fn full_name(&self) -> String {
        join_name(&self.namespace, &self.name)
    }

    /// Field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// All methods named `name`, in declaration order.
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodDef> {
        self.methods.iter().filter(move |method| method.name == name)
    }

    /// Property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|property| property.name == name)
    }

    /// Getter method of a property.
    #[must_use]
    pub fn getter(&self, property: &PropertyDef) -> Option<&MethodDef> {
        property.getter.and_then(|index| self.methods.get(index))
    }

    /// Setter method of a property.
    #[must_use]
    pub fn setter(&self, property: &PropertyDef) -> Option<&MethodDef> {
        property.setter.and_then(|index| self.methods.get(index))
    }
}

/// Join a namespace and a type name.
#[must_use]
pub fn join_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

/// Split a full type name into namespace and name at the last `.` outside of generic
/// arguments.
#[must_use]
pub fn split_name(full_name: &str) -> (&str, &str) {
    let head_end = full_name.find(['<', '[']).unwrap_or(full_name.len());
    match full_name[..head_end].rfind('.') {
        Some(dot) => (&full_name[..dot], &full_name[dot + 1..]),
        None => ("", full_name),
    }
}
