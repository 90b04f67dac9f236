use crate::metadata::token::Token;

/// Element type constants of ECMA-335 II.23.1.16, as used in signature blobs.
#[allow(non_snake_case, missing_docs)]
pub mod ELEMENT_TYPE {
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Followed by type
    pub const PTR: u8 = 0x0f;
    // Followed by type
    pub const BYREF: u8 = 0x10;
    // Followed by TypeDef or TypeRef token
    pub const VALUETYPE: u8 = 0x11;
    // Followed by TypeDef or TypeRef token
    pub const CLASS: u8 = 0x12;
    // Generic parameter in a generic type definition, represented as number
    pub const VAR: u8 = 0x13;
    // type rank boundsCount bound1 … loCount lo1 …
    pub const ARRAY: u8 = 0x14;
    // Generic type instantiation. Followed by type type-arg-count type-1 ... type-n
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    // System.IntPtr
    pub const I: u8 = 0x18;
    // System.UIntPtr
    pub const U: u8 = 0x19;
    // Followed by full method signature
    pub const FNPTR: u8 = 0x1b;
    // System.Object
    pub const OBJECT: u8 = 0x1c;
    // Single-dim array with 0 lower bound
    pub const SZARRAY: u8 = 0x1d;
    // Generic parameter in a generic method definition, represented as number
    pub const MVAR: u8 = 0x1e;
    // Required modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_REQD: u8 = 0x1f;
    // Optional modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_OPT: u8 = 0x20;
    // Sentinel for vararg method signature
    pub const SENTINEL: u8 = 0x41;
    // Denotes a local variable that points at a pinned object
    pub const PINNED: u8 = 0x45;
}

/// Calling convention flags of a method signature (II.23.2.1).
#[allow(non_snake_case, missing_docs)]
pub mod CALLING_CONVENTION {
    pub const DEFAULT: u8 = 0x00;
    pub const VARARG: u8 = 0x05;
    pub const GENERIC: u8 = 0x10;
    pub const HASTHIS: u8 = 0x20;
    pub const EXPLICITTHIS: u8 = 0x40;
}

/// Signature header of a field signature (II.23.2.4).
pub const FIELD_SIGNATURE: u8 = 0x06;

/// A type as it appears in a signature blob.
///
/// Named types (`Class`, `ValueType`) carry a token into the owning module's `TypeDef`,
/// `TypeRef` or `TypeSpec` table, so a signature can only be interpreted together with
/// the module it came from (see [`crate::metadata::module::Module::type_name`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TypeSignature {
    #[default]
    /// Not defined
    Unknown,
    /// void
    Void,
    /// bool
    Boolean,
    /// char
    Char,
    /// signed 8bit integer
    I1,
    /// unsigned 8bit integer
    U1,
    /// signed 16bit integer
    I2,
    /// unsigned 16bit integer
    U2,
    /// signed 32bit integer
    I4,
    /// unsigned 32bit integer
    U4,
    /// signed 64bit integer
    I8,
    /// unsigned 64bit integer
    U8,
    /// 32bit floating-point
    R4,
    /// 64bit floating-point
    R8,
    /// System.String
    String,
    /// A pointer to a type
    Ptr(Box<TypeSignature>),
    /// Type by reference
    ByRef(Box<TypeSignature>),
    /// Value-type, `TypeDefOrRefOrSpecEncoded`
    ValueType(Token),
    /// Class, `TypeDefOrRefOrSpecEncoded`
    Class(Token),
    /// Generic parameter of the enclosing type
    GenericParamType(u32),
    /// Generic parameter of the enclosing method
    GenericParamMethod(u32),
    /// Multi-dimensional array
    Array(SignatureArray),
    /// Generic type and its arguments
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// Type is referenced during runtime
    TypedByRef,
    /// signed integer, sized to executing platform
    I,
    /// unsigned integer, sized to executing platform
    U,
    /// Function pointer
    FnPtr(Box<SignatureMethod>),
    /// System.Object
    Object,
    /// Single dimension array
    SzArray(Box<TypeSignature>),
    /// Type carrying a custom modifier (`modreq`/`modopt`)
    Modified(SignatureModifier),
    /// Pinned local variable
    Pinned(Box<TypeSignature>),
}

/// A multi-dimensional array shape (II.23.2.13).
///
/// Sizes and lower bounds are kept in their encoded form so that signatures re-encode
/// byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureArray {
    /// The element type
    pub base: Box<TypeSignature>,
    /// Number of dimensions
    pub rank: u32,
    /// Declared sizes, first dimensions first
    pub sizes: Vec<u32>,
    /// Declared lower bounds (compressed signed integers, encoded form)
    pub lower_bounds: Vec<u32>,
}

/// A custom modifier attached to a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureModifier {
    /// `modreq` if true, `modopt` otherwise
    pub required: bool,
    /// Modifier type, `TypeDefOrRefOrSpecEncoded`
    pub modifier: Token,
    /// The modified type
    pub base: Box<TypeSignature>,
}

/// A method signature (II.23.2.1), used by method definitions, method references and
/// stand-alone signatures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureMethod {
    /// Instance method (`this` is passed implicitly)
    pub has_this: bool,
    /// `this` is passed explicitly as first parameter
    pub explicit_this: bool,
    /// Variable argument list
    pub vararg: bool,
    /// Number of generic parameters of the method
    pub generic_param_count: u32,
    /// Return type
    pub return_type: TypeSignature,
    /// Parameter types, in order
    pub params: Vec<TypeSignature>,
}

impl SignatureMethod {
    /// A static method signature.
    #[must_use]
    pub fn new_static(return_type: TypeSignature, params: Vec<TypeSignature>) -> Self {
        Self {
            return_type,
            params,
            ..Self::default()
        }
    }

    /// An instance method signature.
    #[must_use]
    pub fn new_instance(return_type: TypeSignature, params: Vec<TypeSignature>) -> Self {
        Self {
            has_this: true,
            return_type,
            params,
            ..Self::default()
        }
    }

    /// Copy of this signature as a generic method with `count` type parameters.
    #[must_use]
    pub fn with_generic_params(mut self, count: u32) -> Self {
        self.generic_param_count = count;
        self
    }
}

/// The signature of a referenced member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberSignature {
    /// A field signature: the field's type
    Field(TypeSignature),
    /// A method signature
    Method(SignatureMethod),
}

impl MemberSignature {
    /// Returns `true` for field signatures.
    #[must_use]
    pub fn is_field(&self) -> bool {
        matches!(self, MemberSignature::Field(_))
    }

    /// The method signature, if this is one.
    #[must_use]
    pub fn as_method(&self) -> Option<&SignatureMethod> {
        match self {
            MemberSignature::Method(method) => Some(method),
            MemberSignature::Field(_) => None,
        }
    }

    /// The field type, if this is a field signature.
    #[must_use]
    pub fn as_field(&self) -> Option<&TypeSignature> {
        match self {
            MemberSignature::Field(field) => Some(field),
            MemberSignature::Method(_) => None,
        }
    }
}

impl TypeSignature {
    /// Strips custom modifiers and pinning, which never affect type identity for
    /// compatibility purposes.
    #[must_use]
    pub fn unmodified(&self) -> &TypeSignature {
        match self {
            TypeSignature::Modified(modifier) => modifier.base.unmodified(),
            TypeSignature::Pinned(base) => base.unmodified(),
            other => other,
        }
    }

    /// Whether this is one of the array shapes.
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(
            self.unmodified(),
            TypeSignature::SzArray(_) | TypeSignature::Array(_)
        )
    }

    /// Token of the named type this signature refers to, looking through generic
    /// instantiations (`List<int>` yields the token of ``List`1``).
    #[must_use]
    pub fn named_token(&self) -> Option<Token> {
        match self.unmodified() {
            TypeSignature::Class(token) | TypeSignature::ValueType(token) => Some(*token),
            TypeSignature::GenericInst(base, _) => base.named_token(),
            _ => None,
        }
    }

    /// Calls `visit` for every token this signature references, depth first.
    pub fn visit_tokens(&self, visit: &mut impl FnMut(Token)) {
        match self {
            TypeSignature::Class(token) | TypeSignature::ValueType(token) => visit(*token),
            TypeSignature::Ptr(base)
            | TypeSignature::ByRef(base)
            | TypeSignature::SzArray(base)
            | TypeSignature::Pinned(base) => base.visit_tokens(visit),
            TypeSignature::Array(array) => array.base.visit_tokens(visit),
            TypeSignature::GenericInst(base, args) => {
                base.visit_tokens(visit);
                for arg in args {
                    arg.visit_tokens(visit);
                }
            }
            TypeSignature::FnPtr(method) => {
                method.return_type.visit_tokens(visit);
                for param in &method.params {
                    param.visit_tokens(visit);
                }
            }
            TypeSignature::Modified(modifier) => {
                visit(modifier.modifier);
                modifier.base.visit_tokens(visit);
            }
            _ => {}
        }
    }
}
