//! Programmatic construction of modules.
//!
//! Hosts describe their assemblies with a [`ModuleBuilder`], the adapter builder emits its
//! shim types with it and tests use it to produce mod modules without a compiler.

use uguid::Guid;

use crate::{
    assembly::{Instruction, InstructionEncoder},
    metadata::{
        identity::AssemblyIdentity,
        module::{
            Constant, FieldAttributes, FieldDef, MemberRef, MethodAttributes, MethodDef,
            MethodSpec, Module, ParamDef, PropertyDef, ResolutionScope, TypeAttributes, TypeDef,
            TypeRef,
        },
        signatures::{MemberSignature, SignatureMethod, TypeSignature},
        token::{TableId, Token},
    },
    Result,
};

/// Builds a [`Module`] table by table.
///
/// ```rust
/// use modcompat::metadata::identity::{AssemblyIdentity, AssemblyVersion};
/// use modcompat::metadata::module::{FieldAttributes, ModuleBuilder, TypeBuilder};
/// use modcompat::metadata::signatures::TypeSignature;
///
/// let identity = AssemblyIdentity::new("Host", AssemblyVersion::new(1, 6, 0, 0));
/// let mut builder = ModuleBuilder::new(identity);
/// let mut widget = TypeBuilder::new("Host", "Widget");
/// widget.field("Name", FieldAttributes::PUBLIC, TypeSignature::I4);
/// builder.add_type(widget)?;
///
/// let module = builder.build();
/// assert!(module.find_type("Host.Widget").unwrap().field("Name").is_some());
/// # Ok::<(), modcompat::Error>(())
/// ```
pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    /// Start a module for the assembly `identity`; the module name defaults to
    /// `<name>.dll`.
    #[must_use]
    pub fn new(identity: AssemblyIdentity) -> Self {
        ModuleBuilder {
            module: Module {
                mvid: Guid::ZERO,
                name: format!("{}.dll", identity.name),
                identity,
                assembly_refs: Vec::new(),
                type_refs: Vec::new(),
                type_specs: Vec::new(),
                member_refs: Vec::new(),
                method_specs: Vec::new(),
                standalone_sigs: Vec::new(),
                user_strings: Vec::new(),
                types: Vec::new(),
                method_rows: Vec::new(),
                field_rows: Vec::new(),
            },
        }
    }

    /// Set the module version id.
    #[must_use]
    pub fn mvid(mut self, mvid: Guid) -> Self {
        self.module.mvid = mvid;
        self
    }

    /// Set the module name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.module.name = name.into();
        self
    }

    /// Add (or reuse) an assembly reference.
    pub fn assembly_ref(&mut self, identity: AssemblyIdentity) -> Token {
        self.module.import_assembly_ref(&identity)
    }

    /// Add (or reuse) a reference to a type of the assembly `assembly_ref`.
    pub fn type_ref(&mut self, assembly_ref: Token, namespace: &str, name: &str) -> Token {
        self.module.import_type_ref(TypeRef {
            scope: ResolutionScope::AssemblyRef(assembly_ref),
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    /// Add (or reuse) a reference to a type of this module.
    pub fn local_type_ref(&mut self, namespace: &str, name: &str) -> Token {
        self.module.import_type_ref(TypeRef {
            scope: ResolutionScope::CurrentModule,
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    /// Add a type specification.
    pub fn type_spec(&mut self, signature: TypeSignature) -> Token {
        self.module.type_specs.push(signature);
        Token::from_parts(TableId::TypeSpec, self.module.type_specs.len() as u32)
    }

    /// Add (or reuse) a member reference.
    pub fn member_ref(
        &mut self,
        parent: TypeSignature,
        name: &str,
        signature: MemberSignature,
    ) -> Token {
        self.module.import_member_ref(MemberRef {
            parent,
            name: name.to_string(),
            signature,
        })
    }

    /// Add (or reuse) a generic method instantiation.
    pub fn method_spec(&mut self, method: Token, instantiation: Vec<TypeSignature>) -> Token {
        self.module.import_method_spec(MethodSpec {
            method,
            instantiation,
        })
    }

    /// Add a stand-alone method signature.
    pub fn standalone_sig(&mut self, signature: SignatureMethod) -> Token {
        self.module.standalone_sigs.push(signature);
        Token::from_parts(TableId::StandAloneSig, self.module.standalone_sigs.len() as u32)
    }

    /// Add (or reuse) a user string.
    pub fn user_string(&mut self, value: &str) -> Token {
        self.module.import_user_string(value)
    }

    /// Reference the type `full_name` of `assembly`.
    pub fn import_type_named(&mut self, assembly: &AssemblyIdentity, full_name: &str) -> Token {
        self.module.import_type_named(assembly, full_name)
    }

    /// Translate a signature of another module into this module's token space.
    ///
    /// # Errors
    /// See [`Module::import_foreign_type`].
    pub fn import_foreign_type(
        &mut self,
        source: &Module,
        signature: &TypeSignature,
    ) -> Result<TypeSignature> {
        self.module.import_foreign_type(source, signature)
    }

    /// The module under construction.
    #[must_use]
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Token the next type passed to [`ModuleBuilder::add_type`] will receive.
    #[must_use]
    pub fn next_type_token(&self) -> Token {
        Token::from_parts(TableId::TypeDef, self.module.types.len() as u32 + 1)
    }

    /// Token the `index`th method of the next added type will receive.
    #[must_use]
    pub fn next_method_token(&self, index: usize) -> Token {
        Token::from_parts(
            TableId::MethodDef,
            (self.module.method_rows.len() + index) as u32 + 1,
        )
    }

    /// Add a type definition, returning its token.
    ///
    /// # Errors
    /// Returns an error if a method body failed to assemble or a property names an
    /// accessor the type does not define.
    pub fn add_type(&mut self, builder: TypeBuilder) -> Result<Token> {
        let type_def = builder.finish()?;
        if self.module.find_type(&type_def.full_name()).is_some() {
            return Err(malformed_error!(
                "Type '{}' is defined twice",
                type_def.full_name()
            ));
        }

        self.module.types.push(type_def);
        self.module.reindex();
        Ok(Token::from_parts(
            TableId::TypeDef,
            self.module.types.len() as u32,
        ))
    }

    /// Finish the module.
    #[must_use]
    pub fn build(mut self) -> Module {
        self.module.reindex();
        self.module
    }
}

struct PendingProperty {
    name: String,
    signature: TypeSignature,
    getter: Option<String>,
    setter: Option<String>,
}

/// Builds a [`TypeDef`].
pub struct TypeBuilder {
    type_def: TypeDef,
    methods: Vec<MethodBuilder>,
    properties: Vec<PendingProperty>,
}

impl TypeBuilder {
    /// A public class in `namespace`.
    #[must_use]
    pub fn new(namespace: &str, name: &str) -> Self {
        TypeBuilder {
            type_def: TypeDef {
                namespace: namespace.to_string(),
                name: name.to_string(),
                flags: TypeAttributes::PUBLIC,
                base: None,
                generic_params: 0,
                fields: Vec::new(),
                methods: Vec::new(),
                properties: Vec::new(),
            },
            methods: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Replace the type attributes.
    pub fn flags(&mut self, flags: TypeAttributes) -> &mut Self {
        self.type_def.flags = flags;
        self
    }

    /// Set the base type.
    pub fn base(&mut self, base: TypeSignature) -> &mut Self {
        self.type_def.base = Some(base);
        self
    }

    /// Set the generic parameter count.
    pub fn generic_params(&mut self, count: u32) -> &mut Self {
        self.type_def.generic_params = count;
        self
    }

    /// Add a field.
    pub fn field(
        &mut self,
        name: &str,
        flags: FieldAttributes,
        signature: TypeSignature,
    ) -> &mut Self {
        self.type_def.fields.push(FieldDef {
            name: name.to_string(),
            flags,
            signature,
        });
        self
    }

    /// Add a method.
    pub fn method(&mut self, method: MethodBuilder) -> &mut Self {
        self.methods.push(method);
        self
    }

    /// Add a property whose accessors are methods of this type, referenced by name.
    pub fn property(
        &mut self,
        name: &str,
        signature: TypeSignature,
        getter: Option<&str>,
        setter: Option<&str>,
    ) -> &mut Self {
        self.properties.push(PendingProperty {
            name: name.to_string(),
            signature,
            getter: getter.map(str::to_string),
            setter: setter.map(str::to_string),
        });
        self
    }

    fn finish(self) -> Result<TypeDef> {
        let mut type_def = self.type_def;
        for method in self.methods {
            type_def.methods.push(method.finish()?);
        }

        for pending in self.properties {
            let mut accessor = |name: Option<String>| -> Result<Option<usize>> {
                let Some(name) = name else {
                    return Ok(None);
                };
                let index = type_def
                    .methods
                    .iter()
                    .position(|method| method.name == name)
                    .ok_or_else(|| {
                        malformed_error!(
                            "Property accessor '{}' is not defined on '{}'",
                            name,
                            type_def.full_name()
                        )
                    })?;
                type_def.methods[index].flags |= MethodAttributes::SPECIAL_NAME;
                Ok(Some(index))
            };

            let getter = accessor(pending.getter)?;
            let setter = accessor(pending.setter)?;
            type_def.properties.push(PropertyDef {
                name: pending.name,
                signature: pending.signature,
                getter,
                setter,
            });
        }

        Ok(type_def)
    }
}

/// Builds a [`MethodDef`].
///
/// Flags default to `public hidebysig`, plus `static` for signatures without `this` and the
/// special name flags for constructors.
pub struct MethodBuilder {
    method: MethodDef,
    body: Result<Vec<Instruction>>,
}

impl MethodBuilder {
    /// A method with parameters named `arg0`, `arg1`, ... and an empty body.
    #[must_use]
    pub fn new(name: &str, signature: SignatureMethod) -> Self {
        let mut flags = MethodAttributes::PUBLIC | MethodAttributes::HIDE_BY_SIG;
        if !signature.has_this {
            flags |= MethodAttributes::STATIC;
        }
        if name == ".ctor" || name == ".cctor" {
            flags |= MethodAttributes::SPECIAL_NAME | MethodAttributes::RT_SPECIAL_NAME;
        }

        let params = (0..signature.params.len())
            .map(|i| ParamDef {
                name: format!("arg{i}"),
                default: None,
            })
            .collect();

        MethodBuilder {
            method: MethodDef {
                name: name.to_string(),
                flags,
                signature,
                params,
                locals: Vec::new(),
                body: Vec::new(),
            },
            body: Ok(Vec::new()),
        }
    }

    /// Replace the method attributes.
    #[must_use]
    pub fn flags(mut self, flags: MethodAttributes) -> Self {
        self.method.flags = flags;
        self
    }

    /// Name the parameter at `index`.
    #[must_use]
    pub fn param_name(mut self, index: usize, name: &str) -> Self {
        if let Some(param) = self.method.params.get_mut(index) {
            param.name = name.to_string();
        }
        self
    }

    /// Give the parameter at `index` a default value, making it optional.
    #[must_use]
    pub fn optional(mut self, index: usize, default: Constant) -> Self {
        if let Some(param) = self.method.params.get_mut(index) {
            param.default = Some(default);
        }
        self
    }

    /// Set the local variable types.
    #[must_use]
    pub fn locals(mut self, locals: Vec<TypeSignature>) -> Self {
        self.method.locals = locals;
        self
    }

    /// Assemble the body with an [`InstructionEncoder`].
    #[must_use]
    pub fn body<F>(mut self, emit: F) -> Self
    where
        F: FnOnce(&mut InstructionEncoder) -> Result<()>,
    {
        let mut encoder = InstructionEncoder::new();
        self.body = emit(&mut encoder).map(|()| encoder.finish());
        self
    }

    /// Use already decoded instructions as body.
    #[must_use]
    pub fn instructions(mut self, instructions: Vec<Instruction>) -> Self {
        self.body = Ok(instructions);
        self
    }

    fn finish(self) -> Result<MethodDef> {
        let mut method = self.method;
        method.body = self.body?;
        Ok(method)
    }
}
