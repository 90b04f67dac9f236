//! Synthesis of adapter types for [`crate::compat::rewriters::ShimRewriter`].
//!
//! An adapter derives from a host type and declares every overload a mod may have been
//! compiled against, including ones the current host dropped. Each overload forwards to
//! the most specific current overload of the same name, filling trailing optional
//! parameters with their default values.
//!
//! ```rust,no_run
//! use modcompat::compat::AdapterBuilder;
//! use modcompat::host::HostAssemblies;
//! use modcompat::metadata::identity::{AssemblyIdentity, AssemblyVersion};
//! use modcompat::metadata::module::ModuleBuilder;
//! use modcompat::metadata::signatures::{SignatureMethod, TypeSignature};
//!
//! # fn hosts() -> HostAssemblies { unimplemented!() }
//! let hosts = hosts();
//! let renderer = hosts.resolve_type(&["Host"], "Host.Renderer").unwrap();
//!
//! let identity = AssemblyIdentity::new("Host.Adapters", AssemblyVersion::new(1, 0, 0, 0));
//! let mut builder = ModuleBuilder::new(identity);
//! AdapterBuilder::new("Host", "RendererAdapter", renderer)
//!     .overload("Flush", SignatureMethod::new_instance(TypeSignature::Void, vec![]))
//!     .build(&mut builder)?;
//! # Ok::<(), modcompat::Error>(())
//! ```

use crate::{
    assembly::InstructionEncoder,
    compat::oracle::TypeOracle,
    host::ResolvedType,
    metadata::{
        module::{
            Constant, MethodAttributes, MethodBuilder, MethodDef, ModuleBuilder,
            TypeBuilder,
        },
        signatures::{MemberSignature, SignatureMethod, TypeSignature},
        token::Token,
    },
    Error, Result,
};

/// A value pushed for an omitted optional parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DefaultValue {
    I4(i32),
    I8(i64),
    R4(f32),
    R8(f64),
    Str(Token),
    Null,
}

impl DefaultValue {
    fn emit(self, encoder: &mut InstructionEncoder) -> Result<()> {
        match self {
            DefaultValue::I4(value) => encoder.emit_ldc_i4(value),
            DefaultValue::I8(value) => encoder.emit_ldc_i8(value),
            DefaultValue::R4(value) => encoder.emit_ldc_r4(value),
            DefaultValue::R8(value) => encoder.emit_ldc_r8(value),
            DefaultValue::Str(token) => encoder.emit_ldstr(token),
            DefaultValue::Null => encoder.emit_ldnull(),
        }
    }
}

/// A forwarding method of the adapter.
struct Forward {
    name: String,
    signature: SignatureMethod,
    target: Token,
    virtual_call: bool,
    defaults: Vec<DefaultValue>,
}

/// Builds an adapter type over a resolved host type.
pub struct AdapterBuilder<'h> {
    namespace: String,
    name: String,
    target: ResolvedType<'h>,
    overloads: Vec<(String, SignatureMethod)>,
    oracle: TypeOracle,
}

impl<'h> AdapterBuilder<'h> {
    /// Adapter `namespace.name` deriving from `target`.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        target: ResolvedType<'h>,
    ) -> Self {
        AdapterBuilder {
            namespace: namespace.into(),
            name: name.into(),
            target,
            overloads: Vec::new(),
            oracle: TypeOracle::default(),
        }
    }

    /// Declare an overload. `signature` uses the token space of the module being built.
    #[must_use]
    pub fn overload(mut self, name: impl Into<String>, signature: SignatureMethod) -> Self {
        self.overloads.push((name.into(), signature));
        self
    }

    /// Declare every method of another variant of the target type, e.g. the same type of
    /// the other platform's assembly. Property accessors are included.
    ///
    /// # Errors
    /// See [`ModuleBuilder::import_foreign_type`].
    pub fn overloads_of(
        mut self,
        builder: &mut ModuleBuilder,
        variant: ResolvedType<'_>,
    ) -> Result<Self> {
        for method in &variant.type_def.methods {
            if method.name == ".cctor" {
                continue;
            }
            let mut signature = method.signature.clone();
            signature.return_type =
                builder.import_foreign_type(variant.module, &method.signature.return_type)?;
            signature.params = method
                .signature
                .params
                .iter()
                .map(|param| builder.import_foreign_type(variant.module, param))
                .collect::<Result<Vec<_>>>()?;
            if !self
                .overloads
                .iter()
                .any(|(name, existing)| *name == method.name && *existing == signature)
            {
                self.overloads.push((method.name.clone(), signature));
            }
        }
        Ok(self)
    }

    /// Add the adapter to `builder`, returning its `TypeDef` token.
    ///
    /// # Errors
    /// Returns [`crate::Error::RewriteRejected`] if an overload has no current overload
    /// to forward to, or a default value cannot be expressed for its parameter type.
    pub fn build(self, builder: &mut ModuleBuilder) -> Result<Token> {
        let identity = self.target.module.identity().clone();
        let target_name = self.target.full_name();
        let parent = TypeSignature::Class(builder.import_type_named(&identity, &target_name));

        let mut forwards = Vec::with_capacity(self.overloads.len());
        for (name, signature) in &self.overloads {
            let target = self.forward_target(builder, name, signature).ok_or_else(|| {
                Error::RewriteRejected(format!(
                    "{}.{} has no overload {} can forward to",
                    target_name, name, self.name
                ))
            })?;

            let supplied = signature.params.len();
            let extra = target.params.get(supplied..).unwrap_or_default();
            let extra_types = target.signature.params.get(supplied..).unwrap_or_default();
            let mut defaults = Vec::with_capacity(extra.len());
            for (param, param_type) in extra.iter().zip(extra_types) {
                let constant = param.default.as_ref().ok_or_else(|| {
                    Error::RewriteRejected(format!(
                        "{}.{} lacks a default",
                        target_name, param.name
                    ))
                })?;
                defaults.push(self.default_value(builder, constant, param_type)?);
            }

            let mut target_signature = target.signature.clone();
            target_signature.return_type =
                builder.import_foreign_type(self.target.module, &target.signature.return_type)?;
            target_signature.params = target
                .signature
                .params
                .iter()
                .map(|param| builder.import_foreign_type(self.target.module, param))
                .collect::<Result<Vec<_>>>()?;

            let token = builder.member_ref(
                parent.clone(),
                &target.name,
                MemberSignature::Method(target_signature),
            );
            forwards.push(Forward {
                name: name.clone(),
                signature: signature.clone(),
                target: token,
                virtual_call: signature.has_this
                    && !target.is_constructor()
                    && target.flags.contains(MethodAttributes::VIRTUAL),
                defaults,
            });
        }

        let mut adapter = TypeBuilder::new(&self.namespace, &self.name);
        adapter.base(parent);
        for forward in forwards {
            let arg_count =
                forward.signature.params.len() + usize::from(forward.signature.has_this);
            let arg_count = u16::try_from(arg_count).map_err(|_| {
                Error::RewriteRejected(format!("{} has too many parameters", forward.name))
            })?;
            let Forward {
                name,
                signature,
                target,
                virtual_call,
                defaults,
            } = forward;

            adapter.method(MethodBuilder::new(&name, signature).body(move |encoder| {
                for arg in 0..arg_count {
                    encoder.emit_ldarg(arg)?;
                }
                for default in defaults {
                    default.emit(encoder)?;
                }
                encoder.emit_call(target, virtual_call)?;
                encoder.emit_ret()
            }));
        }

        log::debug!(
            "built adapter {}.{} over {} with {} overloads",
            self.namespace,
            self.name,
            target_name,
            self.overloads.len()
        );
        builder.add_type(adapter)
    }

    /// The current overload `signature` forwards to: same name, static-ness and generic
    /// arity, leading parameters alike and every further parameter optional. The one
    /// with the fewest extra parameters wins, then the first declared.
    fn forward_target(
        &self,
        builder: &ModuleBuilder,
        name: &str,
        signature: &SignatureMethod,
    ) -> Option<&'h MethodDef> {
        let expected: Vec<String> = signature
            .params
            .iter()
            .map(|param| builder.module().type_name(param))
            .collect();
        let expected_return = builder.module().type_name(&signature.return_type);

        self.target
            .type_def
            .methods
            .iter()
            .filter(|candidate| {
                let actual = &candidate.signature;
                candidate.name == name
                    && actual.has_this == signature.has_this
                    && actual.generic_param_count == signature.generic_param_count
                    && actual.params.len() >= expected.len()
                    && candidate.optional_param_count() >= actual.params.len() - expected.len()
                    && self.oracle.looks_like_same_type(
                        &expected_return,
                        &self.target.type_name(&actual.return_type),
                    )
                    && actual.params.iter().zip(&expected).all(|(param, expected)| {
                        self.oracle
                            .looks_like_same_type(expected, &self.target.type_name(param))
                    })
            })
            .min_by_key(|candidate| candidate.signature.params.len())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn default_value(
        &self,
        builder: &mut ModuleBuilder,
        constant: &Constant,
        param_type: &TypeSignature,
    ) -> Result<DefaultValue> {
        let param_type = param_type.unmodified();
        let rejected = || {
            Error::RewriteRejected(format!(
                "default {:?} does not fit {}",
                constant,
                self.target.type_name(param_type)
            ))
        };

        Ok(match constant {
            Constant::Bool(value) => DefaultValue::I4(i32::from(*value)),
            Constant::Int(value) => match param_type {
                TypeSignature::I8 | TypeSignature::U8 => DefaultValue::I8(*value),
                TypeSignature::R4 => DefaultValue::R4(*value as f32),
                TypeSignature::R8 => DefaultValue::R8(*value as f64),
                _ => DefaultValue::I4(i32::try_from(*value).map_err(|_| rejected())?),
            },
            Constant::Float(value) => match param_type {
                TypeSignature::R4 => DefaultValue::R4(*value as f32),
                TypeSignature::R8 => DefaultValue::R8(*value),
                _ => return Err(rejected()),
            },
            Constant::String(value) => DefaultValue::Str(builder.user_string(value)),
            Constant::Null => match param_type {
                TypeSignature::String
                | TypeSignature::Object
                | TypeSignature::Class(_)
                | TypeSignature::SzArray(_)
                | TypeSignature::Array(_)
                | TypeSignature::GenericParamType(_)
                | TypeSignature::GenericParamMethod(_) => DefaultValue::Null,
                TypeSignature::GenericInst(base, _)
                    if matches!(**base, TypeSignature::Class(_)) =>
                {
                    DefaultValue::Null
                }
                _ => return Err(rejected()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::opcodes,
        metadata::identity::{AssemblyIdentity, AssemblyVersion},
        test::host_assemblies,
    };

    fn adapter_module(
        build: impl FnOnce(AdapterBuilder<'_>, &mut ModuleBuilder) -> Result<Token>,
    ) -> crate::metadata::module::Module {
        let hosts = host_assemblies();
        let renderer = hosts.resolve_type(&["Host"], "Host.Renderer").unwrap();
        let mut builder = ModuleBuilder::new(AssemblyIdentity::new(
            "Host.Adapters",
            AssemblyVersion::new(1, 0, 0, 0),
        ));
        let adapter = AdapterBuilder::new("Host", "RenderShim", renderer);
        build(adapter, &mut builder).unwrap();
        builder.build()
    }

    #[test]
    fn forwards_with_defaults() {
        let module = adapter_module(|adapter, builder| {
            let host = AssemblyIdentity::new("Host", AssemblyVersion::new(1, 6, 0, 0));
            let widget = TypeSignature::Class(builder.import_type_named(&host, "Host.Widget"));
            adapter
                .overload(
                    "Draw",
                    SignatureMethod::new_instance(TypeSignature::Void, vec![
                        widget,
                        TypeSignature::R4,
                    ]),
                )
                .build(builder)
        });

        let shim = module.find_type("Host.RenderShim").unwrap();
        assert_eq!(module.type_name(shim.base.as_ref().unwrap()), "Host.Renderer");
        let draw = &shim.methods[0];
        let mnemonics: Vec<_> = draw.body.iter().map(|i| i.mnemonic).collect();
        assert_eq!(mnemonics, vec!["ldarg.0", "ldarg.1", "ldarg.2", "ldc.i4.0", "callvirt", "ret"]);

        let call = module.member_ref(draw.body[4].token().unwrap()).unwrap();
        assert_eq!(call.name, "Draw");
        assert_eq!(call.signature.as_method().unwrap().params.len(), 3);
        assert!(call.has_this());
    }

    #[test]
    fn static_forward_with_string_default() {
        let module = adapter_module(|adapter, builder| {
            adapter
                .overload("Log", SignatureMethod::new_static(TypeSignature::Void, vec![]))
                .build(builder)
        });

        let shim = module.find_type("Host.RenderShim").unwrap();
        let log = &shim.methods[0];
        assert!(log.is_static());
        assert!(log.body[0].is(opcodes::LDSTR));
        assert_eq!(module.user_string(log.body[0].token().unwrap()), Some("renderer"));
        assert!(log.body[1].is(opcodes::CALL));
    }

    #[test]
    fn overloads_of_variant() {
        let hosts = host_assemblies();
        let renderer = hosts.resolve_type(&["Host"], "Host.Renderer").unwrap();
        let mut builder = ModuleBuilder::new(AssemblyIdentity::new(
            "Host.Adapters",
            AssemblyVersion::new(1, 0, 0, 0),
        ));
        let adapter = AdapterBuilder::new("Host", "RenderShim", renderer)
            .overloads_of(&mut builder, renderer)
            .unwrap()
            .overloads_of(&mut builder, renderer)
            .unwrap();
        assert_eq!(adapter.overloads.len(), 3);

        adapter.build(&mut builder).unwrap();
        let module = builder.build();
        let shim = module.find_type("Host.RenderShim").unwrap();
        let names: Vec<_> = shim.methods.iter().map(|method| method.name.as_str()).collect();
        assert_eq!(names, vec!["Draw", "Log", "Tint"]);
        assert_eq!(module.type_name(&shim.methods[0].signature.params[0]), "Host.Widget");
    }

    #[test]
    fn missing_forward_is_rejected() {
        let hosts = host_assemblies();
        let renderer = hosts.resolve_type(&["Host"], "Host.Renderer").unwrap();
        let mut builder = ModuleBuilder::new(AssemblyIdentity::new(
            "Host.Adapters",
            AssemblyVersion::new(1, 0, 0, 0),
        ));
        let result = AdapterBuilder::new("Host", "RenderShim", renderer)
            .overload("Vanish", SignatureMethod::new_instance(TypeSignature::Void, vec![]))
            .build(&mut builder);
        assert!(matches!(result, Err(Error::RewriteRejected(_))));
    }

    #[test]
    fn null_default_for_value_type_is_rejected() {
        let hosts = host_assemblies();
        let renderer = hosts.resolve_type(&["Host"], "Host.Renderer").unwrap();
        let mut builder = ModuleBuilder::new(AssemblyIdentity::new(
            "Host.Adapters",
            AssemblyVersion::new(1, 0, 0, 0),
        ));
        let result = AdapterBuilder::new("Host", "RenderShim", renderer)
            .overload("Tint", SignatureMethod::new_instance(TypeSignature::Void, vec![]))
            .build(&mut builder);
        assert!(matches!(result, Err(Error::RewriteRejected(_))));
    }
}
