//! Read-only handlers that raise flags.
//!
//! # Key Components
//!
//! - [`SymbolFinder`] - Exact `(type, member)` pairs, e.g. permanently removed APIs
//! - [`TypeFinder`] / [`AssemblyFinder`] - Any use of a named type or assembly
//! - [`MissingMemberFinder`] - References into validated assemblies that do not resolve
//! - [`UnexpectedTypeFinder`] - References that resolve to a member of another type
//! - [`AssemblyVersionFinder`] - References to a newer host than the one running

mod missing;
mod reference;
mod symbol;
mod unexpected;
mod version;

pub use missing::MissingMemberFinder;
pub use reference::{AssemblyFinder, TypeFinder, TypeMatch};
pub use symbol::{Symbol, SymbolFinder};
pub use unexpected::UnexpectedTypeFinder;
pub use version::AssemblyVersionFinder;

use crate::{
    assembly::Instruction,
    compat::handler::ScanContext,
    host::{ResolvedMethod, ResolvedType},
    metadata::{
        module::Module,
        signatures::{SignatureMethod, TypeSignature},
        token::{TableId, Token},
    },
};

/// A method of `resolved` (or its bases) matching `name`, static-ness, generic arity and
/// parameter types of `signature`. Parameter types are compared with the oracle.
pub(crate) fn find_method<'a>(
    ctx: &ScanContext<'a>,
    resolved: ResolvedType<'a>,
    name: &str,
    signature: &SignatureMethod,
) -> Option<ResolvedMethod<'a>> {
    let expected = ctx.param_type_names(signature);
    let oracle = ctx.oracle();

    ctx.hosts()
        .methods_named(resolved, name)
        .into_iter()
        .find(|candidate| {
            let actual = &candidate.method.signature;
            actual.has_this == signature.has_this
                && actual.generic_param_count == signature.generic_param_count
                && actual.params.len() == expected.len()
                && candidate
                    .param_type_names()
                    .iter()
                    .zip(&expected)
                    .all(|(actual, expected)| oracle.looks_like_same_type(expected, actual))
        })
}

/// One use of a named type by an instruction or method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TypeUse {
    /// Full name without generic arguments
    pub name: String,
    /// Defining assembly, as referenced by the module
    pub scope: Option<String>,
    /// Member accessed on the type, when the type is a declaring type
    pub member: Option<String>,
}

fn push_signature_types(
    module: &Module,
    signature: &TypeSignature,
    member: Option<&str>,
    out: &mut Vec<TypeUse>,
    depth: usize,
) {
    if depth > 16 {
        return;
    }

    let mut tokens = Vec::new();
    signature.visit_tokens(&mut |token| tokens.push(token));
    let declaring = signature.named_token();

    for token in tokens {
        if token.is_table(TableId::TypeSpec) {
            if let Some(spec) = module.type_spec(token) {
                push_signature_types(module, spec, member, out, depth + 1);
            }
            continue;
        }

        let class = TypeSignature::Class(token);
        let Some(name) = module.definition_name(&class) else {
            continue;
        };
        out.push(TypeUse {
            name,
            scope: module.type_scope(&class).map(str::to_string),
            member: if Some(token) == declaring {
                member.map(str::to_string)
            } else {
                None
            },
        });
    }
}

fn push_method_signature_types(
    module: &Module,
    signature: &SignatureMethod,
    out: &mut Vec<TypeUse>,
) {
    push_signature_types(module, &signature.return_type, None, out, 0);
    for param in &signature.params {
        push_signature_types(module, param, None, out, 0);
    }
}

/// Types an instruction operand references: the declaring type of a member (with the
/// member name), the member's own signature and any generic instantiation.
pub(crate) fn instruction_types(ctx: &ScanContext<'_>, instruction: &Instruction) -> Vec<TypeUse> {
    let mut uses = Vec::new();
    let module = ctx.module();

    if let Some(operand) = ctx.member_operand(instruction) {
        push_signature_types(
            module,
            &operand.member.parent,
            Some(&operand.member.name),
            &mut uses,
            0,
        );
        match (operand.field_type(), operand.method_signature()) {
            (Some(field_type), _) => push_signature_types(module, field_type, None, &mut uses, 0),
            (_, Some(signature)) => push_method_signature_types(module, signature, &mut uses),
            _ => {}
        }
        if let Some(spec) = &operand.spec {
            for arg in &spec.instantiation {
                push_signature_types(module, arg, None, &mut uses, 0);
            }
        }
        return uses;
    }

    if let Some(token) = instruction.token() {
        if matches!(
            token.table_id(),
            Some(TableId::TypeRef | TableId::TypeDef | TableId::TypeSpec)
        ) {
            push_signature_types(module, &TypeSignature::Class(token), None, &mut uses, 0);
        }
    }
    uses
}

/// Types a method's signature and local variables use.
pub(crate) fn method_types(module: &Module, method: Token) -> Vec<TypeUse> {
    let mut uses = Vec::new();
    if let Some((_, method)) = module.method(method) {
        push_method_signature_types(module, &method.signature, &mut uses);
        for local in &method.locals {
            push_signature_types(module, local, None, &mut uses, 0);
        }
    }
    uses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::opcodes,
        compat::{oracle::TypeOracle, platform::PlatformAssemblyMap, Platform},
        test::{host_assemblies, ModFixture},
    };

    #[test]
    fn instruction_type_uses() {
        let mut fixture = ModFixture::new();
        let list = fixture.type_ref("System.Collections.Generic.List`1");
        let widget = fixture.type_ref("Host.Widget");
        let parent = TypeSignature::GenericInst(
            Box::new(TypeSignature::Class(list)),
            vec![TypeSignature::Class(widget)],
        );
        let add = fixture.builder.member_ref(
            parent,
            "Add",
            crate::metadata::signatures::MemberSignature::Method(SignatureMethod::new_instance(
                TypeSignature::Void,
                vec![TypeSignature::GenericParamType(0)],
            )),
        );
        let mut module = fixture.finish(|_| Ok(()));

        let hosts = host_assemblies();
        let platform = PlatformAssemblyMap::empty(Platform::Linux);
        let oracle = TypeOracle::default();
        let ctx = ScanContext::new(&mut module, &hosts, &platform, &oracle, false);

        let call = Instruction::with_token(opcodes::CALLVIRT, add).unwrap();
        let uses = instruction_types(&ctx, &call);
        assert_eq!(uses.len(), 2);
        assert_eq!(uses[0].name, "System.Collections.Generic.List`1");
        assert_eq!(uses[0].scope.as_deref(), Some("mscorlib"));
        assert_eq!(uses[0].member.as_deref(), Some("Add"));
        assert_eq!(uses[1].name, "Host.Widget");
        assert_eq!(uses[1].scope.as_deref(), Some("Host"));
        assert!(uses[1].member.is_none());

        let box_widget = Instruction::with_token(opcodes::BOX, widget).unwrap();
        let boxed = instruction_types(&ctx, &box_widget);
        assert_eq!(boxed.len(), 1);
        assert_eq!(boxed[0].name, "Host.Widget");
    }

    #[test]
    fn overloads_match_by_parameter_types() {
        let mut module = ModFixture::new().finish(|_| Ok(()));
        let hosts = host_assemblies();
        let platform = PlatformAssemblyMap::empty(Platform::Linux);
        let oracle = TypeOracle::default();
        let ctx = ScanContext::new(&mut module, &hosts, &platform, &oracle, false);

        let widget = hosts.resolve_type(&["Host"], "Host.Widget").unwrap();
        let draw_float =
            SignatureMethod::new_instance(TypeSignature::Void, vec![TypeSignature::R4]);
        assert!(find_method(&ctx, widget, "Draw", &draw_float).is_some());

        let draw_int = SignatureMethod::new_instance(TypeSignature::Void, vec![TypeSignature::I4]);
        assert!(find_method(&ctx, widget, "Draw", &draw_int).is_none());

        let static_draw = SignatureMethod::new_static(TypeSignature::Void, vec![TypeSignature::R4]);
        assert!(find_method(&ctx, widget, "Draw", &static_draw).is_none());
    }
}
