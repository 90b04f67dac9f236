//! Handlers that swap an instruction for a compatible one.
//!
//! Every rewrite replaces one instruction by another of the same encoded size: all field
//! access and call opcodes carry a four byte token, so a field load can become a getter
//! call and a call can move to another declaring type without touching the rest of the
//! body. References the new instruction needs are appended through the context's
//! [`crate::compat::ReferenceImporter`].
//!
//! # Key Components
//!
//! - [`FieldToPropertyRewriter`] - Fields that became properties
//! - [`FieldReplaceRewriter`] - Fields that were renamed or moved
//! - [`MethodParentRewriter`] - Methods whose declaring type changed
//! - [`ShimRewriter`] - Calls into a type that now goes through an adapter type
//! - [`HeuristicFieldRewriter`] - Unresolved fields with a matching property

mod field_property;
mod field_replace;
mod heuristic_field;
mod method_parent;
mod shim;

pub use field_property::FieldToPropertyRewriter;
pub use field_replace::FieldReplaceRewriter;
pub use heuristic_field::HeuristicFieldRewriter;
pub use method_parent::MethodParentRewriter;
pub use shim::ShimRewriter;

use crate::{
    assembly::{opcodes, Instruction},
    compat::handler::{InstructionCursor, Replacement, ScanContext},
    host::ResolvedType,
    metadata::{
        identity::{AssemblyIdentity, AssemblyVersion},
        module::{MemberRef, PropertyDef},
        signatures::{MemberSignature, SignatureMethod, TypeSignature},
        token::Token,
    },
    Result,
};

/// How an instruction accesses a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldAccess {
    Load,
    Store,
    /// `ldflda` / `ldsflda`; a property has no address
    Address,
}

/// The field access an instruction performs, if any.
pub(crate) fn field_access(instruction: &Instruction) -> Option<FieldAccess> {
    if instruction.prefix != 0 {
        return None;
    }
    match instruction.opcode {
        opcodes::LDFLD | opcodes::LDSFLD => Some(FieldAccess::Load),
        opcodes::STFLD | opcodes::STSFLD => Some(FieldAccess::Store),
        opcodes::LDFLDA | opcodes::LDSFLDA => Some(FieldAccess::Address),
        _ => None,
    }
}

/// Whether an instruction is a `volatile.` or `unaligned.` prefix, which must be
/// followed by a memory access rather than a call.
pub(crate) fn is_access_prefix(instruction: &Instruction) -> bool {
    instruction.prefix == opcodes::FE_PREFIX
        && matches!(
            instruction.opcode,
            opcodes::FE_VOLATILE | opcodes::FE_UNALIGNED
        )
}

/// Whether an instruction references a method: `call`, `callvirt`, `newobj`, `ldftn` or
/// `ldvirtftn`.
pub(crate) fn is_method_reference(instruction: &Instruction) -> bool {
    match instruction.prefix {
        0 => matches!(
            instruction.opcode,
            opcodes::CALL | opcodes::CALLVIRT | opcodes::NEWOBJ
        ),
        opcodes::FE_PREFIX => matches!(
            instruction.opcode,
            opcodes::FE_LDFTN | opcodes::FE_LDVIRTFTN
        ),
        _ => false,
    }
}

/// Identity of a host assembly; a bare name when no host module carries it.
pub(crate) fn host_identity(ctx: &ScanContext<'_>, assembly: &str) -> AssemblyIdentity {
    ctx.hosts().module(assembly).map_or_else(
        || AssemblyIdentity::new(assembly, AssemblyVersion::default()),
        |module| module.identity().clone(),
    )
}

/// Declaring type signature for a member found on `owner`.
///
/// The module's own reference is kept when it already names `owner`, so generic
/// instantiations survive; otherwise `owner` is referenced directly.
pub(crate) fn owner_signature(
    ctx: &mut ScanContext<'_>,
    parent: &TypeSignature,
    owner: ResolvedType<'_>,
) -> TypeSignature {
    let full_name = owner.full_name();
    if ctx.module().definition_name(parent).as_deref() == Some(full_name.as_str()) {
        return parent.clone();
    }
    TypeSignature::Class(ctx.importer().type_named(owner.module.identity(), &full_name))
}

/// Translate a host method signature into the module's token space.
pub(crate) fn import_method_signature(
    ctx: &mut ScanContext<'_>,
    owner: ResolvedType<'_>,
    signature: &SignatureMethod,
) -> Result<SignatureMethod> {
    let mut importer = ctx.importer();
    let mut imported = signature.clone();
    imported.return_type = importer.foreign_type(owner.module, &signature.return_type)?;
    imported.params = signature
        .params
        .iter()
        .map(|param| importer.foreign_type(owner.module, param))
        .collect::<Result<Vec<_>>>()?;
    Ok(imported)
}

/// Replace a field load or store by a call to the matching accessor of `property`.
///
/// The call has to leave the stack as the field access did: a static field becomes a
/// static accessor call, an instance field (receiver on the stack) a `callvirt` of an
/// instance accessor. Returns `None` for address loads, a missing accessor, a change
/// between static and instance, and accesses behind a `volatile.` or `unaligned.` prefix.
pub(crate) fn accessor_replacement(
    ctx: &mut ScanContext<'_>,
    cursor: &InstructionCursor,
    field: &MemberRef,
    access: FieldAccess,
    owner: ResolvedType<'_>,
    property: &PropertyDef,
) -> Result<Option<Replacement>> {
    if cursor.previous.as_ref().is_some_and(is_access_prefix) {
        log::debug!(
            "{}.{} is accessed behind a prefix, not rewriting to a call",
            owner.full_name(),
            field.name
        );
        return Ok(None);
    }

    let accessor = match access {
        FieldAccess::Load => owner.type_def.getter(property),
        FieldAccess::Store => owner.type_def.setter(property),
        FieldAccess::Address => None,
    };
    let Some(accessor) = accessor else {
        return Ok(None);
    };

    let static_access = matches!(
        cursor.instruction.opcode,
        opcodes::LDSFLD | opcodes::STSFLD
    );
    if static_access == accessor.signature.has_this {
        log::debug!(
            "{}.{} and property {} differ in being static",
            owner.full_name(),
            field.name,
            property.name
        );
        return Ok(None);
    }

    let signature = import_method_signature(ctx, owner, &accessor.signature)?;
    let opcode = if signature.has_this {
        opcodes::CALLVIRT
    } else {
        opcodes::CALL
    };
    let parent = owner_signature(ctx, &field.parent, owner);
    let token: Token = ctx.importer().member_ref(MemberRef {
        parent,
        name: accessor.name.clone(),
        signature: MemberSignature::Method(signature),
    });

    Ok(Some(Replacement::new(
        Instruction::with_token(opcode, token)?,
        format!(
            "{}.{} field to {} property",
            owner.full_name(),
            field.name,
            property.name
        ),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_kinds() {
        let token = Token::new(0x0A00_0001);
        let load = Instruction::with_token(opcodes::LDSFLD, token).unwrap();
        let store = Instruction::with_token(opcodes::STFLD, token).unwrap();
        let address = Instruction::with_token(opcodes::LDFLDA, token).unwrap();
        let call = Instruction::with_token(opcodes::CALL, token).unwrap();

        assert_eq!(field_access(&load), Some(FieldAccess::Load));
        assert_eq!(field_access(&store), Some(FieldAccess::Store));
        assert_eq!(field_access(&address), Some(FieldAccess::Address));
        assert_eq!(field_access(&call), None);

        assert!(is_method_reference(&call));
        assert!(!is_method_reference(&load));
        let ldftn = Instruction::new(
            opcodes::FE_PREFIX,
            opcodes::FE_LDFTN,
            crate::assembly::Operand::Token(token),
        )
        .unwrap();
        assert!(is_method_reference(&ldftn));
        assert!(!is_access_prefix(&ldftn));

        let volatile = Instruction::new(
            opcodes::FE_PREFIX,
            opcodes::FE_VOLATILE,
            crate::assembly::Operand::None,
        )
        .unwrap();
        let unaligned = Instruction::new(
            opcodes::FE_PREFIX,
            opcodes::FE_UNALIGNED,
            crate::assembly::Operand::Immediate(crate::assembly::Immediate::UInt8(1)),
        )
        .unwrap();
        assert!(is_access_prefix(&volatile));
        assert!(is_access_prefix(&unaligned));
    }
}
