//! Members that exist but changed type.
//!
//! Compared through [`crate::compat::TypeOracle`], so generic arity markers and
//! placeholders do not cause false reports.

use crate::{
    compat::{
        flags::FlagEntry,
        handler::{
            is_array_pseudo_type, HandleOutcome, InstructionCursor, InstructionHandler,
            ScanContext,
        },
    },
    Result,
};

/// Flags references that resolve, but to a member whose type differs from the one the
/// mod was compiled against.
///
/// A field is compared by its type, a method by its return type. Overloads make the
/// comparison ambiguous, so a method is only flagged when no same-named method on the
/// type returns what the mod expects.
#[derive(Debug, Default)]
pub struct UnexpectedTypeFinder;

impl UnexpectedTypeFinder {
    /// The finder.
    #[must_use]
    pub fn new() -> Self {
        UnexpectedTypeFinder
    }
}

impl InstructionHandler for UnexpectedTypeFinder {
    fn name(&self) -> &str {
        "unexpected member types"
    }

    fn handle_instruction(
        &self,
        ctx: &mut ScanContext<'_>,
        cursor: &InstructionCursor,
    ) -> Result<HandleOutcome> {
        let Some(operand) = ctx.member_operand(&cursor.instruction) else {
            return Ok(HandleOutcome::Unchanged);
        };
        let member = &operand.member;
        if member.is_constructor()
            || !ctx.is_validated(&member.parent)
            || is_array_pseudo_type(ctx, member)
        {
            return Ok(HandleOutcome::Unchanged);
        }
        let (Some(type_name), Some(resolved)) =
            (ctx.declaring_definition(member), ctx.resolve_type(&member.parent))
        else {
            return Ok(HandleOutcome::Unchanged);
        };
        let oracle = ctx.oracle();

        if let Some(expected) = operand.field_type() {
            let Some((owner, field)) = ctx.hosts().resolve_field(resolved, &member.name) else {
                return Ok(HandleOutcome::Unchanged);
            };
            let expected = ctx.type_name(expected);
            let actual = owner.type_name(&field.signature);
            if oracle.looks_like_same_type(&expected, &actual) {
                return Ok(HandleOutcome::Unchanged);
            }
            return Ok(HandleOutcome::Flagged(FlagEntry::not_compatible(format!(
                "reference to {}.{} (field returns {}, not {})",
                type_name,
                member.name,
                oracle.friendly_name(&actual),
                oracle.friendly_name(&expected)
            ))));
        }

        let Some(signature) = operand.method_signature() else {
            return Ok(HandleOutcome::Unchanged);
        };
        let candidates = ctx.hosts().methods_named(resolved, &member.name);
        let Some(first) = candidates.first() else {
            return Ok(HandleOutcome::Unchanged);
        };
        let expected = ctx.type_name(&signature.return_type);
        if candidates
            .iter()
            .any(|candidate| oracle.looks_like_same_type(&expected, &candidate.return_type_name()))
        {
            return Ok(HandleOutcome::Unchanged);
        }

        Ok(HandleOutcome::Flagged(FlagEntry::not_compatible(format!(
            "reference to {}.{} (method returns {}, not {})",
            type_name,
            member.name,
            oracle.friendly_name(&first.return_type_name()),
            oracle.friendly_name(&expected)
        ))))
    }
}
