//! Fields that became properties without an explicit rule.

use crate::{
    compat::{
        handler::{HandleOutcome, InstructionCursor, InstructionHandler, ScanContext},
        rewriters::{accessor_replacement, field_access},
    },
    Result,
};

/// Rewrites any unresolved field reference into a validated host assembly when the type
/// now has a property of the same name and a compatible type.
///
/// This catches fields turned into properties that no explicit rule lists.
#[derive(Debug, Default)]
pub struct HeuristicFieldRewriter;

impl HeuristicFieldRewriter {
    /// The rewriter.
    #[must_use]
    pub fn new() -> Self {
        HeuristicFieldRewriter
    }
}

impl InstructionHandler for HeuristicFieldRewriter {
    fn name(&self) -> &str {
        "heuristic field to property"
    }

    fn handle_instruction(
        &self,
        ctx: &mut ScanContext<'_>,
        cursor: &InstructionCursor,
    ) -> Result<HandleOutcome> {
        let Some(access) = field_access(&cursor.instruction) else {
            return Ok(HandleOutcome::Unchanged);
        };
        let Some(operand) = ctx.member_operand(&cursor.instruction) else {
            return Ok(HandleOutcome::Unchanged);
        };
        let field = operand.member;
        let Some(field_type) = field.signature.as_field() else {
            return Ok(HandleOutcome::Unchanged);
        };
        if !ctx.is_validated(&field.parent) {
            return Ok(HandleOutcome::Unchanged);
        }
        let Some(resolved) = ctx.resolve_type(&field.parent) else {
            return Ok(HandleOutcome::Unchanged);
        };
        let hosts = ctx.hosts();
        if hosts.resolve_field(resolved, &field.name).is_some() {
            return Ok(HandleOutcome::Unchanged);
        }
        let Some((owner, property)) = hosts.resolve_property(resolved, &field.name) else {
            return Ok(HandleOutcome::Unchanged);
        };

        let expected = ctx.type_name(field_type);
        let actual = owner.type_name(&property.signature);
        if !ctx.oracle().looks_like_same_type(&expected, &actual) {
            log::trace!(
                "{}.{} became a property of type {}, not {}",
                owner.full_name(),
                field.name,
                actual,
                expected
            );
            return Ok(HandleOutcome::Unchanged);
        }

        Ok(accessor_replacement(ctx, cursor, &field, access, owner, property)?
            .map_or(HandleOutcome::Unchanged, HandleOutcome::Rewritten))
    }

    fn chains_after_rewrite(&self) -> bool {
        false
    }
}
