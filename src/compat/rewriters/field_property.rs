//! Fields listed as turned into properties.

use crate::{
    compat::{
        handler::{HandleOutcome, InstructionCursor, InstructionHandler, ScanContext},
        rewriters::{accessor_replacement, field_access},
    },
    Result,
};

/// Rewrites accesses of a field that became a property into accessor calls.
///
/// Loads call the getter and stores the setter, with `callvirt` for instance and `call`
/// for static properties. Address loads are left alone; the missing member finder
/// reports them if the field is really gone.
#[derive(Debug, Clone)]
pub struct FieldToPropertyRewriter {
    type_name: String,
    field_name: String,
    property_name: String,
}

impl FieldToPropertyRewriter {
    /// Rewrite `type_name.field_name` to the property of the same name.
    #[must_use]
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        let field_name = field_name.into();
        FieldToPropertyRewriter {
            type_name: type_name.into(),
            property_name: field_name.clone(),
            field_name,
        }
    }

    /// Use a property with a different name.
    #[must_use]
    pub fn to_property(mut self, property_name: impl Into<String>) -> Self {
        self.property_name = property_name.into();
        self
    }
}

impl InstructionHandler for FieldToPropertyRewriter {
    fn name(&self) -> &str {
        "field to property"
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
        if field.name != self.field_name
            || ctx.declaring_definition(&field).as_deref() != Some(self.type_name.as_str())
        {
            return Ok(HandleOutcome::Unchanged);
        }

        let Some(resolved) = ctx.resolve_type(&field.parent) else {
            return Ok(HandleOutcome::Unchanged);
        };
        let Some((owner, property)) = ctx.hosts().resolve_property(resolved, &self.property_name)
        else {
            log::debug!(
                "{} has no property {}, leaving field access",
                self.type_name,
                self.property_name
            );
            return Ok(HandleOutcome::Unchanged);
        };

        Ok(accessor_replacement(ctx, cursor, &field, access, owner, property)?
            .map_or(HandleOutcome::Unchanged, HandleOutcome::Rewritten))
    }

    fn chains_after_rewrite(&self) -> bool {
        false
    }
}
