//! Renamed and moved fields.

use crate::{
    assembly::{Instruction, Operand},
    compat::{
        handler::{
            HandleOutcome, InstructionCursor, InstructionHandler, Replacement, ScanContext,
        },
        rewriters::{field_access, host_identity, owner_signature},
    },
    metadata::{
        module::MemberRef,
        signatures::{MemberSignature, TypeSignature},
    },
    Result,
};

/// Where a replaced field now lives.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldTarget {
    type_name: String,
    assembly: String,
}

/// Rewrites references to a renamed field, optionally moved to another type.
///
/// The replacement field must exist in the host assemblies; its type is taken from the
/// host definition.
#[derive(Debug, Clone)]
pub struct FieldReplaceRewriter {
    type_name: String,
    field_name: String,
    to_field: String,
    to_type: Option<FieldTarget>,
}

impl FieldReplaceRewriter {
    /// Rewrite `type_name.field_name` to `type_name.to_field`.
    #[must_use]
    pub fn new(
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        FieldReplaceRewriter {
            type_name: type_name.into(),
            field_name: field_name.into(),
            to_field: to_field.into(),
            to_type: None,
        }
    }

    /// The replacement field is declared by `type_name` of the host assembly `assembly`.
    #[must_use]
    pub fn on_type(mut self, type_name: impl Into<String>, assembly: impl Into<String>) -> Self {
        self.to_type = Some(FieldTarget {
            type_name: type_name.into(),
            assembly: assembly.into(),
        });
        self
    }
}

impl InstructionHandler for FieldReplaceRewriter {
    fn name(&self) -> &str {
        "field replacement"
    }

    fn handle_instruction(
        &self,
        ctx: &mut ScanContext<'_>,
        cursor: &InstructionCursor,
    ) -> Result<HandleOutcome> {
        if field_access(&cursor.instruction).is_none() {
            return Ok(HandleOutcome::Unchanged);
        }
        let Some(operand) = ctx.member_operand(&cursor.instruction) else {
            return Ok(HandleOutcome::Unchanged);
        };
        let field = operand.member;
        if field.name != self.field_name
            || ctx.declaring_definition(&field).as_deref() != Some(self.type_name.as_str())
        {
            return Ok(HandleOutcome::Unchanged);
        }

        let hosts = ctx.hosts();
        let target = match &self.to_type {
            Some(target) => hosts.resolve_type(&[target.assembly.as_str()], &target.type_name),
            None => ctx.resolve_type(&field.parent),
        };
        let Some((owner, definition)) =
            target.and_then(|target| hosts.resolve_field(target, &self.to_field))
        else {
            log::debug!(
                "replacement field {} for {}.{} not found",
                self.to_field,
                self.type_name,
                self.field_name
            );
            return Ok(HandleOutcome::Unchanged);
        };

        let field_type = ctx.importer().foreign_type(owner.module, &definition.signature)?;
        let parent = match &self.to_type {
            Some(target) => {
                let identity = host_identity(ctx, &target.assembly);
                TypeSignature::Class(ctx.importer().type_named(&identity, &owner.full_name()))
            }
            None => owner_signature(ctx, &field.parent, owner),
        };
        let token = ctx.importer().member_ref(MemberRef {
            parent,
            name: definition.name.clone(),
            signature: MemberSignature::Field(field_type),
        });

        let instruction = &cursor.instruction;
        Ok(HandleOutcome::Rewritten(Replacement::new(
            Instruction::new(instruction.prefix, instruction.opcode, Operand::Token(token))?,
            format!(
                "{}.{} field to {}.{}",
                self.type_name,
                self.field_name,
                owner.full_name(),
                definition.name
            ),
        )))
    }

    fn chains_after_rewrite(&self) -> bool {
        false
    }
}
