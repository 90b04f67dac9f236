//! Methods moved to another declaring type.

use crate::{
    assembly::{Instruction, Operand},
    compat::{
        finders::find_method,
        handler::{
            with_named_token, HandleOutcome, InstructionCursor, InstructionHandler, Replacement,
            ScanContext,
        },
        rewriters::{host_identity, is_method_reference},
    },
    metadata::module::MemberRef,
    Result,
};

/// Moves method references from one declaring type to another that now provides the
/// same method.
///
/// The target must define a method with the same name, static-ness, generic arity and
/// parameter types, otherwise the reference is left for the missing member finder.
/// Generic method instantiations are re-instantiated over the moved method.
#[derive(Debug, Clone)]
pub struct MethodParentRewriter {
    from_type: String,
    to_type: String,
    to_assembly: String,
    only_if_platform_changed: bool,
}

impl MethodParentRewriter {
    /// Move methods of `from_type` to `to_type` of the host assembly `to_assembly`.
    #[must_use]
    pub fn new(
        from_type: impl Into<String>,
        to_type: impl Into<String>,
        to_assembly: impl Into<String>,
    ) -> Self {
        MethodParentRewriter {
            from_type: from_type.into(),
            to_type: to_type.into(),
            to_assembly: to_assembly.into(),
            only_if_platform_changed: false,
        }
    }

    /// Only rewrite modules compiled for another platform.
    #[must_use]
    pub fn only_if_platform_changed(mut self, only: bool) -> Self {
        self.only_if_platform_changed = only;
        self
    }
}

impl InstructionHandler for MethodParentRewriter {
    fn name(&self) -> &str {
        "method parent"
    }

    fn handle_instruction(
        &self,
        ctx: &mut ScanContext<'_>,
        cursor: &InstructionCursor,
    ) -> Result<HandleOutcome> {
        if !is_method_reference(&cursor.instruction)
            || (self.only_if_platform_changed && !ctx.platform_changed())
        {
            return Ok(HandleOutcome::Unchanged);
        }
        let Some(operand) = ctx.member_operand(&cursor.instruction) else {
            return Ok(HandleOutcome::Unchanged);
        };
        let Some(signature) = operand.method_signature() else {
            return Ok(HandleOutcome::Unchanged);
        };
        let member = &operand.member;
        if ctx.declaring_definition(member).as_deref() != Some(self.from_type.as_str()) {
            return Ok(HandleOutcome::Unchanged);
        }

        let Some(target) = ctx
            .hosts()
            .resolve_type(&[self.to_assembly.as_str()], &self.to_type)
        else {
            return Ok(HandleOutcome::Unchanged);
        };
        if find_method(ctx, target, &member.name, signature).is_none() {
            log::trace!(
                "{} has no matching {}, keeping {}",
                self.to_type,
                member.name,
                self.from_type
            );
            return Ok(HandleOutcome::Unchanged);
        }

        let identity = host_identity(ctx, &self.to_assembly);
        let mut importer = ctx.importer();
        let parent = importer.type_named(&identity, &self.to_type);
        let token = importer.member_operand(
            MemberRef {
                parent: with_named_token(&member.parent, parent),
                name: member.name.clone(),
                signature: member.signature.clone(),
            },
            operand.spec.as_ref(),
        );

        let instruction = &cursor.instruction;
        Ok(HandleOutcome::Rewritten(Replacement::new(
            Instruction::new(instruction.prefix, instruction.opcode, Operand::Token(token))?,
            format!(
                "{}.{} to {}.{}",
                self.from_type, member.name, self.to_type, member.name
            ),
        )))
    }

    fn chains_after_rewrite(&self) -> bool {
        false
    }
}
