//! Calls routed through a platform adapter type.
//!
//! Adapter types are built with [`crate::compat::AdapterBuilder`].

use crate::{
    assembly::{Instruction, Operand},
    compat::{
        handler::{
            HandleOutcome, InstructionCursor, InstructionHandler, Replacement, ScanContext,
        },
        rewriters::{host_identity, import_method_signature, is_method_reference},
    },
    host::ResolvedType,
    metadata::{
        module::{MemberRef, MethodDef},
        signatures::{MemberSignature, SignatureMethod, TypeSignature},
    },
    Result,
};

/// Redirects calls on a type whose API differs between platforms to an adapter type that
/// provides the union of both variants.
///
/// Only methods declared by the adapter itself are candidates. Among those whose types
/// all look like the call site's, an exact match wins, then the overload with the most
/// exactly matching parameter types, then the first declared.
#[derive(Debug, Clone)]
pub struct ShimRewriter {
    target_type: String,
    adapter_type: String,
    adapter_assembly: String,
    methods: Vec<String>,
}

/// How well an adapter overload matches a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OverloadScore {
    exact: bool,
    exact_params: usize,
}

impl ShimRewriter {
    /// Redirect calls on `target_type` to `adapter_type` of `adapter_assembly`.
    #[must_use]
    pub fn new(
        target_type: impl Into<String>,
        adapter_type: impl Into<String>,
        adapter_assembly: impl Into<String>,
    ) -> Self {
        ShimRewriter {
            target_type: target_type.into(),
            adapter_type: adapter_type.into(),
            adapter_assembly: adapter_assembly.into(),
            methods: Vec::new(),
        }
    }

    /// Only redirect the named methods.
    #[must_use]
    pub fn only_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    fn score(
        ctx: &ScanContext<'_>,
        adapter: ResolvedType<'_>,
        candidate: &MethodDef,
        signature: &SignatureMethod,
    ) -> Option<OverloadScore> {
        let actual = &candidate.signature;
        if actual.has_this != signature.has_this
            || actual.generic_param_count != signature.generic_param_count
            || actual.params.len() != signature.params.len()
        {
            return None;
        }

        let oracle = ctx.oracle();
        let expected_return = ctx.type_name(&signature.return_type);
        let actual_return = adapter.type_name(&actual.return_type);
        if !oracle.looks_like_same_type(&expected_return, &actual_return) {
            return None;
        }

        let mut exact_params = 0;
        for (expected, actual) in signature.params.iter().zip(&actual.params) {
            let expected = ctx.type_name(expected);
            let actual = adapter.type_name(actual);
            if expected == actual {
                exact_params += 1;
            } else if !oracle.looks_like_same_type(&expected, &actual) {
                return None;
            }
        }

        Some(OverloadScore {
            exact: exact_params == signature.params.len() && expected_return == actual_return,
            exact_params,
        })
    }
}

impl InstructionHandler for ShimRewriter {
    fn name(&self) -> &str {
        "adapter shim"
    }

    fn handle_instruction(
        &self,
        ctx: &mut ScanContext<'_>,
        cursor: &InstructionCursor,
    ) -> Result<HandleOutcome> {
        if !is_method_reference(&cursor.instruction) {
            return Ok(HandleOutcome::Unchanged);
        }
        let Some(operand) = ctx.member_operand(&cursor.instruction) else {
            return Ok(HandleOutcome::Unchanged);
        };
        let Some(signature) = operand.method_signature() else {
            return Ok(HandleOutcome::Unchanged);
        };
        let member = &operand.member;
        if ctx.declaring_definition(member).as_deref() != Some(self.target_type.as_str())
            || (!self.methods.is_empty() && !self.methods.contains(&member.name))
        {
            return Ok(HandleOutcome::Unchanged);
        }

        let Some(adapter) = ctx
            .hosts()
            .resolve_type(&[self.adapter_assembly.as_str()], &self.adapter_type)
        else {
            log::debug!("adapter type {} is not loaded", self.adapter_type);
            return Ok(HandleOutcome::Unchanged);
        };

        // strictly greater, so ties keep the first declared overload
        let mut best: Option<(OverloadScore, &MethodDef)> = None;
        for candidate in adapter.type_def.methods_named(&member.name) {
            let Some(score) = Self::score(ctx, adapter, candidate, signature) else {
                continue;
            };
            let better = match best {
                Some((best_score, _)) => score > best_score,
                None => true,
            };
            if better {
                best = Some((score, candidate));
            }
        }
        let Some((score, chosen)) = best else {
            return Ok(HandleOutcome::Unchanged);
        };

        let signature = if score.exact {
            member.signature.clone()
        } else {
            MemberSignature::Method(import_method_signature(ctx, adapter, &chosen.signature)?)
        };
        let identity = host_identity(ctx, &self.adapter_assembly);
        let mut importer = ctx.importer();
        let parent = TypeSignature::Class(importer.type_named(&identity, &self.adapter_type));
        let token = importer.member_operand(
            MemberRef {
                parent,
                name: chosen.name.clone(),
                signature,
            },
            operand.spec.as_ref(),
        );

        let instruction = &cursor.instruction;
        Ok(HandleOutcome::Rewritten(Replacement::new(
            Instruction::new(instruction.prefix, instruction.opcode, Operand::Token(token))?,
            format!(
                "{}.{} to adapter {}",
                self.target_type, member.name, self.adapter_type
            ),
        )))
    }

    fn chains_after_rewrite(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::opcodes,
        compat::finders::MissingMemberFinder,
        test::{scan_with, ModFixture},
    };

    #[test]
    fn exact_overload_keeps_call_site_signature() {
        let mut fixture = ModFixture::new();
        let widget = TypeSignature::Class(fixture.type_ref("Host.Widget"));
        let draw = fixture.method("Host.Renderer", "Draw", TypeSignature::Void, vec![
            widget.clone(),
            TypeSignature::R4,
        ]);
        let mut module = fixture.finish(|encoder| {
            encoder.emit_token(opcodes::CALLVIRT, draw)?;
            encoder.emit_ret()
        });

        let report = scan_with(
            vec![
                Box::new(ShimRewriter::new("Host.Renderer", "Host.RendererAdapter", "Host")),
                Box::new(MissingMemberFinder::new()),
            ],
            &mut module,
        );
        assert_eq!(report.rewrite_count(), 1);
        assert!(report.diagnostics().is_empty());

        let (_, run) = module.method(ModFixture::entry_token()).unwrap();
        assert!(run.body[0].is(opcodes::CALLVIRT));
        let call = module.member_ref(run.body[0].token().unwrap()).unwrap();
        assert_eq!(module.declaring_type_name(call), "Host.RendererAdapter");
        assert_eq!(
            call.signature.as_method().unwrap().params,
            vec![widget, TypeSignature::R4]
        );
    }

    #[test]
    fn most_exact_parameters_win() {
        let mut fixture = ModFixture::new();
        let list = fixture.type_ref("System.Collections.Generic.List`1");
        let list_of_string = TypeSignature::GenericInst(
            Box::new(TypeSignature::Class(list)),
            vec![TypeSignature::String],
        );
        let queue = fixture.method("Host.Renderer", "Queue", TypeSignature::Void, vec![
            list_of_string,
            TypeSignature::String,
        ]);
        let mut module = fixture.finish(|encoder| {
            encoder.emit_token(opcodes::CALLVIRT, queue)?;
            encoder.emit_ret()
        });

        let report = scan_with(
            vec![Box::new(ShimRewriter::new("Host.Renderer", "Host.RendererAdapter", "Host"))],
            &mut module,
        );
        assert_eq!(report.rewrite_count(), 1);

        let (_, run) = module.method(ModFixture::entry_token()).unwrap();
        let call = module.member_ref(run.body[0].token().unwrap()).unwrap();
        let params: Vec<String> = call
            .signature
            .as_method()
            .unwrap()
            .params
            .iter()
            .map(|param| module.type_name(param))
            .collect();
        assert_eq!(params, vec![
            "System.Collections.Generic.List`1<!0>".to_string(),
            "System.String".to_string(),
        ]);
    }

    #[test]
    fn method_filter() {
        let mut fixture = ModFixture::new();
        let widget = TypeSignature::Class(fixture.type_ref("Host.Widget"));
        let draw = fixture.method("Host.Renderer", "Draw", TypeSignature::Void, vec![
            widget,
            TypeSignature::R4,
        ]);
        let mut module = fixture.finish(|encoder| {
            encoder.emit_token(opcodes::CALLVIRT, draw)?;
            encoder.emit_ret()
        });

        let rewriter = ShimRewriter::new("Host.Renderer", "Host.RendererAdapter", "Host")
            .only_methods(["Begin"]);
        let report = scan_with(vec![Box::new(rewriter)], &mut module);
        assert_eq!(report.rewrite_count(), 0);
    }
}
