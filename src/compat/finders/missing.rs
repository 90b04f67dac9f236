//! Members that no longer exist in the host.

use crate::{
    compat::{
        finders::find_method,
        flags::FlagEntry,
        handler::{
            is_array_pseudo_type, HandleOutcome, InstructionCursor, InstructionHandler,
            ScanContext,
        },
    },
    metadata::module::MemberRef,
    Result,
};

/// Flags references into validated host assemblies that no longer resolve.
///
/// The declaring type is looked up through the platform map first. When the type itself is
/// gone the member is reported as missing too, since the difference does not matter to
/// the mod author. References into array pseudo types are skipped: the runtime provides
/// their accessors and they never resolve.
#[derive(Debug, Default)]
pub struct MissingMemberFinder;

impl MissingMemberFinder {
    /// The finder.
    #[must_use]
    pub fn new() -> Self {
        MissingMemberFinder
    }

    fn missing_phrase(type_name: &str, member: &MemberRef, property_exists: bool) -> String {
        if member.is_field() {
            return format!("reference to {}.{} (no such field)", type_name, member.name);
        }
        if member.is_constructor() {
            return format!("reference to {type_name} (no matching constructor)");
        }
        match accessor_property(&member.name) {
            Some(property) if !property_exists => {
                format!("reference to {type_name}.{property} (no such property)")
            }
            _ => format!("reference to {}.{} (no such method)", type_name, member.name),
        }
    }
}

/// Property name of a `get_X` or `set_X` accessor.
fn accessor_property(name: &str) -> Option<&str> {
    name.strip_prefix("get_")
        .or_else(|| name.strip_prefix("set_"))
        .filter(|property| !property.is_empty())
}

impl InstructionHandler for MissingMemberFinder {
    fn name(&self) -> &str {
        "missing members"
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
        if !ctx.is_validated(&member.parent) || is_array_pseudo_type(ctx, member) {
            return Ok(HandleOutcome::Unchanged);
        }
        let Some(type_name) = ctx.declaring_definition(member) else {
            return Ok(HandleOutcome::Unchanged);
        };

        let resolved = ctx.resolve_type(&member.parent);
        let found = match (resolved, operand.method_signature()) {
            (None, _) => false,
            (Some(resolved), None) => ctx.hosts().resolve_field(resolved, &member.name).is_some(),
            (Some(resolved), Some(signature)) => {
                find_method(ctx, resolved, &member.name, signature).is_some()
            }
        };
        if found {
            return Ok(HandleOutcome::Unchanged);
        }

        let property_exists = resolved.is_some_and(|resolved| {
            accessor_property(&member.name)
                .is_some_and(|property| ctx.hosts().resolve_property(resolved, property).is_some())
        });
        log::debug!(
            "{}: unresolved {}.{} in {:?}",
            ctx.module().name(),
            type_name,
            member.name,
            ctx.candidate_scopes(&member.parent)
        );

        Ok(HandleOutcome::Flagged(FlagEntry::not_compatible(
            Self::missing_phrase(&type_name, member, property_exists),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::opcodes,
        metadata::{signatures::TypeSignature, token::Token},
        test::{scan_with, ModFixture},
    };

    type Call = (u8, Token);

    fn diagnostics(build: impl FnOnce(&mut ModFixture) -> Vec<Call>) -> Vec<String> {
        let mut fixture = ModFixture::new();
        let calls = build(&mut fixture);
        let mut module = fixture.finish(|encoder| {
            for (opcode, token) in calls {
                encoder.emit_token(opcode, token)?;
            }
            encoder.emit_ret()
        });
        scan_with(vec![Box::new(MissingMemberFinder::new())], &mut module).diagnostics()
    }

    #[test]
    fn resolving_references_pass() {
        let found = diagnostics(|fixture| {
            let void = || TypeSignature::Void;
            vec![
                (opcodes::LDSFLD, fixture.field("Host.Widget", "Name", TypeSignature::I4)),
                (
                    opcodes::CALLVIRT,
                    fixture.method("Host.Widget", "Draw", void(), vec![TypeSignature::String]),
                ),
                (opcodes::NEWOBJ, fixture.method("Host.Widget", ".ctor", void(), vec![])),
                (
                    opcodes::CALL,
                    fixture.static_method("System.Console", "Beep", void(), vec![]),
                ),
            ]
        });
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn missing_members_are_described() {
        let found = diagnostics(|fixture| {
            let void = || TypeSignature::Void;
            vec![
                (opcodes::LDFLD, fixture.field("Host.Widget", "count", TypeSignature::I4)),
                (
                    opcodes::CALLVIRT,
                    fixture.method("Host.Widget", "get_Color", TypeSignature::I4, vec![]),
                ),
                (
                    opcodes::NEWOBJ,
                    fixture.method("Host.Widget", ".ctor", void(), vec![TypeSignature::I4]),
                ),
                (
                    opcodes::CALLVIRT,
                    fixture.method("Host.Widget", "Draw", void(), vec![TypeSignature::I8]),
                ),
                (opcodes::CALL, fixture.static_method("Host.Gone", "Run", void(), vec![])),
            ]
        });
        assert_eq!(found, vec![
            "reference to Host.Widget.count (no such field)".to_string(),
            "reference to Host.Widget.Color (no such property)".to_string(),
            "reference to Host.Widget (no matching constructor)".to_string(),
            "reference to Host.Widget.Draw (no such method)".to_string(),
            "reference to Host.Gone.Run (no such method)".to_string(),
        ]);
    }

    #[test]
    fn existing_property_with_wrong_accessor_is_a_missing_method() {
        let found = diagnostics(|fixture| {
            let set_count = fixture.method("Host.Widget", "set_Count", TypeSignature::Void, vec![
                TypeSignature::I4,
            ]);
            vec![(opcodes::CALLVIRT, set_count)]
        });
        assert_eq!(found, vec![
            "reference to Host.Widget.set_Count (no such method)".to_string()
        ]);
    }

    #[test]
    fn array_pseudo_types_are_skipped() {
        let found = diagnostics(|fixture| {
            let widget = fixture.type_ref("Host.Widget");
            let array = TypeSignature::SzArray(Box::new(TypeSignature::Class(widget)));
            let spec = TypeSignature::Class(fixture.builder.type_spec(array));
            let get = fixture.method_on(spec, "Get", TypeSignature::Void, vec![TypeSignature::I4]);
            vec![(opcodes::CALL, get)]
        });
        assert!(found.is_empty());
    }
}
