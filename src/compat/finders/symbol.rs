//! Fixed symbol tables, such as APIs removed from the host.

use crate::{
    compat::{
        flags::{Flag, FlagEntry},
        handler::{HandleOutcome, InstructionCursor, InstructionHandler, ScanContext},
    },
    Result,
};

/// A `(type, member)` pair matched by a [`SymbolFinder`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Symbol {
    /// Full name of the declaring type, without generic arguments
    pub type_name: String,
    /// Field or method name
    pub member: String,
    /// Why the symbol is flagged, appended to the phrase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Symbol {
    /// A symbol without reason.
    #[must_use]
    pub fn new(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        Symbol {
            type_name: type_name.into(),
            member: member.into(),
            reason: None,
        }
    }

    /// Attach a reason.
    #[must_use]
    pub fn because(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    fn phrase(&self) -> String {
        match &self.reason {
            Some(reason) => format!("reference to {}.{} ({})", self.type_name, self.member, reason),
            None => format!("reference to {}.{}", self.type_name, self.member),
        }
    }
}

/// Flags every reference to one of a fixed set of symbols, whether or not it would
/// resolve.
///
/// Used with [`Flag::NotCompatible`] to hard-block APIs that are gone for good, and with
/// detection flags to point out specific APIs.
pub struct SymbolFinder {
    name: String,
    flag: Flag,
    symbols: Vec<Symbol>,
}

impl SymbolFinder {
    /// Finder raising `flag` for any of `symbols`.
    #[must_use]
    pub fn new(name: impl Into<String>, flag: Flag, symbols: Vec<Symbol>) -> Self {
        SymbolFinder {
            name: name.into(),
            flag,
            symbols,
        }
    }
}

impl InstructionHandler for SymbolFinder {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle_instruction(
        &self,
        ctx: &mut ScanContext<'_>,
        cursor: &InstructionCursor,
    ) -> Result<HandleOutcome> {
        let Some(operand) = ctx.member_operand(&cursor.instruction) else {
            return Ok(HandleOutcome::Unchanged);
        };
        let Some(type_name) = ctx.declaring_definition(&operand.member) else {
            return Ok(HandleOutcome::Unchanged);
        };

        Ok(self
            .symbols
            .iter()
            .find(|symbol| symbol.type_name == type_name && symbol.member == operand.member.name)
            .map_or(HandleOutcome::Unchanged, |symbol| {
                HandleOutcome::Flagged(FlagEntry::new(self.flag, symbol.phrase()))
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::signatures::TypeSignature,
        test::{scan_with, ModFixture},
    };

    #[test]
    fn flags_listed_symbols_only() {
        let mut fixture = ModFixture::new();
        let removed = fixture.field("Host.Widget", "Name", TypeSignature::I4);
        let kept = fixture.field("Host.Widget", "Id", TypeSignature::I4);
        let mut module = fixture.finish(|encoder| {
            encoder.emit_ldarg(0)?;
            encoder.emit_token(crate::assembly::opcodes::LDFLD, removed)?;
            encoder.emit_ldarg(0)?;
            encoder.emit_token(crate::assembly::opcodes::LDFLD, kept)?;
            encoder.emit_ret()
        });

        let finder = SymbolFinder::new(
            "removed widget members",
            Flag::NotCompatible,
            vec![Symbol::new("Host.Widget", "Name").because("removed in 1.6")],
        );
        let report = scan_with(vec![Box::new(finder)], &mut module);
        assert_eq!(
            report.diagnostics(),
            vec!["reference to Host.Widget.Name (removed in 1.6)".to_string()]
        );
    }
}
