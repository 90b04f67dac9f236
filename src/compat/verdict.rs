//! Turning a scan report into a load decision.

use std::fmt;

use crate::{
    compat::{flags::ScanFlag, scanner::ScanReport},
    metadata::module::Module,
    Result,
};

/// Whether and how a module may be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Load the module as is
    Ok,
    /// Load the rewritten module instead of the original
    Patched {
        /// The serialised rewritten module
        module_bytes: Vec<u8>,
    },
    /// Do not load the module
    Reject {
        /// Every incompatibility found, in scan order
        diagnostics: Vec<String>,
    },
}

impl Verdict {
    /// Whether the module may be loaded, patched or not.
    #[must_use]
    pub fn is_loadable(&self) -> bool {
        !matches!(self, Verdict::Reject { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Ok => write!(f, "compatible"),
            Verdict::Patched { module_bytes } => {
                write!(f, "compatible after rewriting ({} bytes)", module_bytes.len())
            }
            Verdict::Reject { diagnostics } => {
                write!(f, "incompatible: {}", diagnostics.join("; "))
            }
        }
    }
}

/// The outcome for one scanned module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReport {
    /// Name from the scan request
    pub name: String,
    /// The load decision
    pub verdict: Verdict,
    /// Detected behaviour worth telling the user about; never affects the verdict
    pub warnings: Vec<ScanFlag>,
}

/// Decide on `module` after it was scanned into `report`.
///
/// Any incompatibility rejects the module, even if rewrites were applied too.
///
/// # Errors
/// Returns an error if the rewritten module cannot be serialised.
pub fn aggregate(report: &ScanReport, module: &Module) -> Result<Verdict> {
    let diagnostics = report.diagnostics();
    if !diagnostics.is_empty() {
        log::info!(
            "{}: rejected with {} incompatibilities",
            report.module(),
            diagnostics.len()
        );
        return Ok(Verdict::Reject { diagnostics });
    }

    if report.rewrite_count() > 0 {
        log::info!("{}: patched with {} rewrites", report.module(), report.rewrite_count());
        return Ok(Verdict::Patched {
            module_bytes: module.to_bytes()?,
        });
    }

    Ok(Verdict::Ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::opcodes,
        compat::{finders::MissingMemberFinder, rewriters::FieldToPropertyRewriter},
        metadata::signatures::TypeSignature,
        test::{scan_with, ModFixture},
    };

    #[test]
    fn untouched_module_is_ok() {
        let mut fixture = ModFixture::new();
        let id = fixture.field("Host.Widget", "Id", TypeSignature::I4);
        let mut module = fixture.finish(|encoder| {
            encoder.emit_ldarg(0)?;
            encoder.emit_token(opcodes::LDFLD, id)?;
            encoder.emit_ret()
        });

        let report = scan_with(vec![Box::new(MissingMemberFinder::new())], &mut module);
        assert_eq!(aggregate(&report, &module).unwrap(), Verdict::Ok);
    }

    #[test]
    fn rewritten_module_is_patched() {
        let mut fixture = ModFixture::new();
        let label = fixture.field("Host.Widget", "Label", TypeSignature::String);
        let mut module = fixture.finish(|encoder| {
            encoder.emit_ldarg(0)?;
            encoder.emit_token(opcodes::LDFLD, label)?;
            encoder.emit_ret()
        });

        let report = scan_with(
            vec![Box::new(FieldToPropertyRewriter::new("Host.Widget", "Label"))],
            &mut module,
        );
        let Verdict::Patched { module_bytes } = aggregate(&report, &module).unwrap() else {
            panic!("expected a patched module");
        };
        let reloaded = Module::from_mem(module_bytes.clone()).unwrap();
        assert_eq!(reloaded.to_bytes().unwrap(), module_bytes);
        let (_, run) = reloaded.method(ModFixture::entry_token()).unwrap();
        assert!(run.body[1].is(opcodes::CALLVIRT));
    }

    #[test]
    fn incompatibility_wins_over_rewrites() {
        let mut fixture = ModFixture::new();
        let label = fixture.field("Host.Widget", "Label", TypeSignature::String);
        let gone = fixture.field("Host.Widget", "Gone", TypeSignature::I4);
        let mut module = fixture.finish(|encoder| {
            encoder.emit_ldarg(0)?;
            encoder.emit_token(opcodes::LDFLD, label)?;
            encoder.emit_ldarg(0)?;
            encoder.emit_token(opcodes::LDFLD, gone)?;
            encoder.emit_ret()
        });

        let report = scan_with(
            vec![
                Box::new(FieldToPropertyRewriter::new("Host.Widget", "Label")),
                Box::new(MissingMemberFinder::new()),
            ],
            &mut module,
        );
        let verdict = aggregate(&report, &module).unwrap();
        assert!(!verdict.is_loadable());
        assert_eq!(verdict, Verdict::Reject {
            diagnostics: vec!["reference to Host.Widget.Gone (no such field)".to_string()],
        });
    }
}
