//! Assembly version checks against the installed host.

use crate::{
    compat::{
        flags::{Flag, FlagEntry},
        handler::{HandleOutcome, InstructionCursor, InstructionHandler, ScanContext},
    },
    Result,
};

/// Warns about modules built against a newer version of a validated host assembly than
/// the one installed.
///
/// Only references whose name matches a host module are compared. A reference renamed
/// by the platform map points at a different assembly whose versions are unrelated.
#[derive(Debug, Default)]
pub struct AssemblyVersionFinder;

impl AssemblyVersionFinder {
    /// The finder.
    #[must_use]
    pub fn new() -> Self {
        AssemblyVersionFinder
    }
}

impl InstructionHandler for AssemblyVersionFinder {
    fn name(&self) -> &str {
        "host assembly versions"
    }

    fn handle_module(&self, ctx: &ScanContext<'_>) -> Result<Vec<FlagEntry>> {
        let hosts = ctx.hosts();
        Ok(ctx
            .module()
            .assembly_refs()
            .iter()
            .filter(|reference| hosts.is_validated(&reference.name))
            .filter_map(|reference| {
                let host = hosts.module(&reference.name)?.identity();
                (reference.version > host.version).then(|| {
                    FlagEntry::new(
                        Flag::DetectedGameAssemblyMismatch,
                        format!(
                            "references {} version {}, but the host has {}",
                            reference.name, reference.version, host.version
                        ),
                    )
                })
            })
            .collect())
    }

    fn handle_instruction(
        &self,
        _ctx: &mut ScanContext<'_>,
        _cursor: &InstructionCursor,
    ) -> Result<HandleOutcome> {
        Ok(HandleOutcome::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::identity::AssemblyVersion,
        test::{scan_with, ModFixture},
    };

    #[test]
    fn newer_references_warn() {
        let fixture = ModFixture::with_versions(
            AssemblyVersion::new(1, 7, 0, 0),
            AssemblyVersion::new(4, 0, 0, 0),
        );
        let mut module = fixture.finish(|encoder| encoder.emit_ret());

        let report = scan_with(vec![Box::new(AssemblyVersionFinder::new())], &mut module);
        let warnings = report.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].describe(),
            "references Host version 1.7.0.0, but the host has 1.6.0.0"
        );
        assert!(report.diagnostics().is_empty());
    }

    #[test]
    fn older_and_unvalidated_references_pass() {
        let fixture = ModFixture::with_versions(
            AssemblyVersion::new(1, 5, 2, 0),
            AssemblyVersion::new(9, 0, 0, 0),
        );
        let mut module = fixture.finish(|encoder| encoder.emit_ret());

        let report = scan_with(vec![Box::new(AssemblyVersionFinder::new())], &mut module);
        assert!(report.warnings().is_empty());
    }
}
