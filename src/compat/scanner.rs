//! The handler chain driver.
//!
//! [`ModuleScanner`] walks every instruction of every method of a module and offers it to
//! the handlers in order. Once a handler rewrote the instruction, only handlers that
//! chain after rewrites (the finders) still see it, now in its rewritten form. A second
//! rewrite claim for the same instruction is a [`RewriteConflict`]: the first rewrite
//! stays and the claim is recorded. A scan never stops at the first problem; every flag
//! is accumulated in the [`ScanReport`].
//!
//! Batches are scanned in parallel on the rayon pool. Host assemblies, the platform map
//! and the handler list are shared read-only, each scan owns its module and report.

use std::{fmt, path::Path, sync::Arc};

use rayon::prelude::*;

use crate::{
    compat::{
        config::ScannerConfig,
        flags::{Flag, FlagEntry, FlagLocation, ScanFlag},
        handler::{HandleOutcome, InstructionCursor, InstructionHandler, ScanContext},
        oracle::TypeOracle,
        platform::PlatformAssemblyMap,
        verdict::{aggregate, ModuleReport, Verdict},
    },
    host::HostAssemblies,
    metadata::{module::Module, token::Token},
    Error, Result,
};

/// A rewrite claimed for an instruction that an earlier handler already rewrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteConflict {
    /// Method containing the instruction
    pub method: Token,
    /// Index of the instruction in the body
    pub index: usize,
    /// Handler whose rewrite was applied
    pub winner: String,
    /// Handler whose rewrite was dropped
    pub loser: String,
}

/// Everything a scan of one module found.
pub struct ScanReport {
    module: String,
    flags: boxcar::Vec<ScanFlag>,
    conflicts: boxcar::Vec<RewriteConflict>,
    methods: usize,
    instructions: usize,
}

impl ScanReport {
    fn new(module: &str) -> Self {
        ScanReport {
            module: module.to_string(),
            flags: boxcar::Vec::new(),
            conflicts: boxcar::Vec::new(),
            methods: 0,
            instructions: 0,
        }
    }

    fn push(&self, entry: FlagEntry, handler: &str, location: FlagLocation) {
        self.flags.push(ScanFlag {
            entry,
            handler: handler.to_string(),
            location,
        });
    }

    /// Name of the scanned module.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// All raised flags, in scan order.
    pub fn flags(&self) -> impl Iterator<Item = &ScanFlag> {
        self.flags.iter().map(|(_, flag)| flag)
    }

    /// Whether `flag` was raised anywhere.
    #[must_use]
    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags().any(|raised| raised.flag() == flag)
    }

    /// Descriptions of every incompatibility, in scan order, without repetitions.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<String> {
        let mut diagnostics: Vec<String> = Vec::new();
        for flag in self.flags().filter(|flag| flag.flag() == Flag::NotCompatible) {
            let description = flag.describe();
            if !diagnostics.contains(&description) {
                diagnostics.push(description);
            }
        }
        diagnostics
    }

    /// Detection flags, first occurrence of each description only.
    #[must_use]
    pub fn warnings(&self) -> Vec<ScanFlag> {
        let mut warnings: Vec<ScanFlag> = Vec::new();
        for flag in self.flags().filter(|flag| flag.flag().is_detection()) {
            if !warnings
                .iter()
                .any(|seen| seen.flag() == flag.flag() && seen.describe() == flag.describe())
            {
                warnings.push(flag.clone());
            }
        }
        warnings
    }

    /// Number of applied rewrites.
    #[must_use]
    pub fn rewrite_count(&self) -> usize {
        self.flags()
            .filter(|flag| flag.flag() == Flag::Rewritten)
            .count()
    }

    /// Rewrite claims that lost against an earlier rewrite.
    pub fn conflicts(&self) -> impl Iterator<Item = &RewriteConflict> {
        self.conflicts.iter().map(|(_, conflict)| conflict)
    }

    /// Number of scanned methods.
    #[must_use]
    pub fn methods_scanned(&self) -> usize {
        self.methods
    }

    /// Number of scanned instructions.
    #[must_use]
    pub fn instructions_scanned(&self) -> usize {
        self.instructions
    }
}

impl fmt::Debug for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanReport")
            .field("module", &self.module)
            .field("flags", &self.flags.count())
            .field("conflicts", &self.conflicts.count())
            .field("methods", &self.methods)
            .field("instructions", &self.instructions)
            .finish()
    }
}

/// A module to scan.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Display name, usually the file name
    pub name: String,
    /// The module file
    pub bytes: Vec<u8>,
    /// Trust the module without scanning it
    pub assume_compatible: bool,
}

impl ScanRequest {
    /// A request to scan `bytes`.
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        ScanRequest {
            name: name.into(),
            bytes,
            assume_compatible: false,
        }
    }

    /// Skip the scan and accept the module as is.
    #[must_use]
    pub fn assume_compatible(mut self, assume: bool) -> Self {
        self.assume_compatible = assume;
        self
    }
}

/// Runs a handler chain over modules.
pub struct ModuleScanner {
    hosts: Arc<HostAssemblies>,
    platform: Arc<PlatformAssemblyMap>,
    handlers: Vec<Box<dyn InstructionHandler>>,
    oracle: TypeOracle,
    config: ScannerConfig,
}

impl ModuleScanner {
    /// Scanner running `handlers`, in order, against `hosts`.
    #[must_use]
    pub fn new(
        hosts: Arc<HostAssemblies>,
        platform: Arc<PlatformAssemblyMap>,
        handlers: Vec<Box<dyn InstructionHandler>>,
        config: ScannerConfig,
    ) -> Self {
        ModuleScanner {
            hosts,
            platform,
            handlers,
            oracle: config.build_oracle(),
            config,
        }
    }

    /// The handler chain.
    #[must_use]
    pub fn handlers(&self) -> &[Box<dyn InstructionHandler>] {
        &self.handlers
    }

    /// Scan and rewrite `module` in place.
    ///
    /// `platform_changed` tells platform-gated rewriters whether the module was
    /// compiled for another platform.
    ///
    /// # Errors
    /// Only handler errors abort a scan; incompatibilities are reported as flags.
    pub fn scan(&self, module: &mut Module, platform_changed: bool) -> Result<ScanReport> {
        let mut report = ScanReport::new(module.name());
        let mut ctx = ScanContext::new(
            module,
            &self.hosts,
            &self.platform,
            &self.oracle,
            platform_changed,
        );

        for handler in &self.handlers {
            for entry in handler.handle_module(&ctx)? {
                report.push(entry, handler.name(), FlagLocation::Module);
            }
        }

        let methods: Vec<Token> = ctx.module().method_tokens().collect();
        for method in methods {
            report.methods += 1;
            for handler in &self.handlers {
                for entry in handler.handle_method(&ctx, method)? {
                    report.push(entry, handler.name(), FlagLocation::Method(method));
                }
            }

            let count = ctx
                .module()
                .method(method)
                .map_or(0, |(_, definition)| definition.body.len());
            for index in 0..count {
                report.instructions += 1;
                self.scan_instruction(&mut ctx, &report, method, index)?;
            }
        }

        log::debug!(
            "{}: {} methods, {} instructions, {} rewrites, {} incompatibilities",
            report.module,
            report.methods,
            report.instructions,
            report.rewrite_count(),
            report.diagnostics().len()
        );
        Ok(report)
    }

    fn scan_instruction(
        &self,
        ctx: &mut ScanContext<'_>,
        report: &ScanReport,
        method: Token,
        index: usize,
    ) -> Result<()> {
        let Some((instruction, previous)) =
            ctx.module().method(method).and_then(|(_, definition)| {
                let instruction = definition.body.get(index)?.clone();
                let previous = index
                    .checked_sub(1)
                    .and_then(|before| definition.body.get(before))
                    .cloned();
                Some((instruction, previous))
            })
        else {
            return Ok(());
        };
        let mut cursor = InstructionCursor {
            method,
            index,
            instruction,
            previous,
        };
        let location = FlagLocation::Instruction { method, index };
        let mut rewritten_by: Option<&str> = None;

        for handler in &self.handlers {
            if rewritten_by.is_some() && !handler.chains_after_rewrite() {
                continue;
            }

            match handler.handle_instruction(ctx, &cursor)? {
                HandleOutcome::Unchanged => {}
                HandleOutcome::Flagged(entry) => report.push(entry, handler.name(), location),
                HandleOutcome::Rewritten(replacement) => {
                    if let Some(winner) = rewritten_by {
                        log::warn!(
                            "{}: '{}' and '{}' both rewrite IL_{:04x} of {}, keeping the first",
                            report.module,
                            winner,
                            handler.name(),
                            cursor.instruction.offset,
                            method
                        );
                        report.conflicts.push(RewriteConflict {
                            method,
                            index,
                            winner: winner.to_string(),
                            loser: handler.name().to_string(),
                        });
                        continue;
                    }

                    match ctx
                        .module_mut()
                        .replace_instruction(method, index, replacement.instruction)
                    {
                        Ok(original) => {
                            if self.config.log_rewrites {
                                log::debug!(
                                    "{}: rewrote {} at IL_{:04x} of {} ({})",
                                    report.module,
                                    original.mnemonic,
                                    original.offset,
                                    method,
                                    replacement.phrase
                                );
                            }
                            if let Some(current) = ctx
                                .module()
                                .method(method)
                                .and_then(|(_, definition)| definition.body.get(index))
                            {
                                cursor.instruction = current.clone();
                            }
                            rewritten_by = Some(handler.name());
                            report.push(
                                FlagEntry::new(Flag::Rewritten, replacement.phrase),
                                handler.name(),
                                location,
                            );
                        }
                        Err(Error::RewriteRejected(reason)) => {
                            log::warn!(
                                "{}: {} skipped: {}",
                                report.module,
                                handler.name(),
                                reason
                            );
                        }
                        Err(error) => return Err(error),
                    }
                }
            }
        }
        Ok(())
    }

    /// Load and scan one module, producing its verdict.
    ///
    /// # Errors
    /// Returns the load error if the bytes are not a module.
    pub fn scan_bytes(&self, request: ScanRequest) -> Result<ModuleReport> {
        if request.assume_compatible {
            log::info!("{}: assumed compatible, not scanned", request.name);
            return Ok(ModuleReport {
                name: request.name,
                verdict: Verdict::Ok,
                warnings: Vec::new(),
            });
        }

        let module = Module::from_mem(request.bytes)?;
        self.scan_loaded(request.name, module)
    }

    /// Load and scan a module file.
    ///
    /// # Errors
    /// Returns the I/O or load error if the file cannot be read as a module.
    pub fn scan_file(&self, path: &Path) -> Result<ModuleReport> {
        let module = Module::from_file(path)?;
        let name = path
            .file_name()
            .map_or_else(
                || module.name().to_string(),
                |name| name.to_string_lossy().into_owned(),
            );
        self.scan_loaded(name, module)
    }

    fn scan_loaded(&self, name: String, mut module: Module) -> Result<ModuleReport> {
        let platform_changed =
            self.config.detect_platform_change && self.platform.is_platform_changed(&module);
        if platform_changed {
            log::debug!(
                "{name}: compiled for another platform than {}",
                self.platform.platform
            );
        }

        let report = self.scan(&mut module, platform_changed)?;
        let verdict = aggregate(&report, &module)?;
        Ok(ModuleReport {
            name,
            verdict,
            warnings: report.warnings(),
        })
    }

    /// Scan several modules, in parallel unless disabled in the configuration. Results
    /// are returned in request order.
    #[must_use]
    pub fn scan_batch(&self, requests: Vec<ScanRequest>) -> Vec<Result<ModuleReport>> {
        if self.config.parallel {
            requests
                .into_par_iter()
                .map(|request| self.scan_bytes(request))
                .collect()
        } else {
            requests
                .into_iter()
                .map(|request| self.scan_bytes(request))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{opcodes, Instruction},
        compat::{
            finders::MissingMemberFinder,
            handler::Replacement,
            rewriters::FieldReplaceRewriter,
            Platform,
        },
        metadata::signatures::TypeSignature,
        test::{host_assemblies, ModFixture},
    };

    /// Rewrites every field load to `opcode`, and keeps chaining after other rewrites.
    struct GreedyRewriter {
        name: &'static str,
        opcode: u8,
    }

    impl InstructionHandler for GreedyRewriter {
        fn name(&self) -> &str {
            self.name
        }

        fn handle_instruction(
            &self,
            _ctx: &mut ScanContext<'_>,
            cursor: &InstructionCursor,
        ) -> Result<HandleOutcome> {
            if !cursor.instruction.is(opcodes::LDFLD) && !cursor.instruction.is(opcodes::LDSFLD) {
                return Ok(HandleOutcome::Unchanged);
            }
            let instruction = match self.opcode {
                opcodes::NOP => Instruction::simple(opcodes::NOP)?,
                opcode => Instruction::with_token(opcode, cursor.instruction.token().unwrap())?,
            };
            Ok(HandleOutcome::Rewritten(Replacement::new(instruction, self.name)))
        }
    }

    fn scanner(handlers: Vec<Box<dyn InstructionHandler>>) -> ModuleScanner {
        ModuleScanner::new(
            Arc::new(host_assemblies()),
            Arc::new(PlatformAssemblyMap::empty(Platform::Linux)),
            handlers,
            ScannerConfig::default(),
        )
    }

    fn widget_field_module(field: &str) -> Module {
        let mut fixture = ModFixture::new();
        let token = fixture.field("Host.Widget", field, TypeSignature::I4);
        fixture.finish(|encoder| {
            encoder.emit_ldarg(0)?;
            encoder.emit_token(opcodes::LDFLD, token)?;
            encoder.emit_ret()
        })
    }

    #[test]
    fn first_rewrite_wins() {
        let mut module = widget_field_module("Id");
        let scanner = scanner(vec![
            Box::new(GreedyRewriter {
                name: "first",
                opcode: opcodes::LDSFLD,
            }),
            Box::new(GreedyRewriter {
                name: "second",
                opcode: opcodes::LDFLD,
            }),
        ]);

        let report = scanner.scan(&mut module, false).unwrap();
        assert_eq!(report.rewrite_count(), 1);
        let conflicts: Vec<_> = report.conflicts().collect();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].winner, "first");
        assert_eq!(conflicts[0].loser, "second");
        assert_eq!(conflicts[0].index, 1);

        let (_, run) = module.method(conflicts[0].method).unwrap();
        assert!(run.body[1].is(opcodes::LDSFLD));
    }

    #[test]
    fn size_changing_rewrites_are_skipped() {
        let mut module = widget_field_module("Id");
        let before = module.clone();
        let scanner = scanner(vec![Box::new(GreedyRewriter {
            name: "shrinking",
            opcode: opcodes::NOP,
        })]);

        let report = scanner.scan(&mut module, false).unwrap();
        assert_eq!(report.rewrite_count(), 0);
        assert_eq!(module, before);
    }

    #[test]
    fn finders_validate_rewritten_instructions() {
        let mut module = widget_field_module("Identifier");
        let scanner = scanner(vec![
            Box::new(FieldReplaceRewriter::new("Host.Widget", "Identifier", "Missing")),
            Box::new(FieldReplaceRewriter::new("Host.Widget", "Identifier", "Id")),
            Box::new(MissingMemberFinder::new()),
        ]);

        let report = scanner.scan(&mut module, false).unwrap();
        assert_eq!(report.rewrite_count(), 1);
        assert!(report.diagnostics().is_empty());
        assert_eq!(report.methods_scanned(), 1);
        assert_eq!(report.instructions_scanned(), 3);
    }

    #[test]
    fn every_problem_is_reported() {
        let mut fixture = ModFixture::new();
        let first = fixture.field("Host.Widget", "count", TypeSignature::I4);
        let second = fixture.field("Host.Widget", "total", TypeSignature::I4);
        let mut module = fixture.finish(|encoder| {
            encoder.emit_token(opcodes::LDSFLD, first)?;
            encoder.emit_token(opcodes::LDSFLD, second)?;
            encoder.emit_token(opcodes::LDSFLD, first)?;
            encoder.emit_ret()
        });

        let report = scanner(vec![Box::new(MissingMemberFinder::new())])
            .scan(&mut module, false)
            .unwrap();
        assert_eq!(report.flags().count(), 3);
        assert_eq!(report.diagnostics(), vec![
            "reference to Host.Widget.count (no such field)".to_string(),
            "reference to Host.Widget.total (no such field)".to_string(),
        ]);
    }
}
