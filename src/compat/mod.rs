//! Compatibility scanning and rewriting of plugin modules.
//!
//! A [`ModuleScanner`] runs an ordered list of [`InstructionHandler`]s over every
//! instruction of a module. Rewriters redirect references to APIs that moved in the host
//! assemblies; finders flag references that no longer resolve and behaviour worth warning
//! about. The resulting [`ScanReport`] is turned into a [`Verdict`] by [`aggregate`].
//!
//! # Key Components
//!
//! - [`oracle`] - Whether two type names plausibly denote the same type
//! - [`platform`] - Per-platform assembly renames
//! - [`finders`] - Handlers that only flag
//! - [`rewriters`] - Handlers that replace instructions
//! - [`adapter`] - Generating adapter types for platform-dependent APIs
//! - [`catalogue`] - Declarative rule tables producing the handler list
//! - [`scanner`] - The handler chain driver
//! - [`verdict`] - The load decision
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use modcompat::compat::{
//!     ModuleScanner, Platform, PlatformAssemblyMap, RuleCatalogue, ScanRequest, ScannerConfig,
//! };
//! use modcompat::host::HostAssemblies;
//! use modcompat::metadata::module::Module;
//!
//! let host = Module::from_file("Host.dll".as_ref())?;
//! let hosts = Arc::new(HostAssemblies::new(vec![host]).with_validated(["Host"]));
//! let platform = Arc::new(PlatformAssemblyMap::builtin(Platform::current()));
//! let handlers = RuleCatalogue::builtin().build_handlers();
//!
//! let scanner = ModuleScanner::new(hosts, platform, handlers, ScannerConfig::default());
//! let report = scanner.scan_bytes(ScanRequest::new("Mod.dll", std::fs::read("Mod.dll")?))?;
//! println!("{}: {}", report.name, report.verdict);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod adapter;
pub mod catalogue;
pub mod config;
pub mod finders;
pub mod flags;
pub mod handler;
pub mod oracle;
pub mod platform;
pub mod rewriters;
pub mod scanner;
pub mod verdict;

pub use adapter::AdapterBuilder;
pub use catalogue::{
    DetectionRule, FieldReplaceRule, FieldToPropertyRule, MethodParentRule, RuleCatalogue,
    ShimRule,
};
pub use config::{OracleConfig, ScannerConfig};
pub use flags::{Flag, FlagEntry, FlagLocation, ScanFlag};
pub use handler::{
    HandleOutcome, InstructionCursor, InstructionHandler, MemberOperand, ReferenceImporter,
    Replacement, ScanContext,
};
pub use oracle::TypeOracle;
pub use platform::{AssemblyRedirect, Platform, PlatformAssemblyMap};
pub use scanner::{ModuleScanner, RewriteConflict, ScanReport, ScanRequest};
pub use verdict::{aggregate, ModuleReport, Verdict};
