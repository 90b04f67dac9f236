//! # modcompat Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! of the library. Import it to get quick access to everything needed to load host
//! assemblies, build a handler chain and scan mods.
//!
//! ```rust,no_run
//! use modcompat::prelude::*;
//!
//! let catalogue = RuleCatalogue::from_json(&std::fs::read_to_string("rules.json")?)?;
//! println!("{} handlers", catalogue.build_handlers().len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all modcompat operations
pub use crate::Error;

/// The result type used throughout modcompat
pub use crate::Result;

/// Low-level byte access
pub use crate::{File, Parser};

// ================================================================================================
// Module Model
// ================================================================================================

/// The module model and its builders
pub use crate::metadata::module::{
    FieldDef, MemberRef, MethodBuilder, MethodDef, MethodSpec, Module, ModuleBuilder,
    PropertyDef, TypeBuilder, TypeDef, TypeRef,
};

/// Assembly names and versions
pub use crate::metadata::identity::{AssemblyIdentity, AssemblyVersion};

/// Metadata tokens
pub use crate::metadata::token::{TableId, Token};

/// Signatures
pub use crate::metadata::signatures::{MemberSignature, SignatureMethod, TypeSignature};

/// Instructions
pub use crate::assembly::{opcodes, Instruction, InstructionEncoder, Operand};

// ================================================================================================
// Host Assemblies
// ================================================================================================

/// The host assemblies references are resolved against
pub use crate::host::{HostAssemblies, ResolvedType};

// ================================================================================================
// Compatibility Scanning
// ================================================================================================

/// Type comparison and platform renames
pub use crate::compat::{AssemblyRedirect, Platform, PlatformAssemblyMap, TypeOracle};

/// Handler interface
pub use crate::compat::{
    HandleOutcome, InstructionCursor, InstructionHandler, Replacement, ScanContext,
};

/// Flags raised by handlers
pub use crate::compat::{Flag, FlagEntry, FlagLocation, ScanFlag};

/// Configuration and rule tables
pub use crate::compat::{OracleConfig, RuleCatalogue, ScannerConfig};

/// Scanning and verdicts
pub use crate::compat::{
    aggregate, ModuleReport, ModuleScanner, ScanReport, ScanRequest, Verdict,
};

/// Adapter type synthesis
pub use crate::compat::AdapterBuilder;
