// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # modcompat
//!
//! Compatibility scanning and rewriting of compiled plugin modules ("mods") against the
//! current version of the host application they extend.
//!
//! Mods are compiled against the host assemblies of the day. When the host later renames
//! a field, turns it into a property, moves a method to another type or ships different
//! APIs per platform, old mods break at runtime. `modcompat` checks each mod before it is
//! loaded, rewrites the references it knows how to fix and rejects mods whose remaining
//! references no longer resolve, with a readable reason per problem.
//!
//! ## Features
//!
//! - **Module model** - Load, inspect, rewrite and re-serialise mod modules
//! - **Type oracle** - Decide whether a referenced type plausibly is the host's type
//! - **Platform map** - Per-platform assembly renames
//! - **Finders** - Flag missing members, changed types and suspicious behaviour
//! - **Rewriters** - Fix renamed fields, field-to-property changes and moved methods
//! - **Adapters** - Shim types bridging platform-dependent overload sets
//! - **Batch scans** - Modules are scanned in parallel
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use modcompat::prelude::*;
//!
//! let host = Module::from_file("Host.dll".as_ref())?;
//! let hosts = Arc::new(HostAssemblies::new(vec![host]).with_validated(["Host"]));
//! let platform = Arc::new(PlatformAssemblyMap::builtin(Platform::current()));
//! let scanner = ModuleScanner::new(
//!     hosts,
//!     platform,
//!     RuleCatalogue::builtin().build_handlers(),
//!     ScannerConfig::default(),
//! );
//!
//! let report = scanner.scan_file("Mods/Sample.dll".as_ref())?;
//! match &report.verdict {
//!     Verdict::Ok => println!("{} loads unchanged", report.name),
//!     Verdict::Patched { module_bytes } => {
//!         println!("{} patched, {} bytes", report.name, module_bytes.len())
//!     }
//!     Verdict::Reject { diagnostics } => {
//!         for reason in diagnostics {
//!             println!("{}: {}", report.name, reason);
//!         }
//!     }
//! }
//! # Ok::<(), modcompat::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - Tokens, identities, signatures and the [`metadata::module::Module`] model
//! - [`assembly`] - CIL instruction decoding and encoding
//! - [`host`] - The host assemblies references are resolved against
//! - [`compat`] - Oracle, platform map, handlers, scanner and verdicts
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Logging
//!
//! Progress and skipped rewrites are reported through the [`log`] facade. Without an
//! installed logger these calls cost nothing; hosts install whatever sink they use.
//!
//! ## Error Handling
//!
//! Loading and serialising modules returns [`Result<T, Error>`](Result). Incompatible
//! mods are not an error: they produce a [`compat::Verdict::Reject`].
//!
//! ```rust,no_run
//! use modcompat::{metadata::module::Module, Error};
//!
//! match Module::from_file("Mods/Broken.dll".as_ref()) {
//!     Ok(module) => println!("loaded {}", module.name()),
//!     Err(Error::NotSupported) => println!("not a mod module"),
//!     Err(Error::Malformed { message, .. }) => println!("malformed: {}", message),
//!     Err(e) => println!("other error: {}", e),
//! }
//! ```
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! cargo +nightly fuzz run module --release
//! ```

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// ```rust,no_run
/// use modcompat::prelude::*;
///
/// let module = Module::from_file("Mods/Sample.dll".as_ref())?;
/// println!("{} methods", module.method_count());
/// # Ok::<(), modcompat::Error>(())
/// ```
pub mod prelude;

/// CIL instruction decoding and encoding
///
/// Method bodies are decoded into [`assembly::Instruction`]s at load time. Rewriters build
/// replacement instructions with [`assembly::Instruction::new`], the adapter builder
/// assembles whole bodies with [`assembly::InstructionEncoder`].
///
/// ```rust
/// use modcompat::{assembly::decode_body, assembly::opcodes};
///
/// let body = decode_body(&[0x00, 0x2A])?; // nop, ret
/// assert!(body[1].is(opcodes::RET));
/// # Ok::<(), modcompat::Error>(())
/// ```
pub mod assembly;

/// Tokens, assembly identities, signatures and the module model
///
/// # Key Components
///
/// - [`metadata::token`] - Table/row addressing
/// - [`metadata::identity`] - Assembly names and versions
/// - [`metadata::signatures`] - Type and method signatures
/// - [`metadata::module`] - [`metadata::module::Module`], its reader, writer and builder
pub mod metadata;

/// The host assemblies mod references are resolved against
pub mod host;

/// Compatibility scanning, rewriting and verdicts
pub mod compat;

/// `modcompat` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `modcompat` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

/// Owner of module bytes, memory-mapped or in memory
pub use file::{parser::Parser, File};
