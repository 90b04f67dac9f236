//! Module metadata: tokens, assembly identities, signatures and the module model.
//!
//! # Key Components
//!
//! - [`token`] - Table/row addressing used by instruction operands
//! - [`identity`] - Assembly display names and versions
//! - [`signatures`] - Type and method signatures, with parser and encoders
//! - [`module`] - The [`module::Module`] model, its reader, writer and builder

pub mod identity;
pub mod module;
pub mod signatures;
pub mod token;
