//! Shared fixtures for unit tests.

mod fixtures;

pub use fixtures::*;
