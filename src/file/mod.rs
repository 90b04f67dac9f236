//! Input backends for module bytes.
//!
//! Mod modules arrive either as an in-memory buffer handed over by the mod loader or as a
//! path on disk. Both are exposed through the [`Backend`] trait so that the module reader
//! only ever sees a byte slice. File input is memory-mapped with [`memmap2`].
//!
//! # Key Components
//!
//! - [`File`] - Owner of the module bytes, independent of their origin
//! - [`parser::Parser`] - Cursor based, bounds-checked reader over those bytes
//! - [`io`] - Primitive little/big endian helpers used by reader and writer

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::Result;

use memory::Memory;
use physical::Physical;

/// Backing storage of module bytes.
///
/// Implementations must be `Send + Sync` so loaded files can be handed to scanning
/// workers on other threads.
pub trait Backend: Send + Sync {
    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the length of the data buffer.
    fn len(&self) -> usize;

    /// Consumes the backend and returns an owned copy of its bytes.
    fn into_data(self: Box<Self>) -> Vec<u8>;
}

/// Module bytes loaded from disk or memory.
///
/// # Examples
///
/// ```rust
/// use modcompat::File;
///
/// let file = File::from_mem(vec![0x4D, 0x4F, 0x44, 0x4C])?;
/// assert_eq!(file.len(), 4);
/// # Ok::<(), modcompat::Error>(())
/// ```
pub struct File {
    backend: Box<dyn Backend>,
}

impl File {
    /// Memory-map the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped and
    /// [`crate::Error::Empty`] if it has no content.
    pub fn from_file(path: &Path) -> Result<File> {
        let physical = Physical::new(path)?;
        if physical.len() == 0 {
            return Err(crate::Error::Empty);
        }

        Ok(File {
            backend: Box::new(physical),
        })
    }

    /// Wrap an in-memory buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] if `data` is empty.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        if data.is_empty() {
            return Err(crate::Error::Empty);
        }

        Ok(File {
            backend: Box::new(Memory::new(data)),
        })
    }

    /// The raw module bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.backend.data()
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    /// Always false, empty input is rejected on construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backend.len() == 0
    }

    /// Consume the file and return its bytes.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.backend.into_data()
    }
}
