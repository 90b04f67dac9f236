//! Flags raised while scanning a module.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::metadata::token::Token;

/// Outcome classes a handler can raise for an instruction, method or module.
///
/// Only [`Flag::NotCompatible`] and [`Flag::Rewritten`] influence the verdict. All
/// `Detected*` flags are informational and surface as warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum Flag {
    /// The instruction was rewritten to restore compatibility
    Rewritten,
    /// The module cannot work with this host
    NotCompatible,
    /// Patches host code at runtime
    DetectedGamePatch,
    /// Touches the save serializer, which can corrupt saves
    DetectedSaveSerializer,
    /// Hooks the raw update tick, bypassing host validation
    DetectedUnvalidatedUpdateTick,
    /// Was built against a newer host than the one running
    DetectedGameAssemblyMismatch,
    /// Writes to the console directly
    DetectedConsoleAccess,
    /// Accesses the file system directly
    DetectedFilesystemAccess,
    /// Starts external processes
    DetectedShellAccess,
    /// Uses reflection to reach into other code
    DetectedReflectionAccess,
}

impl Flag {
    /// Whether the flag is informational only.
    #[must_use]
    pub fn is_detection(self) -> bool {
        !matches!(self, Flag::Rewritten | Flag::NotCompatible)
    }
}

/// A flag together with the noun phrase describing what matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagEntry {
    /// The raised flag
    pub flag: Flag,
    /// What matched, e.g. `reference to Host.Widget.count (no such field)`
    pub phrase: Option<String>,
}

impl FlagEntry {
    /// A flag with a phrase.
    #[must_use]
    pub fn new(flag: Flag, phrase: impl Into<String>) -> Self {
        FlagEntry {
            flag,
            phrase: Some(phrase.into()),
        }
    }

    /// A flag without a phrase.
    #[must_use]
    pub fn bare(flag: Flag) -> Self {
        FlagEntry { flag, phrase: None }
    }

    /// Shorthand for a `NotCompatible` entry.
    #[must_use]
    pub fn not_compatible(phrase: impl Into<String>) -> Self {
        FlagEntry::new(Flag::NotCompatible, phrase)
    }
}

/// Where in a module a flag was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagLocation {
    /// Raised once for the whole module
    Module,
    /// Raised for a method as a whole, e.g. for its local variable types
    Method(Token),
    /// Raised for the instruction at `index` of `method`
    Instruction {
        /// The method
        method: Token,
        /// Position of the instruction in the body
        index: usize,
    },
}

/// A flag as recorded in a [`crate::compat::ScanReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFlag {
    /// The flag and its phrase
    pub entry: FlagEntry,
    /// Name of the handler that raised it
    pub handler: String,
    /// Where it was raised
    pub location: FlagLocation,
}

impl ScanFlag {
    /// The raised flag.
    #[must_use]
    pub fn flag(&self) -> Flag {
        self.entry.flag
    }

    /// The phrase, or the handler name when the handler gave none.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.entry.phrase {
            Some(phrase) => phrase.clone(),
            None => format!("{} ({})", self.handler, self.entry.flag),
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn detections() {
        assert!(!Flag::Rewritten.is_detection());
        assert!(!Flag::NotCompatible.is_detection());
        assert_eq!(Flag::iter().filter(|flag| flag.is_detection()).count(), 8);
        assert_eq!(Flag::DetectedShellAccess.to_string(), "DetectedShellAccess");
    }

    #[test]
    fn describe_falls_back_to_handler() {
        let flag = ScanFlag {
            entry: FlagEntry::bare(Flag::DetectedGamePatch),
            handler: "patch library".to_string(),
            location: FlagLocation::Module,
        };
        assert_eq!(flag.describe(), "patch library (DetectedGamePatch)");

        let flag = ScanFlag {
            entry: FlagEntry::not_compatible("reference to Host.Widget.count (no such field)"),
            ..flag
        };
        assert_eq!(flag.describe(), "reference to Host.Widget.count (no such field)");
        assert_eq!(flag.flag(), Flag::NotCompatible);
    }
}
