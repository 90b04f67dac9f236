//! Assembly identity and version handling.
//!
//! Modules reference other assemblies by display name, e.g.
//! `Microsoft.Xna.Framework, Version=4.0.0.0, Culture=neutral, PublicKeyToken=842cf8be1de50553`.
//! This module parses and renders those names and provides the version comparisons used by
//! platform redirection and by the host-version finder.
//!
//! # Identity Components
//!
//! - **Simple Name**: The primary assembly name, used for resolution and redirection
//! - **Version**: Four-part version number (major.minor.build.revision)
//! - **Culture**: Localization culture (None for culture-neutral assemblies)
//! - **Public Key Token**: 8-byte strong name token, if signed
//!
//! # Examples
//!
//! ```rust
//! use modcompat::metadata::identity::{AssemblyIdentity, AssemblyVersion};
//!
//! let identity = AssemblyIdentity::parse(
//!     "Microsoft.Xna.Framework, Version=4.0.0.0, Culture=neutral, PublicKeyToken=842cf8be1de50553"
//! )?;
//! assert_eq!(identity.name, "Microsoft.Xna.Framework");
//! assert_eq!(identity.version, AssemblyVersion::new(4, 0, 0, 0));
//! assert!(identity.is_strong_named());
//! # Ok::<(), modcompat::Error>(())
//! ```

use std::{fmt, str::FromStr};

use crate::{Error, Result};

/// Complete identity of an assembly as referenced by a module.
///
/// Equality and hashing consider the name, version and culture. The public key token is
/// excluded, so that the same assembly signed differently per platform still compares
/// equal once its name has been redirected.
#[derive(Debug, Clone)]
pub struct AssemblyIdentity {
    /// Simple assembly name (e.g., "mscorlib", "MonoGame.Framework").
    pub name: String,
    /// Four-part version number.
    pub version: AssemblyVersion,
    /// Culture for satellite assemblies, `None` if culture-neutral.
    pub culture: Option<String>,
    /// Strong name public key token.
    pub public_key_token: Option<[u8; 8]>,
}

impl PartialEq for AssemblyIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version && self.culture == other.culture
    }
}

impl Eq for AssemblyIdentity {}

impl std::hash::Hash for AssemblyIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
        self.culture.hash(state);
    }
}

/// Four-part version numbering for assemblies.
///
/// Versions are compared component-wise in order: major, minor, build, revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssemblyVersion {
    /// Major version component.
    pub major: u16,
    /// Minor version component.
    pub minor: u16,
    /// Build version component.
    pub build: u16,
    /// Revision version component.
    pub revision: u16,
}

impl AssemblyIdentity {
    /// Create an identity without culture or strong name.
    #[must_use]
    pub fn new(name: impl Into<String>, version: AssemblyVersion) -> Self {
        Self {
            name: name.into(),
            version,
            culture: None,
            public_key_token: None,
        }
    }

    /// Parse an assembly display name.
    ///
    /// Unknown components (e.g. `ProcessorArchitecture=...`) are ignored.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an empty name, an invalid version or an
    /// invalid public key token.
    pub fn parse(display_name: &str) -> Result<Self> {
        let mut parts = display_name.split(',').map(str::trim);

        let name = parts.next().unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(malformed_error!("Assembly name cannot be empty"));
        }

        let mut identity = AssemblyIdentity::new(name, AssemblyVersion::default());
        for part in parts {
            if let Some(value) = part.strip_prefix("Version=") {
                identity.version = AssemblyVersion::parse(value)?;
            } else if let Some(value) = part.strip_prefix("Culture=") {
                if value != "neutral" {
                    identity.culture = Some(value.to_string());
                }
            } else if let Some(value) = part.strip_prefix("PublicKeyToken=") {
                if value != "null" && !value.is_empty() {
                    let token_bytes = hex::decode(value).map_err(|e| {
                        malformed_error!("Invalid hex in PublicKeyToken '{}': {}", value, e)
                    })?;

                    let token: [u8; 8] = token_bytes.as_slice().try_into().map_err(|_| {
                        malformed_error!(
                            "PublicKeyToken must be exactly 8 bytes, got {} bytes from '{}'",
                            token_bytes.len(),
                            value
                        )
                    })?;
                    identity.public_key_token = Some(token);
                }
            }
        }

        Ok(identity)
    }

    /// Render the identity as a display name.
    ///
    /// The output round-trips through [`AssemblyIdentity::parse`].
    #[must_use]
    pub fn display_name(&self) -> String {
        let culture = self.culture.as_deref().unwrap_or("neutral");
        let token = self
            .public_key_token
            .map_or_else(|| "null".to_string(), hex::encode);

        format!(
            "{}, Version={}, Culture={}, PublicKeyToken={}",
            self.name, self.version, culture, token
        )
    }

    /// The simple name.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        &self.name
    }

    /// Whether a public key token is present.
    #[must_use]
    pub fn is_strong_named(&self) -> bool {
        self.public_key_token.is_some()
    }

    /// Copy of this identity under a different simple name, keeping everything else.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

impl AssemblyVersion {
    /// Create a new version.
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Parse a version string with one to four dot separated components.
    ///
    /// Missing components default to 0.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an empty string, more than four components
    /// or non-numeric components.
    pub fn parse(version_str: &str) -> Result<Self> {
        let parts: Vec<&str> = version_str.split('.').collect();

        if parts.is_empty() || parts.len() > 4 {
            return Err(malformed_error!("Invalid version format: {}", version_str));
        }

        let mut components = [0u16; 4];

        for (i, part) in parts.iter().enumerate() {
            components[i] = part
                .parse::<u16>()
                .map_err(|_| malformed_error!("Invalid version component: {}", part))?;
        }

        Ok(Self::new(
            components[0],
            components[1],
            components[2],
            components[3],
        ))
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for AssemblyVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromStr for AssemblyIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
