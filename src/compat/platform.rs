//! Platform assembly map.
//!
//! Some host frameworks ship under different assembly names per operating system. A mod
//! compiled on one platform references the names of that platform, which do not exist
//! on another. [`PlatformAssemblyMap`] lists these renames so resolution can look in the
//! assembly that actually provides a type on the current platform, instead of reporting
//! every such reference as missing.
//!
//! The map never rewrites the module itself. It only changes the scopes tried during
//! resolution: the redirected assembly first, then the one the mod names.
//!
//! # Examples
//!
//! ```rust
//! use modcompat::compat::{Platform, PlatformAssemblyMap};
//!
//! let map = PlatformAssemblyMap::builtin(Platform::Linux);
//! assert_eq!(
//!     map.candidate_scopes("Microsoft.Xna.Framework", "Microsoft.Xna.Framework.Vector2"),
//!     vec!["MonoGame.Framework", "Microsoft.Xna.Framework"]
//! );
//! ```

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{
    metadata::{identity::AssemblyIdentity, module::Module},
    Result,
};

/// Assemblies of the XNA framework that MonoGame merges into a single assembly.
pub const XNA_ASSEMBLIES: [&str; 4] = [
    "Microsoft.Xna.Framework",
    "Microsoft.Xna.Framework.Game",
    "Microsoft.Xna.Framework.Graphics",
    "Microsoft.Xna.Framework.Xact",
];

/// The MonoGame framework assembly.
pub const MONOGAME_ASSEMBLY: &str = "MonoGame.Framework";

/// Operating system family of the host.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
pub enum Platform {
    /// Windows, hosting the XNA framework
    Windows,
    /// Linux, hosting MonoGame
    Linux,
    /// macOS, hosting MonoGame
    Mac,
}

impl Platform {
    /// The platform this process runs on.
    #[must_use]
    pub fn current() -> Platform {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Mac
        } else {
            Platform::Linux
        }
    }
}

/// One assembly rename between platform variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyRedirect {
    /// Assembly name used by the other platform
    pub from: String,
    /// Assembly name providing the types on this platform
    pub to: String,
    /// Full type names that keep their original scope
    #[serde(default)]
    pub excluded_types: Vec<String>,
}

impl AssemblyRedirect {
    /// A redirect without excluded types.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        AssemblyRedirect {
            from: from.into(),
            to: to.into(),
            excluded_types: Vec::new(),
        }
    }

    /// Exclude a type from this redirect.
    #[must_use]
    pub fn excluding(mut self, type_full_name: impl Into<String>) -> Self {
        self.excluded_types.push(type_full_name.into());
        self
    }
}

/// Assembly renames that apply on the current platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformAssemblyMap {
    /// Platform the host runs on
    pub platform: Platform,
    /// Renames, tried in order
    #[serde(default)]
    pub redirects: Vec<AssemblyRedirect>,
}

impl PlatformAssemblyMap {
    /// Map from an explicit redirect table.
    #[must_use]
    pub fn new(platform: Platform, redirects: Vec<AssemblyRedirect>) -> Self {
        PlatformAssemblyMap {
            platform,
            redirects,
        }
    }

    /// Map without any redirects.
    #[must_use]
    pub fn empty(platform: Platform) -> Self {
        PlatformAssemblyMap::new(platform, Vec::new())
    }

    /// The graphics framework renames: on Windows MonoGame references go to the XNA
    /// assemblies, elsewhere XNA references go to MonoGame.
    #[must_use]
    pub fn builtin(platform: Platform) -> Self {
        let redirects = match platform {
            Platform::Windows => XNA_ASSEMBLIES
                .iter()
                .map(|xna| AssemblyRedirect::new(MONOGAME_ASSEMBLY, *xna))
                .collect(),
            Platform::Linux | Platform::Mac => XNA_ASSEMBLIES
                .iter()
                .map(|xna| AssemblyRedirect::new(*xna, MONOGAME_ASSEMBLY))
                .collect(),
        };
        PlatformAssemblyMap::new(platform, redirects)
    }

    /// Load a map from JSON.
    ///
    /// # Errors
    /// Returns [`crate::Error::Catalogue`] if the JSON does not describe a map.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether `type_full_name` keeps its original scope when referenced from `scope`.
    #[must_use]
    pub fn should_ignore(&self, scope: &str, type_full_name: &str) -> bool {
        self.redirects.iter().any(|redirect| {
            redirect.from == scope
                && redirect
                    .excluded_types
                    .iter()
                    .any(|excluded| excluded == type_full_name)
        })
    }

    /// Identity a reference to `identity` resolves to on this platform.
    #[must_use]
    pub fn redirect(&self, identity: &AssemblyIdentity) -> AssemblyIdentity {
        match self.redirect_targets(&identity.name).next() {
            Some(target) => identity.renamed(target),
            None => identity.clone(),
        }
    }

    /// Scopes to try, in order, when resolving `type_full_name` referenced from `scope`.
    ///
    /// The redirect targets come first, so the first scope is always the name
    /// [`PlatformAssemblyMap::redirect`] gives; the original scope is the last fallback.
    /// Excluded types only get their original scope.
    #[must_use]
    pub fn candidate_scopes<'a>(&'a self, scope: &'a str, type_full_name: &str) -> Vec<&'a str> {
        if self.should_ignore(scope, type_full_name) {
            return vec![scope];
        }

        let mut scopes: Vec<&str> = Vec::new();
        for candidate in self.redirect_targets(scope).chain([scope]) {
            if !scopes.contains(&candidate) {
                scopes.push(candidate);
            }
        }
        scopes
    }

    fn redirect_targets<'a>(&'a self, scope: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.redirects
            .iter()
            .filter(move |redirect| redirect.from == scope)
            .map(|redirect| redirect.to.as_str())
    }

    /// Whether `assembly` is renamed on this platform.
    #[must_use]
    pub fn is_redirected(&self, assembly: &str) -> bool {
        self.redirects.iter().any(|redirect| redirect.from == assembly)
    }

    /// Whether `module` was compiled for another platform, i.e. references an assembly
    /// this map renames.
    #[must_use]
    pub fn is_platform_changed(&self, module: &Module) -> bool {
        module
            .assembly_refs()
            .iter()
            .any(|identity| self.is_redirected(&identity.name))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;
    use crate::{
        host::HostAssemblies,
        metadata::{
            identity::AssemblyVersion,
            module::{ModuleBuilder, TypeBuilder},
        },
    };

    #[test]
    fn platforms() {
        assert_eq!(Platform::from_str("Linux").unwrap(), Platform::Linux);
        assert_eq!(Platform::Mac.to_string(), "Mac");
        assert_eq!(Platform::iter().count(), 3);
    }

    #[test]
    fn builtin_windows() {
        let map = PlatformAssemblyMap::builtin(Platform::Windows);
        let scopes = map.candidate_scopes(MONOGAME_ASSEMBLY, "Microsoft.Xna.Framework.Vector2");
        assert_eq!(scopes.len(), 5);
        assert_eq!(scopes[0], "Microsoft.Xna.Framework");
        assert_eq!(scopes[4], MONOGAME_ASSEMBLY);

        let identity = AssemblyIdentity::new(MONOGAME_ASSEMBLY, AssemblyVersion::new(3, 8, 0, 0));
        assert_eq!(map.redirect(&identity).name, scopes[0]);
        assert_eq!(map.redirect(&identity).version, AssemblyVersion::new(3, 8, 0, 0));
    }

    #[test]
    fn unrelated_assemblies_pass_through() {
        let map = PlatformAssemblyMap::builtin(Platform::Linux);
        let identity = AssemblyIdentity::new("mscorlib", AssemblyVersion::new(4, 0, 0, 0));
        assert_eq!(map.redirect(&identity), identity);
        assert_eq!(map.candidate_scopes("mscorlib", "System.String"), vec!["mscorlib"]);
    }

    #[test]
    fn excluded_types_keep_scope() {
        let map = PlatformAssemblyMap::new(
            Platform::Linux,
            vec![AssemblyRedirect::new("Legacy.Graphics", "Modern.Graphics")
                .excluding("Legacy.Graphics.SpriteBatch")],
        );
        assert!(map.should_ignore("Legacy.Graphics", "Legacy.Graphics.SpriteBatch"));
        assert_eq!(
            map.candidate_scopes("Legacy.Graphics", "Legacy.Graphics.SpriteBatch"),
            vec!["Legacy.Graphics"]
        );
        assert_eq!(
            map.candidate_scopes("Legacy.Graphics", "Legacy.Graphics.Texture"),
            vec!["Modern.Graphics", "Legacy.Graphics"]
        );
    }

    #[test]
    fn redirected_assembly_wins_over_original() {
        let graphics = |name: &str| {
            let mut builder =
                ModuleBuilder::new(AssemblyIdentity::new(name, AssemblyVersion::new(1, 0, 0, 0)));
            builder
                .add_type(TypeBuilder::new("Legacy.Graphics", "Texture"))
                .unwrap();
            builder.build()
        };
        let hosts = HostAssemblies::new(vec![
            graphics("Legacy.Graphics"),
            graphics("Modern.Graphics"),
        ]);
        let map = PlatformAssemblyMap::new(
            Platform::Linux,
            vec![AssemblyRedirect::new("Legacy.Graphics", "Modern.Graphics")],
        );

        let scopes = map.candidate_scopes("Legacy.Graphics", "Legacy.Graphics.Texture");
        let resolved = hosts
            .resolve_type(&scopes, "Legacy.Graphics.Texture")
            .unwrap();
        assert_eq!(resolved.module.identity().name, "Modern.Graphics");
    }

    #[test]
    fn platform_change_detection() {
        let map = PlatformAssemblyMap::builtin(Platform::Linux);
        let mut builder = ModuleBuilder::new(AssemblyIdentity::new(
            "WindowsMod",
            AssemblyVersion::new(1, 0, 0, 0),
        ));
        builder.assembly_ref(AssemblyIdentity::new(
            "Microsoft.Xna.Framework.Graphics",
            AssemblyVersion::new(4, 0, 0, 0),
        ));
        assert!(map.is_platform_changed(&builder.build()));

        let native = ModuleBuilder::new(AssemblyIdentity::new(
            "LinuxMod",
            AssemblyVersion::new(1, 0, 0, 0),
        ))
        .build();
        assert!(!map.is_platform_changed(&native));
    }

    #[test]
    fn from_json() {
        let map = PlatformAssemblyMap::from_json(
            r#"{
                "platform": "Mac",
                "redirects": [
                    {
                        "from": "Legacy.Audio",
                        "to": "Modern.Audio",
                        "excluded_types": ["Legacy.Audio.Cue"]
                    },
                    { "from": "Legacy.Input", "to": "Modern.Input" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(map.platform, Platform::Mac);
        assert_eq!(map.redirects.len(), 2);
        assert!(map.should_ignore("Legacy.Audio", "Legacy.Audio.Cue"));
        assert!(PlatformAssemblyMap::from_json("{\"platform\": \"Amiga\"}").is_err());
    }
}
