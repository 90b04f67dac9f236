//! Declarative rule tables and the handler chain built from them.
//!
//! The symbols a host deprecated, moved or renamed are data: a [`RuleCatalogue`] lists
//! them per rule kind, and [`RuleCatalogue::build_handlers`] turns the tables into the
//! ordered handler list a [`crate::compat::ModuleScanner`] runs. Catalogues are usually
//! shipped as JSON next to the host.
//!
//! ```rust
//! use modcompat::compat::RuleCatalogue;
//!
//! let catalogue = RuleCatalogue::from_json(r#"{
//!     "field_to_property": [
//!         { "type_name": "Host.Widget", "field": "Label" }
//!     ],
//!     "detections": [
//!         { "kind": "Type", "name": "console", "flag": "DetectedConsoleAccess",
//!           "types": [ { "type_name": "System.Console" } ] }
//!     ]
//! }"#)?;
//! assert_eq!(catalogue.build_handlers().len(), 4);
//! # Ok::<(), modcompat::Error>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    compat::{
        finders::{
            AssemblyFinder, AssemblyVersionFinder, MissingMemberFinder, Symbol, SymbolFinder,
            TypeFinder, TypeMatch, UnexpectedTypeFinder,
        },
        flags::Flag,
        handler::InstructionHandler,
        rewriters::{
            FieldReplaceRewriter, FieldToPropertyRewriter, HeuristicFieldRewriter,
            MethodParentRewriter, ShimRewriter,
        },
    },
    Result,
};

/// A field that became a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldToPropertyRule {
    /// Declaring type
    pub type_name: String,
    /// Former field name
    pub field: String,
    /// Property name, if it differs from the field's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

/// A field that was renamed or moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReplaceRule {
    /// Declaring type
    pub type_name: String,
    /// Former field name
    pub field: String,
    /// New field name
    pub to_field: String,
    /// New declaring type and its assembly, if the field moved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_type: Option<(String, String)>,
}

/// Methods that moved to another declaring type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodParentRule {
    /// Former declaring type
    pub from_type: String,
    /// New declaring type
    pub to_type: String,
    /// Assembly of the new declaring type
    pub to_assembly: String,
    /// Only rewrite modules compiled for another platform
    #[serde(default)]
    pub only_if_platform_changed: bool,
}

/// Calls redirected to an adapter type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShimRule {
    /// Type whose calls are redirected
    pub target_type: String,
    /// Adapter type
    pub adapter_type: String,
    /// Assembly of the adapter type
    pub adapter_assembly: String,
    /// Methods to redirect, all when empty
    #[serde(default)]
    pub methods: Vec<String>,
}

/// An informational finder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DetectionRule {
    /// Any use of the listed types
    Type {
        /// Handler name
        name: String,
        /// Raised flag
        flag: Flag,
        /// Matched types
        types: Vec<TypeMatch>,
    },
    /// Any use of a type of the listed assemblies
    Assembly {
        /// Handler name
        name: String,
        /// Raised flag
        flag: Flag,
        /// Matched assemblies
        assemblies: Vec<String>,
        /// Types of those assemblies that are not flagged
        #[serde(default)]
        excluded_types: Vec<String>,
    },
    /// References to the listed symbols
    Symbol {
        /// Handler name
        name: String,
        /// Raised flag
        flag: Flag,
        /// Matched symbols
        symbols: Vec<Symbol>,
    },
}

impl DetectionRule {
    fn handler(&self) -> Box<dyn InstructionHandler> {
        match self {
            DetectionRule::Type { name, flag, types } => {
                Box::new(TypeFinder::new(name.clone(), *flag, types.clone()))
            }
            DetectionRule::Assembly {
                name,
                flag,
                assemblies,
                excluded_types,
            } => Box::new(
                excluded_types.iter().fold(
                    AssemblyFinder::new(name.clone(), *flag, assemblies.clone()),
                    |finder, excluded| finder.excluding(excluded.clone()),
                ),
            ),
            DetectionRule::Symbol {
                name,
                flag,
                symbols,
            } => Box::new(SymbolFinder::new(name.clone(), *flag, symbols.clone())),
        }
    }
}

/// All rules a host applies to the mods it loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleCatalogue {
    /// Symbols that are gone for good; any reference rejects the module
    pub removed_symbols: Vec<Symbol>,
    /// Fields that became properties
    pub field_to_property: Vec<FieldToPropertyRule>,
    /// Renamed or moved fields
    pub field_replacements: Vec<FieldReplaceRule>,
    /// Methods that moved to another type
    pub method_parents: Vec<MethodParentRule>,
    /// Adapter redirections
    pub shims: Vec<ShimRule>,
    /// Rewrite any unresolved field with a same-named property
    pub heuristic_fields: bool,
    /// Run the missing member and unexpected type finders
    pub validate_members: bool,
    /// Warn about references to newer host assemblies
    pub validate_assembly_versions: bool,
    /// Informational finders
    pub detections: Vec<DetectionRule>,
}

impl Default for RuleCatalogue {
    fn default() -> Self {
        RuleCatalogue {
            removed_symbols: Vec::new(),
            field_to_property: Vec::new(),
            field_replacements: Vec::new(),
            method_parents: Vec::new(),
            shims: Vec::new(),
            heuristic_fields: false,
            validate_members: true,
            validate_assembly_versions: false,
            detections: Vec::new(),
        }
    }
}

impl RuleCatalogue {
    /// Load a catalogue from JSON. Missing tables are empty.
    ///
    /// # Errors
    /// Returns [`crate::Error::Catalogue`] if the JSON does not describe a catalogue.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the catalogue to pretty printed JSON.
    ///
    /// # Errors
    /// Returns [`crate::Error::Catalogue`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Host independent rules: member validation, version checks, the field heuristic
    /// and detections for runtime patching, console, file system, process and reflection
    /// access.
    #[must_use]
    pub fn builtin() -> Self {
        let types = |names: &[&str]| -> Vec<TypeMatch> {
            names.iter().map(|name| TypeMatch::new(*name)).collect()
        };
        RuleCatalogue {
            heuristic_fields: true,
            validate_members: true,
            validate_assembly_versions: true,
            detections: vec![
                DetectionRule::Assembly {
                    name: "runtime patching".to_string(),
                    flag: Flag::DetectedGamePatch,
                    assemblies: vec!["0Harmony".to_string(), "Harmony".to_string()],
                    excluded_types: Vec::new(),
                },
                DetectionRule::Type {
                    name: "console access".to_string(),
                    flag: Flag::DetectedConsoleAccess,
                    types: types(&["System.Console"]),
                },
                DetectionRule::Type {
                    name: "file system access".to_string(),
                    flag: Flag::DetectedFilesystemAccess,
                    types: types(&[
                        "System.IO.File",
                        "System.IO.FileStream",
                        "System.IO.FileInfo",
                        "System.IO.Directory",
                        "System.IO.DirectoryInfo",
                        "System.IO.DriveInfo",
                        "System.IO.FileSystemWatcher",
                    ]),
                },
                DetectionRule::Type {
                    name: "shell access".to_string(),
                    flag: Flag::DetectedShellAccess,
                    types: types(&["System.Diagnostics.Process"]),
                },
                DetectionRule::Type {
                    name: "reflection access".to_string(),
                    flag: Flag::DetectedReflectionAccess,
                    types: types(&[
                        "System.Reflection.Assembly",
                        "System.Reflection.FieldInfo",
                        "System.Reflection.MethodInfo",
                        "System.Reflection.PropertyInfo",
                    ]),
                },
            ],
            ..RuleCatalogue::default()
        }
    }

    /// The handler chain: hard rejections first, then specific rewriters, structural
    /// rewriters, the heuristic rewriter, validation finders and finally detections.
    /// Validation finders see instructions as rewritten by the earlier handlers.
    #[must_use]
    pub fn build_handlers(&self) -> Vec<Box<dyn InstructionHandler>> {
        let mut handlers: Vec<Box<dyn InstructionHandler>> = Vec::new();

        if !self.removed_symbols.is_empty() {
            handlers.push(Box::new(SymbolFinder::new(
                "removed symbols",
                Flag::NotCompatible,
                self.removed_symbols.clone(),
            )));
        }

        for rule in &self.field_to_property {
            let rewriter = FieldToPropertyRewriter::new(rule.type_name.clone(), rule.field.clone());
            handlers.push(Box::new(match &rule.property {
                Some(property) => rewriter.to_property(property.clone()),
                None => rewriter,
            }));
        }
        for rule in &self.field_replacements {
            let rewriter = FieldReplaceRewriter::new(
                rule.type_name.clone(),
                rule.field.clone(),
                rule.to_field.clone(),
            );
            handlers.push(Box::new(match &rule.to_type {
                Some((type_name, assembly)) => {
                    rewriter.on_type(type_name.clone(), assembly.clone())
                }
                None => rewriter,
            }));
        }

        for rule in &self.method_parents {
            handlers.push(Box::new(
                MethodParentRewriter::new(
                    rule.from_type.clone(),
                    rule.to_type.clone(),
                    rule.to_assembly.clone(),
                )
                .only_if_platform_changed(rule.only_if_platform_changed),
            ));
        }
        for rule in &self.shims {
            handlers.push(Box::new(
                ShimRewriter::new(
                    rule.target_type.clone(),
                    rule.adapter_type.clone(),
                    rule.adapter_assembly.clone(),
                )
                .only_methods(rule.methods.iter().cloned()),
            ));
        }

        if self.heuristic_fields {
            handlers.push(Box::new(HeuristicFieldRewriter::new()));
        }

        if self.validate_members {
            handlers.push(Box::new(MissingMemberFinder::new()));
            handlers.push(Box::new(UnexpectedTypeFinder::new()));
        }
        if self.validate_assembly_versions {
            handlers.push(Box::new(AssemblyVersionFinder::new()));
        }

        handlers.extend(self.detections.iter().map(DetectionRule::handler));
        handlers
    }
}
