//! The set of host assemblies mod references are resolved against.
//!
//! [`HostAssemblies`] is built once before any scan and shared read-only by all scanning
//! workers. Resolution never fails with an error: a reference that cannot be matched simply
//! yields `None`, which is what the validation finders look for.
//!
//! Lookups follow base types that are themselves defined in a host module, so a member
//! referenced through a derived type still resolves.

use std::collections::{HashMap, HashSet};

use crate::metadata::{
    module::{FieldDef, MethodDef, Module, PropertyDef, TypeDef},
    signatures::TypeSignature,
};

/// Maximum depth of base type chains that are followed.
const MAX_BASE_DEPTH: usize = 16;

/// A type definition found in one of the host modules.
#[derive(Clone, Copy)]
pub struct ResolvedType<'h> {
    /// The module defining the type
    pub module: &'h Module,
    /// The definition
    pub type_def: &'h TypeDef,
}

impl<'h> ResolvedType<'h> {
    /// `Namespace.Name` of the definition.
    #[must_use]
    pub fn full_name(&self) -> String {
        self.type_def.full_name()
    }

    /// Simple name of the defining assembly.
    #[must_use]
    pub fn assembly(&self) -> &'h str {
        &self.module.identity().name
    }

    /// Canonical name of a signature appearing in this type's members.
    #[must_use]
    pub fn type_name(&self, signature: &TypeSignature) -> String {
        self.module.type_name(signature)
    }
}

/// A method found on a resolved type (or one of its bases).
#[derive(Clone, Copy)]
pub struct ResolvedMethod<'h> {
    /// The type declaring the method
    pub owner: ResolvedType<'h>,
    /// The definition
    pub method: &'h MethodDef,
}

impl ResolvedMethod<'_> {
    /// Canonical names of the parameter types.
    #[must_use]
    pub fn param_type_names(&self) -> Vec<String> {
        self.method
            .signature
            .params
            .iter()
            .map(|param| self.owner.type_name(param))
            .collect()
    }

    /// Canonical name of the return type.
    #[must_use]
    pub fn return_type_name(&self) -> String {
        self.owner.type_name(&self.method.signature.return_type)
    }
}

/// Read-only set of host modules, keyed by assembly simple name.
#[derive(Default)]
pub struct HostAssemblies {
    modules: Vec<Module>,
    by_assembly: HashMap<String, usize>,
    validated: HashSet<String>,
}

impl HostAssemblies {
    /// Host set over `modules`. Later modules with an already known assembly name are
    /// ignored.
    #[must_use]
    pub fn new(modules: Vec<Module>) -> Self {
        let mut by_assembly = HashMap::new();
        for (index, module) in modules.iter().enumerate() {
            by_assembly
                .entry(module.identity().name.clone())
                .or_insert(index);
        }

        HostAssemblies {
            modules,
            by_assembly,
            validated: HashSet::new(),
        }
    }

    /// Mark assemblies whose references the validation finders check.
    #[must_use]
    pub fn with_validated<I, S>(mut self, assemblies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validated.extend(assemblies.into_iter().map(Into::into));
        self
    }

    /// All host modules.
    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Host module of an assembly.
    #[must_use]
    pub fn module(&self, assembly: &str) -> Option<&Module> {
        self.by_assembly
            .get(assembly)
            .and_then(|&index| self.modules.get(index))
    }

    /// Whether references into `assembly` are validated.
    #[must_use]
    pub fn is_validated(&self, assembly: &str) -> bool {
        self.validated.contains(assembly)
    }

    /// Resolve a type definition by full name, trying `scopes` in order.
    #[must_use]
    pub fn resolve_type<S: AsRef<str>>(
        &self,
        scopes: &[S],
        full_name: &str,
    ) -> Option<ResolvedType<'_>> {
        scopes.iter().find_map(|scope| {
            let module = self.module(scope.as_ref())?;
            let type_def = module.find_type(full_name)?;
            Some(ResolvedType { module, type_def })
        })
    }

    /// The base type of `resolved`, if it is defined in a host module.
    #[must_use]
    pub fn base_of<'h>(&'h self, resolved: &ResolvedType<'h>) -> Option<ResolvedType<'h>> {
        let base = resolved.type_def.base.as_ref()?;
        let scope = resolved.module.type_scope(base)?;
        let name = resolved.module.token_type_name(base.named_token()?)?;
        let name = name.split('<').next().unwrap_or(&name);
        self.resolve_type(&[scope], name)
    }

    /// `resolved` followed by its host-defined base types.
    pub fn type_chain<'h>(
        &'h self,
        resolved: ResolvedType<'h>,
    ) -> impl Iterator<Item = ResolvedType<'h>> + 'h {
        std::iter::successors(Some(resolved), move |current| self.base_of(current))
            .take(MAX_BASE_DEPTH)
    }

    /// Field by name on `resolved` or its bases.
    #[must_use]
    pub fn resolve_field<'h>(
        &'h self,
        resolved: ResolvedType<'h>,
        name: &str,
    ) -> Option<(ResolvedType<'h>, &'h FieldDef)> {
        self.type_chain(resolved)
            .find_map(|owner| owner.type_def.field(name).map(|field| (owner, field)))
    }

    /// Property by name on `resolved` or its bases.
    #[must_use]
    pub fn resolve_property<'h>(
        &'h self,
        resolved: ResolvedType<'h>,
        name: &str,
    ) -> Option<(ResolvedType<'h>, &'h PropertyDef)> {
        self.type_chain(resolved).find_map(|owner| {
            owner
                .type_def
                .property(name)
                .map(|property| (owner, property))
        })
    }

    /// All methods named `name` on `resolved` and its bases, most derived first.
    #[must_use]
    pub fn methods_named<'h>(
        &'h self,
        resolved: ResolvedType<'h>,
        name: &str,
    ) -> Vec<ResolvedMethod<'h>> {
        self.type_chain(resolved)
            .flat_map(|owner| {
                owner
                    .type_def
                    .methods
                    .iter()
                    .filter(move |method| method.name == name)
                    .map(move |method| ResolvedMethod { owner, method })
            })
            .collect()
    }

    /// Method by name, generic arity and exact parameter type names.
    #[must_use]
    pub fn resolve_method<'h>(
        &'h self,
        resolved: ResolvedType<'h>,
        name: &str,
        generic_arity: u32,
        param_type_names: &[String],
    ) -> Option<ResolvedMethod<'h>> {
        self.methods_named(resolved, name).into_iter().find(|candidate| {
            candidate.method.signature.generic_param_count == generic_arity
                && candidate.param_type_names() == param_type_names
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        identity::{AssemblyIdentity, AssemblyVersion},
        module::{FieldAttributes, MethodBuilder, ModuleBuilder, TypeBuilder},
        signatures::SignatureMethod,
    };

    fn hosts() -> HostAssemblies {
        let mut builder = ModuleBuilder::new(AssemblyIdentity::new(
            "Host",
            AssemblyVersion::new(1, 6, 0, 0),
        ));
        let base_token = builder.next_type_token();
        let mut base = TypeBuilder::new("Host", "Entity");
        base.field("Id", FieldAttributes::PUBLIC, TypeSignature::I4)
            .method(MethodBuilder::new(
                "Update",
                SignatureMethod::new_instance(TypeSignature::Void, vec![]),
            ));
        builder.add_type(base).unwrap();

        let mut widget = TypeBuilder::new("Host", "Widget");
        widget
            .base(TypeSignature::Class(base_token))
            .method(MethodBuilder::new(
                "Draw",
                SignatureMethod::new_instance(TypeSignature::Void, vec![TypeSignature::R4]),
            ))
            .method(MethodBuilder::new(
                "Draw",
                SignatureMethod::new_instance(TypeSignature::Void, vec![TypeSignature::String]),
            ));
        builder.add_type(widget).unwrap();

        HostAssemblies::new(vec![builder.build()]).with_validated(["Host"])
    }

    #[test]
    fn resolve_types_by_scope() {
        let hosts = hosts();
        assert!(hosts.resolve_type(&["Host"], "Host.Widget").is_some());
        assert!(hosts.resolve_type(&["Other", "Host"], "Host.Widget").is_some());
        assert!(hosts.resolve_type(&["Other"], "Host.Widget").is_none());
        assert!(hosts.resolve_type(&["Host"], "Host.Missing").is_none());
        assert!(hosts.is_validated("Host"));
        assert!(!hosts.is_validated("mscorlib"));
    }

    #[test]
    fn members_resolve_through_bases() {
        let hosts = hosts();
        let widget = hosts.resolve_type(&["Host"], "Host.Widget").unwrap();

        let (owner, field) = hosts.resolve_field(widget, "Id").unwrap();
        assert_eq!(owner.full_name(), "Host.Entity");
        assert_eq!(field.signature, TypeSignature::I4);
        assert_eq!(hosts.methods_named(widget, "Update").len(), 1);
        assert!(hosts.resolve_field(widget, "Missing").is_none());
    }

    #[test]
    fn methods_resolve_by_exact_params() {
        let hosts = hosts();
        let widget = hosts.resolve_type(&["Host"], "Host.Widget").unwrap();

        let draw = hosts
            .resolve_method(widget, "Draw", 0, &["System.String".to_string()])
            .unwrap();
        assert_eq!(draw.return_type_name(), "System.Void");
        assert!(hosts
            .resolve_method(widget, "Draw", 0, &["System.Int32".to_string()])
            .is_none());
        assert!(hosts
            .resolve_method(widget, "Draw", 1, &["System.String".to_string()])
            .is_none());
        assert_eq!(hosts.methods_named(widget, "Draw").len(), 2);
    }
}
