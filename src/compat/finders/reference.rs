//! Finders matching any use of a named type or assembly.

use crate::{
    compat::{
        finders::{instruction_types, method_types, TypeUse},
        flags::{Flag, FlagEntry},
        handler::{HandleOutcome, InstructionCursor, InstructionHandler, ScanContext},
    },
    metadata::token::Token,
    Result,
};

/// A type matched by a [`TypeFinder`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TypeMatch {
    /// Full name without generic arguments
    pub type_name: String,
    /// Members of the type whose use is known to be safe
    #[serde(default)]
    pub excluded_members: Vec<String>,
}

impl TypeMatch {
    /// Match every use of `type_name`.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        TypeMatch {
            type_name: type_name.into(),
            excluded_members: Vec::new(),
        }
    }

    /// Do not flag accesses to `member`.
    #[must_use]
    pub fn excluding(mut self, member: impl Into<String>) -> Self {
        self.excluded_members.push(member.into());
        self
    }

    fn matches(&self, type_use: &TypeUse) -> bool {
        type_use.name == self.type_name
            && !type_use
                .member
                .as_ref()
                .is_some_and(|member| self.excluded_members.contains(member))
    }
}

/// Flags instructions and methods that use one of a set of types, as declaring type of
/// a member, in a member signature, as a type operand or as a local variable.
pub struct TypeFinder {
    name: String,
    flag: Flag,
    types: Vec<TypeMatch>,
}

impl TypeFinder {
    /// Finder raising `flag` for any use of `types`.
    #[must_use]
    pub fn new(name: impl Into<String>, flag: Flag, types: Vec<TypeMatch>) -> Self {
        TypeFinder {
            name: name.into(),
            flag,
            types,
        }
    }

    fn check(&self, uses: &[TypeUse]) -> Option<FlagEntry> {
        uses.iter()
            .find_map(|type_use| self.types.iter().find(|matcher| matcher.matches(type_use)))
            .map(|matcher| FlagEntry::new(self.flag, format!("{} type", matcher.type_name)))
    }
}

impl InstructionHandler for TypeFinder {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle_method(&self, ctx: &ScanContext<'_>, method: Token) -> Result<Vec<FlagEntry>> {
        Ok(self
            .check(&method_types(ctx.module(), method))
            .into_iter()
            .collect())
    }

    fn handle_instruction(
        &self,
        ctx: &mut ScanContext<'_>,
        cursor: &InstructionCursor,
    ) -> Result<HandleOutcome> {
        Ok(self
            .check(&instruction_types(ctx, &cursor.instruction))
            .map_or(HandleOutcome::Unchanged, HandleOutcome::Flagged))
    }
}

/// Flags instructions and methods that use any type of a set of assemblies.
pub struct AssemblyFinder {
    name: String,
    flag: Flag,
    assemblies: Vec<String>,
    excluded_types: Vec<String>,
}

impl AssemblyFinder {
    /// Finder raising `flag` for any use of a type defined in `assemblies`.
    #[must_use]
    pub fn new(name: impl Into<String>, flag: Flag, assemblies: Vec<String>) -> Self {
        AssemblyFinder {
            name: name.into(),
            flag,
            assemblies,
            excluded_types: Vec::new(),
        }
    }

    /// Do not flag uses of `type_name`.
    #[must_use]
    pub fn excluding(mut self, type_name: impl Into<String>) -> Self {
        self.excluded_types.push(type_name.into());
        self
    }

    fn check(&self, uses: &[TypeUse]) -> Option<FlagEntry> {
        uses.iter()
            .find_map(|type_use| {
                let scope = type_use.scope.as_ref()?;
                (self.assemblies.contains(scope) && !self.excluded_types.contains(&type_use.name))
                    .then_some(scope)
            })
            .map(|scope| FlagEntry::new(self.flag, format!("{scope} assembly")))
    }
}

impl InstructionHandler for AssemblyFinder {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle_method(&self, ctx: &ScanContext<'_>, method: Token) -> Result<Vec<FlagEntry>> {
        Ok(self
            .check(&method_types(ctx.module(), method))
            .into_iter()
            .collect())
    }

    fn handle_instruction(
        &self,
        ctx: &mut ScanContext<'_>,
        cursor: &InstructionCursor,
    ) -> Result<HandleOutcome> {
        Ok(self
            .check(&instruction_types(ctx, &cursor.instruction))
            .map_or(HandleOutcome::Unchanged, HandleOutcome::Flagged))
    }
}
