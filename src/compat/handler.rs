//! The contract shared by all finders and rewriters.
//!
//! A handler sees one instruction at a time through an [`InstructionCursor`] and answers
//! with a [`HandleOutcome`]. Handlers never write to the module themselves: a rewriter
//! returns a [`Replacement`] which the scanner applies, and interns any references the
//! replacement needs through the [`ReferenceImporter`] of the [`ScanContext`].
//!
//! The context also carries the resolution helpers every handler shares, so that all of
//! them resolve references identically: the platform map widens the scopes that are
//! tried, then [`HostAssemblies`] looks the type up.

use crate::{
    assembly::Instruction,
    compat::{flags::FlagEntry, oracle::TypeOracle, platform::PlatformAssemblyMap},
    host::{HostAssemblies, ResolvedType},
    metadata::{
        identity::AssemblyIdentity,
        module::{MemberRef, MethodSpec, Module},
        signatures::{SignatureMethod, TypeSignature},
        token::{TableId, Token},
    },
    Result,
};

/// Position of the instruction under inspection.
#[derive(Debug, Clone)]
pub struct InstructionCursor {
    /// Method containing the instruction
    pub method: Token,
    /// Index of the instruction in the method body
    pub index: usize,
    /// The instruction as currently present in the body
    pub instruction: Instruction,
    /// The instruction before it, if any
    pub previous: Option<Instruction>,
}

/// A rewrite proposed by a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    /// The instruction taking the original's place; must have the same encoded size
    pub instruction: Instruction,
    /// What was rewritten, for the scan log
    pub phrase: String,
}

impl Replacement {
    /// A replacement with a description.
    #[must_use]
    pub fn new(instruction: Instruction, phrase: impl Into<String>) -> Self {
        Replacement {
            instruction,
            phrase: phrase.into(),
        }
    }
}

/// Answer of a handler for a single instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum HandleOutcome {
    /// Not relevant to this handler
    Unchanged,
    /// Raise a flag for the instruction
    Flagged(FlagEntry),
    /// Replace the instruction
    Rewritten(Replacement),
}

/// A finder or rewriter.
///
/// Implementations must be deterministic and free of interior state, since one handler
/// list is shared by all concurrent module scans.
pub trait InstructionHandler: Send + Sync {
    /// Name used in logs and scan reports.
    fn name(&self) -> &str;

    /// Called once per module before any method is visited.
    ///
    /// # Errors
    /// Errors abort the scan of this module.
    fn handle_module(&self, _ctx: &ScanContext<'_>) -> Result<Vec<FlagEntry>> {
        Ok(Vec::new())
    }

    /// Called once per method before its instructions are visited.
    ///
    /// # Errors
    /// Errors abort the scan of this module.
    fn handle_method(&self, _ctx: &ScanContext<'_>, _method: Token) -> Result<Vec<FlagEntry>> {
        Ok(Vec::new())
    }

    /// Inspect one instruction.
    ///
    /// # Errors
    /// Errors abort the scan of this module.
    fn handle_instruction(
        &self,
        ctx: &mut ScanContext<'_>,
        cursor: &InstructionCursor,
    ) -> Result<HandleOutcome>;

    /// Whether this handler still runs for an instruction that an earlier handler
    /// rewrote. Finders chain so they validate the rewritten instruction; rewriters do
    /// not.
    fn chains_after_rewrite(&self) -> bool {
        true
    }
}

/// A member reference operand, looking through generic method instantiations.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberOperand {
    /// The referenced member; for a `MethodSpec` operand its generic method
    pub member: MemberRef,
    /// The instantiation, if the operand is a `MethodSpec`
    pub spec: Option<MethodSpec>,
}

impl MemberOperand {
    /// Method signature, if the member is a method.
    #[must_use]
    pub fn method_signature(&self) -> Option<&SignatureMethod> {
        self.member.signature.as_method()
    }

    /// Field type, if the member is a field.
    #[must_use]
    pub fn field_type(&self) -> Option<&TypeSignature> {
        self.member.signature.as_field()
    }
}

/// Appends references to the module under scan.
pub struct ReferenceImporter<'m> {
    module: &'m mut Module,
}

impl ReferenceImporter<'_> {
    /// The module being extended.
    #[must_use]
    pub fn module(&self) -> &Module {
        &*self.module
    }

    /// Reference the type `full_name` of `assembly`.
    pub fn type_named(&mut self, assembly: &AssemblyIdentity, full_name: &str) -> Token {
        self.module.import_type_named(assembly, full_name)
    }

    /// Reuse or append a member reference.
    pub fn member_ref(&mut self, member: MemberRef) -> Token {
        self.module.import_member_ref(member)
    }

    /// Reuse or append a generic method instantiation.
    pub fn method_spec(&mut self, spec: MethodSpec) -> Token {
        self.module.import_method_spec(spec)
    }

    /// Reuse or append a user string.
    pub fn user_string(&mut self, value: &str) -> Token {
        self.module.import_user_string(value)
    }

    /// Translate a host signature into the module's token space.
    ///
    /// # Errors
    /// See [`Module::import_foreign_type`].
    pub fn foreign_type(
        &mut self,
        source: &Module,
        signature: &TypeSignature,
    ) -> Result<TypeSignature> {
        self.module.import_foreign_type(source, signature)
    }

    /// Intern `member` and, for a generic method operand, a matching instantiation.
    /// Returns the token an instruction should carry.
    pub fn member_operand(&mut self, member: MemberRef, spec: Option<&MethodSpec>) -> Token {
        let token = self.member_ref(member);
        match spec {
            Some(spec) => self.method_spec(MethodSpec {
                method: token,
                instantiation: spec.instantiation.clone(),
            }),
            None => token,
        }
    }
}

/// Everything a handler may look at while scanning one module.
pub struct ScanContext<'a> {
    module: &'a mut Module,
    hosts: &'a HostAssemblies,
    platform: &'a PlatformAssemblyMap,
    oracle: &'a TypeOracle,
    platform_changed: bool,
}

impl<'a> ScanContext<'a> {
    /// Context for scanning `module`.
    pub fn new(
        module: &'a mut Module,
        hosts: &'a HostAssemblies,
        platform: &'a PlatformAssemblyMap,
        oracle: &'a TypeOracle,
        platform_changed: bool,
    ) -> Self {
        ScanContext {
            module,
            hosts,
            platform,
            oracle,
            platform_changed,
        }
    }

    /// The module under scan.
    #[must_use]
    pub fn module(&self) -> &Module {
        &*self.module
    }

    pub(crate) fn module_mut(&mut self) -> &mut Module {
        &mut *self.module
    }

    /// The host assemblies.
    #[must_use]
    pub fn hosts(&self) -> &'a HostAssemblies {
        self.hosts
    }

    /// The platform assembly map.
    #[must_use]
    pub fn platform(&self) -> &'a PlatformAssemblyMap {
        self.platform
    }

    /// The type oracle.
    #[must_use]
    pub fn oracle(&self) -> &'a TypeOracle {
        self.oracle
    }

    /// Whether the module was compiled for another platform.
    #[must_use]
    pub fn platform_changed(&self) -> bool {
        self.platform_changed
    }

    /// Importer for new references.
    pub fn importer(&mut self) -> ReferenceImporter<'_> {
        ReferenceImporter {
            module: &mut *self.module,
        }
    }

    /// The member an instruction operand references, if it is a `MemberRef` or an
    /// instantiation of one. Members defined by the module itself are not returned.
    #[must_use]
    pub fn member_operand(&self, instruction: &Instruction) -> Option<MemberOperand> {
        let token = instruction.token()?;
        match token.table_id()? {
            TableId::MemberRef => Some(MemberOperand {
                member: self.module.member_ref(token)?.clone(),
                spec: None,
            }),
            TableId::MethodSpec => {
                let spec = self.module.method_spec(token)?;
                Some(MemberOperand {
                    member: self.module.member_ref(spec.method)?.clone(),
                    spec: Some(spec.clone()),
                })
            }
            _ => None,
        }
    }

    /// Full name of the definition the declaring type of `member` names.
    #[must_use]
    pub fn declaring_definition(&self, member: &MemberRef) -> Option<String> {
        self.module.definition_name(&member.parent)
    }

    /// Canonical name of a signature of the module under scan.
    #[must_use]
    pub fn type_name(&self, signature: &TypeSignature) -> String {
        self.module.type_name(signature)
    }

    /// Canonical names of a method's parameter types.
    #[must_use]
    pub fn param_type_names(&self, signature: &SignatureMethod) -> Vec<String> {
        signature
            .params
            .iter()
            .map(|param| self.module.type_name(param))
            .collect()
    }

    /// Scopes resolution tries for the type named by `signature`, after platform
    /// redirection. Empty for signatures without a named type.
    #[must_use]
    pub fn candidate_scopes(&self, signature: &TypeSignature) -> Vec<String> {
        let (Some(scope), Some(name)) = (
            self.module.type_scope(signature),
            self.module.definition_name(signature),
        ) else {
            return Vec::new();
        };
        self.platform
            .candidate_scopes(scope, &name)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Resolve the type named by `signature` in the host assemblies.
    #[must_use]
    pub fn resolve_type(&self, signature: &TypeSignature) -> Option<ResolvedType<'a>> {
        let hosts: &'a HostAssemblies = self.hosts;
        let name = self.module.definition_name(signature)?;
        let scopes = self.candidate_scopes(signature);
        let resolved = hosts.resolve_type(&scopes, &name);
        if resolved.is_none() {
            log::trace!("{} does not resolve in {:?}", name, scopes);
        }
        resolved
    }

    /// Whether references to the type named by `signature` are validated, i.e. any of its
    /// candidate scopes is a validated host assembly.
    #[must_use]
    pub fn is_validated(&self, signature: &TypeSignature) -> bool {
        self.candidate_scopes(signature)
            .iter()
            .any(|scope| self.hosts.is_validated(scope))
    }
}

/// `signature` with the named type replaced by `token`, keeping any generic
/// instantiation.
pub(crate) fn with_named_token(signature: &TypeSignature, token: Token) -> TypeSignature {
    match signature {
        TypeSignature::Class(_) => TypeSignature::Class(token),
        TypeSignature::ValueType(_) => TypeSignature::ValueType(token),
        TypeSignature::GenericInst(base, args) => {
            TypeSignature::GenericInst(Box::new(with_named_token(base, token)), args.clone())
        }
        other => other.clone(),
    }
}

/// Whether an instruction's declaring type is an array pseudo type, whose `Get`, `Set`
/// and `Address` methods are provided by the runtime and never resolve.
pub(crate) fn is_array_pseudo_type(ctx: &ScanContext<'_>, member: &MemberRef) -> bool {
    member.parent.is_array() || ctx.type_name(&member.parent).contains('[')
}
