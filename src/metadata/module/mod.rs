//! In-memory model of a compiled mod module.
//!
//! A [`Module`] owns its tables and every method body decoded into instructions. It is
//! read-only for everything except the handler chain's rewriters, which may only
//!
//! - append `AssemblyRef`, `TypeRef`, `MemberRef`, `MethodSpec` and user string rows
//!   (`import_*`, existing rows are reused), and
//! - swap a single instruction for one of the same encoded size
//!   ([`Module::replace_instruction`]).
//!
//! Method and type counts, and the positions of all existing instructions, are therefore
//! stable across a scan.
//!
//! # Examples
//!
//! ```rust
//! use modcompat::metadata::module::{Module, ModuleBuilder};
//! use modcompat::metadata::identity::{AssemblyIdentity, AssemblyVersion};
//!
//! let identity = AssemblyIdentity::new("EmptyMod", AssemblyVersion::new(1, 0, 0, 0));
//! let module = ModuleBuilder::new(identity).build();
//! let bytes = module.to_bytes()?;
//! let loaded = Module::from_mem(bytes)?;
//! assert_eq!(loaded.identity().name, "EmptyMod");
//! assert_eq!(loaded.types().len(), 0);
//! # Ok::<(), modcompat::Error>(())
//! ```

mod builder;
mod reader;
mod types;
mod writer;

pub use builder::{MethodBuilder, ModuleBuilder, TypeBuilder};
pub use types::*;

use std::path::Path;

use uguid::Guid;

use crate::{
    assembly::Instruction,
    file::File,
    metadata::{
        identity::AssemblyIdentity,
        signatures::{SignatureMethod, TypeSignature},
        token::{TableId, Token},
    },
    Error, Result,
};

/// File magic, `MODL` in little-endian byte order.
pub const MODULE_MAGIC: u32 = 0x4C44_4F4D;
/// Supported format version.
pub const MODULE_VERSION: u16 = 1;

/// A parsed module.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub(crate) mvid: Guid,
    pub(crate) name: String,
    pub(crate) identity: AssemblyIdentity,
    pub(crate) assembly_refs: Vec<AssemblyIdentity>,
    pub(crate) type_refs: Vec<TypeRef>,
    pub(crate) type_specs: Vec<TypeSignature>,
    pub(crate) member_refs: Vec<MemberRef>,
    pub(crate) method_specs: Vec<MethodSpec>,
    pub(crate) standalone_sigs: Vec<SignatureMethod>,
    pub(crate) user_strings: Vec<String>,
    pub(crate) types: Vec<TypeDef>,
    /// `(type index, method index)` per `MethodDef` row
    pub(crate) method_rows: Vec<(usize, usize)>,
    /// `(type index, field index)` per `Field` row
    pub(crate) field_rows: Vec<(usize, usize)>,
}

impl Module {
    /// Parse a module from an owned buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`], [`crate::Error::NotSupported`],
    /// [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] if the buffer is not a
    /// well-formed module.
    pub fn from_mem(data: Vec<u8>) -> Result<Module> {
        let file = File::from_mem(data)?;
        reader::read_module(file.data())
    }

    /// Parse a module from disk. The file is memory-mapped for the duration of parsing.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be read, otherwise as
    /// [`Module::from_mem`].
    pub fn from_file(path: &Path) -> Result<Module> {
        let file = File::from_file(path)?;
        reader::read_module(file.data())
    }

    /// Serialise the module.
    ///
    /// # Errors
    /// Returns an error if a signature or instruction cannot be encoded.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        writer::write_module(self)
    }

    pub(crate) fn reindex(&mut self) {
        self.method_rows.clear();
        self.field_rows.clear();
        for (type_index, type_def) in self.types.iter().enumerate() {
            for method_index in 0..type_def.methods.len() {
                self.method_rows.push((type_index, method_index));
            }
            for field_index in 0..type_def.fields.len() {
                self.field_rows.push((type_index, field_index));
            }
        }
    }

    /// Module version id.
    #[must_use]
    pub fn mvid(&self) -> &Guid {
        &self.mvid
    }

    /// Module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of the assembly this module belongs to.
    #[must_use]
    pub fn identity(&self) -> &AssemblyIdentity {
        &self.identity
    }

    /// Types defined in this module.
    #[must_use]
    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }

    /// Assemblies referenced by this module.
    #[must_use]
    pub fn assembly_refs(&self) -> &[AssemblyIdentity] {
        &self.assembly_refs
    }

    /// Type references.
    #[must_use]
    pub fn type_refs(&self) -> &[TypeRef] {
        &self.type_refs
    }

    /// Member references.
    #[must_use]
    pub fn member_refs(&self) -> &[MemberRef] {
        &self.member_refs
    }

    /// Type definition by full name.
    #[must_use]
    pub fn find_type(&self, full_name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|type_def| type_def.full_name() == full_name)
    }

    fn row<T>(table: &[T], token: Token, id: TableId) -> Option<&T> {
        if !token.is_table(id) {
            return None;
        }
        table.get(token.index()?)
    }

    /// Type definition by token.
    #[must_use]
    pub fn type_def(&self, token: Token) -> Option<&TypeDef> {
        Self::row(&self.types, token, TableId::TypeDef)
    }

    /// Type reference by token.
    #[must_use]
    pub fn type_ref(&self, token: Token) -> Option<&TypeRef> {
        Self::row(&self.type_refs, token, TableId::TypeRef)
    }

    /// Type specification by token.
    #[must_use]
    pub fn type_spec(&self, token: Token) -> Option<&TypeSignature> {
        Self::row(&self.type_specs, token, TableId::TypeSpec)
    }

    /// Member reference by token.
    #[must_use]
    pub fn member_ref(&self, token: Token) -> Option<&MemberRef> {
        Self::row(&self.member_refs, token, TableId::MemberRef)
    }

    /// Method specification by token.
    #[must_use]
    pub fn method_spec(&self, token: Token) -> Option<&MethodSpec> {
        Self::row(&self.method_specs, token, TableId::MethodSpec)
    }

    /// Stand-alone signature by token.
    #[must_use]
    pub fn standalone_sig(&self, token: Token) -> Option<&SignatureMethod> {
        Self::row(&self.standalone_sigs, token, TableId::StandAloneSig)
    }

    /// Assembly reference by token.
    #[must_use]
    pub fn assembly_ref(&self, token: Token) -> Option<&AssemblyIdentity> {
        Self::row(&self.assembly_refs, token, TableId::AssemblyRef)
    }

    /// User string by token.
    #[must_use]
    pub fn user_string(&self, token: Token) -> Option<&str> {
        Self::row(&self.user_strings, token, TableId::UserString).map(String::as_str)
    }

    /// Method definition by token, together with its declaring type.
    #[must_use]
    pub fn method(&self, token: Token) -> Option<(&TypeDef, &MethodDef)> {
        let &(type_index, method_index) = Self::row(&self.method_rows, token, TableId::MethodDef)?;
        let type_def = self.types.get(type_index)?;
        Some((type_def, type_def.methods.get(method_index)?))
    }

    /// Field definition by token, together with its declaring type.
    #[must_use]
    pub fn field(&self, token: Token) -> Option<(&TypeDef, &FieldDef)> {
        let &(type_index, field_index) = Self::row(&self.field_rows, token, TableId::Field)?;
        let type_def = self.types.get(type_index)?;
        Some((type_def, type_def.fields.get(field_index)?))
    }

    /// Tokens of all method definitions, in declaration order.
    pub fn method_tokens(&self) -> impl Iterator<Item = Token> + '_ {
        (1..=self.method_rows.len() as u32).map(|row| Token::from_parts(TableId::MethodDef, row))
    }

    /// `MethodDef` token of the `method_index`th method of the `type_index`th type.
    #[must_use]
    pub fn method_token(&self, type_index: usize, method_index: usize) -> Option<Token> {
        self.method_rows
            .iter()
            .position(|&row| row == (type_index, method_index))
            .map(|position| Token::from_parts(TableId::MethodDef, position as u32 + 1))
    }

    /// Number of method definitions.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.method_rows.len()
    }

    /// Total number of instructions over all method bodies.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.types
            .iter()
            .flat_map(|type_def| &type_def.methods)
            .map(|method| method.body.len())
            .sum()
    }

    /// Simple name of the assembly that defines the type named by `signature`.
    ///
    /// Primitive types, arrays of them and generic parameters have no scope of their own
    /// and yield `None`.
    #[must_use]
    pub fn type_scope(&self, signature: &TypeSignature) -> Option<&str> {
        let token = signature.named_token()?;
        match token.table_id()? {
            TableId::TypeDef => Some(self.identity.name.as_str()),
            TableId::TypeRef => match self.type_ref(token)?.scope {
                ResolutionScope::CurrentModule => Some(self.identity.name.as_str()),
                ResolutionScope::AssemblyRef(assembly) => {
                    self.assembly_ref(assembly).map(|identity| identity.name.as_str())
                }
            },
            TableId::TypeSpec => self.type_scope(self.type_spec(token)?),
            _ => None,
        }
    }

    /// Canonical full name of a type signature.
    ///
    /// Names follow the usual runtime notation:
    /// ``System.Collections.Generic.List`1<System.String>``, `System.Int32[]`,
    /// `System.Int32[,]`, `!0` and `!!0` for generic parameters, `T&` and `T*` for
    /// references and pointers. Custom modifiers are not shown.
    #[must_use]
    pub fn type_name(&self, signature: &TypeSignature) -> String {
        let mut name = String::new();
        self.write_type_name(signature, &mut name, 0);
        name
    }

    /// Full name of the type a `TypeDef`, `TypeRef` or `TypeSpec` token points to.
    #[must_use]
    pub fn token_type_name(&self, token: Token) -> Option<String> {
        match token.table_id()? {
            TableId::TypeDef => self.type_def(token).map(TypeDef::full_name),
            TableId::TypeRef => self.type_ref(token).map(TypeRef::full_name),
            TableId::TypeSpec => self.type_spec(token).map(|spec| self.type_name(spec)),
            _ => None,
        }
    }

    fn write_type_name(&self, signature: &TypeSignature, out: &mut String, depth: usize) {
        // TypeSpecs may reference each other; cut cycles in malformed input
        if depth > 32 {
            out.push('?');
            return;
        }

        let primitive = match signature {
            TypeSignature::Unknown => "?",
            TypeSignature::Void => "System.Void",
            TypeSignature::Boolean => "System.Boolean",
            TypeSignature::Char => "System.Char",
            TypeSignature::I1 => "System.SByte",
            TypeSignature::U1 => "System.Byte",
            TypeSignature::I2 => "System.Int16",
            TypeSignature::U2 => "System.UInt16",
            TypeSignature::I4 => "System.Int32",
            TypeSignature::U4 => "System.UInt32",
            TypeSignature::I8 => "System.Int64",
            TypeSignature::U8 => "System.UInt64",
            TypeSignature::R4 => "System.Single",
            TypeSignature::R8 => "System.Double",
            TypeSignature::String => "System.String",
            TypeSignature::TypedByRef => "System.TypedReference",
            TypeSignature::I => "System.IntPtr",
            TypeSignature::U => "System.UIntPtr",
            TypeSignature::Object => "System.Object",
            TypeSignature::Class(token) | TypeSignature::ValueType(token) => {
                match token.table_id() {
                    Some(TableId::TypeSpec) => match self.type_spec(*token) {
                        Some(spec) => self.write_type_name(spec, out, depth + 1),
                        None => out.push('?'),
                    },
                    _ => match self.token_type_name(*token) {
                        Some(name) => out.push_str(&name),
                        None => out.push('?'),
                    },
                }
                return;
            }
            TypeSignature::GenericParamType(index) => {
                out.push('!');
                out.push_str(&index.to_string());
                return;
            }
            TypeSignature::GenericParamMethod(index) => {
                out.push_str("!!");
                out.push_str(&index.to_string());
                return;
            }
            TypeSignature::Ptr(base) => {
                self.write_type_name(base, out, depth + 1);
                out.push('*');
                return;
            }
            TypeSignature::ByRef(base) => {
                self.write_type_name(base, out, depth + 1);
                out.push('&');
                return;
            }
            TypeSignature::SzArray(base) => {
                self.write_type_name(base, out, depth + 1);
                out.push_str("[]");
                return;
            }
            TypeSignature::Array(array) => {
                self.write_type_name(&array.base, out, depth + 1);
                out.push('[');
                for _ in 1..array.rank {
                    out.push(',');
                }
                out.push(']');
                return;
            }
            TypeSignature::GenericInst(base, args) => {
                self.write_type_name(base, out, depth + 1);
                out.push('<');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.write_type_name(arg, out, depth + 1);
                }
                out.push('>');
                return;
            }
            TypeSignature::FnPtr(method) => {
                out.push_str("method ");
                self.write_type_name(&method.return_type, out, depth + 1);
                out.push_str(" *(");
                for (i, param) in method.params.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.write_type_name(param, out, depth + 1);
                }
                out.push(')');
                return;
            }
            TypeSignature::Modified(modifier) => {
                self.write_type_name(&modifier.base, out, depth + 1);
                return;
            }
            TypeSignature::Pinned(base) => {
                self.write_type_name(base, out, depth + 1);
                return;
            }
        };

        out.push_str(primitive);
    }

    /// Full name of a member reference's declaring type.
    #[must_use]
    pub fn declaring_type_name(&self, member: &MemberRef) -> String {
        self.type_name(&member.parent)
    }

    /// Reuse or append an assembly reference with the same simple name.
    pub fn import_assembly_ref(&mut self, identity: &AssemblyIdentity) -> Token {
        let row = match self
            .assembly_refs
            .iter()
            .position(|existing| existing.name == identity.name)
        {
            Some(index) => index + 1,
            None => {
                self.assembly_refs.push(identity.clone());
                self.assembly_refs.len()
            }
        };
        Token::from_parts(TableId::AssemblyRef, row as u32)
    }

    /// Reuse or append a type reference.
    pub fn import_type_ref(&mut self, type_ref: TypeRef) -> Token {
        Token::from_parts(TableId::TypeRef, intern(&mut self.type_refs, type_ref))
    }

    /// Reuse or append a member reference.
    pub fn import_member_ref(&mut self, member: MemberRef) -> Token {
        Token::from_parts(TableId::MemberRef, intern(&mut self.member_refs, member))
    }

    /// Reuse or append a generic method instantiation.
    pub fn import_method_spec(&mut self, spec: MethodSpec) -> Token {
        Token::from_parts(TableId::MethodSpec, intern(&mut self.method_specs, spec))
    }

    /// Reuse or append a user string.
    pub fn import_user_string(&mut self, value: &str) -> Token {
        let row = match self.user_strings.iter().position(|existing| existing == value) {
            Some(index) => index + 1,
            None => {
                self.user_strings.push(value.to_string());
                self.user_strings.len()
            }
        };
        Token::from_parts(TableId::UserString, row as u32)
    }

    /// Full name of the type definition a signature names, without generic arguments
    /// (``List`1`` for ``List`1<System.String>``).
    #[must_use]
    pub fn definition_name(&self, signature: &TypeSignature) -> Option<String> {
        let mut name = self.token_type_name(signature.named_token()?)?;
        if let Some(open) = name.find('<') {
            name.truncate(open);
        }
        Some(name)
    }

    /// Token referring to the type `full_name` of the assembly `assembly`: the `TypeDef`
    /// if this module is that assembly and defines it, otherwise a reused or appended
    /// `TypeRef`.
    pub fn import_type_named(&mut self, assembly: &AssemblyIdentity, full_name: &str) -> Token {
        let (namespace, name) = split_name(full_name);
        let scope = if assembly.name == self.identity.name {
            if let Some(index) = self
                .types
                .iter()
                .position(|type_def| type_def.full_name() == full_name)
            {
                return Token::from_parts(TableId::TypeDef, index as u32 + 1);
            }
            ResolutionScope::CurrentModule
        } else {
            ResolutionScope::AssemblyRef(self.import_assembly_ref(assembly))
        };

        self.import_type_ref(TypeRef {
            scope,
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    /// Translate a signature of `source` into this module's token space, importing type
    /// references as needed.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidToken`] if the signature references a row `source`
    /// does not have.
    pub fn import_foreign_type(
        &mut self,
        source: &Module,
        signature: &TypeSignature,
    ) -> Result<TypeSignature> {
        self.import_foreign_type_inner(source, signature, 0)
    }

    fn import_foreign_type_inner(
        &mut self,
        source: &Module,
        signature: &TypeSignature,
        depth: usize,
    ) -> Result<TypeSignature> {
        if depth > 32 {
            return Err(malformed_error!("Signature nesting too deep"));
        }
        let import = |module: &mut Module, inner: &TypeSignature| {
            module
                .import_foreign_type_inner(source, inner, depth + 1)
                .map(Box::new)
        };

        Ok(match signature {
            TypeSignature::Class(token) | TypeSignature::ValueType(token)
                if token.is_table(TableId::TypeSpec) =>
            {
                let spec = source.type_spec(*token).ok_or(Error::InvalidToken(*token))?;
                return self.import_foreign_type_inner(source, spec, depth + 1);
            }
            TypeSignature::Class(token) => {
                TypeSignature::Class(self.import_foreign_token(source, *token)?)
            }
            TypeSignature::ValueType(token) => {
                TypeSignature::ValueType(self.import_foreign_token(source, *token)?)
            }
            TypeSignature::Ptr(base) => TypeSignature::Ptr(import(self, base)?),
            TypeSignature::ByRef(base) => TypeSignature::ByRef(import(self, base)?),
            TypeSignature::SzArray(base) => TypeSignature::SzArray(import(self, base)?),
            TypeSignature::Pinned(base) => TypeSignature::Pinned(import(self, base)?),
            TypeSignature::Array(array) => {
                let mut array = array.clone();
                array.base = import(self, &array.base)?;
                TypeSignature::Array(array)
            }
            TypeSignature::GenericInst(base, args) => {
                let base = import(self, base)?;
                let args = args
                    .iter()
                    .map(|arg| self.import_foreign_type_inner(source, arg, depth + 1))
                    .collect::<Result<Vec<_>>>()?;
                TypeSignature::GenericInst(base, args)
            }
            TypeSignature::FnPtr(method) => {
                let mut method = (**method).clone();
                method.return_type =
                    self.import_foreign_type_inner(source, &method.return_type, depth + 1)?;
                method.params = method
                    .params
                    .iter()
                    .map(|param| self.import_foreign_type_inner(source, param, depth + 1))
                    .collect::<Result<Vec<_>>>()?;
                TypeSignature::FnPtr(Box::new(method))
            }
            TypeSignature::Modified(modifier) => {
                let mut modifier = modifier.clone();
                modifier.modifier = self.import_foreign_token(source, modifier.modifier)?;
                modifier.base = import(self, &modifier.base)?;
                TypeSignature::Modified(modifier)
            }
            other => other.clone(),
        })
    }

    fn import_foreign_token(&mut self, source: &Module, token: Token) -> Result<Token> {
        let (assembly, full_name) = match token.table_id() {
            Some(TableId::TypeDef) => {
                let type_def = source.type_def(token).ok_or(Error::InvalidToken(token))?;
                (source.identity.clone(), type_def.full_name())
            }
            Some(TableId::TypeRef) => {
                let type_ref = source.type_ref(token).ok_or(Error::InvalidToken(token))?;
                let assembly = match type_ref.scope {
                    ResolutionScope::CurrentModule => source.identity.clone(),
                    ResolutionScope::AssemblyRef(assembly) => source
                        .assembly_ref(assembly)
                        .ok_or(Error::InvalidToken(assembly))?
                        .clone(),
                };
                (assembly, type_ref.full_name())
            }
            _ => return Err(Error::InvalidToken(token)),
        };
        Ok(self.import_type_named(&assembly, &full_name))
    }

    /// Replace the instruction at `index` of `method` and return the original.
    ///
    /// The replacement takes over the original offset. Its encoded size must equal the
    /// original's, so all branch offsets of the body stay valid.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidToken`] for an unknown method,
    /// [`crate::Error::OutOfBounds`] for an invalid index and
    /// [`crate::Error::RewriteRejected`] if the encoded sizes differ.
    pub fn replace_instruction(
        &mut self,
        method: Token,
        index: usize,
        mut replacement: Instruction,
    ) -> Result<Instruction> {
        let &(type_index, method_index) = Self::row(&self.method_rows, method, TableId::MethodDef)
            .ok_or(Error::InvalidToken(method))?;
        let body = &mut self.types[type_index].methods[method_index].body;
        let original = body.get_mut(index).ok_or_else(|| out_of_bounds_error!())?;

        if original.size != replacement.size {
            return Err(Error::RewriteRejected(format!(
                "'{}' ({} bytes) cannot replace '{}' ({} bytes) at IL_{:04x}",
                replacement.mnemonic,
                replacement.size,
                original.mnemonic,
                original.size,
                original.offset
            )));
        }

        replacement.offset = original.offset;
        Ok(std::mem::replace(original, replacement))
    }
}

/// Returns the 1-based row of `value` in `table`, appending it if not present.
fn intern<T: PartialEq>(table: &mut Vec<T>, value: T) -> u32 {
    match table.iter().position(|existing| *existing == value) {
        Some(index) => index as u32 + 1,
        None => {
            table.push(value);
            table.len() as u32
        }
    }
}
