//! Metadata tokens addressing rows of module tables.
//!
//! A [`Token`] is a 32-bit value with the table identifier in the high byte and a 1-based
//! row index in the low 24 bits, following the ECMA-335 token layout. Instruction operands
//! that reference fields, methods, types or strings carry tokens.
//!
//! # Examples
//!
//! ```rust
//! use modcompat::metadata::token::{Token, TableId};
//!
//! let token = Token::from_parts(TableId::MemberRef, 3);
//! assert_eq!(token.table(), TableId::MemberRef as u8);
//! assert_eq!(token.row(), 3);
//! assert_eq!(token.to_string(), "0x0a000003");
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use strum::{Display, EnumIter};

/// Tables that tokens of this module format may address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[repr(u8)]
pub enum TableId {
    /// References to types defined in this or another module
    TypeRef = 0x01,
    /// Types defined in this module
    TypeDef = 0x02,
    /// Fields defined in this module
    Field = 0x04,
    /// Methods defined in this module
    MethodDef = 0x06,
    /// References to fields or methods of other types
    MemberRef = 0x0A,
    /// Stand-alone method signatures (used by `calli`)
    StandAloneSig = 0x11,
    /// Type specifications (arrays, generic instances, ...)
    TypeSpec = 0x1B,
    /// Assemblies referenced by this module
    AssemblyRef = 0x23,
    /// Generic method instantiations
    MethodSpec = 0x2B,
    /// Entries of the user string heap (`ldstr`)
    UserString = 0x70,
}

impl TableId {
    /// Map the high byte of a token back to its table.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<TableId> {
        match value {
            0x01 => Some(TableId::TypeRef),
            0x02 => Some(TableId::TypeDef),
            0x04 => Some(TableId::Field),
            0x06 => Some(TableId::MethodDef),
            0x0A => Some(TableId::MemberRef),
            0x11 => Some(TableId::StandAloneSig),
            0x1B => Some(TableId::TypeSpec),
            0x23 => Some(TableId::AssemblyRef),
            0x2B => Some(TableId::MethodSpec),
            0x70 => Some(TableId::UserString),
            _ => None,
        }
    }
}

/// A metadata token: table id in the high byte, 1-based row in the low 24 bits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Token(pub u32);

impl Token {
    /// Create a token from its raw value.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Create a token from a table and a 1-based row.
    #[must_use]
    pub fn from_parts(table: TableId, row: u32) -> Self {
        Token((u32::from(table as u8) << 24) | (row & 0x00FF_FFFF))
    }

    /// The raw value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The table id (high byte).
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The table as [`TableId`], if it is one this format knows.
    #[must_use]
    pub fn table_id(&self) -> Option<TableId> {
        TableId::from_u8(self.table())
    }

    /// Returns `true` if the token points into `table`.
    #[must_use]
    pub fn is_table(&self, table: TableId) -> bool {
        self.table() == table as u8
    }

    /// The 1-based row index (low 24 bits).
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// The 0-based index into the owning table, if the row is not null.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        (self.row() as usize).checked_sub(1)
    }

    /// A token whose value is 0.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}
