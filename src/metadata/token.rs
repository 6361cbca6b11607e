//! Metadata tokens as they appear in CIL operands.
//!
//! Only the two reference tables are resolved by this crate ([`TableId::TypeRef`] and
//! [`TableId::MemberRef`]); tokens into definition tables of the module itself are kept
//! as opaque values because they can never point at drifted host API.

use std::fmt;

use strum::{Display, EnumIter, FromRepr};

/// Metadata tables a CIL token operand can point into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, FromRepr)]
#[repr(u8)]
pub enum TableId {
    /// External type reference
    TypeRef = 0x01,
    /// Type defined by the module itself
    TypeDef = 0x02,
    /// Field defined by the module itself
    Field = 0x04,
    /// Method defined by the module itself
    MethodDef = 0x06,
    /// External field or method reference
    MemberRef = 0x0A,
    /// Stand-alone signature (`calli`)
    StandAloneSig = 0x11,
    /// Constructed type (generic instantiation, array, pointer)
    TypeSpec = 0x1B,
    /// Generic method instantiation
    MethodSpec = 0x2B,
    /// User string heap offset (`ldstr`)
    UserString = 0x70,
}

/// A metadata token representing a reference to a metadata table entry.
///
/// Tokens in .NET metadata consist of a 32-bit value where:
/// - The high byte (bits 24-31) indicates the table type
/// - The low 24 bits (bits 0-23) indicate the row index within that table
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Creates a new token from a raw 32-bit value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Creates a token from a table and a 1-based row index
    #[must_use]
    pub fn from_parts(table: TableId, row: u32) -> Self {
        Token((u32::from(table as u8) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Extracts the table type from the token (high byte)
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Returns the table as [`TableId`], or `None` for tables CIL operands never use
    #[must_use]
    pub fn table_id(&self) -> Option<TableId> {
        TableId::from_repr(self.table())
    }

    /// Extracts the row index from the token (low 24 bits)
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns true if this is a null token (value 0)
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
