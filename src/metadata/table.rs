//! The reference table of a module: every external type and member its code can name.
//!
//! Rows are 1-based like ECMA-335 metadata rows and are addressed by [`Token`]s from
//! [`TableId::TypeRef`] and [`TableId::MemberRef`]. Existing rows are never reordered or
//! removed, so tokens already present in method bodies stay valid; rewritten references
//! are appended through [`ReferenceTable::intern_member`] / [`ReferenceTable::intern_type`].

use std::collections::HashMap;

use crate::{
    metadata::{
        reference::{MemberRef, SymbolicReference, TypeRef},
        token::{TableId, Token},
    },
    Result,
};

/// Highest row index a token can address.
const MAX_ROW: usize = 0x00FF_FFFF;

/// Interning table of type and member references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTable {
    types: Vec<TypeRef>,
    members: Vec<MemberRef>,
    type_index: HashMap<TypeRef, u32>,
    member_index: HashMap<MemberRef, u32>,
}

impl ReferenceTable {
    /// Creates an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of type reference rows
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Number of member reference rows
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// All type reference rows in row order
    #[must_use]
    pub fn types(&self) -> &[TypeRef] {
        &self.types
    }

    /// All member reference rows in row order
    #[must_use]
    pub fn members(&self) -> &[MemberRef] {
        &self.members
    }

    /// Appends a type row, even if an equal row already exists, and returns its token.
    ///
    /// Used when reading a container, where row numbers must be reproduced exactly.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the table is full.
    pub fn push_type(&mut self, ty: TypeRef) -> Result<Token> {
        let row = Self::next_row(self.types.len())?;
        self.type_index.entry(ty.clone()).or_insert(row);
        self.types.push(ty);
        Ok(Token::from_parts(TableId::TypeRef, row))
    }

    /// Appends a member row, even if an equal row already exists, and returns its token.
    ///
    /// The parent type is interned so every member row has a type row to point at.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if a table is full.
    pub fn push_member(&mut self, member: MemberRef) -> Result<Token> {
        self.intern_type(&member.parent)?;
        let row = Self::next_row(self.members.len())?;
        self.member_index.entry(member.clone()).or_insert(row);
        self.members.push(member);
        Ok(Token::from_parts(TableId::MemberRef, row))
    }

    /// Returns the token of an equal type row, appending one if needed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the table is full.
    pub fn intern_type(&mut self, ty: &TypeRef) -> Result<Token> {
        if let Some(row) = self.type_index.get(ty) {
            return Ok(Token::from_parts(TableId::TypeRef, *row));
        }
        self.push_type(ty.clone())
    }

    /// Returns the token of an equal member row, appending one if needed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if a table is full.
    pub fn intern_member(&mut self, member: &MemberRef) -> Result<Token> {
        if let Some(row) = self.member_index.get(member) {
            return Ok(Token::from_parts(TableId::MemberRef, *row));
        }
        self.push_member(member.clone())
    }

    /// Interns either kind of reference.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if a table is full.
    pub fn intern(&mut self, reference: &SymbolicReference) -> Result<Token> {
        match reference {
            SymbolicReference::Type(ty) => self.intern_type(ty),
            SymbolicReference::Member(member) => self.intern_member(member),
        }
    }

    /// Resolves a `TypeRef` or `MemberRef` token.
    ///
    /// Returns `None` for tokens of other tables and for rows past the end.
    #[must_use]
    pub fn resolve(&self, token: Token) -> Option<SymbolicReference> {
        let index = (token.row() as usize).checked_sub(1)?;
        match token.table_id()? {
            TableId::TypeRef => self.types.get(index).cloned().map(SymbolicReference::Type),
            TableId::MemberRef => self
                .members
                .get(index)
                .cloned()
                .map(SymbolicReference::Member),
            _ => None,
        }
    }

    /// Returns the 1-based row of the first type row equal to `ty`
    #[must_use]
    pub fn type_row(&self, ty: &TypeRef) -> Option<u32> {
        self.type_index.get(ty).copied()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn next_row(len: usize) -> Result<u32> {
        if len >= MAX_ROW {
            return Err(malformed_error!("Reference table exceeds {} rows", MAX_ROW));
        }

        Ok(len as u32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::reference::Signature;

    fn farmer() -> TypeRef {
        TypeRef::new("StardewValley", "StardewValley.Farmer")
    }

    #[test]
    fn intern_reuses_rows() {
        let mut table = ReferenceTable::new();
        let money = MemberRef::field(farmer(), "money", "System.Int32");

        let first = table.intern_member(&money).unwrap();
        let second = table.intern_member(&money).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, Token(0x0A00_0001));
        assert_eq!(table.member_count(), 1);
        // parent type interned alongside
        assert_eq!(table.type_count(), 1);
        assert_eq!(table.type_row(&farmer()), Some(1));
    }

    #[test]
    fn push_keeps_duplicates() {
        let mut table = ReferenceTable::new();
        let a = table.push_type(farmer()).unwrap();
        let b = table.push_type(farmer()).unwrap();

        assert_ne!(a, b);
        assert_eq!(table.type_count(), 2);
        // interning resolves to the first occurrence
        assert_eq!(table.intern_type(&farmer()).unwrap(), a);
    }

    #[test]
    fn resolve_tokens() {
        let mut table = ReferenceTable::new();
        let call = MemberRef::new(
            farmer(),
            "getName",
            Signature::instance_method("System.String", &[]),
        );
        let token = table.intern_member(&call).unwrap();

        assert_eq!(table.resolve(token), Some(SymbolicReference::Member(call)));
        assert_eq!(
            table.resolve(Token(0x0100_0001)),
            Some(SymbolicReference::Type(farmer()))
        );
        assert_eq!(table.resolve(Token(0x0A00_0002)), None);
        assert_eq!(table.resolve(Token(0x0A00_0000)), None);
        assert_eq!(table.resolve(Token(0x0600_0001)), None);
    }
}
