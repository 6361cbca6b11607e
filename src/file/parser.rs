//! Cursor-based byte stream parser for module containers and CIL bytecode.
//!
//! [`Parser`] keeps a position inside a borrowed byte slice and validates every read
//! against the end of the data, so truncated input surfaces as
//! [`crate::Error::OutOfBounds`] instead of a panic.
//!
//! # Example
//!
//! ```rust
//! use dotshim::Parser;
//!
//! let data = [0x01, 0x02, 0x81, 0x00, 0x03, b'a', b'b', b'c'];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_le::<u16>()?, 0x0201);
//! assert_eq!(parser.read_compressed_uint()?, 0x100);
//! assert_eq!(parser.read_prefixed_string_utf8()?, "abc");
//! assert!(!parser.has_more_data());
//! # Ok::<(), dotshim::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, CilIO},
    Result,
};

/// A generic binary data parser.
///
/// The parser maintains an internal position cursor and provides bounds checking
/// to prevent buffer overruns when reading malformed or truncated data.
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new `Parser` from a byte slice
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying data is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if the cursor has not reached the end of the data
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Returns the current cursor position
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Returns the number of unread bytes
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Move the cursor forward by `step` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the new position would pass the end of the data.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        if step > self.remaining() {
            return Err(out_of_bounds_error!());
        }

        self.position += step;
        Ok(())
    }

    /// Returns the byte at the cursor without consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        if self.position >= self.data.len() {
            return Err(out_of_bounds_error!());
        }
        Ok(self.data[self.position])
    }

    /// Read a little-endian value of type `T` and advance the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if not enough bytes remain.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read `count` raw bytes and advance the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if not enough bytes remain.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(out_of_bounds_error!());
        }

        let bytes = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    /// Read a compressed unsigned integer (ECMA-335 II.23.2).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] on truncation, or [`crate::Error::Malformed`]
    /// if the first byte does not start a valid encoding.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        // 1-byte encoding: 0xxxxxxx
        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        // 2-byte encoding: 10xxxxxx xxxxxxxx
        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            let value = ((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte);
            return Ok(value);
        }

        // 4-byte encoding: 11xxxxxx xxxxxxxx xxxxxxxx xxxxxxxx
        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_le::<u8>()?);
            let b2 = u32::from(self.read_le::<u8>()?);
            let b3 = u32::from(self.read_le::<u8>()?);
            let value = ((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3;
            return Ok(value);
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }

    /// Read a UTF-8 string prefixed by its compressed byte length.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] on truncation, or [`crate::Error::Malformed`]
    /// if the bytes are not valid UTF-8.
    pub fn read_prefixed_string_utf8(&mut self) -> Result<String> {
        let length = self.read_compressed_uint()? as usize;
        let start = self.position;
        let bytes = self.read_bytes(length)?;

        String::from_utf8(bytes.to_vec()).map_err(|e| {
            malformed_error!(
                "Invalid UTF-8 string at offset {}-{}: {}",
                start,
                start + length,
                e.utf8_error()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_bytes_bounds() {
        let data = [1, 2, 3];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_bytes(2).unwrap(), &[1, 2]);
        assert_eq!(parser.remaining(), 1);
        assert!(parser.read_bytes(2).is_err());
        assert_eq!(parser.pos(), 2);
    }

    #[test]
    fn invalid_compressed_uint() {
        let data = [0xE0, 0x00, 0x00, 0x00];
        let mut parser = Parser::new(&data);
        assert!(matches!(
            parser.read_compressed_uint(),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn truncated_prefixed_string() {
        let data = [0x05, b'a', b'b'];
        let mut parser = Parser::new(&data);
        assert!(matches!(
            parser.read_prefixed_string_utf8(),
            Err(crate::Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn invalid_utf8_string() {
        let data = [0x02, 0xC3, 0x28];
        let mut parser = Parser::new(&data);
        assert!(matches!(
            parser.read_prefixed_string_utf8(),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn peek_and_advance() {
        let data = [0xFE, 0x06];
        let mut parser = Parser::new(&data);
        assert_eq!(parser.peek_byte().unwrap(), 0xFE);
        parser.advance_by(2).unwrap();
        assert!(parser.peek_byte().is_err());
        assert!(parser.advance_by(1).is_err());
    }
}
