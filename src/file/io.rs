//! Little-endian primitive I/O and ECMA-335 compressed integer encoding.
//!
//! The [`CilIO`] trait abstracts over the fixed-width integers that appear in CIL
//! operands and module containers, so [`read_le_at`] and [`write_le`] can be written once.
//! [`write_compressed_uint`] is the inverse of
//! [`crate::file::parser::Parser::read_compressed_uint`].

use crate::Result;

/// Fixed-width integer that can be converted from and to little-endian bytes.
pub trait CilIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cil_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_cil_io! {
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
    f32 => 4,
    f64 => 8,
}

/// Reads a value of type `T` at `offset` in little-endian order and advances `offset`.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(out_of_bounds_error!());
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Appends `value` to `out` in little-endian order.
pub fn write_le<T: CilIO>(out: &mut Vec<u8>, value: T) {
    out.extend_from_slice(value.to_le_bytes().as_ref());
}

/// Appends `value` using the ECMA-335 II.23.2 compressed unsigned integer encoding.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] for values above `0x1FFF_FFFF`, which the
/// encoding cannot represent.
#[allow(clippy::cast_possible_truncation)]
pub fn write_compressed_uint(out: &mut Vec<u8>, value: u32) -> Result<()> {
    match value {
        0..=0x7F => out.push(value as u8),
        0x80..=0x3FFF => {
            out.push(((value >> 8) as u8) | 0x80);
            out.push(value as u8);
        }
        0x4000..=0x1FFF_FFFF => {
            out.push(((value >> 24) as u8) | 0xC0);
            out.push((value >> 16) as u8);
            out.push((value >> 8) as u8);
            out.push(value as u8);
        }
        _ => {
            return Err(malformed_error!(
                "Value {:#x} too large for compressed encoding",
                value
            ))
        }
    }

    Ok(())
}

/// Appends a compressed-length-prefixed UTF-8 string.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if the string is longer than the compressed
/// encoding allows.
pub fn write_prefixed_string_utf8(out: &mut Vec<u8>, value: &str) -> Result<()> {
    let Ok(len) = u32::try_from(value.len()) else {
        return Err(malformed_error!("String of {} bytes is too long", value.len()));
    };
    write_compressed_uint(out, len)?;
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::parser::Parser;

    #[test]
    fn read_le_advances_offset() {
        let data = [0x01, 0x00, 0x02, 0x00, 0x00, 0x00];
        let mut offset = 0;

        assert_eq!(read_le_at::<u16>(&data, &mut offset).unwrap(), 1);
        assert_eq!(offset, 2);
        assert_eq!(read_le_at::<u32>(&data, &mut offset).unwrap(), 2);
        assert_eq!(offset, 6);
        assert!(read_le_at::<u8>(&data, &mut offset).is_err());
    }

    #[test]
    fn compressed_uint_boundaries() {
        for (value, expected) in [
            (0x03_u32, vec![0x03]),
            (0x7F, vec![0x7F]),
            (0x80, vec![0x80, 0x80]),
            (0x2E57, vec![0xAE, 0x57]),
            (0x3FFF, vec![0xBF, 0xFF]),
            (0x4000, vec![0xC0, 0x00, 0x40, 0x00]),
            (0x1FFF_FFFF, vec![0xDF, 0xFF, 0xFF, 0xFF]),
        ] {
            let mut out = Vec::new();
            write_compressed_uint(&mut out, value).unwrap();
            assert_eq!(out, expected, "encoding {value:#x}");

            let mut parser = Parser::new(&out);
            assert_eq!(parser.read_compressed_uint().unwrap(), value);
        }
    }

    #[test]
    fn compressed_uint_rejects_oversized() {
        let mut out = Vec::new();
        assert!(write_compressed_uint(&mut out, 0x2000_0000).is_err());
        assert!(out.is_empty());
    }
}
