//! Endian-aware primitive reading and writing for the module format.
//!
//! This module provides the [`CilIO`] trait together with the free functions used by
//! [`crate::file::parser::Parser`] for reading and by the module writer for emitting
//! binary data. All reads are bounds-checked and return [`crate::Error::OutOfBounds`]
//! instead of panicking.
//!
//! # Examples
//!
//! ```rust,ignore
//! use modcompat::file::io::{read_le_at, write_compressed_uint};
//!
//! let data = [0x01, 0x00, 0x02, 0x00];
//! let mut offset = 0;
//! let first: u16 = read_le_at(&data, &mut offset)?;
//! assert_eq!(first, 1);
//! assert_eq!(offset, 2);
//!
//! let mut buffer = Vec::new();
//! write_compressed_uint(0x80, &mut buffer);
//! assert_eq!(buffer, vec![0x80, 0x80]);
//! # Ok::<(), modcompat::Error>(())
//! ```

use crate::Result;

/// Trait for implementing type-specific safe binary data reading operations.
///
/// Each implementation defines a `Bytes` associated type that represents the fixed-size
/// byte array required for that particular type (e.g., `[u8; 4]` for `u32`).
pub trait CilIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]> + AsRef<[u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
    /// Write T to a byte buffer in big-endian
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cil_io {
    ($($ty:ty => $len:literal),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_cil_io!(
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
);

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`, advancing it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    if type_len + *offset > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = data[*offset..*offset + type_len].try_into() else {
        return Err(out_of_bounds_error!());
    };

    *offset += type_len;

    Ok(T::from_le_bytes(read))
}

/// Safely reads a value of type `T` in big-endian byte order at `offset`, advancing it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    if type_len + *offset > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = data[*offset..*offset + type_len].try_into() else {
        return Err(out_of_bounds_error!());
    };

    *offset += type_len;

    Ok(T::from_be_bytes(read))
}

/// Appends `value` in little-endian byte order.
pub fn write_le<T: CilIO>(buffer: &mut Vec<u8>, value: T) {
    buffer.extend_from_slice(value.to_le_bytes().as_ref());
}

/// Appends an ECMA-335 compressed unsigned integer (II.23.2).
///
/// Values up to `0x7F` take one byte, up to `0x3FFF` two bytes and up to `0x1FFF_FFFF`
/// four bytes. Larger values are not representable and are clamped to the maximum.
#[allow(clippy::cast_possible_truncation)]
pub fn write_compressed_uint(value: u32, buffer: &mut Vec<u8>) {
    if value <= 0x7F {
        buffer.push(value as u8);
    } else if value <= 0x3FFF {
        buffer.push(((value >> 8) as u8) | 0x80);
        buffer.push(value as u8);
    } else {
        let value = value.min(0x1FFF_FFFF);
        buffer.push(((value >> 24) as u8) | 0xC0);
        buffer.push((value >> 16) as u8);
        buffer.push((value >> 8) as u8);
        buffer.push(value as u8);
    }
}

/// Appends a 7-bit encoded integer, as used for string length prefixes.
pub fn write_7bit_encoded_int(mut value: u32, buffer: &mut Vec<u8>) {
    while value >= 0x80 {
        #[allow(clippy::cast_possible_truncation)]
        buffer.push((value as u8) | 0x80);
        value >>= 7;
    }
    #[allow(clippy::cast_possible_truncation)]
    buffer.push(value as u8);
}

/// Appends a 7-bit length prefixed UTF-8 string.
pub fn write_prefixed_string_utf8(value: &str, buffer: &mut Vec<u8>) {
    #[allow(clippy::cast_possible_truncation)]
    write_7bit_encoded_int(value.len() as u32, buffer);
    buffer.extend_from_slice(value.as_bytes());
}
