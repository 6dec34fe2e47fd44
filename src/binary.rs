//! Binary reading utilities for little-endian archive structures.
//!
//! Two flavours are provided:
//!
//! - slice readers (`read_u16_le`, `read_u32_le`, `read_u64_le`,
//!   `read_bytes`) that decode a field at a fixed offset of an
//!   already-read buffer, with bounds checking;
//! - stream readers (`read_u8_from`, `read_array_from`) that pull exactly
//!   the requested number of bytes from an `io::Read` and report a
//!   short read as a truncated stream.
//!
//! # Example
//!
//! ```
//! use blizzard_replay::binary::{read_u16_le, read_u32_le, read_bytes};
//!
//! let data = [0x4D, 0x50, 0x51, 0x1A, 0x20, 0x00, 0x00, 0x00];
//!
//! assert_eq!(read_bytes(&data, 0, 4).unwrap(), b"MPQ\x1A");
//! assert_eq!(read_u32_le(&data, 4).unwrap(), 0x20);
//! assert_eq!(read_u16_le(&data, 4).unwrap(), 0x20);
//! ```

use std::io::Read;

use crate::error::{ParserError, Result};

/// Reads a little-endian u16 value from the byte buffer at the given offset.
///
/// # Errors
///
/// Returns `ParserError::UnexpectedEof` if the buffer doesn't contain
/// at least 2 bytes starting from the given offset.
pub fn read_u16_le(bytes: &[u8], offset: usize) -> Result<u16> {
    let slice = read_bytes(bytes, offset, 2)?;
    Ok(u16::from_le_bytes([slice[0], slice[1]]))
}

/// Reads a little-endian u32 value from the byte buffer at the given offset.
///
/// # Errors
///
/// Returns `ParserError::UnexpectedEof` if the buffer doesn't contain
/// at least 4 bytes starting from the given offset.
///
/// # Example
///
/// ```
/// use blizzard_replay::binary::read_u32_le;
///
/// let data = [0x78, 0x56, 0x34, 0x12];
/// assert_eq!(read_u32_le(&data, 0).unwrap(), 0x12345678);
/// ```
pub fn read_u32_le(bytes: &[u8], offset: usize) -> Result<u32> {
    let slice = read_bytes(bytes, offset, 4)?;
    Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

/// Reads a little-endian u64 value from the byte buffer at the given offset.
///
/// # Errors
///
/// Returns `ParserError::UnexpectedEof` if the buffer doesn't contain
/// at least 8 bytes starting from the given offset.
pub fn read_u64_le(bytes: &[u8], offset: usize) -> Result<u64> {
    let slice = read_bytes(bytes, offset, 8)?;
    let mut word = [0u8; 8];
    word.copy_from_slice(slice);
    Ok(u64::from_le_bytes(word))
}

/// Reads a slice of bytes from the buffer at the given offset.
///
/// # Errors
///
/// Returns `ParserError::UnexpectedEof` if the buffer doesn't contain
/// at least `len` bytes starting from the given offset.
pub fn read_bytes(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let end = offset.saturating_add(len);
    if end > bytes.len() {
        return Err(ParserError::unexpected_eof(end, bytes.len()));
    }

    Ok(&bytes[offset..end])
}

/// Reads exactly `N` bytes from a stream.
///
/// # Errors
///
/// Returns `ParserError::TruncatedStream` naming `context` if the stream
/// ends first, or `ParserError::IoError` for other read failures.
pub fn read_array_from<R: Read + ?Sized, const N: usize>(
    reader: &mut R,
    context: &str,
) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader
        .read_exact(&mut buf)
        .map_err(|e| ParserError::from_io(e, context))?;
    Ok(buf)
}

/// Reads a single byte from a stream.
///
/// # Errors
///
/// Same as [`read_array_from`].
pub fn read_u8_from<R: Read + ?Sized>(reader: &mut R, context: &str) -> Result<u8> {
    let [byte] = read_array_from::<R, 1>(reader, context)?;
    Ok(byte)
}
