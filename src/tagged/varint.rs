//! Signed variable-length integers.
//!
//! Magnitudes are written as base-128 groups, least significant first,
//! with the top bit of each byte marking a continuation. The low bit of
//! the assembled magnitude is the sign: `v & 1 == 1` means `-(v >> 1)`.
//!
//! This is not protobuf zig-zag: odd magnitudes map to `-(v >> 1)`, so
//! `1` decodes to `0` and `i64::MIN` has no encoding.

use std::io::Read;

use crate::binary::read_u8_from;
use crate::error::{ParserError, Result};

/// Longest valid encoding of a 64-bit magnitude.
pub const MAX_VARINT_LEN: usize = 10;

/// Reads one signed varint.
///
/// # Errors
///
/// - `ParserError::TruncatedStream` if the source ends mid-integer
/// - `ParserError::VarIntOverflow` if the magnitude exceeds 64 bits
pub fn read_varint<R: Read + ?Sized>(reader: &mut R) -> Result<i64> {
    let mut magnitude: u64 = 0;
    let mut shift = 0u32;

    loop {
        let byte = read_u8_from(reader, "variable-length integer")?;
        let group = u64::from(byte & 0x7F);

        if shift >= 64 || (shift > 0 && group >> (64 - shift) != 0) {
            return Err(ParserError::VarIntOverflow);
        }
        magnitude |= group << shift;

        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }

    Ok(decode_sign(magnitude))
}

fn decode_sign(magnitude: u64) -> i64 {
    // The shifted magnitude fits in 63 bits, so the cast is lossless.
    let value = (magnitude >> 1) as i64;
    if magnitude & 1 == 0 {
        value
    } else {
        -value
    }
}

/// Encodes `value` in the signed varint format.
///
/// `i64::MIN` has no encoding and is written as `-i64::MAX`.
#[must_use]
pub fn encode_varint(value: i64) -> Vec<u8> {
    let abs = value.unsigned_abs().min(i64::MAX as u64);
    let mut magnitude = (abs << 1) | u64::from(value < 0);

    let mut out = Vec::with_capacity(MAX_VARINT_LEN);
    loop {
        let group = (magnitude & 0x7F) as u8;
        magnitude >>= 7;
        if magnitude == 0 {
            out.push(group);
            return out;
        }
        out.push(group | 0x80);
    }
}
