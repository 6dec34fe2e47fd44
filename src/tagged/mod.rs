//! Self-describing tagged values.
//!
//! Replay metadata and tracker events use a byte-aligned format where every
//! value starts with a one-byte tag:
//!
//! | Tag | Value | Payload |
//! |-----|-------|---------|
//! | 0x00 | array | varint count, then that many values |
//! | 0x02 | byte string | varint length, then raw bytes |
//! | 0x04 | optional | presence byte, then a value if nonzero |
//! | 0x05 | map | varint count, then (varint key, value) pairs |
//! | 0x06 | u8 | one byte |
//! | 0x07 | u32 | four little-endian bytes |
//! | 0x09 | integer | signed varint |
//!
//! # Example
//!
//! ```
//! use blizzard_replay::tagged::{decode_value, Value};
//!
//! let mut data: &[u8] = &[0x05, 0x02, 0x00, 0x06, 0x07];
//! let value = decode_value(&mut data).unwrap();
//! assert_eq!(value.get(0), Some(&Value::UInt8(7)));
//! ```

pub mod value;
pub mod varint;

pub use value::Value;
pub use varint::{encode_varint, read_varint};

use std::collections::BTreeMap;
use std::io::Read;

use crate::binary::{read_array_from, read_u8_from};
use crate::error::{ParserError, Result};
use crate::limits::DecodeLimits;

/// Tag of an array.
pub const TAG_ARRAY: u8 = 0x00;
/// Tag of a byte string.
pub const TAG_BYTES: u8 = 0x02;
/// Tag of an optional.
pub const TAG_OPTIONAL: u8 = 0x04;
/// Tag of a map.
pub const TAG_MAP: u8 = 0x05;
/// Tag of a single byte.
pub const TAG_U8: u8 = 0x06;
/// Tag of a 32-bit word.
pub const TAG_U32: u8 = 0x07;
/// Tag of a signed varint.
pub const TAG_VARINT: u8 = 0x09;

/// Decodes one value with [`DecodeLimits::default`].
///
/// # Errors
///
/// See [`decode_value_with_limits`].
pub fn decode_value<R: Read + ?Sized>(reader: &mut R) -> Result<Value> {
    decode_value_with_limits(reader, &DecodeLimits::default())
}

/// Decodes one value, refusing lengths and nesting beyond `limits`.
///
/// # Errors
///
/// - `ParserError::UnknownTag` for a tag not in the table above
/// - `ParserError::TruncatedStream` if the source ends inside the value
/// - `ParserError::LimitExceeded` if a length or the nesting depth is too large
/// - `ParserError::UnexpectedValue` for a negative length
/// - `ParserError::VarIntOverflow` for an overlong varint
pub fn decode_value_with_limits<R: Read + ?Sized>(
    reader: &mut R,
    limits: &DecodeLimits,
) -> Result<Value> {
    decode_nested(reader, limits, 0)
}

fn decode_nested<R: Read + ?Sized>(
    reader: &mut R,
    limits: &DecodeLimits,
    depth: usize,
) -> Result<Value> {
    let tag = read_u8_from(reader, "tagged value tag")?;

    match tag {
        TAG_ARRAY => {
            check_depth(limits, depth)?;
            let count = read_length(reader, limits.max_collection_len, "array length")?;
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                items.push(decode_nested(reader, limits, depth + 1)?);
            }
            Ok(Value::Array(items))
        }
        TAG_BYTES => {
            let len = read_length(reader, limits.max_blob_len, "byte string length")?;
            let mut bytes = Vec::new();
            Read::take(&mut *reader, len as u64).read_to_end(&mut bytes)?;
            if bytes.len() != len {
                return Err(ParserError::truncated("tagged byte string"));
            }
            Ok(Value::Bytes(bytes))
        }
        TAG_OPTIONAL => {
            if read_u8_from(reader, "optional presence")? == 0 {
                return Ok(Value::Null);
            }
            check_depth(limits, depth)?;
            decode_nested(reader, limits, depth + 1)
        }
        TAG_MAP => {
            check_depth(limits, depth)?;
            let count = read_length(reader, limits.max_collection_len, "map length")?;
            let mut map = BTreeMap::new();
            for _ in 0..count {
                let key = read_varint(reader)?;
                let value = decode_nested(reader, limits, depth + 1)?;
                map.insert(key, value);
            }
            Ok(Value::Map(map))
        }
        TAG_U8 => Ok(Value::UInt8(read_u8_from(reader, "tagged u8")?)),
        TAG_U32 => {
            let bytes: [u8; 4] = read_array_from(reader, "tagged u32")?;
            Ok(Value::UInt32(u32::from_le_bytes(bytes)))
        }
        TAG_VARINT => Ok(Value::Int(read_varint(reader)?)),
        other => Err(ParserError::UnknownTag { tag: other }),
    }
}

fn check_depth(limits: &DecodeLimits, depth: usize) -> Result<()> {
    if depth >= limits.max_nesting_depth {
        return Err(ParserError::LimitExceeded {
            what: "nesting depth",
            value: depth as u64 + 1,
            limit: limits.max_nesting_depth as u64,
        });
    }
    Ok(())
}

fn read_length<R: Read + ?Sized>(
    reader: &mut R,
    limit: usize,
    what: &'static str,
) -> Result<usize> {
    let raw = read_varint(reader)?;
    let len = u64::try_from(raw).map_err(|_| ParserError::UnexpectedValue {
        reason: format!("negative {what} {raw}"),
    })?;
    if len > limit as u64 {
        return Err(ParserError::LimitExceeded {
            what,
            value: len,
            limit: limit as u64,
        });
    }
    // Bounded by `limit`, which is a usize.
    Ok(len as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Result<Value> {
        let mut reader = bytes;
        decode_value(&mut reader)
    }

    #[test]
    fn test_decode_u8() {
        assert_eq!(decode(&[0x06, 0x2A]).unwrap(), Value::UInt8(0x2A));
    }

    #[test]
    fn test_decode_single_entry_map() {
        let value = decode(&[0x05, 0x02, 0x00, 0x06, 0x07]).unwrap();
        let mut expected = BTreeMap::new();
        expected.insert(0, Value::UInt8(0x07));
        assert_eq!(value, Value::Map(expected));
    }

    #[test]
    fn test_decode_u32_and_varint() {
        assert_eq!(
            decode(&[0x07, 0x78, 0x56, 0x34, 0x12]).unwrap(),
            Value::UInt32(0x1234_5678)
        );
        assert_eq!(decode(&[0x09, 0x03]).unwrap(), Value::Int(-1));
    }

    #[test]
    fn test_decode_bytes_and_array() {
        let data = [0x00, 0x04, 0x02, 0x06, b'a', b'b', b'c', 0x09, 0x08];
        let value = decode(&data).unwrap();
        assert_eq!(
            value,
            Value::Array(vec![Value::Bytes(b"abc".to_vec()), Value::Int(4)])
        );
    }

    #[test]
    fn test_decode_optional() {
        assert_eq!(decode(&[0x04, 0x00]).unwrap(), Value::Null);
        assert_eq!(decode(&[0x04, 0x01, 0x06, 0x01]).unwrap(), Value::UInt8(1));
    }

    #[test]
    fn test_unsorted_map_keys() {
        let data = [0x05, 0x04, 0x0A, 0x06, 0x01, 0x02, 0x06, 0x02];
        let value = decode(&data).unwrap();
        let keys: Vec<i64> = value.as_map().unwrap().keys().copied().collect();
        assert_eq!(keys, vec![1, 5]);
    }

    #[test]
    fn test_unknown_tag() {
        assert!(matches!(
            decode(&[0x03]),
            Err(ParserError::UnknownTag { tag: 0x03 })
        ));
    }

    #[test]
    fn test_truncated_values() {
        for data in [&[][..], &[0x07, 0x01], &[0x02, 0x08, b'a'], &[0x00, 0x02, 0x06]] {
            assert!(
                matches!(decode(data), Err(ParserError::TruncatedStream { .. })),
                "input {data:?}"
            );
        }
    }

    #[test]
    fn test_negative_length() {
        assert!(matches!(
            decode(&[0x00, 0x03]),
            Err(ParserError::UnexpectedValue { .. })
        ));
    }

    #[test]
    fn test_limits() {
        let limits = DecodeLimits::for_testing();

        let long_blob = [0x02, 0x80, 0x08];
        let mut reader = &long_blob[..];
        assert!(matches!(
            decode_value_with_limits(&mut reader, &limits),
            Err(ParserError::LimitExceeded {
                what: "byte string length",
                ..
            })
        ));

        let mut nested = vec![0x04, 0x01].repeat(limits.max_nesting_depth + 1);
        nested.extend_from_slice(&[0x06, 0x00]);
        let mut reader = nested.as_slice();
        assert!(matches!(
            decode_value_with_limits(&mut reader, &limits),
            Err(ParserError::LimitExceeded {
                what: "nesting depth",
                ..
            })
        ));
    }
}
