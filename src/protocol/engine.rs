//! Decoding of bit-packed data against a [`TypeDescriptor`].

use std::io::BufRead;

use super::decoded::{Decoded, DecodedField};
use super::descriptor::{BlobLength, TypeDescriptor};
use crate::bits::BitCursor;
use crate::error::{ParserError, Result};
use crate::limits::DecodeLimits;

/// Decodes one value with [`DecodeLimits::default`].
///
/// # Errors
///
/// See [`decode_with_limits`].
pub fn decode<R: BufRead>(cursor: &mut BitCursor<R>, descriptor: &TypeDescriptor) -> Result<Decoded> {
    decode_with_limits(cursor, descriptor, &DecodeLimits::default())
}

/// Decodes one value described by `descriptor`.
///
/// # Errors
///
/// - `ParserError::TruncatedStream` if the source ends inside the value
/// - `ParserError::UnknownChoiceTag` if a choice selector has no branch
/// - `ParserError::LimitExceeded` if a count, length or nesting is too large
/// - `ParserError::UnexpectedValue` for an integer wider than 64 bits
pub fn decode_with_limits<R: BufRead>(
    cursor: &mut BitCursor<R>,
    descriptor: &TypeDescriptor,
    limits: &DecodeLimits,
) -> Result<Decoded> {
    Engine { cursor, limits }.decode(descriptor, 0)
}

struct Engine<'a, R> {
    cursor: &'a mut BitCursor<R>,
    limits: &'a DecodeLimits,
}

impl<R: BufRead> Engine<'_, R> {
    fn decode(&mut self, descriptor: &TypeDescriptor, depth: usize) -> Result<Decoded> {
        match descriptor {
            TypeDescriptor::Int { width, bias } => {
                let raw = self.cursor.read_bits(*width)?;
                // 64-bit fields are reinterpreted, so the sum wraps like the wire value.
                Ok(Decoded::Int(bias.wrapping_add(raw as i64)))
            }
            TypeDescriptor::Bool => Ok(Decoded::Bool(self.cursor.read_bool()?)),
            TypeDescriptor::Blob(length) => {
                let len = match *length {
                    BlobLength::Fixed(len) => len as u64,
                    BlobLength::Bits(width) => self.cursor.read_bits(width)?,
                };
                let len = self.check_len(len, self.limits.max_blob_len, "blob length")?;
                Ok(Decoded::Blob(self.cursor.read_aligned_bytes(len)?))
            }
            TypeDescriptor::Struct(fields) => {
                self.check_depth(depth)?;
                let mut out = Vec::with_capacity(fields.len());
                for field in fields {
                    out.push(DecodedField {
                        name: field.name.clone(),
                        value: self.decode(&field.descriptor, depth + 1)?,
                    });
                }
                Ok(Decoded::Struct(out))
            }
            TypeDescriptor::Array {
                element,
                count_width,
                count_bias,
            } => {
                self.check_depth(depth)?;
                let count = self.cursor.read_bits(*count_width)?.saturating_add(*count_bias);
                let count = self.check_len(count, self.limits.max_collection_len, "array length")?;
                let mut items = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    items.push(self.decode(element, depth + 1)?);
                }
                Ok(Decoded::Array(items))
            }
            TypeDescriptor::Optional(inner) => {
                if !self.cursor.read_bool()? {
                    return Ok(Decoded::Optional(None));
                }
                self.check_depth(depth)?;
                let value = self.decode(inner, depth + 1)?;
                Ok(Decoded::Optional(Some(Box::new(value))))
            }
            TypeDescriptor::Choice {
                tag_width,
                branches,
            } => {
                let tag = self.cursor.read_bits(*tag_width)?;
                let branch = branches.get(&tag).ok_or(ParserError::UnknownChoiceTag {
                    tag,
                    width: *tag_width,
                })?;
                self.check_depth(depth)?;
                let value = self.decode(&branch.descriptor, depth + 1)?;
                Ok(Decoded::Choice {
                    tag,
                    name: branch.name.clone(),
                    value: Box::new(value),
                })
            }
            TypeDescriptor::BitArray { count_width } => {
                let len = self.cursor.read_bits(*count_width)?;
                let max_bits = self.limits.max_blob_len.saturating_mul(8);
                self.check_len(len, max_bits, "bit array length")?;

                let mut bits = Vec::with_capacity(((len + 7) / 8).min(4096) as usize);
                let mut left = len;
                while left > 0 {
                    let take = left.min(8) as u32;
                    bits.push(self.cursor.read_bits(take)? as u8);
                    left -= u64::from(take);
                }
                Ok(Decoded::BitArray { len, bits })
            }
            TypeDescriptor::FourCC => Ok(Decoded::FourCC(self.cursor.read_bits(32)? as u32)),
            TypeDescriptor::Null => Ok(Decoded::Null),
        }
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth >= self.limits.max_nesting_depth {
            return Err(ParserError::LimitExceeded {
                what: "nesting depth",
                value: depth as u64 + 1,
                limit: self.limits.max_nesting_depth as u64,
            });
        }
        Ok(())
    }

    fn check_len(&self, len: u64, limit: usize, what: &'static str) -> Result<usize> {
        if len > limit as u64 {
            return Err(ParserError::LimitExceeded {
                what,
                value: len,
                limit: limit as u64,
            });
        }
        Ok(len as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::pack;

    fn run(data: &[u8], descriptor: &TypeDescriptor) -> Result<Decoded> {
        decode(&mut BitCursor::new(data), descriptor)
    }

    #[test]
    fn test_optional_present() {
        let data = pack(&[(1, 1), (1, 8)]);
        let descriptor = TypeDescriptor::optional(TypeDescriptor::uint(8));
        assert_eq!(
            run(&data, &descriptor).unwrap(),
            Decoded::Optional(Some(Box::new(Decoded::Int(1))))
        );
    }

    #[test]
    fn test_optional_absent_consumes_one_bit() {
        let data = pack(&[(0, 1), (0x5, 3)]);
        let mut cursor = BitCursor::new(data.as_slice());
        let descriptor = TypeDescriptor::optional(TypeDescriptor::uint(8));
        assert_eq!(decode(&mut cursor, &descriptor).unwrap(), Decoded::Optional(None));
        assert_eq!(cursor.read_bits(3).unwrap(), 0x5);
    }

    #[test]
    fn test_int_bias() {
        let data = pack(&[(0, 32)]);
        let descriptor = TypeDescriptor::int(32, -2_147_483_648);
        assert_eq!(run(&data, &descriptor).unwrap(), Decoded::Int(-2_147_483_648));

        let data = pack(&[(3, 4)]);
        assert_eq!(run(&data, &TypeDescriptor::int(4, 10)).unwrap(), Decoded::Int(13));
        assert_eq!(run(&[], &TypeDescriptor::int(0, 7)).unwrap(), Decoded::Int(7));
    }

    #[test]
    fn test_choice() {
        let descriptor = TypeDescriptor::choice(
            2,
            [
                (0, "none", TypeDescriptor::Null),
                (1, "small", TypeDescriptor::uint(6)),
            ],
        );

        let data = pack(&[(1, 2), (42, 6)]);
        assert_eq!(
            run(&data, &descriptor).unwrap(),
            Decoded::Choice {
                tag: 1,
                name: "small".to_string(),
                value: Box::new(Decoded::Int(42)),
            }
        );

        let data = pack(&[(3, 2)]);
        assert!(matches!(
            run(&data, &descriptor),
            Err(ParserError::UnknownChoiceTag { tag: 3, width: 2 })
        ));
    }

    #[test]
    fn test_struct_with_blob_realigns() {
        let descriptor = TypeDescriptor::structure([
            ("kind", TypeDescriptor::uint(3)),
            ("name", TypeDescriptor::blob(4)),
            ("flag", TypeDescriptor::Bool),
        ]);
        let mut data = pack(&[(5, 3), (2, 4)]);
        data.extend_from_slice(b"ok");
        data.push(0x01);

        let value = run(&data, &descriptor).unwrap();
        assert_eq!(value.field("kind").and_then(Decoded::as_int), Some(5));
        assert_eq!(value.field("name").and_then(Decoded::as_blob), Some(&b"ok"[..]));
        assert_eq!(value.field("flag").and_then(Decoded::as_bool), Some(true));
    }

    #[test]
    fn test_arrays() {
        let descriptor = TypeDescriptor::array(TypeDescriptor::uint(4), 3);
        let data = pack(&[(2, 3), (0xA, 4), (0x5, 4)]);
        assert_eq!(
            run(&data, &descriptor).unwrap(),
            Decoded::Array(vec![Decoded::Int(0xA), Decoded::Int(0x5)])
        );

        let fixed = TypeDescriptor::fixed_array(TypeDescriptor::uint(8), 2);
        assert_eq!(
            run(&[0x01, 0x02], &fixed).unwrap(),
            Decoded::Array(vec![Decoded::Int(1), Decoded::Int(2)])
        );
    }

    #[test]
    fn test_bit_array_and_fourcc() {
        let data = pack(&[(10, 5), (0xAB, 8), (0x3, 2)]);
        let value = run(&data, &TypeDescriptor::BitArray { count_width: 5 }).unwrap();
        assert_eq!(
            value,
            Decoded::BitArray {
                len: 10,
                bits: vec![0xAB, 0x3],
            }
        );

        let data = pack(&[(0x5332_4D41, 32)]);
        assert_eq!(run(&data, &TypeDescriptor::FourCC).unwrap(), Decoded::FourCC(0x5332_4D41));
    }

    #[test]
    fn test_truncated_and_limits() {
        assert!(matches!(
            run(&[0xFF], &TypeDescriptor::uint(12)),
            Err(ParserError::TruncatedStream { .. })
        ));

        let limits = DecodeLimits::for_testing();
        let data = pack(&[(0xFF, 8)]);
        let mut cursor = BitCursor::new(data.as_slice());
        let descriptor = TypeDescriptor::array(TypeDescriptor::Null, 8);
        assert!(matches!(
            decode_with_limits(&mut cursor, &descriptor, &limits),
            Err(ParserError::LimitExceeded { what: "array length", .. })
        ));
    }
}
