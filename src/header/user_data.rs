//! User data preamble (`MPQ\x1B`).
//!
//! Replays begin with a user data section instead of the archive header.
//! It carries an embedded blob (the replay's own header, itself a tagged
//! value) and the absolute offset of the real archive header.
//!
//! # Layout (16 bytes, then content)
//!
//! | Offset | Size | Field | Description |
//! |--------|------|-------|-------------|
//! | 0x00 | 4 | `magic` | "MPQ\x1B" |
//! | 0x04 | 4 | `user_data_size` | Reserved size of the user data area |
//! | 0x08 | 4 | `header_offset` | Absolute offset of the archive header |
//! | 0x0C | 4 | `content_size` | Size of the content following this preamble |
//! | 0x10 | var | content | Embedded user data |

use std::io::Read;

use crate::binary::{read_bytes, read_u32_le};
use crate::error::{ParserError, Result};
use crate::format::USER_DATA_MAGIC;

/// The size of the fixed user data preamble in bytes.
pub const USER_DATA_HEADER_SIZE: usize = 16;

/// Parsed user data preamble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataHeader {
    /// Reserved size of the whole user data area.
    pub user_data_size: u32,

    /// Absolute offset of the archive header. All table and member
    /// offsets in the archive are relative to this position.
    pub header_offset: u32,

    /// Size of the embedded content that follows the preamble.
    pub content_size: u32,

    /// The embedded content bytes.
    pub content: Vec<u8>,
}

impl UserDataHeader {
    /// Parses the fixed preamble fields from raw bytes starting at the magic.
    ///
    /// The returned header has empty `content`; see [`UserDataHeader::read_from`].
    ///
    /// # Errors
    ///
    /// - `ParserError::UnexpectedEof` if data is shorter than 16 bytes
    /// - `ParserError::InvalidMagic` if the magic is not `MPQ\x1B`
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < USER_DATA_HEADER_SIZE {
            return Err(ParserError::unexpected_eof(
                USER_DATA_HEADER_SIZE,
                data.len(),
            ));
        }

        let magic = read_bytes(data, 0x00, 4)?;
        if magic != USER_DATA_MAGIC {
            return Err(ParserError::invalid_magic(USER_DATA_MAGIC, magic));
        }

        Ok(UserDataHeader {
            user_data_size: read_u32_le(data, 0x04)?,
            header_offset: read_u32_le(data, 0x08)?,
            content_size: read_u32_le(data, 0x0C)?,
            content: Vec::new(),
        })
    }

    /// Reads the preamble body and its content from a stream positioned
    /// just after the magic.
    ///
    /// # Errors
    ///
    /// - `ParserError::TruncatedStream` if the stream ends early
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; USER_DATA_HEADER_SIZE];
        buf[..4].copy_from_slice(USER_DATA_MAGIC);
        reader
            .read_exact(&mut buf[4..])
            .map_err(|e| ParserError::from_io(e, "user data header"))?;

        let mut header = Self::parse(&buf)?;

        let mut content = Vec::new();
        reader
            .by_ref()
            .take(u64::from(header.content_size))
            .read_to_end(&mut content)?;
        if content.len() != header.content_size as usize {
            return Err(ParserError::truncated("user data content"));
        }
        header.content = content;

        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_user_data(content: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(USER_DATA_MAGIC);
        data.extend_from_slice(&0x200u32.to_le_bytes());
        data.extend_from_slice(&0x400u32.to_le_bytes());
        data.extend_from_slice(&(content.len() as u32).to_le_bytes());
        data.extend_from_slice(content);
        data
    }

    #[test]
    fn test_parse_user_data() {
        let data = create_user_data(&[]);
        let header = UserDataHeader::parse(&data).unwrap();
        assert_eq!(header.user_data_size, 0x200);
        assert_eq!(header.header_offset, 0x400);
        assert_eq!(header.content_size, 0);
    }

    #[test]
    fn test_parse_user_data_bad_magic() {
        let mut data = create_user_data(&[]);
        data[3] = 0x1A;
        assert!(matches!(
            UserDataHeader::parse(&data),
            Err(ParserError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn test_read_user_data_with_content() {
        let data = create_user_data(b"\x06\x2A");
        let mut reader = &data[4..];
        let header = UserDataHeader::read_from(&mut reader).unwrap();
        assert_eq!(header.content, b"\x06\x2A");
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_user_data_truncated_content() {
        let mut data = create_user_data(b"abcdef");
        data.truncate(data.len() - 2);
        let mut reader = &data[4..];
        assert!(matches!(
            UserDataHeader::read_from(&mut reader),
            Err(ParserError::TruncatedStream { .. })
        ));
    }
}
