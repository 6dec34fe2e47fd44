//! Main archive header (`MPQ\x1A`).
//!
//! # Layout
//!
//! | Offset | Size | Field | Since |
//! |--------|------|-------|-------|
//! | 0x00 | 4 | `magic` "MPQ\x1A" | v1 |
//! | 0x04 | 4 | `header_size` | v1 |
//! | 0x08 | 4 | `archive_size` | v1 |
//! | 0x0C | 2 | `format_version` | v1 |
//! | 0x0E | 2 | `sector_size_shift` | v1 |
//! | 0x10 | 4 | `hash_table_offset` | v1 |
//! | 0x14 | 4 | `block_table_offset` | v1 |
//! | 0x18 | 4 | `hash_table_entries` | v1 |
//! | 0x1C | 4 | `block_table_entries` | v1 |
//! | 0x20 | 8 | `extended_block_table_offset` | v2 |
//! | 0x28 | 2 | `hash_table_offset_high` | v2 |
//! | 0x2A | 2 | `block_table_offset_high` | v2 |
//! | 0x2C | 8 | `archive_size_64` | v3 |
//! | 0x34 | 8 | `bet_table_offset` | v3 |
//! | 0x3C | 8 | `het_table_offset` | v3 |

use std::io::Read;

use crate::binary::{read_bytes, read_u16_le, read_u32_le, read_u64_le};
use crate::error::{ParserError, Result};
use crate::format::{FormatVersion, HEADER_MAGIC};

/// Size of the fields common to every header version.
pub const BASE_HEADER_SIZE: usize = 0x20;

/// Fields added by the version 2 layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedTables {
    /// Offset of the extended block table (high 16 bits of block offsets).
    pub extended_block_table_offset: u64,
    /// High 16 bits of the hash table offset.
    pub hash_table_offset_high: u16,
    /// High 16 bits of the block table offset.
    pub block_table_offset_high: u16,
}

/// Fields added by the version 3 layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LargeArchiveInfo {
    /// 64-bit archive size.
    pub archive_size_64: u64,
    /// Offset of the BET table.
    pub bet_table_offset: u64,
    /// Offset of the HET table.
    pub het_table_offset: u64,
}

/// Parsed archive header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHeader {
    /// Declared size of the header in bytes.
    pub header_size: u32,

    /// Size of the archive in bytes (32-bit field).
    pub archive_size: u32,

    /// The raw `format_version` field.
    pub raw_format_version: u16,

    /// The layout selected by `raw_format_version`.
    pub format_version: FormatVersion,

    /// Sector size as a power of two shift over 512 bytes.
    pub sector_size_shift: u16,

    /// Hash table offset relative to the header position.
    pub hash_table_offset: u32,

    /// Block table offset relative to the header position.
    pub block_table_offset: u32,

    /// Number of hash table entries.
    pub hash_table_entries: u32,

    /// Number of block table entries.
    pub block_table_entries: u32,

    /// Version 2 additions.
    pub extended: Option<ExtendedTables>,

    /// Version 3 additions.
    pub large: Option<LargeArchiveInfo>,
}

impl ArchiveHeader {
    /// Parses an archive header from raw bytes starting at the magic.
    ///
    /// # Errors
    ///
    /// - `ParserError::UnexpectedEof` if data is shorter than the layout
    ///   its version field selects
    /// - `ParserError::InvalidMagic` if the magic is not `MPQ\x1A`
    /// - `ParserError::MalformedHeader` for format version 4 or newer
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < BASE_HEADER_SIZE {
            return Err(ParserError::unexpected_eof(BASE_HEADER_SIZE, data.len()));
        }

        let magic = read_bytes(data, 0x00, 4)?;
        if magic != HEADER_MAGIC {
            return Err(ParserError::invalid_magic(HEADER_MAGIC, magic));
        }

        let raw_format_version = read_u16_le(data, 0x0C)?;
        let format_version = FormatVersion::from_raw(raw_format_version)?;

        if data.len() < format_version.header_size() {
            return Err(ParserError::unexpected_eof(
                format_version.header_size(),
                data.len(),
            ));
        }

        let extended = if format_version == FormatVersion::V1 {
            None
        } else {
            Some(ExtendedTables {
                extended_block_table_offset: read_u64_le(data, 0x20)?,
                hash_table_offset_high: read_u16_le(data, 0x28)?,
                block_table_offset_high: read_u16_le(data, 0x2A)?,
            })
        };

        let large = if format_version == FormatVersion::V3 {
            Some(LargeArchiveInfo {
                archive_size_64: read_u64_le(data, 0x2C)?,
                bet_table_offset: read_u64_le(data, 0x34)?,
                het_table_offset: read_u64_le(data, 0x3C)?,
            })
        } else {
            None
        };

        Ok(ArchiveHeader {
            header_size: read_u32_le(data, 0x04)?,
            archive_size: read_u32_le(data, 0x08)?,
            raw_format_version,
            format_version,
            sector_size_shift: read_u16_le(data, 0x0E)?,
            hash_table_offset: read_u32_le(data, 0x10)?,
            block_table_offset: read_u32_le(data, 0x14)?,
            hash_table_entries: read_u32_le(data, 0x18)?,
            block_table_entries: read_u32_le(data, 0x1C)?,
            extended,
            large,
        })
    }

    /// Reads a header from a stream positioned just after the magic.
    ///
    /// Only the bytes the selected layout needs are consumed.
    ///
    /// # Errors
    ///
    /// Same as [`ArchiveHeader::parse`], plus `ParserError::TruncatedStream`
    /// if the stream ends early.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; FormatVersion::V3.header_size()];
        buf[..4].copy_from_slice(HEADER_MAGIC);
        reader
            .read_exact(&mut buf[4..BASE_HEADER_SIZE])
            .map_err(|e| ParserError::from_io(e, "archive header"))?;

        let version = FormatVersion::from_raw(read_u16_le(&buf, 0x0C)?)?;
        let size = version.header_size();
        reader
            .read_exact(&mut buf[BASE_HEADER_SIZE..size])
            .map_err(|e| ParserError::from_io(e, "archive header extension"))?;

        Self::parse(&buf[..size])
    }

    /// Position of the hash table relative to the header.
    ///
    /// Includes the high 16 bits from the version 2 extension when present.
    #[must_use]
    pub fn hash_table_position(&self) -> u64 {
        let high = self.extended.map_or(0, |e| u64::from(e.hash_table_offset_high));
        (high << 32) | u64::from(self.hash_table_offset)
    }

    /// Position of the block table relative to the header.
    ///
    /// Includes the high 16 bits from the version 2 extension when present.
    #[must_use]
    pub fn block_table_position(&self) -> u64 {
        let high = self.extended.map_or(0, |e| u64::from(e.block_table_offset_high));
        (high << 32) | u64::from(self.block_table_offset)
    }

    /// Sector size in bytes.
    #[must_use]
    pub fn sector_size(&self) -> u64 {
        512u64 << self.sector_size_shift.min(32)
    }
}
