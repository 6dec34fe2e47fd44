//! Section detection and format versions for MPQ archives.
//!
//! An archive is a sequence of at most two sections at known offsets:
//!
//! - **User data** (`MPQ\x1B`): an optional preamble whose body tells where
//!   the real header lives. Replays use it to carry their own header
//!   before the archive proper.
//! - **Archive header** (`MPQ\x1A`): the main header with table offsets.
//!
//! # Example
//!
//! ```
//! use blizzard_replay::format::{detect_section, SectionKind};
//!
//! assert!(matches!(detect_section(b"MPQ\x1A"), Ok(SectionKind::Header)));
//! assert!(matches!(detect_section(b"MPQ\x1B"), Ok(SectionKind::UserData)));
//! ```

use serde::Serialize;

use crate::error::{ParserError, Result};

/// Signature of the main archive header.
pub const HEADER_MAGIC: &[u8; 4] = b"MPQ\x1A";

/// Signature of the user data preamble.
pub const USER_DATA_MAGIC: &[u8; 4] = b"MPQ\x1B";

/// The kind of section found at an offset in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// `MPQ\x1A`: the archive header.
    Header,
    /// `MPQ\x1B`: the user data preamble.
    UserData,
}

/// Identifies a section from its four signature bytes.
///
/// # Errors
///
/// - `ParserError::UnexpectedEof` if fewer than 4 bytes are given
/// - `ParserError::InvalidMagic` if the signature is not recognised
pub fn detect_section(data: &[u8]) -> Result<SectionKind> {
    if data.len() < 4 {
        return Err(ParserError::unexpected_eof(4, data.len()));
    }

    match &data[..4] {
        m if m == HEADER_MAGIC => Ok(SectionKind::Header),
        m if m == USER_DATA_MAGIC => Ok(SectionKind::UserData),
        other => Err(ParserError::invalid_magic(HEADER_MAGIC, other)),
    }
}

/// Archive header layout selected by the header's `format_version` field.
///
/// Each layout extends the previous one. A field value of 4 or more
/// changes how tables are located and is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FormatVersion {
    /// Original 32-byte header.
    V1,
    /// Adds the extended block table and high table offset words.
    V2,
    /// Adds the 64-bit archive size and HET/BET table positions.
    V3,
}

impl FormatVersion {
    /// Maps the raw header field to a supported layout.
    ///
    /// Values `0` and `1` use the base layout, `2` adds the extended
    /// table words and `3` adds the 64-bit positions.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::MalformedHeader` for version 4 and anything
    /// newer.
    pub fn from_raw(raw: u16) -> Result<Self> {
        match raw {
            0 | 1 => Ok(FormatVersion::V1),
            2 => Ok(FormatVersion::V2),
            3 => Ok(FormatVersion::V3),
            other => Err(ParserError::MalformedHeader {
                reason: format!("unsupported archive format version {other}"),
            }),
        }
    }

    /// Returns the version number (1-based).
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            FormatVersion::V1 => 1,
            FormatVersion::V2 => 2,
            FormatVersion::V3 => 3,
        }
    }

    /// Size of the header fields this version reads, including the magic.
    #[must_use]
    pub const fn header_size(self) -> usize {
        match self {
            FormatVersion::V1 => 0x20,
            FormatVersion::V2 => 0x2C,
            FormatVersion::V3 => 0x44,
        }
    }
}
