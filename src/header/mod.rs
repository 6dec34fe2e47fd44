//! Header parsing for MPQ archives.
//!
//! An archive starts with either the main header or a user data preamble
//! pointing at it:
//!
//! - **Direct**: `MPQ\x1A` at offset 0. Tables are relative to offset 0.
//! - **With preamble**: `MPQ\x1B` at offset 0, then `MPQ\x1A` at the
//!   absolute offset the preamble declares. Tables are relative to that
//!   offset.
//!
//! # Usage
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use blizzard_replay::header::ArchiveHeaders;
//!
//! let mut file = BufReader::new(File::open("game.SC2Replay").unwrap());
//! let headers = ArchiveHeaders::read(&mut file).unwrap();
//!
//! println!("Format version: {}", headers.header.format_version.number());
//! println!("Header at: 0x{:X}", headers.header_offset());
//! ```

pub mod archive;
pub mod user_data;

pub use archive::{ArchiveHeader, ExtendedTables, LargeArchiveInfo};
pub use user_data::UserDataHeader;

use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use crate::binary::read_array_from;
use crate::error::{ParserError, Result};
use crate::format::{detect_section, SectionKind};

/// The headers of an opened archive.
///
/// Created once when an archive is opened and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHeaders {
    /// The user data preamble, if the archive starts with one.
    pub user_data: Option<UserDataHeader>,

    /// The main archive header.
    pub header: ArchiveHeader,
}

impl ArchiveHeaders {
    /// Reads the headers from the start of an archive.
    ///
    /// The preamble is read at most once, before the main header. A
    /// preamble pointing at another preamble is rejected.
    ///
    /// # Errors
    ///
    /// - `ParserError::InvalidMagic` if a section signature is unknown
    /// - `ParserError::MalformedHeader` if the preamble does not lead to a
    ///   header, or the header version is 4 or newer
    /// - `ParserError::TruncatedStream` if the archive ends inside a header
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let magic: [u8; 4] = read_array_from(reader, "section signature")?;

        match detect_section(&magic)? {
            SectionKind::Header => {
                let header = ArchiveHeader::read_from(reader)?;
                debug!(
                    version = header.format_version.number(),
                    "Archive header at offset 0"
                );
                Ok(ArchiveHeaders {
                    user_data: None,
                    header,
                })
            }
            SectionKind::UserData => {
                let user_data = UserDataHeader::read_from(reader)?;
                debug!(
                    header_offset = user_data.header_offset,
                    content_size = user_data.content_size,
                    "User data preamble"
                );

                reader.seek(SeekFrom::Start(u64::from(user_data.header_offset)))?;
                let magic: [u8; 4] = read_array_from(reader, "section signature")?;
                if detect_section(&magic)? != SectionKind::Header {
                    return Err(ParserError::MalformedHeader {
                        reason: format!(
                            "user data at offset 0x{:X} does not point at an archive header",
                            user_data.header_offset
                        ),
                    });
                }

                let header = ArchiveHeader::read_from(reader)?;
                debug!(
                    version = header.format_version.number(),
                    offset = user_data.header_offset,
                    "Archive header"
                );
                Ok(ArchiveHeaders {
                    user_data: Some(user_data),
                    header,
                })
            }
        }
    }

    /// Absolute offset of the archive header.
    ///
    /// Table positions and block offsets are relative to this value.
    #[must_use]
    pub fn header_offset(&self) -> u64 {
        self.user_data
            .as_ref()
            .map_or(0, |u| u64::from(u.header_offset))
    }

    /// Absolute position of the hash table.
    #[must_use]
    pub fn hash_table_start(&self) -> u64 {
        self.header_offset() + self.header.hash_table_position()
    }

    /// Absolute position of the block table.
    #[must_use]
    pub fn block_table_start(&self) -> u64 {
        self.header_offset() + self.header.block_table_position()
    }
}
