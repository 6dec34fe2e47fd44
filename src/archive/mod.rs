//! MPQ archive access.
//!
//! Opening an archive reads its headers and decrypts both tables once.
//! The result, an [`ArchiveIndex`], is immutable: several readers can
//! resolve and open members through the same index as long as each brings
//! its own `Read + Seek` source.
//!
//! # Usage
//!
//! ```no_run
//! use blizzard_replay::archive::Archive;
//!
//! let mut archive = Archive::open_path("game.SC2Replay").unwrap();
//! for name in archive.list().unwrap() {
//!     println!("{name}");
//! }
//! let details = archive.read_member("replay.details").unwrap();
//! println!("details: {} bytes", details.len());
//! ```

pub mod tables;

pub use tables::{probe, BlockFlags, BlockTableEntry, HashTableEntry, ProbeHit};

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, trace};

use crate::decompress::MemberReader;
use crate::error::{ParserError, Result};
use crate::header::{ArchiveHeader, ArchiveHeaders, UserDataHeader};

/// Name of the member listing the archive's contents.
pub const LISTFILE: &str = "(listfile)";

/// A resolved member: its hash slot and block entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberEntry {
    /// The matching hash table entry.
    pub hash: HashTableEntry,
    /// The block the hash entry points at.
    pub block: BlockTableEntry,
}

/// Headers and decrypted tables of an archive.
#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    headers: ArchiveHeaders,
    hash_table: Vec<HashTableEntry>,
    block_table: Vec<BlockTableEntry>,
}

impl ArchiveIndex {
    /// Reads the headers and both tables from `reader`.
    ///
    /// # Errors
    ///
    /// - Header errors from [`ArchiveHeaders::read`]
    /// - `ParserError::TableDecryptFailure` if either table cannot be read
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let headers = ArchiveHeaders::read(reader)?;
        let header = &headers.header;

        reader.seek(SeekFrom::Start(headers.hash_table_start()))?;
        let hash_table = tables::read_hash_table(&mut *reader, header.hash_table_entries)?;

        reader.seek(SeekFrom::Start(headers.block_table_start()))?;
        let block_table = tables::read_block_table(&mut *reader, header.block_table_entries)?;

        debug!(
            hash_entries = hash_table.len(),
            block_entries = block_table.len(),
            "Loaded archive tables"
        );

        Ok(ArchiveIndex {
            headers,
            hash_table,
            block_table,
        })
    }

    /// The parsed headers.
    #[must_use]
    pub fn headers(&self) -> &ArchiveHeaders {
        &self.headers
    }

    /// The decrypted hash table.
    #[must_use]
    pub fn hash_table(&self) -> &[HashTableEntry] {
        &self.hash_table
    }

    /// The decrypted block table.
    #[must_use]
    pub fn block_table(&self) -> &[BlockTableEntry] {
        &self.block_table
    }

    /// Resolves a member name.
    ///
    /// Returns `Ok(None)` if no hash entry matches.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::MalformedHeader` if the matching hash entry
    /// points past the end of the block table.
    pub fn find(&self, name: &str) -> Result<Option<MemberEntry>> {
        let Some(hit) = probe(&self.hash_table, name) else {
            trace!(name, "Member not in hash table");
            return Ok(None);
        };

        let index = hit.entry.block_index as usize;
        let block = self
            .block_table
            .get(index)
            .copied()
            .ok_or_else(|| ParserError::MalformedHeader {
                reason: format!(
                    "hash entry for {name} points at block {index} of {}",
                    self.block_table.len()
                ),
            })?;

        trace!(name, slot = hit.slot, probes = hit.probes, block = index, "Resolved member");
        Ok(Some(MemberEntry {
            hash: *hit.entry,
            block,
        }))
    }

    /// Returns whether a member with this name exists.
    ///
    /// # Errors
    ///
    /// Same as [`ArchiveIndex::find`].
    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.find(name)?.is_some())
    }

    /// Opens a member for reading from `reader`.
    ///
    /// The returned reader borrows `reader` and yields decompressed bytes.
    ///
    /// # Errors
    ///
    /// - `ParserError::MemberNotFound` if no hash entry matches
    /// - `ParserError::UnimplementedFeature` for imploded or uncompressed
    ///   members
    /// - `ParserError::UnsupportedCompression` for a method other than bzip2
    pub fn open_member<'r, R: Read + Seek>(
        &self,
        reader: &'r mut R,
        name: &str,
    ) -> Result<MemberReader<&'r mut R>> {
        let entry = self
            .find(name)?
            .ok_or_else(|| ParserError::MemberNotFound {
                name: name.to_string(),
            })?;
        let block = entry.block;

        if !block.flags.is_compressed() {
            let feature = if block.flags.is_imploded() {
                "imploded members"
            } else {
                "uncompressed members"
            };
            return Err(ParserError::UnimplementedFeature {
                feature: format!("{feature} ({name}: {})", block.flags.describe()),
            });
        }

        let position = self.headers.header_offset() + u64::from(block.offset);
        debug!(
            name,
            position,
            compressed_size = block.compressed_size,
            file_size = block.file_size,
            "Opening member"
        );
        reader.seek(SeekFrom::Start(position))?;
        MemberReader::new(reader, u64::from(block.compressed_size))
    }

    /// Reads a whole member into memory.
    ///
    /// # Errors
    ///
    /// Same as [`ArchiveIndex::open_member`], plus
    /// `ParserError::DecompressionError` if the stream is corrupt.
    pub fn read_member<R: Read + Seek>(&self, reader: &mut R, name: &str) -> Result<Vec<u8>> {
        let mut member = self.open_member(reader, name)?;
        let mut out = Vec::new();
        member
            .read_to_end(&mut out)
            .map_err(|e| ParserError::DecompressionError {
                reason: format!("{name}: {e}"),
            })?;
        Ok(out)
    }

    /// Lists the member names recorded in `(listfile)`.
    ///
    /// An archive without a listfile yields an empty list.
    ///
    /// # Errors
    ///
    /// Errors opening or decompressing an existing listfile are returned.
    pub fn list<R: Read + Seek>(&self, reader: &mut R) -> Result<Vec<String>> {
        if !self.contains(LISTFILE)? {
            debug!("Archive has no listfile");
            return Ok(Vec::new());
        }

        let bytes = self.read_member(reader, LISTFILE)?;
        Ok(split_listfile(&bytes))
    }
}

/// Splits listfile contents into names, one per line.
fn split_listfile(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// An archive together with the source it was opened from.
#[derive(Debug)]
pub struct Archive<R> {
    source: R,
    index: ArchiveIndex,
}

impl Archive<BufReader<File>> {
    /// Opens the archive at `path`.
    ///
    /// # Errors
    ///
    /// `ParserError::IoError` if the file cannot be opened, otherwise the
    /// same errors as [`Archive::open`].
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::open(BufReader::new(file))
    }
}

impl<R: Read + Seek> Archive<R> {
    /// Opens an archive from a seekable source.
    ///
    /// # Errors
    ///
    /// Same as [`ArchiveIndex::read`].
    pub fn open(mut source: R) -> Result<Self> {
        let index = ArchiveIndex::read(&mut source)?;
        Ok(Archive { source, index })
    }

    /// The shareable index of this archive.
    #[must_use]
    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    /// The main archive header.
    #[must_use]
    pub fn header(&self) -> &ArchiveHeader {
        &self.index.headers.header
    }

    /// The user data preamble, if present.
    #[must_use]
    pub fn user_data(&self) -> Option<&UserDataHeader> {
        self.index.headers.user_data.as_ref()
    }

    /// See [`ArchiveIndex::find`].
    pub fn find(&self, name: &str) -> Result<Option<MemberEntry>> {
        self.index.find(name)
    }

    /// See [`ArchiveIndex::contains`].
    pub fn contains(&self, name: &str) -> Result<bool> {
        self.index.contains(name)
    }

    /// See [`ArchiveIndex::open_member`].
    pub fn open_member(&mut self, name: &str) -> Result<MemberReader<&mut R>> {
        self.index.open_member(&mut self.source, name)
    }

    /// See [`ArchiveIndex::read_member`].
    pub fn read_member(&mut self, name: &str) -> Result<Vec<u8>> {
        self.index.read_member(&mut self.source, name)
    }

    /// See [`ArchiveIndex::list`].
    pub fn list(&mut self) -> Result<Vec<String>> {
        self.index.list(&mut self.source)
    }

    /// Splits the archive into its source and index.
    pub fn into_parts(self) -> (R, ArchiveIndex) {
        (self.source, self.index)
    }
}
