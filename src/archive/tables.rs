//! Hash and block tables.
//!
//! Both tables are stored encrypted as arrays of 16-byte entries and are
//! decrypted once when the archive is opened. Afterwards they are plain
//! read-only vectors.
//!
//! # Hash table entry (16 bytes)
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0x00 | 4 | `name_a` (hash of the name, [`HashType::NameA`]) |
//! | 0x04 | 4 | `name_b` (hash of the name, [`HashType::NameB`]) |
//! | 0x08 | 2 | `locale` |
//! | 0x0A | 2 | `platform` |
//! | 0x0C | 4 | `block_index` or a sentinel |
//!
//! # Block table entry (16 bytes)
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0x00 | 4 | `offset` relative to the archive header |
//! | 0x04 | 4 | `compressed_size` |
//! | 0x08 | 4 | `file_size` |
//! | 0x0C | 4 | `flags` |

use std::fmt;
use std::io::Read;

use tracing::trace;

use crate::binary::{read_u16_le, read_u32_le};
use crate::crypto::{hash_string, Decrypter, HashType};
use crate::error::{ParserError, Result};

/// Size of one table entry in bytes.
pub const TABLE_ENTRY_SIZE: usize = 16;

/// Name whose [`HashType::FileKey`] hash decrypts the hash table.
pub const HASH_TABLE_KEY_NAME: &str = "(hash table)";

/// Name whose [`HashType::FileKey`] hash decrypts the block table.
pub const BLOCK_TABLE_KEY_NAME: &str = "(block table)";

/// One slot of the hash table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashTableEntry {
    /// [`HashType::NameA`] hash of the member name.
    pub name_a: u32,
    /// [`HashType::NameB`] hash of the member name.
    pub name_b: u32,
    /// Windows LANGID of the member.
    pub locale: u16,
    /// Platform the member is used for.
    pub platform: u16,
    /// Index into the block table, or a sentinel.
    pub block_index: u32,
}

impl HashTableEntry {
    /// Slot has never been used; a probe stops here.
    pub const EMPTY_NEVER_USED: u32 = 0xFFFF_FFFF;

    /// Slot held a member that was deleted; a probe continues past it.
    pub const EMPTY_DELETED: u32 = 0xFFFF_FFFE;

    /// Parses an entry from 16 decrypted bytes.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than 16 bytes are given.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Ok(HashTableEntry {
            name_a: read_u32_le(data, 0x00)?,
            name_b: read_u32_le(data, 0x04)?,
            locale: read_u16_le(data, 0x08)?,
            platform: read_u16_le(data, 0x0A)?,
            block_index: read_u32_le(data, 0x0C)?,
        })
    }

    /// Returns whether this slot has never been used.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.block_index == Self::EMPTY_NEVER_USED
    }

    /// Returns whether this slot was deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.block_index == Self::EMPTY_DELETED
    }

    /// Returns whether this slot refers to a block.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.block_index < Self::EMPTY_DELETED
    }
}

/// Flag bits of a block table entry.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockFlags(pub u32);

impl BlockFlags {
    /// The entry describes a file.
    pub const FILE: u32 = 1 << 31;
    /// The member has per-sector checksums.
    pub const CHECKSUMS: u32 = 1 << 26;
    /// The member is a deletion marker.
    pub const DELETION_MARKER: u32 = 1 << 25;
    /// The member is stored as a single unit rather than sectors.
    pub const SINGLE_UNIT: u32 = 1 << 24;
    /// The member is compressed with a leading method byte.
    pub const COMPRESSED: u32 = 1 << 9;
    /// The member is compressed with PKWARE implode.
    pub const IMPLODED: u32 = 1 << 8;

    const NAMES: [(u32, &'static str); 6] = [
        (Self::FILE, "file"),
        (Self::CHECKSUMS, "checksums"),
        (Self::DELETION_MARKER, "deletion marker"),
        (Self::SINGLE_UNIT, "single unit"),
        (Self::COMPRESSED, "compressed"),
        (Self::IMPLODED, "imploded"),
    ];

    /// Returns whether all bits of `flag` are set.
    #[must_use]
    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    /// Returns whether the member is compressed.
    #[must_use]
    pub fn is_compressed(self) -> bool {
        self.contains(Self::COMPRESSED)
    }

    /// Returns whether the member is imploded.
    #[must_use]
    pub fn is_imploded(self) -> bool {
        self.contains(Self::IMPLODED)
    }

    /// Returns whether the entry is a deletion marker.
    #[must_use]
    pub fn is_deleted(self) -> bool {
        self.contains(Self::DELETION_MARKER)
    }

    /// Renders the known flags as a comma-separated list.
    ///
    /// Leftover bits are reported as `[unknown flags 0x..]`.
    #[must_use]
    pub fn describe(self) -> String {
        let mut rest = self.0;
        let mut names = Vec::new();
        for (flag, name) in Self::NAMES {
            if rest & flag != 0 {
                names.push(name.to_string());
                rest &= !flag;
            }
        }
        if rest != 0 {
            names.push(format!("[unknown flags 0x{rest:x}]"));
        }
        names.join(", ")
    }
}

impl fmt::Debug for BlockFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockFlags(0x{:08X}: {})", self.0, self.describe())
    }
}

/// One row of the block table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTableEntry {
    /// Offset of the member data relative to the archive header.
    pub offset: u32,
    /// Stored size, including the compression method byte.
    pub compressed_size: u32,
    /// Size after decompression.
    pub file_size: u32,
    /// Flag bits.
    pub flags: BlockFlags,
}

impl BlockTableEntry {
    /// Parses an entry from 16 decrypted bytes.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than 16 bytes are given.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Ok(BlockTableEntry {
            offset: read_u32_le(data, 0x00)?,
            compressed_size: read_u32_le(data, 0x04)?,
            file_size: read_u32_le(data, 0x08)?,
            flags: BlockFlags(read_u32_le(data, 0x0C)?),
        })
    }
}

/// Reads `count` encrypted entries from `reader` and parses each with `parse`.
fn read_table<R, T>(
    reader: R,
    count: u32,
    key_name: &str,
    table: &'static str,
    parse: fn(&[u8]) -> Result<T>,
) -> Result<Vec<T>>
where
    R: Read,
{
    let mut decrypter = Decrypter::new(reader, hash_string(key_name, HashType::FileKey));
    // The count is untrusted; let a short source fail before a large reservation does.
    let mut entries = Vec::with_capacity((count as usize).min(4096));
    let mut buf = [0u8; TABLE_ENTRY_SIZE];

    for _ in 0..count {
        decrypter
            .read_exact(&mut buf)
            .map_err(|source| ParserError::TableDecryptFailure { table, source })?;
        entries.push(parse(&buf)?);
    }

    trace!(table, count, "Decrypted table");
    Ok(entries)
}

/// Reads and decrypts the hash table.
///
/// # Errors
///
/// Returns `ParserError::TableDecryptFailure` if the source fails or ends
/// before `count` entries were read.
pub fn read_hash_table<R: Read>(reader: R, count: u32) -> Result<Vec<HashTableEntry>> {
    read_table(
        reader,
        count,
        HASH_TABLE_KEY_NAME,
        "hash table",
        HashTableEntry::parse,
    )
}

/// Reads and decrypts the block table.
///
/// # Errors
///
/// Returns `ParserError::TableDecryptFailure` if the source fails or ends
/// before `count` entries were read.
pub fn read_block_table<R: Read>(reader: R, count: u32) -> Result<Vec<BlockTableEntry>> {
    read_table(
        reader,
        count,
        BLOCK_TABLE_KEY_NAME,
        "block table",
        BlockTableEntry::parse,
    )
}

/// Result of probing the hash table for a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeHit<'a> {
    /// Slot index of the match.
    pub slot: usize,
    /// Number of slots examined, including the match.
    pub probes: usize,
    /// The matching entry.
    pub entry: &'a HashTableEntry,
}

/// Resolves a member name to its hash table entry.
///
/// Probing starts at `Hash(name, TableOffset) % len` and walks forward,
/// wrapping at the end of the table:
///
/// - a never-used slot (`0xFFFFFFFF`) ends the probe with no match;
/// - a deleted slot (`0xFFFFFFFE`) is skipped, even if its hashes match;
/// - the probe gives up after visiting every slot once.
#[must_use]
pub fn probe<'a>(entries: &'a [HashTableEntry], name: &str) -> Option<ProbeHit<'a>> {
    let len = entries.len();
    if len == 0 {
        return None;
    }

    let start = hash_string(name, HashType::TableOffset) as usize % len;
    let name_a = hash_string(name, HashType::NameA);
    let name_b = hash_string(name, HashType::NameB);

    for step in 0..len {
        let slot = (start + step) % len;
        let entry = &entries[slot];

        if entry.is_empty() {
            return None;
        }
        if entry.is_occupied() && entry.name_a == name_a && entry.name_b == name_b {
            return Some(ProbeHit {
                slot,
                probes: step + 1,
                entry,
            });
        }
    }

    None
}
