//! # Blizzard Replay
//!
//! Decoders for Blizzard replay files (StarCraft II, Heroes of the Storm).
//!
//! A replay is an MPQ archive. This library covers the three layers needed
//! to get events out of one:
//! - **Archive**: headers, encrypted hash/block tables, bzip2 members
//! - **Tagged values**: the self-describing format of `replay.details`
//!   and `replay.tracker.events`
//! - **Bit grammar**: the bit-packed format of `replay.game.events` and
//!   `replay.message.events`, driven by caller-supplied schemas
//!
//! ## Quick Start
//!
//! ```no_run
//! use blizzard_replay::archive::Archive;
//! use blizzard_replay::error::Result;
//! use blizzard_replay::tagged::decode_value;
//!
//! fn dump_details(path: &str) -> Result<()> {
//!     let mut archive = Archive::open_path(path)?;
//!
//!     println!("Format version: {}", archive.header().format_version.number());
//!     for name in archive.list()? {
//!         println!("member: {name}");
//!     }
//!
//!     let bytes = archive.read_member("replay.details")?;
//!     let value = decode_value(&mut bytes.as_slice())?;
//!     println!("{value}");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`error`] - Error types and result alias
//! - [`binary`] - Little-endian readers for slices and streams
//! - [`format`] - Section signatures and archive format versions
//! - [`crypto`] - Crypt table, name hashing and the table cipher
//! - [`header`] - User data preamble and archive header
//! - [`archive`] - Hash/block tables, member lookup and extraction
//! - [`decompress`] - Compressed member streams
//! - [`tagged`] - Self-describing tagged values and varints
//! - [`bits`] - Bit cursor for bit-packed streams
//! - [`protocol`] - Type descriptors, grammar engine and schema registry
//! - [`events`] - Game, message and tracker event stream framing
//! - [`replay`] - Well-known replay members
//! - [`limits`] - Decode limits for untrusted input
//!
//! ## Format Notes
//!
//! All multi-byte integers in headers and tables are little-endian. Bit
//! fields are read from the low end of each byte first.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]

pub mod archive;
pub mod binary;
pub mod bits;
pub mod crypto;
pub mod decompress;
pub mod error;
pub mod events;
pub mod format;
pub mod header;
pub mod limits;
pub mod protocol;
pub mod replay;
pub mod tagged;

// Re-export commonly used types at the crate root
pub use archive::{Archive, ArchiveIndex, BlockFlags, MemberEntry};
pub use bits::BitCursor;
pub use crypto::{hash_string, HashType};
pub use error::{ParserError, Result};
pub use events::{
    BitEventReader, EventMetadata, GameEvent, TrackerEvent, TrackerEventReader, TrackerEventType,
};
pub use header::{ArchiveHeader, ArchiveHeaders, UserDataHeader};
pub use limits::DecodeLimits;
pub use protocol::{Decoded, SchemaRegistry, StreamKind, TypeDescriptor};
pub use replay::{Details, Player, Replay};
pub use tagged::{decode_value, Value};
