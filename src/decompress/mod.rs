//! Decompression of archive members.
//!
//! A member with the `COMPRESSED` block flag stores one method byte ahead
//! of its payload. Only bzip2 (`0x10`) is decoded; every other method byte
//! is reported, not guessed at.
//!
//! # Member layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0x00 | 1 | compression method |
//! | 0x01 | `compressed_size - 1` | compressed payload |
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::{BufReader, Read};
//! use blizzard_replay::archive::Archive;
//!
//! let file = BufReader::new(File::open("game.SC2Replay").unwrap());
//! let mut archive = Archive::open(file).unwrap();
//! let mut member = archive.open_member("replay.details").unwrap();
//! let mut bytes = Vec::new();
//! member.read_to_end(&mut bytes).unwrap();
//! ```

use std::io::{self, Read, Take};

use bzip2::read::BzDecoder;
use serde::Serialize;
use tracing::trace;

use crate::binary::read_u8_from;
use crate::error::{ParserError, Result};

/// Compression method identified by a member's leading byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompressionMethod {
    /// bzip2 stream.
    Bzip2,
}

impl CompressionMethod {
    /// Method byte for bzip2.
    pub const BZIP2: u8 = 0x10;

    /// Maps a method byte to a supported method.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnsupportedCompression` for any byte other than
    /// `0x10`.
    pub fn from_byte(method: u8) -> Result<Self> {
        match method {
            Self::BZIP2 => Ok(CompressionMethod::Bzip2),
            other => Err(ParserError::UnsupportedCompression { method: other }),
        }
    }

    /// The method byte as stored in the archive.
    #[must_use]
    pub fn byte(self) -> u8 {
        match self {
            CompressionMethod::Bzip2 => Self::BZIP2,
        }
    }
}

/// A readable view of a member's decompressed bytes.
///
/// The reader borrows the archive source and is limited to the member's
/// stored bytes, so it never reads into the next member.
pub struct MemberReader<R: Read> {
    inner: BzDecoder<Take<R>>,
}

impl<R: Read> MemberReader<R> {
    /// Reads the method byte from `source` and wraps the remaining
    /// `compressed_size - 1` bytes in a decoder.
    ///
    /// `source` must be positioned at the start of the member.
    ///
    /// # Errors
    ///
    /// - `ParserError::DecompressionError` if `compressed_size` is zero
    /// - `ParserError::TruncatedStream` if the method byte is missing
    /// - `ParserError::UnsupportedCompression` for a method other than bzip2
    pub fn new(mut source: R, compressed_size: u64) -> Result<Self> {
        if compressed_size == 0 {
            return Err(ParserError::DecompressionError {
                reason: "compressed member has no method byte".to_string(),
            });
        }

        let method = CompressionMethod::from_byte(read_u8_from(&mut source, "compression method")?)?;
        trace!(?method, compressed_size, "Opening compressed member");

        let payload = source.take(compressed_size - 1);
        Ok(MemberReader {
            inner: BzDecoder::new(payload),
        })
    }
}

impl<R: Read> Read for MemberReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Decompresses a whole member held in memory.
///
/// `data` starts with the method byte.
///
/// # Errors
///
/// Same as [`MemberReader::new`], plus `ParserError::DecompressionError` if
/// the payload is not a valid stream.
pub fn decompress_member(data: &[u8]) -> Result<Vec<u8>> {
    let mut reader = MemberReader::new(data, data.len() as u64)?;
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .map_err(|e| ParserError::DecompressionError {
            reason: format!("bzip2 stream error: {e}"),
        })?;
    Ok(out)
}
