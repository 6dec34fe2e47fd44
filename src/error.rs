//! Error types for archive, tagged-value, and bitstream decoding.
//!
//! Every failure in this crate is surfaced as a [`ParserError`]. None of
//! them are recoverable within the decode operation that produced them:
//! bit and byte framing carry no resynchronization markers, so a caller can
//! only abort the stream or keep what was decoded before the error.

use thiserror::Error;

/// The main error type for archive and replay decoding operations.
///
/// # Example
///
/// ```
/// use blizzard_replay::error::{ParserError, Result};
///
/// fn example_operation() -> Result<()> {
///     Err(ParserError::MemberNotFound {
///         name: "replay.details".to_string(),
///     })
/// }
/// ```
#[derive(Error, Debug)]
pub enum ParserError {
    /// An I/O error occurred while reading the underlying source.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A section did not start with a known archive signature.
    ///
    /// Archives start with either `MPQ\x1A` (main header) or `MPQ\x1B`
    /// (user data preamble).
    #[error("Invalid magic bytes: expected {expected}, found {found}")]
    InvalidMagic {
        /// The expected magic bytes (as hex string for display).
        expected: String,
        /// The bytes actually found (as hex string).
        found: String,
    },

    /// The archive header is malformed or uses an unsupported version.
    #[error("Malformed header: {reason}")]
    MalformedHeader {
        /// A description of what makes the header invalid.
        reason: String,
    },

    /// Reading the hash or block table failed.
    ///
    /// This means the archive itself is unusable; it is distinct from a
    /// member simply being absent.
    #[error("Failed to decrypt {table}: {source}")]
    TableDecryptFailure {
        /// Which table was being read.
        table: &'static str,
        /// The underlying I/O failure.
        source: std::io::Error,
    },

    /// No hash table entry matched the requested member name.
    #[error("Member not found: {name}")]
    MemberNotFound {
        /// The member name that was looked up.
        name: String,
    },

    /// A compressed member uses a method byte this crate cannot decode.
    #[error("Unsupported compression method 0x{method:02X}")]
    UnsupportedCompression {
        /// The leading compression method byte.
        method: u8,
    },

    /// The archive uses a feature this decoder does not implement.
    #[error("Unimplemented feature: {feature}")]
    UnimplementedFeature {
        /// A description of the missing feature.
        feature: String,
    },

    /// Decompression of a member failed.
    #[error("Decompression failed: {reason}")]
    DecompressionError {
        /// A description of the decompression failure.
        reason: String,
    },

    /// A tagged value started with an unknown type tag.
    #[error("Unknown tagged value tag 0x{tag:02X}")]
    UnknownTag {
        /// The tag byte.
        tag: u8,
    },

    /// A grammar choice read a selector with no matching branch.
    #[error("Unknown choice tag {tag} ({width}-bit selector)")]
    UnknownChoiceTag {
        /// The selector value read from the stream.
        tag: u64,
        /// Width of the selector in bits.
        width: u32,
    },

    /// The schema registry has no decoder for an event type id.
    #[error("Unknown {stream} event type {type_id}")]
    UnknownEventType {
        /// The stream the event was read from.
        stream: &'static str,
        /// The numeric event type id.
        type_id: u32,
    },

    /// The source ran out in the middle of a record.
    #[error("Truncated stream while reading {context}")]
    TruncatedStream {
        /// What was being read when the source ran out.
        context: String,
    },

    /// A bounds-checked slice read ran past the end of the buffer.
    #[error("Unexpected end of data: expected {expected} bytes, but only {available} available")]
    UnexpectedEof {
        /// The number of bytes that were expected to be available.
        expected: usize,
        /// The actual number of bytes available.
        available: usize,
    },

    /// A tracker event did not start with a known framing marker.
    #[error("Invalid tracker frame marker: {found}")]
    InvalidFrameMarker {
        /// The bytes found in place of the marker (as hex string).
        found: String,
    },

    /// A variable-length integer did not terminate within 64 bits.
    #[error("Variable-length integer exceeds 64 bits")]
    VarIntOverflow,

    /// A decoded length or depth exceeded the configured limit.
    #[error("{what} of {value} exceeds limit {limit}")]
    LimitExceeded {
        /// What was being limited.
        what: &'static str,
        /// The value found in the stream.
        value: u64,
        /// The configured maximum.
        limit: u64,
    },

    /// A decoded value did not have the shape a typed accessor expected.
    #[error("Unexpected value: {reason}")]
    UnexpectedValue {
        /// A description of the mismatch.
        reason: String,
    },
}

impl ParserError {
    /// Creates an `InvalidMagic` error with the given byte slices.
    ///
    /// # Example
    ///
    /// ```
    /// use blizzard_replay::error::ParserError;
    ///
    /// let err = ParserError::invalid_magic(b"MPQ\x1A", b"\x00\x00\x00\x00");
    /// assert!(err.to_string().contains("Invalid magic bytes"));
    /// ```
    #[must_use]
    pub fn invalid_magic(expected: &[u8], found: &[u8]) -> Self {
        ParserError::InvalidMagic {
            expected: bytes_to_hex(expected),
            found: bytes_to_hex(found),
        }
    }

    /// Creates an `UnexpectedEof` error with the given sizes.
    #[must_use]
    pub fn unexpected_eof(expected: usize, available: usize) -> Self {
        ParserError::UnexpectedEof { expected, available }
    }

    /// Creates a `TruncatedStream` error naming what was being read.
    #[must_use]
    pub fn truncated(context: impl Into<String>) -> Self {
        ParserError::TruncatedStream {
            context: context.into(),
        }
    }

    /// Creates an `InvalidFrameMarker` error for the bytes found.
    #[must_use]
    pub fn invalid_frame_marker(found: &[u8]) -> Self {
        ParserError::InvalidFrameMarker {
            found: bytes_to_hex(found),
        }
    }

    /// Maps an I/O error to `TruncatedStream` when it is an end-of-file.
    ///
    /// Other I/O failures are kept as `IoError`.
    #[must_use]
    pub fn from_io(err: std::io::Error, context: &str) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            ParserError::truncated(context)
        } else {
            ParserError::IoError(err)
        }
    }
}

/// Converts a byte slice to a hexadecimal string representation.
///
/// If the slice is 8 bytes or less, formats as space-separated hex values.
/// If longer, shows the first 8 bytes followed by "...".
pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    if bytes.len() <= 8 {
        bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        let prefix: String = bytes[..8]
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{prefix}... ({} bytes total)", bytes.len())
    }
}

/// A specialized Result type for decoding operations.
pub type Result<T> = std::result::Result<T, ParserError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_error_display() {
        let err = ParserError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        assert!(err.to_string().contains("I/O error"));

        let err = ParserError::MemberNotFound {
            name: "missing.txt".to_string(),
        };
        assert!(err.to_string().contains("missing.txt"));

        let err = ParserError::UnsupportedCompression { method: 0x02 };
        assert_eq!(err.to_string(), "Unsupported compression method 0x02");

        let err = ParserError::UnknownChoiceTag { tag: 5, width: 2 };
        assert!(err.to_string().contains("2-bit selector"));

        let err = ParserError::UnknownEventType {
            stream: "game",
            type_id: 99,
        };
        assert_eq!(err.to_string(), "Unknown game event type 99");

        let err = ParserError::unexpected_eof(128, 64);
        assert!(err.to_string().contains("expected 128 bytes"));
        assert!(err.to_string().contains("64 available"));
    }

    #[test]
    fn test_bytes_to_hex_short() {
        assert_eq!(bytes_to_hex(b"MPQ\x1A"), "4D 50 51 1A");
    }

    #[test]
    fn test_bytes_to_hex_long() {
        let result = bytes_to_hex(b"(block table)");
        assert!(result.contains("..."));
        assert!(result.contains("13 bytes total"));
    }

    #[test]
    fn test_invalid_magic_helper() {
        let err = ParserError::invalid_magic(b"MPQ\x1A", b"BAD!");
        match err {
            ParserError::InvalidMagic { expected, found } => {
                assert_eq!(expected, "4D 50 51 1A");
                assert_eq!(found, "42 41 44 21");
            }
            _ => panic!("Expected InvalidMagic variant"),
        }
    }

    #[test]
    fn test_from_io_maps_eof_to_truncated() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(
            ParserError::from_io(eof, "event body"),
            ParserError::TruncatedStream { context } if context == "event body"
        ));

        let other = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(
            ParserError::from_io(other, "event body"),
            ParserError::IoError(_)
        ));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ParserError>();
    }
}
