//! Limits enforced while decoding untrusted streams.
//!
//! Length prefixes in both the tagged-value format and the bit grammar are
//! read straight from the wire. These limits are checked before anything
//! is allocated or recursed into.

/// Decoder limits shared by the tagged-value codec and the bit grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum nesting of arrays, maps, optionals, structs and choices.
    pub max_nesting_depth: usize,
    /// Maximum element count of an array or map.
    pub max_collection_len: usize,
    /// Maximum length of a byte string or blob.
    pub max_blob_len: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_nesting_depth: 64,
            max_collection_len: 1 << 20,
            max_blob_len: 16 << 20,
        }
    }
}

impl DecodeLimits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_nesting_depth: 8,
            max_collection_len: 64,
            max_blob_len: 256,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_nesting_depth: usize::MAX,
            max_collection_len: usize::MAX,
            max_blob_len: usize::MAX,
        }
    }
}
