//! Values produced by the bit grammar.

use serde::Serialize;

/// A decoded struct member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedField {
    /// Field name from the descriptor.
    pub name: String,
    /// Decoded value.
    pub value: Decoded,
}

/// A value decoded by a [`TypeDescriptor`](super::TypeDescriptor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Decoded {
    /// An integer with its bias applied.
    Int(i64),
    /// A single bit.
    Bool(bool),
    /// Raw bytes.
    Blob(Vec<u8>),
    /// Struct members in declared order.
    Struct(Vec<DecodedField>),
    /// Array elements.
    Array(Vec<Decoded>),
    /// An optional; `None` when the presence bit was clear.
    Optional(Option<Box<Decoded>>),
    /// The selected branch of a choice.
    Choice {
        /// Selector value.
        tag: u64,
        /// Branch name.
        name: String,
        /// Branch value.
        value: Box<Decoded>,
    },
    /// A run of bits packed eight per byte in read order.
    BitArray {
        /// Number of bits.
        len: u64,
        /// Packed bits; the last byte holds the remainder.
        bits: Vec<u8>,
    },
    /// A four character code.
    FourCC(u32),
    /// No value.
    Null,
}

impl Decoded {
    /// Looks up a struct member by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Decoded> {
        match self {
            Decoded::Struct(fields) => fields.iter().find(|f| f.name == name).map(|f| &f.value),
            _ => None,
        }
    }

    /// Returns an integer value.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Decoded::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Decoded::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Returns blob bytes.
    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Decoded::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns whether this is [`Decoded::Null`] or an absent optional.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Decoded::Null | Decoded::Optional(None))
    }

    /// Renders a four character code as text.
    #[must_use]
    pub fn fourcc_string(code: u32) -> String {
        code.to_be_bytes()
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect()
    }
}
