//! Decoded tagged values.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// A self-describing value.
///
/// Map keys are unordered on the wire; they are kept sorted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Value {
    /// An absent optional.
    Null,
    /// A single raw byte (tag `0x06`).
    UInt8(u8),
    /// A little-endian 32-bit word (tag `0x07`).
    UInt32(u32),
    /// A signed varint (tag `0x09`).
    Int(i64),
    /// A byte string (tag `0x02`). Usually text.
    Bytes(Vec<u8>),
    /// An array (tag `0x00`).
    Array(Vec<Value>),
    /// A map with integer keys (tag `0x05`).
    Map(BTreeMap<i64, Value>),
}

impl Value {
    /// Looks up `key` in a map. Returns `None` for other variants.
    #[must_use]
    pub fn get(&self, key: i64) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(&key))
    }

    /// Returns the entries of a map.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<i64, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the elements of an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the contents of a byte string.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns a byte string as text, replacing invalid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<String> {
        self.as_bytes()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Returns any integer variant widened to `i64`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::UInt8(v) => Some(i64::from(v)),
            Value::UInt32(v) => Some(i64::from(v)),
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Returns whether this is [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent + 1);
        match self {
            Value::Null => write!(f, "nil"),
            Value::UInt8(v) => write!(f, "{v:#x}"),
            Value::UInt32(v) => write!(f, "{v:#x}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Bytes(bytes) => write!(f, "{:?}", String::from_utf8_lossy(bytes)),
            Value::Array(items) => {
                writeln!(f, "[")?;
                for item in items {
                    write!(f, "{pad}")?;
                    item.fmt_indented(f, indent + 1)?;
                    writeln!(f)?;
                }
                write!(f, "{}]", "  ".repeat(indent))
            }
            Value::Map(map) => {
                writeln!(f, "{{")?;
                for (key, item) in map {
                    write!(f, "{pad}{key}: ")?;
                    item.fmt_indented(f, indent + 1)?;
                    writeln!(f)?;
                }
                write!(f, "{}}}", "  ".repeat(indent))
            }
        }
    }
}

/// Renders the value as an indented tree with map keys in order.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
