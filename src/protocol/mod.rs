//! Bit-packed protocol grammar.
//!
//! Event bodies are described by [`TypeDescriptor`] trees and decoded by a
//! single generic engine. Concrete schemas are data registered in a
//! [`SchemaRegistry`]; this module knows none of them.
//!
//! # Example
//!
//! ```
//! use blizzard_replay::bits::BitCursor;
//! use blizzard_replay::protocol::{decode, Decoded, TypeDescriptor};
//!
//! let descriptor = TypeDescriptor::optional(TypeDescriptor::uint(8));
//! let mut cursor = BitCursor::new(&[0x01, 0x01][..]);
//! let value = decode(&mut cursor, &descriptor).unwrap();
//! assert_eq!(value, Decoded::Optional(Some(Box::new(Decoded::Int(1)))));
//! ```

pub mod decoded;
pub mod descriptor;
pub mod engine;
pub mod registry;

pub use decoded::{Decoded, DecodedField};
pub use descriptor::{BlobLength, Field, TypeDescriptor};
pub use engine::{decode, decode_with_limits};
pub use registry::{EventSchema, SchemaRegistry, StreamKind};
