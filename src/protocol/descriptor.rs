//! Type descriptors for bit-packed data.
//!
//! A descriptor is plain data: schemas for concrete event types are built
//! out of these nodes at runtime and handed to the decoding engine.

use std::collections::BTreeMap;

/// How a blob's byte length is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobLength {
    /// A constant length.
    Fixed(usize),
    /// A length read from the stream as an unsigned field of this width.
    Bits(u32),
}

/// A named member of a struct or a branch of a choice.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name, used when rendering decoded values.
    pub name: String,
    /// The field's type.
    pub descriptor: TypeDescriptor,
}

impl Field {
    /// Creates a field.
    pub fn new(name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
        }
    }
}

/// One node of the bit grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// `width` unsigned bits plus `bias`.
    Int {
        /// Number of bits, up to 64. Zero yields `bias` without reading.
        width: u32,
        /// Added to the raw value; may be negative.
        bias: i64,
    },
    /// A single bit.
    Bool,
    /// Raw bytes, read after realigning to a byte boundary.
    Blob(BlobLength),
    /// Fields decoded in order with no padding.
    Struct(Vec<Field>),
    /// A counted sequence of one element type.
    Array {
        /// Element type.
        element: Box<TypeDescriptor>,
        /// Width of the element count.
        count_width: u32,
        /// Added to the count read from the stream.
        count_bias: u64,
    },
    /// A presence bit, then the inner type if set.
    Optional(Box<TypeDescriptor>),
    /// A selector of `tag_width` bits, then the branch it names.
    Choice {
        /// Width of the selector.
        tag_width: u32,
        /// Branches keyed by selector value.
        branches: BTreeMap<u64, Field>,
    },
    /// A counted run of bits.
    BitArray {
        /// Width of the bit count.
        count_width: u32,
    },
    /// A 32-bit four character code.
    FourCC,
    /// Nothing; reads no bits.
    Null,
}

impl TypeDescriptor {
    /// An unsigned integer of `width` bits.
    #[must_use]
    pub fn uint(width: u32) -> Self {
        TypeDescriptor::Int { width, bias: 0 }
    }

    /// An integer of `width` bits offset by `bias`.
    #[must_use]
    pub fn int(width: u32, bias: i64) -> Self {
        TypeDescriptor::Int { width, bias }
    }

    /// A blob whose length is a `width`-bit field.
    #[must_use]
    pub fn blob(width: u32) -> Self {
        TypeDescriptor::Blob(BlobLength::Bits(width))
    }

    /// A blob of exactly `len` bytes.
    #[must_use]
    pub fn fixed_blob(len: usize) -> Self {
        TypeDescriptor::Blob(BlobLength::Fixed(len))
    }

    /// A struct from `(name, type)` pairs.
    #[must_use]
    pub fn structure<N: Into<String>>(
        fields: impl IntoIterator<Item = (N, TypeDescriptor)>,
    ) -> Self {
        TypeDescriptor::Struct(
            fields
                .into_iter()
                .map(|(name, descriptor)| Field::new(name, descriptor))
                .collect(),
        )
    }

    /// A struct with no fields.
    #[must_use]
    pub fn empty_struct() -> Self {
        TypeDescriptor::Struct(Vec::new())
    }

    /// An array whose count is a `count_width`-bit field.
    #[must_use]
    pub fn array(element: TypeDescriptor, count_width: u32) -> Self {
        TypeDescriptor::Array {
            element: Box::new(element),
            count_width,
            count_bias: 0,
        }
    }

    /// An array of exactly `count` elements.
    #[must_use]
    pub fn fixed_array(element: TypeDescriptor, count: u64) -> Self {
        TypeDescriptor::Array {
            element: Box::new(element),
            count_width: 0,
            count_bias: count,
        }
    }

    /// An optional wrapping `inner`.
    #[must_use]
    pub fn optional(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Optional(Box::new(inner))
    }

    /// A choice from `(tag, name, type)` triples.
    #[must_use]
    pub fn choice<N: Into<String>>(
        tag_width: u32,
        branches: impl IntoIterator<Item = (u64, N, TypeDescriptor)>,
    ) -> Self {
        TypeDescriptor::Choice {
            tag_width,
            branches: branches
                .into_iter()
                .map(|(tag, name, descriptor)| (tag, Field::new(name, descriptor)))
                .collect(),
        }
    }
}
