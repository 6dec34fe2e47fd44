//! Bit cursor over a byte source.
//!
//! Event streams pack fields at bit granularity. Bits are taken from the
//! low end of each source byte first, and each chunk read is appended
//! below the bits already accumulated:
//!
//! ```text
//! bytes:   0111 1100  0111 1100
//! read 3:        ^^^                -> 0b100   = 0x4
//! read 4:   ^^^ ^                   -> 0b1111  = 0xF
//! read 4:  ^                ^^^     -> 0b0100  = 0x4
//! read 5:             ^^^^ ^        -> 0b01111 = 0xF
//! ```
//!
//! A value that spans a byte boundary therefore has the bits of the
//! earlier byte in its high positions.

use std::io::BufRead;

use crate::error::{ParserError, Result};

/// Reads bit-packed fields from a buffered source.
///
/// At most one source byte is buffered inside the cursor. Everything else
/// stays in the underlying reader, so the cursor can report end of stream
/// exactly at a byte boundary.
#[derive(Debug)]
pub struct BitCursor<R> {
    inner: R,
    buf: u8,
    remaining: u32,
    bytes_read: u64,
}

impl<R: BufRead> BitCursor<R> {
    /// Creates a cursor at the first bit of `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: 0,
            remaining: 0,
            bytes_read: 0,
        }
    }

    /// Number of source bytes consumed so far, including a partly read one.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Returns whether the cursor sits on a byte boundary.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.remaining == 0
    }

    /// Returns the wrapped reader. Buffered bits are lost.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        let byte = match self.inner.fill_buf()?.first() {
            Some(&b) => b,
            None => return Ok(None),
        };
        self.inner.consume(1);
        self.bytes_read += 1;
        Ok(Some(byte))
    }

    /// Reads `count` bits, `count <= 64`.
    ///
    /// # Errors
    ///
    /// - `ParserError::TruncatedStream` if the source ends first
    /// - `ParserError::UnexpectedValue` if `count` is over 64
    pub fn read_bits(&mut self, count: u32) -> Result<u64> {
        if count > 64 {
            return Err(ParserError::UnexpectedValue {
                reason: format!("cannot read {count} bits into a 64-bit value"),
            });
        }

        let mut value = 0u64;
        let mut left = count;
        while left > 0 {
            if self.remaining == 0 {
                self.buf = self
                    .next_byte()?
                    .ok_or_else(|| ParserError::truncated(format!("{count}-bit field")))?;
                self.remaining = 8;
            }

            let take = self.remaining.min(left);
            let mask = (1u16 << take) - 1;
            value = (value << take) | u64::from(u16::from(self.buf) & mask);
            self.buf = (u16::from(self.buf) >> take) as u8;
            self.remaining -= take;
            left -= take;
        }
        Ok(value)
    }

    /// Reads one bit as a boolean.
    ///
    /// # Errors
    ///
    /// `ParserError::TruncatedStream` if the source is exhausted.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? != 0)
    }

    /// Discards the rest of the current byte.
    pub fn realign(&mut self) {
        self.remaining = 0;
        self.buf = 0;
    }

    /// Realigns, then reads `len` whole bytes.
    ///
    /// # Errors
    ///
    /// `ParserError::TruncatedStream` if fewer than `len` bytes remain.
    pub fn read_aligned_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.realign();
        let mut out = Vec::with_capacity(len.min(4096));
        while out.len() < len {
            let available = self.inner.fill_buf()?;
            if available.is_empty() {
                return Err(ParserError::truncated(format!("{len}-byte blob")));
            }
            let n = available.len().min(len - out.len());
            out.extend_from_slice(&available[..n]);
            self.inner.consume(n);
            self.bytes_read += n as u64;
        }
        Ok(out)
    }

    /// Returns whether no bits are left.
    ///
    /// # Errors
    ///
    /// `ParserError::IoError` if the source fails while checking.
    pub fn at_end(&mut self) -> Result<bool> {
        if self.remaining > 0 {
            return Ok(false);
        }
        Ok(self.inner.fill_buf()?.is_empty())
    }
}

/// Packs `(value, width)` chunks the way [`BitCursor`] reads them back,
/// padding the last byte with zeros.
#[cfg(test)]
pub(crate) fn pack(chunks: &[(u64, u32)]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut current = 0u8;
    let mut used = 0u32;
    for &(value, width) in chunks {
        let mut left = width;
        while left > 0 {
            let take = (8 - used).min(left);
            let part = (value >> (left - take)) & ((1 << take) - 1);
            current |= (part as u8) << used;
            used += take;
            left -= take;
            if used == 8 {
                out.push(current);
                current = 0;
                used = 0;
            }
        }
    }
    if used > 0 {
        out.push(current);
    }
    out
}
