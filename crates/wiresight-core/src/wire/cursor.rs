//! Forward-only byte cursor over a borrowed buffer.
//!
//! [`ByteCursor`] provides the primitive reads the wire decoder is built on:
//! varints, fixed-width integers, and raw byte slices, plus a single-slot
//! checkpoint used to roll back a partially consumed field.

use crate::error::{Error, Result};

/// A forward-only reader over an immutable byte buffer.
///
/// The cursor borrows its backing buffer; reads of length-delimited data
/// return subslices of it rather than copies. The offset only moves forward,
/// except for an explicit [`reset_to_checkpoint`](Self::reset_to_checkpoint).
#[derive(Debug)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    offset: usize,
    saved_offset: usize,
}

impl<'a> ByteCursor<'a> {
    /// Creates a cursor positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            offset: 0,
            saved_offset: 0,
        }
    }

    /// Reads a variable-length integer.
    ///
    /// Each byte contributes its lower 7 bits; the MSB marks continuation.
    /// Varints are at most 10 bytes for a 64-bit value; longer encodings fail
    /// with [`Error::MalformedVarint`]. Running out of buffer mid-varint fails
    /// with [`Error::InsufficientBytes`].
    ///
    /// Returns the decoded value and the number of bytes consumed.
    pub fn read_varint(&mut self) -> Result<(u64, usize)> {
        let start = self.offset;
        let mut result: u64 = 0;
        let mut shift: u32 = 0;

        loop {
            if shift >= 70 {
                return Err(Error::malformed_varint(start));
            }

            let byte = *self
                .buf
                .get(self.offset)
                .ok_or_else(|| Error::insufficient_bytes(1, 0))?;
            self.offset += 1;

            result |= u64::from(byte & 0x7f) << shift;
            shift += 7;

            if byte & 0x80 == 0 {
                return Ok((result, self.offset - start));
            }
        }
    }

    /// Reads the next `n` bytes as a borrowed subslice and advances the offset.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::insufficient_bytes(n, self.remaining()));
        }
        let slice = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    /// Reads a fixed 32-bit little-endian unsigned integer.
    pub fn read_fixed32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("4-byte slice")))
    }

    /// Reads a fixed 64-bit little-endian unsigned integer.
    pub fn read_fixed64(&mut self) -> Result<u64> {
        let bytes = self.read_bytes(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("8-byte slice")))
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Returns the current read offset.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Saves the current offset as a checkpoint.
    pub fn checkpoint(&mut self) {
        self.saved_offset = self.offset;
    }

    /// Restores the offset to the last saved checkpoint.
    pub fn reset_to_checkpoint(&mut self) {
        self.offset = self.saved_offset;
    }
}
