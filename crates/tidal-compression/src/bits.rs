//! Bit-level I/O shared by the bit-packed codecs
//!
//! Bits are written most significant first; the last byte is zero padded.
//! The Gorilla, delta-of-delta and boolean codecs all go through these two types.

use crate::error::{CompressionError, Result};

/// Appends bit fields to a byte buffer
pub struct BitWriter {
    bytes: Vec<u8>,
    /// Bits not yet flushed to `bytes`, right-aligned
    acc: u64,
    /// Number of valid bits in `acc`; always below 8 between calls
    pending: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            acc: 0,
            pending: 0,
        }
    }

    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.write_bits(bit as u64, 1);
    }

    /// Write the low `num_bits` bits of `value`
    #[inline]
    pub fn write_bits(&mut self, value: u64, num_bits: usize) {
        debug_assert!(num_bits <= 64);

        // Fed in chunks of at most 32 bits so `acc` cannot overflow
        let mut left = num_bits as u32;
        while left > 0 {
            let take = left.min(32);
            left -= take;
            let chunk = (value >> left) & ((1u64 << take) - 1);
            self.acc = (self.acc << take) | chunk;
            self.pending += take;

            while self.pending >= 8 {
                self.pending -= 8;
                self.bytes.push((self.acc >> self.pending) as u8);
            }
            self.acc &= (1u64 << self.pending) - 1;
        }
    }

    /// Write a full 64-bit word
    #[inline]
    pub fn write_u64(&mut self, value: u64) {
        if self.pending == 0 {
            self.bytes.extend_from_slice(&value.to_be_bytes());
        } else {
            self.write_bits(value, 64);
        }
    }

    /// Flush the padded final byte and return the buffer
    pub fn finish(mut self) -> Vec<u8> {
        if self.pending > 0 {
            self.bytes.push((self.acc << (8 - self.pending)) as u8);
        }
        self.bytes
    }

    /// Encoded size so far in bytes, counting a partial byte
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() + usize::from(self.pending > 0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads bit fields back in the order a [`BitWriter`] wrote them
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Read position in bits
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Read `num_bits` bits into the low bits of the result.
    ///
    /// Fails with `BufferUnderflow` without consuming anything if fewer bits remain.
    #[inline]
    pub fn read_bits(&mut self, num_bits: usize) -> Result<u64> {
        debug_assert!(num_bits <= 64);
        if num_bits > self.remaining_bits() {
            return Err(CompressionError::BufferUnderflow);
        }

        let mut value = 0u64;
        let mut left = num_bits;
        while left > 0 {
            let byte = self.data[self.pos / 8];
            let available = 8 - self.pos % 8;
            let take = available.min(left);
            let bits = (byte >> (available - take)) & ((1u16 << take) - 1) as u8;

            value = (value << take) | bits as u64;
            self.pos += take;
            left -= take;
        }
        Ok(value)
    }

    #[inline]
    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_bits(64)
    }

    /// Bits left before the end of the buffer, padding included
    #[inline]
    pub fn remaining_bits(&self) -> usize {
        self.data.len() * 8 - self.pos
    }
}
