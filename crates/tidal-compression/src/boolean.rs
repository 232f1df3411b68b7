//! Bit-packed BOOLEAN values, one bit per value

use crate::bits::{BitReader, BitWriter};
use crate::error::Result;
use crate::ValueDecoder;

/// Boolean encoder
pub struct BooleanEncoder {
    writer: BitWriter,
    count: usize,
}

impl BooleanEncoder {
    pub fn new() -> Self {
        Self {
            writer: BitWriter::with_capacity(64),
            count: 0,
        }
    }

    /// Encode a boolean value
    pub fn encode(&mut self, value: bool) {
        self.writer.write_bit(value);
        self.count += 1;
    }

    /// Number of values encoded
    pub fn count(&self) -> usize {
        self.count
    }

    /// Finish encoding; the last byte is zero padded
    pub fn finish(self) -> Vec<u8> {
        self.writer.finish()
    }
}

impl Default for BooleanEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Boolean decoder
pub struct BooleanDecoder<'a> {
    reader: BitReader<'a>,
    count: usize,
    expected_count: usize,
}

impl<'a> BooleanDecoder<'a> {
    pub fn new(data: &'a [u8], expected_count: usize) -> Self {
        Self {
            reader: BitReader::new(data),
            count: 0,
            expected_count,
        }
    }
}

impl ValueDecoder for BooleanDecoder<'_> {
    type Item = bool;

    fn decode_next(&mut self) -> Result<Option<bool>> {
        if self.count >= self.expected_count {
            return Ok(None);
        }
        let bit = self.reader.read_bit()?;
        self.count += 1;
        Ok(Some(bit))
    }

    fn remaining(&self) -> usize {
        self.expected_count - self.count
    }
}
