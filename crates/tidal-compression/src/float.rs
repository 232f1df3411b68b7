//! Gorilla XOR compression for FLOAT and DOUBLE columns
//!
//! Each value after the first is stored as the XOR with its predecessor.
//! Only the bits between the XOR's leading and trailing zero runs are
//! written, and that window is reused while the next XOR still fits in it:
//!
//! ```text
//! first value        64 raw bits
//! same as previous   0
//! reuse window       10  <meaningful bits>
//! new window         11  <leading:5> <len-1:6> <meaningful bits>
//! ```
//!
//! FLOAT columns go through the same stream: widening `f32` to `f64` and
//! narrowing back are both exact.
//!
//! Reference: "Gorilla: A Fast, Scalable, In-Memory Time Series Database"
//! http://www.vldb.org/pvldb/vol8/p1816-teller.pdf

use crate::bits::{BitReader, BitWriter};
use crate::error::{CompressionError, Result};
use crate::ValueDecoder;

/// Largest leading-zero count the 5-bit header field can carry
const MAX_LEADING: u32 = 31;

/// Position of the meaningful bits inside a 64-bit XOR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct XorWindow {
    leading: u32,
    trailing: u32,
}

impl XorWindow {
    fn of(xor: u64) -> Self {
        Self {
            leading: xor.leading_zeros().min(MAX_LEADING),
            trailing: xor.trailing_zeros(),
        }
    }

    #[inline]
    fn width(self) -> u32 {
        64 - self.leading - self.trailing
    }

    #[inline]
    fn contains(self, other: XorWindow) -> bool {
        other.leading >= self.leading && other.trailing >= self.trailing
    }
}

/// Writes `f64` values as a Gorilla XOR stream
pub struct GorillaEncoder {
    writer: BitWriter,
    last: Option<u64>,
    window: Option<XorWindow>,
}

impl GorillaEncoder {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            writer: BitWriter::with_capacity(capacity),
            last: None,
            window: None,
        }
    }

    pub fn encode(&mut self, value: f64) {
        let bits = value.to_bits();
        let Some(last) = self.last.replace(bits) else {
            self.writer.write_u64(bits);
            return;
        };

        let xor = last ^ bits;
        if xor == 0 {
            self.writer.write_bit(false);
            return;
        }
        self.writer.write_bit(true);

        let fresh = XorWindow::of(xor);
        let window = match self.window {
            Some(current) if current.contains(fresh) => {
                self.writer.write_bit(false);
                current
            }
            _ => {
                self.writer.write_bit(true);
                self.writer.write_bits(fresh.leading as u64, 5);
                self.writer.write_bits((fresh.width() - 1) as u64, 6);
                self.window = Some(fresh);
                fresh
            }
        };
        self.writer
            .write_bits(xor >> window.trailing, window.width() as usize);
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.writer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_none()
    }

    pub fn finish(self) -> Vec<u8> {
        self.writer.finish()
    }
}

impl Default for GorillaEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads back a stream written by [`GorillaEncoder`]
pub struct GorillaDecoder<'a> {
    reader: BitReader<'a>,
    last: Option<u64>,
    window: Option<XorWindow>,
    remaining: usize,
}

impl<'a> GorillaDecoder<'a> {
    pub fn new(data: &'a [u8], expected_count: usize) -> Self {
        Self {
            reader: BitReader::new(data),
            last: None,
            window: None,
            remaining: expected_count,
        }
    }

    pub fn decode(&mut self) -> Result<Option<f64>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let bits = match self.last {
            None => self.reader.read_u64()?,
            Some(last) => last ^ self.read_xor()?,
        };

        self.last = Some(bits);
        self.remaining -= 1;
        Ok(Some(f64::from_bits(bits)))
    }

    fn read_xor(&mut self) -> Result<u64> {
        if !self.reader.read_bit()? {
            return Ok(0);
        }

        let window = if self.reader.read_bit()? {
            let leading = self.reader.read_bits(5)? as u32;
            let width = self.reader.read_bits(6)? as u32 + 1;
            if leading + width > 64 {
                return Err(CompressionError::InvalidData(format!(
                    "XOR window of {} bits after {} leading zeros",
                    width, leading
                )));
            }
            let window = XorWindow {
                leading,
                trailing: 64 - leading - width,
            };
            self.window = Some(window);
            window
        } else {
            self.window.ok_or_else(|| {
                CompressionError::InvalidData("XOR window reused before being set".to_string())
            })?
        };

        let meaningful = self.reader.read_bits(window.width() as usize)?;
        Ok(meaningful << window.trailing)
    }

    pub fn decode_all(&mut self) -> Result<Vec<f64>> {
        // Every value takes at least one bit
        let mut values = Vec::with_capacity(self.remaining.min(self.reader.remaining_bits()));
        while let Some(value) = self.decode()? {
            values.push(value);
        }
        Ok(values)
    }
}

impl ValueDecoder for GorillaDecoder<'_> {
    type Item = f64;

    fn decode_next(&mut self) -> Result<Option<f64>> {
        self.decode()
    }

    fn remaining(&self) -> usize {
        self.remaining
    }
}

/// Narrows a Gorilla stream of widened FLOAT values back to `f32`
pub struct Float32Decoder<'a>(GorillaDecoder<'a>);

impl<'a> Float32Decoder<'a> {
    pub fn new(data: &'a [u8], expected_count: usize) -> Self {
        Self(GorillaDecoder::new(data, expected_count))
    }
}

impl ValueDecoder for Float32Decoder<'_> {
    type Item = f32;

    fn decode_next(&mut self) -> Result<Option<f32>> {
        Ok(self.0.decode()?.map(|v| v as f32))
    }

    fn remaining(&self) -> usize {
        self.0.remaining
    }
}
