//! Delta varint coding for INT32 and INT64 columns
//!
//! Every value is written as its difference from the previous value (the
//! first one from zero). Differences are zigzag mapped so small negative
//! steps stay small, then written as LEB128 varints. A slowly changing
//! counter therefore costs one byte per sample.
//!
//! INT32 columns share the stream; [`Int32Decoder`] narrows on the way out.

use crate::error::{CompressionError, Result};
use crate::ValueDecoder;

/// Maps 0, -1, 1, -2, 2, ... onto 0, 1, 2, 3, 4, ...
#[inline]
fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
fn unzigzag(value: u64) -> i64 {
    (value >> 1) as i64 ^ -((value & 1) as i64)
}

fn put_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push(value as u8 | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Read one varint starting at `*pos`, advancing it past the last byte
fn take_varint(data: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value = 0u64;
    for shift in (0..64).step_by(7) {
        let byte = *data.get(*pos).ok_or(CompressionError::BufferUnderflow)?;
        *pos += 1;
        value |= u64::from(byte & 0x7F) << shift;
        if byte < 0x80 {
            return Ok(value);
        }
    }
    Err(CompressionError::InvalidData(
        "varint longer than 10 bytes".to_string(),
    ))
}

/// Writes `i64` values as zigzag delta varints
#[derive(Default)]
pub struct IntegerEncoder {
    out: Vec<u8>,
    last: i64,
    written: usize,
}

impl IntegerEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(values: usize) -> Self {
        Self {
            out: Vec::with_capacity(values),
            ..Self::default()
        }
    }

    pub fn encode(&mut self, value: i64) {
        put_varint(&mut self.out, zigzag(value.wrapping_sub(self.last)));
        self.last = value;
        self.written += 1;
    }

    /// Values encoded so far
    pub fn count(&self) -> usize {
        self.written
    }

    pub fn finish(self) -> Vec<u8> {
        self.out
    }
}

/// Reads back a stream written by [`IntegerEncoder`]
pub struct IntegerDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    last: i64,
    remaining: usize,
}

impl<'a> IntegerDecoder<'a> {
    pub fn new(data: &'a [u8], expected_count: usize) -> Self {
        Self {
            data,
            pos: 0,
            last: 0,
            remaining: expected_count,
        }
    }

    pub fn decode(&mut self) -> Result<Option<i64>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let delta = unzigzag(take_varint(self.data, &mut self.pos)?);
        self.last = self.last.wrapping_add(delta);
        self.remaining -= 1;
        Ok(Some(self.last))
    }

    pub fn decode_all(&mut self) -> Result<Vec<i64>> {
        let mut values = Vec::with_capacity(self.remaining.min(self.data.len() - self.pos));
        while let Some(v) = self.decode()? {
            values.push(v);
        }
        Ok(values)
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl ValueDecoder for IntegerDecoder<'_> {
    type Item = i64;

    fn decode_next(&mut self) -> Result<Option<i64>> {
        self.decode()
    }

    fn remaining(&self) -> usize {
        self.remaining
    }
}

/// INT32 view over an integer stream; values outside `i32` are rejected
pub struct Int32Decoder<'a>(IntegerDecoder<'a>);

impl<'a> Int32Decoder<'a> {
    pub fn new(data: &'a [u8], expected_count: usize) -> Self {
        Self(IntegerDecoder::new(data, expected_count))
    }
}

impl ValueDecoder for Int32Decoder<'_> {
    type Item = i32;

    fn decode_next(&mut self) -> Result<Option<i32>> {
        self.0
            .decode()?
            .map(|v| {
                i32::try_from(v).map_err(|_| CompressionError::ValueOutOfRange {
                    target: "INT32",
                    value: v,
                })
            })
            .transpose()
    }

    fn remaining(&self) -> usize {
        self.0.remaining
    }
}
