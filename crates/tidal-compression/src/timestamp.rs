//! Delta-of-delta coding for page time columns
//!
//! Sensors sample on a fixed period, so the change between consecutive
//! deltas is nearly always zero and costs a single bit. The first timestamp
//! is written raw; every later one as `delta - previous delta`, where the
//! delta before the second timestamp counts as zero.
//!
//! | second difference | bits                 |
//! |-------------------|----------------------|
//! | 0                 | `0`                  |
//! | -63 ..= 64        | `10` + 7             |
//! | -255 ..= 256      | `110` + 9            |
//! | -2047 ..= 2048    | `1110` + 12          |
//! | anything else     | `1111` + 64          |

use crate::bits::{BitReader, BitWriter};
use crate::error::Result;
use crate::ValueDecoder;
use tidal_core::Timestamp;

/// Biased fixed-width ranges, tried in order after the zero case
struct Range {
    prefix: u64,
    prefix_len: usize,
    width: usize,
    bias: i64,
}

const RANGES: [Range; 3] = [
    Range { prefix: 0b10, prefix_len: 2, width: 7, bias: 63 },
    Range { prefix: 0b110, prefix_len: 3, width: 9, bias: 255 },
    Range { prefix: 0b1110, prefix_len: 4, width: 12, bias: 2047 },
];

const ESCAPE: (u64, usize) = (0b1111, 4);

impl Range {
    #[inline]
    fn holds(&self, dod: i64) -> bool {
        (-self.bias..=self.bias + 1).contains(&dod)
    }
}

/// Previous timestamp and the delta that led to it
#[derive(Clone, Copy)]
struct Cursor {
    time: Timestamp,
    delta: i64,
}

/// Writes an ascending time column
pub struct TimestampEncoder {
    writer: BitWriter,
    cursor: Option<Cursor>,
    written: usize,
}

impl TimestampEncoder {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            writer: BitWriter::with_capacity(capacity),
            cursor: None,
            written: 0,
        }
    }

    pub fn encode(&mut self, timestamp: Timestamp) {
        self.written += 1;
        let Some(cursor) = self.cursor else {
            self.writer.write_u64(timestamp as u64);
            self.cursor = Some(Cursor { time: timestamp, delta: 0 });
            return;
        };

        let delta = timestamp.wrapping_sub(cursor.time);
        self.put_dod(delta.wrapping_sub(cursor.delta));
        self.cursor = Some(Cursor { time: timestamp, delta });
    }

    pub fn count(&self) -> usize {
        self.written
    }

    pub fn finish(self) -> Vec<u8> {
        self.writer.finish()
    }

    fn put_dod(&mut self, dod: i64) {
        if dod == 0 {
            self.writer.write_bit(false);
            return;
        }
        match RANGES.iter().find(|r| r.holds(dod)) {
            Some(range) => {
                self.writer.write_bits(range.prefix, range.prefix_len);
                self.writer.write_bits((dod + range.bias) as u64, range.width);
            }
            None => {
                self.writer.write_bits(ESCAPE.0, ESCAPE.1);
                self.writer.write_u64(dod as u64);
            }
        }
    }
}

impl Default for TimestampEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads back a column written by [`TimestampEncoder`]
pub struct TimestampDecoder<'a> {
    reader: BitReader<'a>,
    cursor: Option<Cursor>,
    remaining: usize,
}

impl<'a> TimestampDecoder<'a> {
    pub fn new(data: &'a [u8], expected_count: usize) -> Self {
        Self {
            reader: BitReader::new(data),
            cursor: None,
            remaining: expected_count,
        }
    }

    pub fn decode(&mut self) -> Result<Option<Timestamp>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let next = match self.cursor {
            None => Cursor {
                time: self.reader.read_u64()? as Timestamp,
                delta: 0,
            },
            Some(cursor) => {
                let delta = cursor.delta.wrapping_add(self.take_dod()?);
                Cursor {
                    time: cursor.time.wrapping_add(delta),
                    delta,
                }
            }
        };

        self.cursor = Some(next);
        self.remaining -= 1;
        Ok(Some(next.time))
    }

    pub fn decode_all(&mut self) -> Result<Vec<Timestamp>> {
        // Every timestamp takes at least one bit
        let mut out = Vec::with_capacity(self.remaining.min(self.reader.remaining_bits()));
        while let Some(t) = self.decode()? {
            out.push(t);
        }
        Ok(out)
    }

    fn take_dod(&mut self) -> Result<i64> {
        if !self.reader.read_bit()? {
            return Ok(0);
        }
        for range in &RANGES {
            if !self.reader.read_bit()? {
                return Ok(self.reader.read_bits(range.width)? as i64 - range.bias);
            }
        }
        Ok(self.reader.read_u64()? as i64)
    }
}

impl ValueDecoder for TimestampDecoder<'_> {
    type Item = Timestamp;

    fn decode_next(&mut self) -> Result<Option<Timestamp>> {
        self.decode()
    }

    fn remaining(&self) -> usize {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompressionError;

    fn encode(times: &[Timestamp]) -> Vec<u8> {
        let mut encoder = TimestampEncoder::with_capacity(times.len());
        times.iter().for_each(|&t| encoder.encode(t));
        assert_eq!(encoder.count(), times.len());
        encoder.finish()
    }

    fn decode(data: &[u8], count: usize) -> Vec<Timestamp> {
        TimestampDecoder::new(data, count).decode_all().unwrap()
    }

    #[test]
    fn test_fixed_period_layout() {
        // 64 raw bits, then dod 10 in the 7-bit range, then two zero bits
        let data = encode(&[100, 110, 120, 130]);
        assert_eq!(data.len(), (64 + 9 + 2 + 7) / 8);
        assert_eq!(decode(&data, 4), vec![100, 110, 120, 130]);
    }

    #[test]
    fn test_one_second_sampling_over_a_day() {
        let times: Vec<Timestamp> = (0..86_400).map(|i| 1_700_000_000_000 + i * 1000).collect();
        let data = encode(&times);
        // Raw first value, 16 bits for the first delta, then 1 bit each
        assert_eq!(data.len(), (64 + 16 + 86_398 + 7) / 8);
        assert_eq!(decode(&data, times.len()), times);
    }

    #[test]
    fn test_range_edges() {
        let mut times = vec![0i64];
        for dod_step in [64, -63, 65, 256, -255, 257, 2048, -2047, 2049, 1 << 40, 0] {
            let last_delta = if times.len() > 1 {
                times[times.len() - 1] - times[times.len() - 2]
            } else {
                0
            };
            let next = times[times.len() - 1] + last_delta + dod_step;
            times.push(next);
        }
        assert_eq!(decode(&encode(&times), times.len()), times);
    }

    #[test]
    fn test_range_membership() {
        assert!(RANGES[0].holds(64) && RANGES[0].holds(-63));
        assert!(!RANGES[0].holds(65) && !RANGES[0].holds(-64));
        assert!(RANGES[2].holds(2048) && !RANGES[2].holds(2049));
    }

    #[test]
    fn test_wrapping_extremes() {
        let times = [i64::MIN, -1, i64::MAX, 0];
        assert_eq!(decode(&encode(&times), times.len()), times);
    }

    #[test]
    fn test_irregular_gaps() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let mut t = 1_000i64;
        let times: Vec<Timestamp> = (0..1000)
            .map(|_| {
                t += rng.gen_range(1..100_000);
                t
            })
            .collect();
        assert_eq!(decode(&encode(&times), times.len()), times);
    }

    #[test]
    fn test_stops_after_expected_count() {
        let data = encode(&[5, 7]);
        let mut decoder = TimestampDecoder::new(&data, 2);
        assert_eq!(decoder.remaining(), 2);
        assert_eq!(decoder.decode_next().unwrap(), Some(5));
        assert_eq!(decoder.decode_next().unwrap(), Some(7));
        assert!(!decoder.has_next());
        assert_eq!(decoder.decode_next().unwrap(), None);
    }

    #[test]
    fn test_inflated_count_fails_without_allocating_it() {
        let data = encode(&[10, 20, 30]);
        let mut decoder = TimestampDecoder::new(&data, usize::MAX / 4);
        assert!(matches!(decoder.decode_all(), Err(CompressionError::BufferUnderflow)));
    }

    #[test]
    fn test_short_header() {
        let mut decoder = TimestampDecoder::new(&[0u8; 7], 1);
        assert!(matches!(decoder.decode(), Err(CompressionError::BufferUnderflow)));
    }
}
