//! Dictionary encoding for TEXT values
//!
//! Maps byte strings to integer ids. Text columns in sensor data are mostly
//! low-cardinality (states, codes, labels).
//!
//! Layout: `u32 LE` entry count, then each entry as `u32 LE` length + bytes,
//! then one id per value as a delta varint stream.

use crate::error::{CompressionError, Result};
use crate::integer::{IntegerDecoder, IntegerEncoder};
use crate::ValueDecoder;
use std::collections::HashMap;

/// Dictionary encoder for byte strings
pub struct DictionaryEncoder {
    /// Bytes to id
    ids: HashMap<Vec<u8>, u32>,
    /// Id to bytes
    entries: Vec<Vec<u8>>,
    encoded: IntegerEncoder,
    max_size: usize,
}

impl DictionaryEncoder {
    /// Create a new dictionary encoder with default max size (65536)
    pub fn new() -> Self {
        Self::with_max_size(65536)
    }

    /// Create a new dictionary encoder with specified max size
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            ids: HashMap::new(),
            entries: Vec::new(),
            encoded: IntegerEncoder::new(),
            max_size,
        }
    }

    /// Encode one value, returning its dictionary id
    pub fn encode(&mut self, value: &[u8]) -> Result<u32> {
        let id = match self.ids.get(value) {
            Some(&id) => id,
            None => {
                if self.entries.len() >= self.max_size {
                    return Err(CompressionError::DictionaryFull { max: self.max_size });
                }
                let id = self.entries.len() as u32;
                self.ids.insert(value.to_vec(), id);
                self.entries.push(value.to_vec());
                id
            }
        };
        self.encoded.encode(i64::from(id));
        Ok(id)
    }

    /// Get dictionary size
    pub fn dictionary_size(&self) -> usize {
        self.entries.len()
    }

    /// Get number of encoded values
    pub fn count(&self) -> usize {
        self.encoded.count()
    }

    /// Serialize the dictionary and the id stream
    pub fn finish(self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        for entry in &self.entries {
            bytes.extend_from_slice(&(entry.len() as u32).to_le_bytes());
            bytes.extend_from_slice(entry);
        }
        bytes.extend_from_slice(&self.encoded.finish());
        bytes
    }
}

impl Default for DictionaryEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Dictionary decoder; owns the dictionary, streams the ids
pub struct DictionaryDecoder<'a> {
    dictionary: Vec<Vec<u8>>,
    ids: IntegerDecoder<'a>,
    remaining: usize,
}

impl<'a> DictionaryDecoder<'a> {
    /// Parse the dictionary header; ids are decoded lazily
    pub fn from_bytes(data: &'a [u8], expected_count: usize) -> Result<Self> {
        let mut pos = 0;
        let dict_size = read_u32(data, &mut pos)? as usize;

        let mut dictionary = Vec::with_capacity(dict_size.min(data.len()));
        for _ in 0..dict_size {
            let len = read_u32(data, &mut pos)? as usize;
            let entry = data
                .get(pos..pos + len)
                .ok_or(CompressionError::BufferUnderflow)?;
            dictionary.push(entry.to_vec());
            pos += len;
        }

        Ok(Self {
            dictionary,
            ids: IntegerDecoder::new(&data[pos..], expected_count),
            remaining: expected_count,
        })
    }

    /// Look up an id
    pub fn entry(&self, id: u32) -> Result<&[u8]> {
        self.dictionary
            .get(id as usize)
            .map(|e| e.as_slice())
            .ok_or(CompressionError::InvalidDictionaryIndex {
                index: id,
                max: self.dictionary.len() as u32,
            })
    }

    /// Get dictionary size
    pub fn dictionary_size(&self) -> usize {
        self.dictionary.len()
    }
}

impl ValueDecoder for DictionaryDecoder<'_> {
    type Item = Vec<u8>;

    fn decode_next(&mut self) -> Result<Option<Vec<u8>>> {
        let id = match self.ids.decode()? {
            Some(id) => id,
            None => return Ok(None),
        };
        let id = u32::try_from(id).map_err(|_| {
            CompressionError::InvalidData(format!("dictionary id {} out of range", id))
        })?;
        let value = self.entry(id)?.to_vec();
        self.remaining -= 1;
        Ok(Some(value))
    }

    fn remaining(&self) -> usize {
        self.remaining
    }
}

fn read_u32(data: &[u8], pos: &mut usize) -> Result<u32> {
    let bytes = data
        .get(*pos..*pos + 4)
        .ok_or(CompressionError::BufferUnderflow)?;
    *pos += 4;
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    Ok(u32::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(data: &[u8], count: usize) -> Vec<Vec<u8>> {
        let mut decoder = DictionaryDecoder::from_bytes(data, count).unwrap();
        let mut out = Vec::new();
        while let Some(v) = decoder.decode_next().unwrap() {
            out.push(v);
        }
        out
    }

    #[test]
    fn test_basic_encoding() {
        let mut encoder = DictionaryEncoder::new();

        let id1 = encoder.encode(b"hello").unwrap();
        let id2 = encoder.encode(b"world").unwrap();
        let id3 = encoder.encode(b"hello").unwrap();

        assert_eq!(id1, 0);
        assert_eq!(id2, 1);
        assert_eq!(id3, 0);

        assert_eq!(encoder.dictionary_size(), 2);
        assert_eq!(encoder.count(), 3);
    }

    #[test]
    fn test_encoding_decoding_roundtrip() {
        let values: Vec<&[u8]> = ["foo", "bar", "", "foo", "世界", "bar"]
            .iter()
            .map(|s| s.as_bytes())
            .collect();
        let mut encoder = DictionaryEncoder::new();
        for v in &values {
            encoder.encode(v).unwrap();
        }
        let data = encoder.finish();

        let decoded = decode_all(&data, values.len());
        let expected: Vec<Vec<u8>> = values.iter().map(|v| v.to_vec()).collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_non_utf8_bytes() {
        let mut encoder = DictionaryEncoder::new();
        encoder.encode(&[0xFF, 0x00, 0xFE]).unwrap();
        let data = encoder.finish();
        assert_eq!(decode_all(&data, 1), vec![vec![0xFF, 0x00, 0xFE]]);
    }

    #[test]
    fn test_dictionary_full() {
        let mut encoder = DictionaryEncoder::with_max_size(3);

        encoder.encode(b"a").unwrap();
        encoder.encode(b"b").unwrap();
        encoder.encode(b"c").unwrap();
        encoder.encode(b"a").unwrap();

        let result = encoder.encode(b"d");
        assert!(matches!(result, Err(CompressionError::DictionaryFull { max: 3 })));
    }

    #[test]
    fn test_low_cardinality_compression() {
        let states: Vec<String> = (0..10).map(|i| format!("state-{:04}", i)).collect();
        let mut encoder = DictionaryEncoder::new();
        for _ in 0..100 {
            for s in &states {
                encoder.encode(s.as_bytes()).unwrap();
            }
        }
        let data = encoder.finish();

        let uncompressed: usize = states.iter().map(|s| s.len()).sum::<usize>() * 100;
        assert!(data.len() * 4 < uncompressed);
    }

    #[test]
    fn test_invalid_index() {
        // Dictionary with one entry, id stream pointing at id 5
        let mut data = Vec::new();
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.push(b'x');
        data.push(5);

        let mut decoder = DictionaryDecoder::from_bytes(&data, 1).unwrap();
        assert!(matches!(
            decoder.decode_next(),
            Err(CompressionError::InvalidDictionaryIndex { index: 5, max: 1 })
        ));
    }

    #[test]
    fn test_truncated_header() {
        let data = [2u8, 0, 0, 0, 9, 0];
        assert!(matches!(
            DictionaryDecoder::from_bytes(&data, 1),
            Err(CompressionError::BufferUnderflow)
        ));
    }
}
