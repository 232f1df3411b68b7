//! Tidal Compression - value codecs for encoded series pages
//!
//! One codec per value domain, plus the timestamp codec used for the page's
//! time column:
//! - **Delta-of-delta**: timestamps
//! - **Zigzag varint delta**: INT32 / INT64
//! - **Gorilla XOR**: FLOAT / DOUBLE (FLOAT is widened losslessly)
//! - **Bit packing**: BOOLEAN
//! - **Dictionary**: TEXT (raw byte strings)
//!
//! Every decoder implements [`ValueDecoder`], which is the pull contract the
//! page readers consume.

pub mod bits;
pub mod boolean;
pub mod dictionary;
pub mod error;
pub mod float;
pub mod integer;
pub mod timestamp;

pub use boolean::{BooleanDecoder, BooleanEncoder};
pub use dictionary::{DictionaryDecoder, DictionaryEncoder};
pub use error::{CompressionError, Result};
pub use float::{Float32Decoder, GorillaDecoder, GorillaEncoder};
pub use integer::{Int32Decoder, IntegerDecoder, IntegerEncoder};
pub use timestamp::{TimestampDecoder, TimestampEncoder};

/// Pull interface over an encoded value stream.
///
/// Returns `Ok(None)` once the expected number of values has been produced.
pub trait ValueDecoder {
    type Item;

    /// Decode the next value
    fn decode_next(&mut self) -> Result<Option<Self::Item>>;

    /// Values still to be decoded
    fn remaining(&self) -> usize;

    /// Whether another value is available
    fn has_next(&self) -> bool {
        self.remaining() > 0
    }
}
