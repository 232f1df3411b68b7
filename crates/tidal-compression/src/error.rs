//! Codec error types

use thiserror::Error;

/// Errors raised while encoding or decoding a value stream
#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("Buffer underflow: unexpected end of data")]
    BufferUnderflow,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Value out of range for {target}: {value}")]
    ValueOutOfRange { target: &'static str, value: i64 },

    #[error("Dictionary full: max {max} entries")]
    DictionaryFull { max: usize },

    #[error("Invalid dictionary index: {index} (max: {max})")]
    InvalidDictionaryIndex { index: u32, max: u32 },
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CompressionError>;
