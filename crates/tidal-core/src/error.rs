//! Error types for tidal-core

use thiserror::Error;

/// Core error types
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid time range: start {start} >= end {end}")]
    InvalidTimeRange { start: i64, end: i64 },

    #[error("Invalid series path: {0:?}")]
    InvalidPath(String),

    #[error("Invalid value type: expected {expected}, got {actual}")]
    InvalidValueType { expected: String, actual: String },
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
