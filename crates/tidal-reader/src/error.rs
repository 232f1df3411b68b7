//! Read path error types

use thiserror::Error;
use tidal_compression::CompressionError;
use tidal_core::{CoreError, DataType};

/// Read path errors
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: DataType, actual: DataType },

    #[error("Failed to decode page: {0}")]
    Decode(#[from] CompressionError),

    #[error("Invalid overlay: {0}")]
    InvalidOverlay(String),

    #[error("Invalid common timestamps: {0}")]
    InvalidCommonTimestamps(String),

    #[error("Invalid page layout: {0}")]
    PageLayout(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Series not found: {0}")]
    SeriesNotFound(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for read operations
pub type Result<T> = std::result::Result<T, ReadError>;
