//! Query error types

use thiserror::Error;
use tidal_reader::ReadError;

/// Query errors
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid time range: start {start} >= end {end}")]
    InvalidTimeRange { start: i64, end: i64 },

    #[error("Invalid aggregation: {0}")]
    InvalidAggregation(String),

    #[error("Too many windows: {count} exceeds the limit of {max}")]
    TooManyWindows { count: u64, max: u64 },

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Read error: {0}")]
    Read(#[from] ReadError),
}

/// Result type for query operations
pub type Result<T> = std::result::Result<T, QueryError>;
