//! Tidal Core - Core types for the tidal read path
//!
//! This crate provides the fundamental data types shared by the reader and query crates:
//! - `Timestamp`: signed 64-bit timestamps
//! - `DataType`: the six value domains a series can hold
//! - `Value`: a dynamically typed value of one of those domains
//! - `DataPoint`: a single `(timestamp, value)` pair
//! - `SeriesPath`: dotted identifier of one series (`device.measurement`)
//! - `TimeRange`: half-open `[start, end)` range

pub mod error;
pub mod types;

pub use error::{CoreError, Result};
pub use types::*;
