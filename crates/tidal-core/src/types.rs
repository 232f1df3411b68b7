//! Core data types for the tidal read path

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Signed 64-bit timestamp; the unit is chosen by the writer
pub type Timestamp = i64;

/// Value domains a series can hold. Fixed per series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Float,
    Double,
    Text,
}

impl DataType {
    /// Canonical upper-case name
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Boolean => "BOOLEAN",
            DataType::Int32 => "INT32",
            DataType::Int64 => "INT64",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::Text => "TEXT",
        }
    }

    /// Whether sum/mean style statistics make sense for this type
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int32 | DataType::Int64 | DataType::Float | DataType::Double
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "BOOLEAN" | "BOOL" => Ok(DataType::Boolean),
            "INT32" | "INT" | "INTEGER" => Ok(DataType::Int32),
            "INT64" | "LONG" | "BIGINT" => Ok(DataType::Int64),
            "FLOAT" | "FLOAT32" => Ok(DataType::Float),
            "DOUBLE" | "FLOAT64" => Ok(DataType::Double),
            "TEXT" | "BINARY" | "STRING" => Ok(DataType::Text),
            _ => Err(CoreError::UnsupportedDataType(s.to_string())),
        }
    }
}

/// A value of one of the six domains
#[derive(Debug, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Value {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Text(Vec<u8>),
}

impl Value {
    /// Build a text value from a string slice
    pub fn text(s: &str) -> Self {
        Value::Text(s.as_bytes().to_vec())
    }

    /// Domain of this value
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Boolean(_) => DataType::Boolean,
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::Text(_) => DataType::Text,
        }
    }

    /// Try to convert to f64 (numeric domains only)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(*v as f64),
            Value::Int64(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Boolean(_) | Value::Text(_) => None,
        }
    }

    /// Try to convert to i64 (integer domains only)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as raw bytes
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Text(b) => Some(b),
            _ => None,
        }
    }

    /// Check the value against an expected domain
    pub fn expect_type(&self, expected: DataType) -> Result<()> {
        if self.data_type() == expected {
            Ok(())
        } else {
            Err(CoreError::InvalidValueType {
                expected: expected.to_string(),
                actual: self.data_type().to_string(),
            })
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", String::from_utf8_lossy(v)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::text(v)
    }
}

/// A single `(timestamp, value)` pair of one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint<V> {
    pub timestamp: Timestamp,
    pub value: V,
}

impl<V> DataPoint<V> {
    /// Create a new point
    pub fn new(timestamp: Timestamp, value: V) -> Self {
        Self { timestamp, value }
    }

    /// Map the value, keeping the timestamp
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> DataPoint<U> {
        DataPoint {
            timestamp: self.timestamp,
            value: f(self.value),
        }
    }
}

impl<V> From<(Timestamp, V)> for DataPoint<V> {
    fn from((timestamp, value): (Timestamp, V)) -> Self {
        Self { timestamp, value }
    }
}

/// Full dotted path of a series, e.g. `root.sg1.d1.s1`.
///
/// The last segment is the measurement, everything before it the device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesPath(String);

impl SeriesPath {
    /// Parse a dotted path, rejecting empty segments
    pub fn parse(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path.is_empty() || path.split('.').any(|segment| segment.is_empty()) {
            return Err(CoreError::InvalidPath(path));
        }
        Ok(Self(path))
    }

    /// Build a path from a device and a measurement
    pub fn from_parts(device: &str, measurement: &str) -> Result<Self> {
        Self::parse(format!("{}.{}", device, measurement))
    }

    /// Full path
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the last segment (empty for single-segment paths)
    pub fn device(&self) -> &str {
        self.0.rsplit_once('.').map(|(device, _)| device).unwrap_or("")
    }

    /// Last segment
    pub fn measurement(&self) -> &str {
        self.0
            .rsplit_once('.')
            .map(|(_, measurement)| measurement)
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for SeriesPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SeriesPath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Time range for queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start timestamp (inclusive)
    pub start: Timestamp,
    /// End timestamp (exclusive)
    pub end: Timestamp,
}

impl TimeRange {
    /// Create a new time range
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Create a time range, rejecting empty or inverted ranges
    pub fn checked(start: Timestamp, end: Timestamp) -> Result<Self> {
        if start >= end {
            return Err(CoreError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Check if a timestamp falls within this range
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Check if this range overlaps with another
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Duration of the range, saturating on overflow
    pub fn duration(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self {
            start: i64::MIN,
            end: i64::MAX,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_parse() {
        assert_eq!("int32".parse::<DataType>().unwrap(), DataType::Int32);
        assert_eq!("DOUBLE".parse::<DataType>().unwrap(), DataType::Double);
        assert_eq!("Bool".parse::<DataType>().unwrap(), DataType::Boolean);
        assert_eq!("text".parse::<DataType>().unwrap(), DataType::Text);

        let err = "INT96".parse::<DataType>().unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedDataType(ref s) if s == "INT96"));
    }

    #[test]
    fn test_data_type_numeric() {
        assert!(DataType::Int32.is_numeric());
        assert!(DataType::Double.is_numeric());
        assert!(!DataType::Boolean.is_numeric());
        assert!(!DataType::Text.is_numeric());
    }

    #[test]
    fn test_value_conversions() {
        let v = Value::Double(3.5);
        assert_eq!(v.as_f64(), Some(3.5));
        assert_eq!(v.data_type(), DataType::Double);

        let v = Value::Int32(-42);
        assert_eq!(v.as_i64(), Some(-42));
        assert_eq!(v.as_f64(), Some(-42.0));

        let v = Value::text("hello");
        assert_eq!(v.as_bytes(), Some(&b"hello"[..]));
        assert_eq!(v.as_f64(), None);

        let v = Value::Boolean(true);
        assert_eq!(v.as_bool(), Some(true));
        assert_eq!(v.as_f64(), None);
    }

    #[test]
    fn test_value_from_impls() {
        assert!(matches!(Value::from(1.5_f64), Value::Double(_)));
        assert!(matches!(Value::from(1.5_f32), Value::Float(_)));
        assert!(matches!(Value::from(7_i32), Value::Int32(7)));
        assert!(matches!(Value::from(7_i64), Value::Int64(7)));
        assert!(matches!(Value::from(false), Value::Boolean(false)));
        assert!(matches!(Value::from("x"), Value::Text(_)));
    }

    #[test]
    fn test_value_expect_type() {
        assert!(Value::Int64(1).expect_type(DataType::Int64).is_ok());
        let err = Value::Int64(1).expect_type(DataType::Int32).unwrap_err();
        assert!(matches!(err, CoreError::InvalidValueType { .. }));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Int32(5).to_string(), "5");
        assert_eq!(Value::text("abc").to_string(), "abc");
        assert_eq!(Value::Boolean(true).to_string(), "true");
    }

    #[test]
    fn test_series_path() {
        let path = SeriesPath::parse("root.sg1.d1.s1").unwrap();
        assert_eq!(path.device(), "root.sg1.d1");
        assert_eq!(path.measurement(), "s1");
        assert_eq!(path.to_string(), "root.sg1.d1.s1");

        let path = SeriesPath::from_parts("root.d2", "temp").unwrap();
        assert_eq!(path.as_str(), "root.d2.temp");

        let single = SeriesPath::parse("s1").unwrap();
        assert_eq!(single.device(), "");
        assert_eq!(single.measurement(), "s1");

        assert!(SeriesPath::parse("").is_err());
        assert!(SeriesPath::parse("root..s1").is_err());
        assert!(SeriesPath::parse("root.s1.").is_err());
    }

    #[test]
    fn test_data_point_map() {
        let p = DataPoint::new(10, 3_i32).map(Value::from);
        assert_eq!(p, DataPoint::new(10, Value::Int32(3)));
        let q: DataPoint<i64> = (5, 9).into();
        assert_eq!(q.timestamp, 5);
    }

    #[test]
    fn test_time_range() {
        let range = TimeRange::new(100, 200);

        assert!(range.contains(100));
        assert!(range.contains(150));
        assert!(!range.contains(200)); // end is exclusive
        assert!(!range.contains(50));

        let other = TimeRange::new(150, 250);
        assert!(range.overlaps(&other));

        let non_overlapping = TimeRange::new(200, 300);
        assert!(!range.overlaps(&non_overlapping));

        assert_eq!(range.duration(), 100);
        assert_eq!(TimeRange::default().duration(), i64::MAX);
    }

    #[test]
    fn test_time_range_checked() {
        assert!(TimeRange::checked(0, 10).is_ok());
        assert!(matches!(
            TimeRange::checked(10, 10),
            Err(CoreError::InvalidTimeRange { start: 10, end: 10 })
        ));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let p = DataPoint::new(1_609_459_200_000, Value::Double(64.5));
        let json = serde_json::to_string(&p).unwrap();
        let decoded: DataPoint<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(p, decoded);

        let json = serde_json::to_string(&DataType::Int64).unwrap();
        assert_eq!(json, "\"INT64\"");

        let path: SeriesPath = serde_json::from_str("\"root.d1.s1\"").unwrap();
        assert_eq!(path.measurement(), "s1");
    }
}
