//! Aggregation functions for time series data

use crate::error::{QueryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tidal_core::{DataType, Value};
use tidal_reader::PageValue;

/// Supported aggregation functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AggregateFunction {
    /// Count of values
    Count,
    /// Sum of values
    Sum,
    /// Mean (average) of values
    Mean,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// First value (by time)
    First,
    /// Last value (by time)
    Last,
    /// Sample standard deviation
    StdDev,
    /// Sample variance
    Variance,
    /// Percentile (0-100), linearly interpolated
    Percentile(u8),
}

impl AggregateFunction {
    /// Whether the function only makes sense over numeric series
    pub fn is_numeric_only(&self) -> bool {
        !matches!(
            self,
            AggregateFunction::Count | AggregateFunction::First | AggregateFunction::Last
        )
    }

    /// Type of the value produced over a series of `input` type
    pub fn result_type(&self, input: DataType) -> Result<DataType> {
        if self.is_numeric_only() && !input.is_numeric() {
            return Err(QueryError::InvalidAggregation(format!(
                "{} is not defined for {} series",
                self, input
            )));
        }

        Ok(match self {
            AggregateFunction::Count => DataType::Int64,
            AggregateFunction::Sum
            | AggregateFunction::Mean
            | AggregateFunction::StdDev
            | AggregateFunction::Variance
            | AggregateFunction::Percentile(_) => DataType::Double,
            AggregateFunction::Min
            | AggregateFunction::Max
            | AggregateFunction::First
            | AggregateFunction::Last => input,
        })
    }
}

fn parse_percentile(digits: Option<&str>, original: &str) -> Result<AggregateFunction> {
    digits
        .and_then(|p| p.parse::<u8>().ok())
        .filter(|&p| p <= 100)
        .map(AggregateFunction::Percentile)
        .ok_or_else(|| QueryError::InvalidAggregation(original.to_string()))
}

impl FromStr for AggregateFunction {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        let s_lower = s.to_lowercase();
        match s_lower.as_str() {
            "count" => Ok(AggregateFunction::Count),
            "sum" => Ok(AggregateFunction::Sum),
            "mean" | "avg" | "average" => Ok(AggregateFunction::Mean),
            "min" => Ok(AggregateFunction::Min),
            "max" => Ok(AggregateFunction::Max),
            "first" => Ok(AggregateFunction::First),
            "last" => Ok(AggregateFunction::Last),
            "stddev" | "std_dev" => Ok(AggregateFunction::StdDev),
            "variance" | "var" => Ok(AggregateFunction::Variance),
            _ if s_lower.starts_with("percentile_") => {
                parse_percentile(s_lower.strip_prefix("percentile_"), s)
            }
            _ if s_lower.starts_with('p') && s_lower.len() <= 4 => {
                parse_percentile(s_lower.strip_prefix('p'), s)
            }
            _ => Err(QueryError::InvalidAggregation(s.to_string())),
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateFunction::Count => f.write_str("count"),
            AggregateFunction::Sum => f.write_str("sum"),
            AggregateFunction::Mean => f.write_str("mean"),
            AggregateFunction::Min => f.write_str("min"),
            AggregateFunction::Max => f.write_str("max"),
            AggregateFunction::First => f.write_str("first"),
            AggregateFunction::Last => f.write_str("last"),
            AggregateFunction::StdDev => f.write_str("stddev"),
            AggregateFunction::Variance => f.write_str("variance"),
            AggregateFunction::Percentile(p) => write!(f, "percentile_{}", p),
        }
    }
}

impl TryFrom<String> for AggregateFunction {
    type Error = QueryError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<AggregateFunction> for String {
    fn from(function: AggregateFunction) -> Self {
        function.to_string()
    }
}

/// Welford running mean and variance
#[derive(Debug, Clone, Copy, Default)]
struct RunningStats {
    n: u64,
    sum: f64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn push(&mut self, x: f64) {
        self.n += 1;
        self.sum += x;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn variance(&self) -> f64 {
        if self.n < 2 {
            return 0.0;
        }
        self.m2 / (self.n - 1) as f64
    }
}

/// Running state of one aggregation over one window
#[derive(Debug, Clone)]
pub struct Aggregator<T> {
    function: AggregateFunction,
    count: u64,
    first: Option<T>,
    last: Option<T>,
    /// Min or max so far, depending on the function
    extreme: Option<T>,
    stats: RunningStats,
    /// Percentile only
    values: Vec<f64>,
}

impl<T: PageValue> Aggregator<T> {
    /// Create a new aggregator
    pub fn new(function: AggregateFunction) -> Self {
        Self {
            function,
            count: 0,
            first: None,
            last: None,
            extreme: None,
            stats: RunningStats::default(),
            values: Vec::new(),
        }
    }

    pub fn function(&self) -> AggregateFunction {
        self.function
    }

    /// Add a value to the aggregation. Values must arrive in time order.
    pub fn add(&mut self, value: &T) {
        self.count += 1;
        let numeric = value.to_f64().filter(|v| !v.is_nan());

        match self.function {
            AggregateFunction::Count => {}
            AggregateFunction::First => {
                if self.first.is_none() {
                    self.first = Some(value.clone());
                }
            }
            AggregateFunction::Last => self.last = Some(value.clone()),
            AggregateFunction::Min | AggregateFunction::Max => {
                if numeric.is_none() {
                    return;
                }
                let replace = match &self.extreme {
                    None => true,
                    Some(current) if self.function == AggregateFunction::Min => value < current,
                    Some(current) => value > current,
                };
                if replace {
                    self.extreme = Some(value.clone());
                }
            }
            AggregateFunction::Sum
            | AggregateFunction::Mean
            | AggregateFunction::StdDev
            | AggregateFunction::Variance => {
                if let Some(v) = numeric {
                    self.stats.push(v);
                }
            }
            AggregateFunction::Percentile(_) => {
                if let Some(v) = numeric {
                    self.values.push(v);
                }
            }
        }
    }

    /// Compute the aggregate result; `None` when the window had no usable points
    pub fn result(&self) -> Option<Value> {
        if self.count == 0 {
            return None;
        }

        match self.function {
            AggregateFunction::Count => Some(Value::Int64(self.count as i64)),
            AggregateFunction::First => self.first.clone().map(PageValue::into_value),
            AggregateFunction::Last => self.last.clone().map(PageValue::into_value),
            AggregateFunction::Min | AggregateFunction::Max => {
                self.extreme.clone().map(PageValue::into_value)
            }
            _ if self.stats.n == 0 && self.values.is_empty() => None,
            AggregateFunction::Sum => Some(Value::Double(self.stats.sum)),
            AggregateFunction::Mean => Some(Value::Double(self.stats.mean)),
            AggregateFunction::StdDev => Some(Value::Double(self.stats.variance().sqrt())),
            AggregateFunction::Variance => Some(Value::Double(self.stats.variance())),
            AggregateFunction::Percentile(p) => {
                let mut sorted = self.values.clone();
                sorted.sort_by(f64::total_cmp);

                let rank = (p as f64 / 100.0) * (sorted.len() - 1) as f64;
                let lower = rank.floor() as usize;
                let upper = rank.ceil() as usize;

                if lower == upper {
                    Some(Value::Double(sorted[lower]))
                } else {
                    let frac = rank - lower as f64;
                    Some(Value::Double(sorted[lower] * (1.0 - frac) + sorted[upper] * frac))
                }
            }
        }
    }

    /// Reset the aggregator for the next window
    pub fn reset(&mut self) {
        self.count = 0;
        self.first = None;
        self.last = None;
        self.extreme = None;
        self.stats = RunningStats::default();
        self.values.clear();
    }

    /// Number of points seen in the current window
    pub fn count(&self) -> u64 {
        self.count
    }
}
