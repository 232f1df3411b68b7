//! Group-by time windows
//!
//! Window `k` covers `[start + k * step, min(start + k * step + interval, end))`
//! for every `k` whose window start lies below `end`.

use crate::error::{QueryError, Result};
use serde::{Deserialize, Serialize};
use tidal_core::{TimeRange, Timestamp};

/// Window layout of a group-by query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Start of the first window (inclusive)
    pub start: Timestamp,
    /// End of the query range (exclusive)
    pub end: Timestamp,
    /// Width of each window
    pub interval: i64,
    /// Distance between consecutive window starts; at least `interval`
    pub sliding_step: i64,
}

impl WindowSpec {
    /// Tumbling windows: the step equals the interval
    pub fn tumbling(start: Timestamp, end: Timestamp, interval: i64) -> Self {
        Self {
            start,
            end,
            interval,
            sliding_step: interval,
        }
    }

    pub fn with_sliding_step(mut self, sliding_step: i64) -> Self {
        self.sliding_step = sliding_step;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.start >= self.end {
            return Err(QueryError::InvalidTimeRange {
                start: self.start,
                end: self.end,
            });
        }
        if self.interval <= 0 {
            return Err(QueryError::InvalidQuery(format!(
                "Window interval must be positive, got {}",
                self.interval
            )));
        }
        if self.sliding_step < self.interval {
            return Err(QueryError::InvalidQuery(format!(
                "Sliding step {} is smaller than the interval {}",
                self.sliding_step, self.interval
            )));
        }
        Ok(())
    }

    /// Number of windows; computed in 128 bits so extreme ranges cannot overflow
    pub fn window_count(&self) -> u64 {
        if self.start >= self.end || self.sliding_step <= 0 {
            return 0;
        }
        let range = self.end as i128 - self.start as i128;
        let step = self.sliding_step as i128;
        let count = (range + step - 1) / step;
        u64::try_from(count).unwrap_or(u64::MAX)
    }

    /// Window `k`, or `None` past the last window
    pub fn window(&self, k: u64) -> Option<TimeRange> {
        let offset = (k as i128).checked_mul(self.sliding_step as i128)?;
        let start = self.start as i128 + offset;
        if start >= self.end as i128 {
            return None;
        }
        let end = (start + self.interval as i128).min(self.end as i128);
        Some(TimeRange::new(start as Timestamp, end as Timestamp))
    }

    /// Reject layouts producing more than `max_windows` windows
    pub fn check_limit(&self, max_windows: u64) -> Result<()> {
        let count = self.window_count();
        if count > max_windows {
            return Err(QueryError::TooManyWindows {
                count,
                max: max_windows,
            });
        }
        Ok(())
    }
}

/// Forward-only cursor over the windows of a [`WindowSpec`]
#[derive(Debug, Clone)]
pub struct WindowCursor {
    spec: WindowSpec,
    next: u64,
}

impl WindowCursor {
    pub fn new(spec: WindowSpec) -> Self {
        Self { spec, next: 0 }
    }

    /// Index of the next window to be returned
    pub fn position(&self) -> u64 {
        self.next
    }
}

impl Iterator for WindowCursor {
    type Item = TimeRange;

    fn next(&mut self) -> Option<TimeRange> {
        let window = self.spec.window(self.next)?;
        self.next += 1;
        Some(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows(spec: WindowSpec) -> Vec<(i64, i64)> {
        WindowCursor::new(spec).map(|w| (w.start, w.end)).collect()
    }

    #[test]
    fn test_tumbling_windows() {
        let spec = WindowSpec::tumbling(0, 30, 10);
        assert_eq!(windows(spec), vec![(0, 10), (10, 20), (20, 30)]);
        assert_eq!(spec.window_count(), 3);
    }

    #[test]
    fn test_last_window_clipped_to_end() {
        let spec = WindowSpec::tumbling(0, 25, 10);
        assert_eq!(windows(spec), vec![(0, 10), (10, 20), (20, 25)]);
        assert_eq!(spec.window_count(), 3);
    }

    #[test]
    fn test_sliding_step_leaves_gaps() {
        let spec = WindowSpec::tumbling(100, 140, 5).with_sliding_step(15);
        assert_eq!(windows(spec), vec![(100, 105), (115, 120), (130, 135)]);
        assert_eq!(spec.window_count(), 3);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            WindowSpec::tumbling(10, 10, 1).validate(),
            Err(QueryError::InvalidTimeRange { .. })
        ));
        assert!(WindowSpec::tumbling(0, 10, 0).validate().is_err());
        assert!(WindowSpec::tumbling(0, 10, 5)
            .with_sliding_step(4)
            .validate()
            .is_err());
        assert!(WindowSpec::tumbling(0, 10, 5).validate().is_ok());
    }

    #[test]
    fn test_extreme_range_no_overflow() {
        let spec = WindowSpec::tumbling(i64::MIN, i64::MAX, i64::MAX);
        assert_eq!(spec.window_count(), 3);

        let all = windows(spec);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], (i64::MIN, -1));
        assert_eq!(all[2].1, i64::MAX);
    }

    #[test]
    fn test_window_limit() {
        let spec = WindowSpec::tumbling(0, 1_000, 1);
        assert!(spec.check_limit(1_000).is_ok());
        assert!(matches!(
            spec.check_limit(999),
            Err(QueryError::TooManyWindows { count: 1000, max: 999 })
        ));
    }
}
