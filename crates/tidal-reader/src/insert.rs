//! Buffered writes not yet flushed to pages

use std::collections::VecDeque;
use tidal_core::{DataPoint, Timestamp};

/// Time-ascending pull source of pending points for one series.
///
/// Points are consumed from the front; a buffer shared by consecutive page
/// merges simply resumes where the previous merge stopped.
#[derive(Debug, Clone)]
pub struct InsertBuffer<T> {
    points: VecDeque<DataPoint<T>>,
}

impl<T> InsertBuffer<T> {
    pub fn new() -> Self {
        Self {
            points: VecDeque::new(),
        }
    }

    /// Build from writes in arrival order.
    ///
    /// Points are ordered by time; when a timestamp was written more than once,
    /// the last write wins.
    pub fn from_writes(writes: Vec<DataPoint<T>>) -> Self {
        let mut writes = writes;
        // Stable, so equal timestamps keep arrival order
        writes.sort_by_key(|p| p.timestamp);

        let mut points: VecDeque<DataPoint<T>> = VecDeque::with_capacity(writes.len());
        for point in writes {
            match points.back_mut() {
                Some(last) if last.timestamp == point.timestamp => *last = point,
                _ => points.push_back(point),
            }
        }
        Self { points }
    }

    /// Time of the next pending point
    pub fn peek_time(&self) -> Option<Timestamp> {
        self.points.front().map(|p| p.timestamp)
    }

    /// Time of the last pending point
    pub fn last_time(&self) -> Option<Timestamp> {
        self.points.back().map(|p| p.timestamp)
    }

    /// Take the next pending point
    pub fn pop(&mut self) -> Option<DataPoint<T>> {
        self.points.pop_front()
    }

    pub fn has_more(&self) -> bool {
        !self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl<T> Default for InsertBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}
