//! Merge output

use tidal_core::{DataPoint, Timestamp};

/// Ordered points produced by one merge or aligned pass.
///
/// `insert_count` is the provenance count: how many of the points came from
/// the insert buffer rather than the page.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultColumn<T> {
    pub points: Vec<DataPoint<T>>,
    pub insert_count: usize,
}

impl<T> ResultColumn<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            insert_count: 0,
        }
    }

    /// Append a point decoded from a page
    pub fn push(&mut self, timestamp: Timestamp, value: T) {
        self.points.push(DataPoint::new(timestamp, value));
    }

    /// Append a point taken from the insert buffer
    pub fn push_insert(&mut self, point: DataPoint<T>) {
        self.points.push(point);
        self.insert_count += 1;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Timestamps in emission order
    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    /// Append another column, keeping the provenance count
    pub fn extend(&mut self, other: ResultColumn<T>) {
        self.points.extend(other.points);
        self.insert_count += other.insert_count;
    }
}

impl<T: Clone> ResultColumn<T> {
    /// `(timestamp, value)` pairs, mostly for assertions
    pub fn pairs(&self) -> Vec<(Timestamp, T)> {
        self.points
            .iter()
            .map(|p| (p.timestamp, p.value.clone()))
            .collect()
    }
}

impl<T> Default for ResultColumn<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IntoIterator for ResultColumn<T> {
    type Item = DataPoint<T>;
    type IntoIter = std::vec::IntoIter<DataPoint<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}
