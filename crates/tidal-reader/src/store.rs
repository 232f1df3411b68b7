//! Storage interface the readers are opened from

use crate::codec::PageValue;
use crate::error::{ReadError, Result};
use crate::insert::InsertBuffer;
use crate::overlay::{DeleteInterval, Overlay, UpdateInterval};
use crate::page::EncodedPage;
use crate::reader::{PageSource, VecPageSource};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use tidal_core::{DataPoint, DataType, SeriesPath, Timestamp, Value};
use tracing::{debug, warn};

/// Everything stored for one series, values still in dynamic form
pub struct SeriesData {
    pub path: SeriesPath,
    pub data_type: DataType,
    pub pages: Box<dyn PageSource>,
    /// Buffered writes in arrival order
    pub inserts: Vec<DataPoint<Value>>,
    pub updates: Vec<UpdateInterval<Value>>,
    pub deletes: Vec<DeleteInterval>,
}

impl SeriesData {
    /// Convert to the typed form a reader consumes.
    ///
    /// Fails with `TypeMismatch` if any buffered or override value is not of
    /// the series' type, and with `InvalidOverlay` on malformed interval lists.
    pub fn into_typed<T: PageValue>(self) -> Result<TypedSeries<T>> {
        if T::DATA_TYPE != self.data_type {
            return Err(ReadError::TypeMismatch {
                expected: T::DATA_TYPE,
                actual: self.data_type,
            });
        }

        let inserts = self
            .inserts
            .into_iter()
            .map(|p| Ok(DataPoint::new(p.timestamp, T::from_value(p.value)?)))
            .collect::<Result<Vec<_>>>()?;
        let updates = self
            .updates
            .into_iter()
            .map(|u| Ok(UpdateInterval::new(u.start, u.end, T::from_value(u.value)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(TypedSeries {
            pages: self.pages,
            inserts: InsertBuffer::from_writes(inserts),
            overlay: Overlay::new(updates, self.deletes)?,
        })
    }
}

/// Typed inputs of one series scan
pub struct TypedSeries<T> {
    pub pages: Box<dyn PageSource>,
    pub inserts: InsertBuffer<T>,
    pub overlay: Overlay<T>,
}

/// Source of series data
pub trait SeriesStore: Send + Sync {
    /// Open one series for reading.
    ///
    /// `data_type` is the type the caller expects; a different stored type is
    /// a `TypeMismatch`.
    fn open_series(&self, path: &SeriesPath, data_type: DataType) -> Result<SeriesData>;
}

#[derive(Debug, Clone)]
struct StoredSeries {
    data_type: DataType,
    pages: Vec<EncodedPage>,
    inserts: Vec<DataPoint<Value>>,
    updates: Vec<UpdateInterval<Value>>,
    deletes: Vec<DeleteInterval>,
}

/// In-memory series store
#[derive(Debug, Default)]
pub struct MemorySeriesStore {
    series: RwLock<FxHashMap<SeriesPath, StoredSeries>>,
}

impl MemorySeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series; registering an existing path with the same type is a no-op
    pub fn create_series(&self, path: SeriesPath, data_type: DataType) -> Result<()> {
        let mut series = self.series.write();
        if let Some(existing) = series.get(&path) {
            if existing.data_type != data_type {
                return Err(ReadError::TypeMismatch {
                    expected: existing.data_type,
                    actual: data_type,
                });
            }
            return Ok(());
        }
        debug!("Created series {} ({})", path, data_type);
        series.insert(
            path,
            StoredSeries {
                data_type,
                pages: Vec::new(),
                inserts: Vec::new(),
                updates: Vec::new(),
                deletes: Vec::new(),
            },
        );
        Ok(())
    }

    /// Append a page; it must start after the previous page ends
    pub fn append_page(&self, path: &SeriesPath, page: EncodedPage) -> Result<()> {
        self.with_series(path, |stored| {
            if page.data_type() != stored.data_type {
                return Err(ReadError::TypeMismatch {
                    expected: stored.data_type,
                    actual: page.data_type(),
                });
            }
            let prev_end = stored.pages.iter().rev().find_map(|p| p.last_time());
            if let (Some(prev_end), Some(first)) = (prev_end, page.first_time()) {
                if first <= prev_end {
                    warn!("Rejected page for {} starting at {} before {}", path, first, prev_end);
                    return Err(ReadError::PageLayout(format!(
                        "page starting at {} does not follow page ending at {}",
                        first, prev_end
                    )));
                }
            }
            stored.pages.push(page);
            Ok(())
        })
    }

    /// Buffer one write
    pub fn write(&self, path: &SeriesPath, timestamp: Timestamp, value: Value) -> Result<()> {
        self.with_series(path, |stored| {
            check_type(stored.data_type, &value)?;
            stored.inserts.push(DataPoint::new(timestamp, value));
            Ok(())
        })
    }

    /// Record an update interval
    pub fn update(
        &self,
        path: &SeriesPath,
        start: Timestamp,
        end: Timestamp,
        value: Value,
    ) -> Result<()> {
        self.with_series(path, |stored| {
            check_type(stored.data_type, &value)?;
            stored.updates.push(UpdateInterval::new(start, end, value));
            Ok(())
        })
    }

    /// Record a delete interval
    pub fn delete(&self, path: &SeriesPath, start: Timestamp, end: Timestamp) -> Result<()> {
        self.with_series(path, |stored| {
            stored.deletes.push(DeleteInterval::new(start, end));
            Ok(())
        })
    }

    /// Number of registered series
    pub fn series_count(&self) -> usize {
        self.series.read().len()
    }

    fn with_series<R>(
        &self,
        path: &SeriesPath,
        f: impl FnOnce(&mut StoredSeries) -> Result<R>,
    ) -> Result<R> {
        let mut series = self.series.write();
        let stored = series
            .get_mut(path)
            .ok_or_else(|| ReadError::SeriesNotFound(path.to_string()))?;
        f(stored)
    }
}

impl SeriesStore for MemorySeriesStore {
    fn open_series(&self, path: &SeriesPath, data_type: DataType) -> Result<SeriesData> {
        let series = self.series.read();
        let stored = series
            .get(path)
            .ok_or_else(|| ReadError::SeriesNotFound(path.to_string()))?;
        if stored.data_type != data_type {
            return Err(ReadError::TypeMismatch {
                expected: data_type,
                actual: stored.data_type,
            });
        }

        Ok(SeriesData {
            path: path.clone(),
            data_type,
            pages: Box::new(VecPageSource::new(stored.pages.clone())),
            inserts: stored.inserts.clone(),
            updates: stored.updates.clone(),
            deletes: stored.deletes.clone(),
        })
    }
}

fn check_type(expected: DataType, value: &Value) -> Result<()> {
    if value.data_type() != expected {
        return Err(ReadError::TypeMismatch {
            expected,
            actual: value.data_type(),
        });
    }
    Ok(())
}
