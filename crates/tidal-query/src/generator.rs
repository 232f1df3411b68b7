//! Grid generation for value-filtered group-by
//!
//! The grid is never collected up front. Each aligned executor gets its own
//! cursor over the filter series, and the filter series is merged one page at
//! a time as the executor's reader asks for more grid points.

use crate::error::Result;
use crate::model::ValueFilter;
use tidal_core::{DataType, SeriesPath, Timestamp};
use tidal_reader::{
    Filter, GridCursor, GridSource, MergeReader, PageValue, Predicate, SeriesReader, SeriesStore,
};
use tracing::debug;

/// Derives a common timestamp grid from the points of one series that pass
/// the query's time predicate and a value predicate
pub struct TimestampGenerator<'a> {
    store: &'a dyn SeriesStore,
    filter: &'a ValueFilter,
    time_filter: Option<&'a Predicate<Timestamp>>,
}

impl<'a> TimestampGenerator<'a> {
    pub fn new(
        store: &'a dyn SeriesStore,
        filter: &'a ValueFilter,
        time_filter: Option<&'a Predicate<Timestamp>>,
    ) -> Self {
        Self {
            store,
            filter,
            time_filter,
        }
    }

    /// Open a fresh scan of the filter series as a lazily pulled grid
    pub fn open(&self) -> Result<GridCursor> {
        match self.filter.data_type {
            DataType::Boolean => self.scan::<bool>(),
            DataType::Int32 => self.scan::<i32>(),
            DataType::Int64 => self.scan::<i64>(),
            DataType::Float => self.scan::<f32>(),
            DataType::Double => self.scan::<f64>(),
            DataType::Text => self.scan::<Vec<u8>>(),
        }
    }

    fn scan<T: PageValue>(&self) -> Result<GridCursor> {
        let predicate = self.filter.predicate.clone().try_map(&mut T::from_value)?;
        let filter = Filter {
            time: self.time_filter.cloned(),
            value: Some(predicate),
        };

        let series = self
            .store
            .open_series(&self.filter.path, T::DATA_TYPE)?
            .into_typed::<T>()?;
        let source = FilteredGrid {
            path: self.filter.path.clone(),
            reader: MergeReader::new(series, filter),
            selected: 0,
        };
        Ok(GridCursor::new(Box::new(source)))
    }
}

/// Grid source yielding the matching timestamps of one merged page per batch
struct FilteredGrid<T: PageValue> {
    path: SeriesPath,
    reader: MergeReader<T>,
    selected: usize,
}

impl<T: PageValue> GridSource for FilteredGrid<T> {
    fn next_batch(&mut self) -> tidal_reader::Result<Option<Vec<Timestamp>>> {
        match self.reader.next_column()? {
            Some(column) => {
                self.selected += column.len();
                Ok(Some(column.timestamps()))
            }
            None => {
                debug!(
                    "Value filter on {} selected {} timestamps over {} pages",
                    self.path,
                    self.selected,
                    self.reader.pages_read()
                );
                Ok(None)
            }
        }
    }
}
