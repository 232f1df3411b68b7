//! Per-path group-by executors
//!
//! One executor owns the reader of one series and every aggregator requested
//! against that path, so the series is scanned once however many columns use it.
//! Windows never overlap and arrive in ascending order, so the scan only moves
//! forward; points past the current window stay pending for the next one.

use crate::aggregation::{AggregateFunction, Aggregator};
use crate::error::Result;
use crate::generator::TimestampGenerator;
use crate::model::ValueFilter;
use tidal_core::{DataPoint, DataType, SeriesPath, TimeRange, Timestamp, Value};
use tidal_reader::{
    open_reader, CommonTimestamps, Filter, GridCursor, PageValue, Predicate, ReadMode,
    SeriesReader, SeriesStore,
};
use tracing::debug;

/// Aggregates one series window by window
pub trait GroupByExecutor: Send {
    fn path(&self) -> &SeriesPath;

    /// Aggregate the points inside `window`; one result per aggregation, in
    /// the order the aggregations were requested
    fn compute(&mut self, window: &TimeRange) -> Result<Vec<Option<Value>>>;
}

/// Where an aligned executor takes its grid from
#[derive(Debug, Clone)]
pub enum GridPlan {
    /// Grid supplied with the query
    Fixed(CommonTimestamps),
    /// Matching timestamps of a filter series, scanned alongside each executor
    ValueFilter(ValueFilter),
}

/// How executors read their series
#[derive(Debug, Clone)]
pub enum ExecutorMode {
    /// Every point passing the time predicate
    Merge {
        time_filter: Option<Predicate<Timestamp>>,
    },
    /// Only points on the grid
    Aligned {
        grid: GridPlan,
        time_filter: Option<Predicate<Timestamp>>,
    },
}

impl ExecutorMode {
    fn read_mode<T: PageValue>(&self, store: &dyn SeriesStore) -> Result<ReadMode<T>> {
        Ok(match self {
            ExecutorMode::Merge { time_filter } => ReadMode::Merge(Filter {
                time: time_filter.clone(),
                value: None,
            }),
            ExecutorMode::Aligned { grid, time_filter } => ReadMode::Aligned {
                grid: match grid {
                    GridPlan::Fixed(grid) => GridCursor::fixed(grid.clone()),
                    GridPlan::ValueFilter(filter) => {
                        TimestampGenerator::new(store, filter, time_filter.as_ref()).open()?
                    }
                },
                time_filter: time_filter.clone(),
            },
        })
    }
}

/// Executor over a series of value type `T`
pub struct PathExecutor<T: PageValue> {
    path: SeriesPath,
    reader: Box<dyn SeriesReader<T>>,
    aggregators: Vec<Aggregator<T>>,
    /// Last column pulled from the reader and the next unconsumed point in it
    pending: Vec<DataPoint<T>>,
    pos: usize,
    exhausted: bool,
}

impl<T: PageValue> PathExecutor<T> {
    pub fn new(
        path: SeriesPath,
        reader: Box<dyn SeriesReader<T>>,
        functions: &[AggregateFunction],
    ) -> Self {
        Self {
            path,
            reader,
            aggregators: functions.iter().map(|&f| Aggregator::new(f)).collect(),
            pending: Vec::new(),
            pos: 0,
            exhausted: false,
        }
    }

    /// Open `path` from `store` and wrap its reader
    pub fn open(
        store: &dyn SeriesStore,
        path: &SeriesPath,
        functions: &[AggregateFunction],
        mode: &ExecutorMode,
    ) -> Result<Self> {
        let series = store.open_series(path, T::DATA_TYPE)?.into_typed::<T>()?;
        let reader = open_reader(series, mode.read_mode(store)?);
        debug!(
            "Opened {} executor for {} with {} aggregations",
            T::DATA_TYPE,
            path,
            functions.len()
        );
        Ok(Self::new(path.clone(), reader, functions))
    }

    /// Whether the underlying reader has returned its last column
    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.pos >= self.pending.len()
    }
}

impl<T: PageValue> GroupByExecutor for PathExecutor<T> {
    fn path(&self) -> &SeriesPath {
        &self.path
    }

    fn compute(&mut self, window: &TimeRange) -> Result<Vec<Option<Value>>> {
        for agg in &mut self.aggregators {
            agg.reset();
        }

        loop {
            if self.pos >= self.pending.len() {
                if self.exhausted {
                    break;
                }
                match self.reader.next_column()? {
                    Some(column) => {
                        self.pending = column.points;
                        self.pos = 0;
                    }
                    None => {
                        self.exhausted = true;
                        break;
                    }
                }
                continue;
            }

            let point = &self.pending[self.pos];
            if point.timestamp >= window.end {
                break;
            }
            // Points in the gap between sliding windows are skipped
            if point.timestamp >= window.start {
                for agg in &mut self.aggregators {
                    agg.add(&point.value);
                }
            }
            self.pos += 1;
        }

        Ok(self.aggregators.iter().map(Aggregator::result).collect())
    }
}

fn boxed<T: PageValue>(
    store: &dyn SeriesStore,
    path: &SeriesPath,
    functions: &[AggregateFunction],
    mode: &ExecutorMode,
) -> Result<Box<dyn GroupByExecutor>> {
    Ok(Box::new(PathExecutor::<T>::open(store, path, functions, mode)?))
}

/// Open an executor for a series of the declared `data_type`
pub fn open_executor(
    store: &dyn SeriesStore,
    path: &SeriesPath,
    data_type: DataType,
    functions: &[AggregateFunction],
    mode: &ExecutorMode,
) -> Result<Box<dyn GroupByExecutor>> {
    match data_type {
        DataType::Boolean => boxed::<bool>(store, path, functions, mode),
        DataType::Int32 => boxed::<i32>(store, path, functions, mode),
        DataType::Int64 => boxed::<i64>(store, path, functions, mode),
        DataType::Float => boxed::<f32>(store, path, functions, mode),
        DataType::Double => boxed::<f64>(store, path, functions, mode),
        DataType::Text => boxed::<Vec<u8>>(store, path, functions, mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidal_reader::{EncodedPage, MemorySeriesStore};

    fn store() -> (MemorySeriesStore, SeriesPath) {
        let store = MemorySeriesStore::new();
        let path = SeriesPath::parse("root.d1.s1").unwrap();
        store.create_series(path.clone(), DataType::Int64).unwrap();
        for chunk in [[1_i64, 2, 3], [11, 12, 25]] {
            let points: Vec<_> = chunk.iter().map(|&t| DataPoint::new(t, t * 10)).collect();
            store
                .append_page(&path, EncodedPage::encode(&points).unwrap())
                .unwrap();
        }
        (store, path)
    }

    #[test]
    fn test_windows_consume_forward() {
        let (store, path) = store();
        let mode = ExecutorMode::Merge { time_filter: None };
        let mut executor = open_executor(
            &store,
            &path,
            DataType::Int64,
            &[AggregateFunction::Count, AggregateFunction::Sum],
            &mode,
        )
        .unwrap();

        let first = executor.compute(&TimeRange::new(0, 10)).unwrap();
        assert_eq!(first, vec![Some(Value::Int64(3)), Some(Value::Double(60.0))]);

        let second = executor.compute(&TimeRange::new(10, 20)).unwrap();
        assert_eq!(second, vec![Some(Value::Int64(2)), Some(Value::Double(230.0))]);

        let empty = executor.compute(&TimeRange::new(20, 25)).unwrap();
        assert_eq!(empty, vec![None, None]);

        let last = executor.compute(&TimeRange::new(25, 30)).unwrap();
        assert_eq!(last, vec![Some(Value::Int64(1)), Some(Value::Double(250.0))]);
    }

    #[test]
    fn test_gap_points_skipped() {
        let (store, path) = store();
        let mode = ExecutorMode::Merge { time_filter: None };
        let mut executor =
            PathExecutor::<i64>::open(&store, &path, &[AggregateFunction::First], &mode).unwrap();

        // 1, 2, 3 fall before the window and are dropped
        let result = executor.compute(&TimeRange::new(10, 12)).unwrap();
        assert_eq!(result, vec![Some(Value::Int64(110))]);
        assert!(!executor.is_exhausted());

        executor.compute(&TimeRange::new(30, 40)).unwrap();
        assert!(executor.is_exhausted());
    }

    #[test]
    fn test_aligned_mode() {
        let (store, path) = store();
        let mode = ExecutorMode::Aligned {
            grid: GridPlan::Fixed(CommonTimestamps::new(vec![2, 12, 13]).unwrap()),
            time_filter: None,
        };
        let mut executor =
            open_executor(&store, &path, DataType::Int64, &[AggregateFunction::Count], &mode)
                .unwrap();
        assert_eq!(
            executor.compute(&TimeRange::new(0, 100)).unwrap(),
            vec![Some(Value::Int64(2))]
        );
    }

    #[test]
    fn test_value_filter_grid() {
        let (store, path) = store();
        let flags = SeriesPath::parse("root.d1.flag").unwrap();
        store.create_series(flags.clone(), DataType::Boolean).unwrap();
        let points: Vec<_> = [(2, true), (3, false), (11, true), (25, true)]
            .iter()
            .map(|&(t, v)| DataPoint::new(t, v))
            .collect();
        store
            .append_page(&flags, EncodedPage::encode(&points).unwrap())
            .unwrap();

        let mode = ExecutorMode::Aligned {
            grid: GridPlan::ValueFilter(ValueFilter {
                path: flags,
                data_type: DataType::Boolean,
                predicate: Predicate::Eq(Value::Boolean(true)),
            }),
            time_filter: Some(Predicate::Lt(20)),
        };
        let mut executor =
            open_executor(&store, &path, DataType::Int64, &[AggregateFunction::Sum], &mode)
                .unwrap();
        // Grid {2, 11}
        assert_eq!(
            executor.compute(&TimeRange::new(0, 100)).unwrap(),
            vec![Some(Value::Double(130.0))]
        );
    }

    #[test]
    fn test_declared_type_must_match() {
        let (store, path) = store();
        let mode = ExecutorMode::Merge { time_filter: None };
        let result = open_executor(&store, &path, DataType::Double, &[], &mode);
        assert!(matches!(
            result,
            Err(crate::QueryError::Read(tidal_reader::ReadError::TypeMismatch { .. }))
        ));
    }
}
