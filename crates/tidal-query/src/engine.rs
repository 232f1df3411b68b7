//! Group-by engine
//!
//! Drives the windows of a [`GroupByPlan`] over one executor per distinct
//! series path and scatters each executor's results into the output row.

use crate::aggregation::AggregateFunction;
use crate::config::GroupBySettings;
use crate::error::{QueryError, Result};
use crate::executor::{open_executor, ExecutorMode, GridPlan, GroupByExecutor};
use crate::model::{Alignment, GroupByPlan};
use crate::window::WindowCursor;
use fxhash::FxHashMap;
use serde::Serialize;
use tidal_core::{DataType, SeriesPath, TimeRange, Timestamp, Value};
use tidal_reader::{CommonTimestamps, SeriesStore};
use tracing::{debug, error};

/// Where the engine is in its window sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// The next window has not been looked up yet
    AwaitingInterval,
    /// A window is pending and `compute_row` may be called
    HasInterval,
    /// No windows left
    Exhausted,
}

/// One aggregated window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub start: Timestamp,
    pub end: Timestamp,
    /// One field per requested aggregation; `None` where the window had no points
    pub fields: Vec<Option<Value>>,
}

impl Row {
    pub fn get(&self, column: usize) -> Option<&Value> {
        self.fields.get(column).and_then(Option::as_ref)
    }

    pub fn window(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}

/// Requests sharing one series path
struct PathGroup {
    path: SeriesPath,
    data_type: DataType,
    functions: Vec<AggregateFunction>,
    columns: Vec<usize>,
}

/// Window-at-a-time group-by over a series store
pub struct GroupByEngine {
    executors: Vec<Box<dyn GroupByExecutor>>,
    /// Output column of every aggregator, per executor
    result_index: Vec<Vec<usize>>,
    result_types: Vec<DataType>,
    windows: WindowCursor,
    current: Option<TimeRange>,
    state: EngineState,
}

impl GroupByEngine {
    pub fn new(
        plan: GroupByPlan,
        store: &dyn SeriesStore,
        settings: &GroupBySettings,
    ) -> Result<Self> {
        plan.validate()?;
        plan.window.check_limit(settings.max_windows)?;
        let result_types = plan.result_types()?;

        let mode = match &plan.alignment {
            None => ExecutorMode::Merge {
                time_filter: plan.time_filter.clone(),
            },
            Some(Alignment::CommonTimestamps(timestamps)) => ExecutorMode::Aligned {
                grid: GridPlan::Fixed(CommonTimestamps::new(timestamps.clone())?),
                time_filter: plan.time_filter.clone(),
            },
            Some(Alignment::ValueFilter(filter)) => ExecutorMode::Aligned {
                grid: GridPlan::ValueFilter(filter.clone()),
                time_filter: plan.time_filter.clone(),
            },
        };

        let mut by_path: FxHashMap<SeriesPath, usize> = FxHashMap::default();
        let mut groups: Vec<PathGroup> = Vec::new();
        for (column, request) in plan.aggregations.iter().enumerate() {
            if let Some(&idx) = by_path.get(&request.path) {
                let group = &mut groups[idx];
                if group.data_type != request.data_type {
                    return Err(QueryError::InvalidQuery(format!(
                        "Series {} requested as both {} and {}",
                        request.path, group.data_type, request.data_type
                    )));
                }
                group.functions.push(request.function);
                group.columns.push(column);
            } else {
                by_path.insert(request.path.clone(), groups.len());
                groups.push(PathGroup {
                    path: request.path.clone(),
                    data_type: request.data_type,
                    functions: vec![request.function],
                    columns: vec![column],
                });
            }
        }

        let mut executors = Vec::with_capacity(groups.len());
        let mut result_index = Vec::with_capacity(groups.len());
        for group in groups {
            executors.push(open_executor(
                store,
                &group.path,
                group.data_type,
                &group.functions,
                &mode,
            )?);
            result_index.push(group.columns);
        }

        debug!(
            "Group-by over {} series, {} columns, {} windows",
            executors.len(),
            result_types.len(),
            plan.window.window_count()
        );

        Ok(Self {
            executors,
            result_index,
            result_types,
            windows: WindowCursor::new(plan.window),
            current: None,
            state: EngineState::AwaitingInterval,
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Output column types, in request order
    pub fn result_types(&self) -> &[DataType] {
        &self.result_types
    }

    /// Number of distinct series being scanned
    pub fn series_count(&self) -> usize {
        self.executors.len()
    }

    /// Look up the next window. Repeated calls without `compute_row` in
    /// between do not skip windows.
    pub fn has_next_interval(&mut self) -> bool {
        match self.state {
            EngineState::HasInterval => true,
            EngineState::Exhausted => false,
            EngineState::AwaitingInterval => match self.windows.next() {
                Some(window) => {
                    self.current = Some(window);
                    self.state = EngineState::HasInterval;
                    true
                }
                None => {
                    debug!("Group-by exhausted after {} windows", self.windows.position());
                    self.current = None;
                    self.state = EngineState::Exhausted;
                    false
                }
            },
        }
    }

    /// Aggregate the pending window.
    ///
    /// Fails with `IllegalState` unless `has_next_interval` just returned true.
    /// An executor failure aborts the row and ends the query.
    pub fn compute_row(&mut self) -> Result<Row> {
        let window = match (self.state, self.current) {
            (EngineState::HasInterval, Some(window)) => window,
            _ => {
                return Err(QueryError::IllegalState(
                    "compute_row called without a pending interval".to_string(),
                ))
            }
        };

        let mut fields = vec![None; self.result_types.len()];
        for (executor, columns) in self.executors.iter_mut().zip(&self.result_index) {
            let results = match executor.compute(&window) {
                Ok(results) => results,
                Err(e) => {
                    error!(
                        "Failed to aggregate {} over [{}, {}): {}",
                        executor.path(),
                        window.start,
                        window.end,
                        e
                    );
                    self.current = None;
                    self.state = EngineState::Exhausted;
                    return Err(e);
                }
            };
            for (value, &column) in results.into_iter().zip(columns) {
                fields[column] = value;
            }
        }

        self.state = EngineState::AwaitingInterval;
        Ok(Row {
            start: window.start,
            end: window.end,
            fields,
        })
    }
}

impl Iterator for GroupByEngine {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Result<Row>> {
        if !self.has_next_interval() {
            return None;
        }
        Some(self.compute_row())
    }
}
