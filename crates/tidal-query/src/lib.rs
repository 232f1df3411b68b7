//! Tidal Query - windowed group-by over series readers
//!
//! A [`GroupByPlan`] names the aggregations, the time predicate and the
//! windows. The [`GroupByEngine`] opens one reader per distinct series path
//! and yields one [`Row`] per window.

pub mod aggregation;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod generator;
pub mod model;
pub mod window;

pub use aggregation::{AggregateFunction, Aggregator};
pub use config::{GroupBySettings, QueryConfig};
pub use engine::{EngineState, GroupByEngine, Row};
pub use error::{QueryError, Result};
pub use executor::{open_executor, ExecutorMode, GridPlan, GroupByExecutor, PathExecutor};
pub use generator::TimestampGenerator;
pub use model::{AggregationRequest, Alignment, GroupByPlan, GroupByPlanBuilder, ValueFilter};
pub use window::{WindowCursor, WindowSpec};
