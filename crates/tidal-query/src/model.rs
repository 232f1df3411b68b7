//! Query model - group-by plans

use crate::aggregation::AggregateFunction;
use crate::error::{QueryError, Result};
use crate::window::WindowSpec;
use serde::{Deserialize, Serialize};
use tidal_core::{DataType, SeriesPath, Timestamp, Value};
use tidal_reader::Predicate;

/// One output column: an aggregation over one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRequest {
    pub path: SeriesPath,
    pub function: AggregateFunction,
    /// Declared type of the series
    pub data_type: DataType,
}

/// Value predicate on one series selecting the timestamps to aggregate at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueFilter {
    pub path: SeriesPath,
    pub data_type: DataType,
    pub predicate: Predicate<Value>,
}

/// Restricts every series to a set of timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Explicit strictly ascending grid
    CommonTimestamps(Vec<Timestamp>),
    /// Grid derived from the timestamps where the filter series matches
    ValueFilter(ValueFilter),
}

/// Group-by query definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupByPlan {
    /// Output columns, in order
    pub aggregations: Vec<AggregationRequest>,
    #[serde(default)]
    pub time_filter: Option<Predicate<Timestamp>>,
    pub window: WindowSpec,
    #[serde(default)]
    pub alignment: Option<Alignment>,
}

impl GroupByPlan {
    /// Create a new plan builder
    pub fn builder(window: WindowSpec) -> GroupByPlanBuilder {
        GroupByPlanBuilder::new(window)
    }

    /// Validate the plan
    pub fn validate(&self) -> Result<()> {
        if self.aggregations.is_empty() {
            return Err(QueryError::InvalidQuery("No aggregations requested".to_string()));
        }

        self.window.validate()?;

        for request in &self.aggregations {
            request.function.result_type(request.data_type)?;
        }

        if let Some(Alignment::ValueFilter(filter)) = &self.alignment {
            let data_type = filter.data_type;
            filter
                .predicate
                .clone()
                .try_map(&mut |v: Value| v.expect_type(data_type))
                .map_err(|e| {
                    QueryError::InvalidQuery(format!(
                        "Value filter on {}: {}",
                        filter.path, e
                    ))
                })?;
        }

        Ok(())
    }

    /// Output column types, in request order
    pub fn result_types(&self) -> Result<Vec<DataType>> {
        self.aggregations
            .iter()
            .map(|r| r.function.result_type(r.data_type))
            .collect()
    }
}

/// Plan builder for fluent API
pub struct GroupByPlanBuilder {
    aggregations: Vec<AggregationRequest>,
    time_filter: Option<Predicate<Timestamp>>,
    window: WindowSpec,
    alignment: Option<Alignment>,
}

impl GroupByPlanBuilder {
    pub fn new(window: WindowSpec) -> Self {
        Self {
            aggregations: Vec::new(),
            time_filter: None,
            window,
            alignment: None,
        }
    }

    /// Add an output column
    pub fn aggregate(
        mut self,
        path: SeriesPath,
        function: AggregateFunction,
        data_type: DataType,
    ) -> Self {
        self.aggregations.push(AggregationRequest {
            path,
            function,
            data_type,
        });
        self
    }

    pub fn time_filter(mut self, predicate: Predicate<Timestamp>) -> Self {
        self.time_filter = Some(predicate);
        self
    }

    /// Aggregate only at the given timestamps
    pub fn common_timestamps(mut self, timestamps: Vec<Timestamp>) -> Self {
        self.alignment = Some(Alignment::CommonTimestamps(timestamps));
        self
    }

    /// Aggregate only where `path` satisfies `predicate`
    pub fn value_filter(
        mut self,
        path: SeriesPath,
        data_type: DataType,
        predicate: Predicate<Value>,
    ) -> Self {
        self.alignment = Some(Alignment::ValueFilter(ValueFilter {
            path,
            data_type,
            predicate,
        }));
        self
    }

    /// Build the plan
    pub fn build(self) -> Result<GroupByPlan> {
        let plan = GroupByPlan {
            aggregations: self.aggregations,
            time_filter: self.time_filter,
            window: self.window,
            alignment: self.alignment,
        };

        plan.validate()?;
        Ok(plan)
    }
}
