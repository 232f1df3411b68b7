//! JSON snapshot of series data plus the query to run over it
//!
//! Values are plain JSON scalars interpreted by the declared data type of
//! their series:
//!
//! ```json
//! {
//!   "series": [{
//!     "path": "root.sg.d1.s1",
//!     "data_type": "INT32",
//!     "pages": [[[1, 10], [2, 20]], [[5, 50]]],
//!     "inserts": [[2, 99]],
//!     "updates": [{"start": 3, "end": 4, "value": 77}],
//!     "deletes": [{"start": 5, "end": 5}]
//!   }],
//!   "plan": {
//!     "aggregations": [{"path": "root.sg.d1.s1", "function": "count", "data_type": "INT32"}],
//!     "window": {"start": 0, "end": 10, "interval": 5, "sliding_step": 5},
//!     "time_filter": {"gt_eq": 1}
//!   }
//! }
//! ```

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use tidal_core::{DataPoint, DataType, SeriesPath, Timestamp, Value};
use tidal_query::{AggregationRequest, GroupByPlan, WindowSpec};
use tidal_reader::{EncodedPage, MemorySeriesStore, PageValue, Predicate};
use tracing::debug;

type JsonValue = serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub series: Vec<SeriesSnapshot>,
    pub plan: PlanSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct SeriesSnapshot {
    pub path: String,
    pub data_type: DataType,
    #[serde(default)]
    pub pages: Vec<Vec<(Timestamp, JsonValue)>>,
    #[serde(default)]
    pub inserts: Vec<(Timestamp, JsonValue)>,
    #[serde(default)]
    pub updates: Vec<UpdateSnapshot>,
    #[serde(default)]
    pub deletes: Vec<DeleteSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSnapshot {
    pub start: Timestamp,
    pub end: Timestamp,
    pub value: JsonValue,
}

#[derive(Debug, Deserialize)]
pub struct DeleteSnapshot {
    pub start: Timestamp,
    pub end: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct PlanSnapshot {
    pub aggregations: Vec<AggregationRequest>,
    pub window: WindowSpec,
    #[serde(default)]
    pub time_filter: Option<Predicate<Timestamp>>,
    #[serde(default)]
    pub common_timestamps: Option<Vec<Timestamp>>,
    #[serde(default)]
    pub value_filter: Option<ValueFilterSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct ValueFilterSnapshot {
    pub path: String,
    pub data_type: DataType,
    pub predicate: Predicate<JsonValue>,
}

impl Snapshot {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load every series into an in-memory store
    pub fn build_store(&self) -> Result<MemorySeriesStore> {
        let store = MemorySeriesStore::new();
        for series in &self.series {
            load_series(&store, series)
                .with_context(|| format!("Failed to load series {}", series.path))?;
        }
        debug!("Loaded {} series from snapshot", store.series_count());
        Ok(store)
    }

    /// Convert the plan, typing every JSON operand
    pub fn build_plan(&self) -> Result<GroupByPlan> {
        let plan = &self.plan;
        let mut builder = GroupByPlan::builder(plan.window);
        for request in &plan.aggregations {
            builder = builder.aggregate(request.path.clone(), request.function, request.data_type);
        }
        if let Some(predicate) = &plan.time_filter {
            builder = builder.time_filter(predicate.clone());
        }

        match (&plan.common_timestamps, &plan.value_filter) {
            (Some(_), Some(_)) => bail!("A plan takes common_timestamps or value_filter, not both"),
            (Some(timestamps), None) => builder = builder.common_timestamps(timestamps.clone()),
            (None, Some(filter)) => {
                let data_type = filter.data_type;
                let predicate = filter
                    .predicate
                    .clone()
                    .try_map(&mut |v: JsonValue| json_to_value(data_type, &v))?;
                builder = builder.value_filter(SeriesPath::parse(&filter.path)?, data_type, predicate);
            }
            (None, None) => {}
        }

        Ok(builder.build()?)
    }
}

fn load_series(store: &MemorySeriesStore, series: &SeriesSnapshot) -> Result<()> {
    let path = SeriesPath::parse(&series.path)?;
    let data_type = series.data_type;
    store.create_series(path.clone(), data_type)?;

    for page in &series.pages {
        let points = page
            .iter()
            .map(|(t, v)| Ok(DataPoint::new(*t, json_to_value(data_type, v)?)))
            .collect::<Result<Vec<_>>>()?;
        store.append_page(&path, encode_page(data_type, points)?)?;
    }
    for (timestamp, value) in &series.inserts {
        store.write(&path, *timestamp, json_to_value(data_type, value)?)?;
    }
    for update in &series.updates {
        let value = json_to_value(data_type, &update.value)?;
        store.update(&path, update.start, update.end, value)?;
    }
    for delete in &series.deletes {
        store.delete(&path, delete.start, delete.end)?;
    }
    Ok(())
}

fn encode_page(data_type: DataType, points: Vec<DataPoint<Value>>) -> Result<EncodedPage> {
    match data_type {
        DataType::Boolean => encode_typed::<bool>(points),
        DataType::Int32 => encode_typed::<i32>(points),
        DataType::Int64 => encode_typed::<i64>(points),
        DataType::Float => encode_typed::<f32>(points),
        DataType::Double => encode_typed::<f64>(points),
        DataType::Text => encode_typed::<Vec<u8>>(points),
    }
}

fn encode_typed<T: PageValue>(points: Vec<DataPoint<Value>>) -> Result<EncodedPage> {
    let typed = points
        .into_iter()
        .map(|p| Ok(DataPoint::new(p.timestamp, T::from_value(p.value)?)))
        .collect::<tidal_reader::Result<Vec<_>>>()?;
    Ok(EncodedPage::encode(&typed)?)
}

/// Interpret a JSON scalar as a value of `data_type`
pub fn json_to_value(data_type: DataType, json: &JsonValue) -> Result<Value> {
    let invalid = || anyhow!("{} is not a valid {} value", json, data_type);
    Ok(match data_type {
        DataType::Boolean => Value::Boolean(json.as_bool().ok_or_else(invalid)?),
        DataType::Int32 => {
            let v = json.as_i64().ok_or_else(invalid)?;
            Value::Int32(i32::try_from(v).map_err(|_| invalid())?)
        }
        DataType::Int64 => Value::Int64(json.as_i64().ok_or_else(invalid)?),
        DataType::Float => Value::Float(json.as_f64().ok_or_else(invalid)? as f32),
        DataType::Double => Value::Double(json.as_f64().ok_or_else(invalid)?),
        DataType::Text => Value::text(json.as_str().ok_or_else(invalid)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tidal_query::{Alignment, GroupByEngine, GroupBySettings};

    const SNAPSHOT: &str = r#"{
        "series": [{
            "path": "root.sg.d1.s1",
            "data_type": "INT32",
            "pages": [[[1, 10], [2, 20], [3, 30], [4, 40], [5, 50]]],
            "inserts": [[2, 99]],
            "updates": [{"start": 3, "end": 4, "value": 77}],
            "deletes": [{"start": 5, "end": 5}]
        }],
        "plan": {
            "aggregations": [
                {"path": "root.sg.d1.s1", "function": "count", "data_type": "INT32"},
                {"path": "root.sg.d1.s1", "function": "max", "data_type": "INT32"}
            ],
            "window": {"start": 0, "end": 10, "interval": 10, "sliding_step": 10}
        }
    }"#;

    #[test]
    fn test_snapshot_runs_end_to_end() {
        let snapshot = Snapshot::from_json(SNAPSHOT).unwrap();
        let store = snapshot.build_store().unwrap();
        let plan = snapshot.build_plan().unwrap();

        let rows: Vec<_> = GroupByEngine::new(plan, &store, &GroupBySettings::default())
            .unwrap()
            .collect::<tidal_query::Result<_>>()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].fields,
            vec![Some(Value::Int64(4)), Some(Value::Int32(99))]
        );
    }

    #[test]
    fn test_value_filter_operands_typed() {
        let mut snapshot = Snapshot::from_json(SNAPSHOT).unwrap();
        snapshot.plan.value_filter = Some(ValueFilterSnapshot {
            path: "root.sg.d1.s1".to_string(),
            data_type: DataType::Int32,
            predicate: Predicate::Between(json!(15), json!(80)),
        });

        let plan = snapshot.build_plan().unwrap();
        match plan.alignment {
            Some(Alignment::ValueFilter(filter)) => assert_eq!(
                filter.predicate,
                Predicate::Between(Value::Int32(15), Value::Int32(80))
            ),
            other => panic!("Expected value filter, got {:?}", other),
        }
    }

    #[test]
    fn test_both_alignments_rejected() {
        let mut snapshot = Snapshot::from_json(SNAPSHOT).unwrap();
        snapshot.plan.common_timestamps = Some(vec![1, 2]);
        snapshot.plan.value_filter = Some(ValueFilterSnapshot {
            path: "root.sg.d1.s1".to_string(),
            data_type: DataType::Int32,
            predicate: Predicate::Gt(json!(0)),
        });
        assert!(snapshot.build_plan().is_err());
    }

    #[test]
    fn test_json_to_value() {
        assert_eq!(
            json_to_value(DataType::Int32, &json!(7)).unwrap(),
            Value::Int32(7)
        );
        assert_eq!(
            json_to_value(DataType::Text, &json!("idle")).unwrap(),
            Value::text("idle")
        );
        assert_eq!(
            json_to_value(DataType::Float, &json!(1.5)).unwrap(),
            Value::Float(1.5)
        );
        assert!(json_to_value(DataType::Int32, &json!(1_i64 << 40)).is_err());
        assert!(json_to_value(DataType::Boolean, &json!("yes")).is_err());
    }

    #[test]
    fn test_out_of_order_page_rejected() {
        let json = SNAPSHOT.replace("[[1, 10], [2, 20]", "[[2, 10], [1, 20]");
        let snapshot = Snapshot::from_json(&json).unwrap();
        assert!(snapshot.build_store().is_err());
    }
}
