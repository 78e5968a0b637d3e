//! Typed metric snapshots and the shared flatten visitor
//!
//! Baseline construction and deviation comparison must flatten snapshots the
//! exact same way or z-scores compare different keys. [`flatten`] is that one
//! function: dotted keys, numeric leaves only; flags, text, dates, and lists
//! are dropped.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One value in a metric snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Flag(bool),
    Text(String),
    List(Vec<MetricValue>),
    Record(BTreeMap<String, MetricValue>),
}

impl MetricValue {
    /// Convert loose JSON into a typed value; nulls are dropped
    pub fn from_json(value: serde_json::Value) -> Option<MetricValue> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(MetricValue::Flag(b)),
            serde_json::Value::Number(n) => n.as_f64().map(MetricValue::Number),
            serde_json::Value::String(s) => Some(MetricValue::Text(s)),
            serde_json::Value::Array(items) => Some(MetricValue::List(
                items.into_iter().filter_map(MetricValue::from_json).collect(),
            )),
            serde_json::Value::Object(map) => Some(MetricValue::Record(
                map.into_iter()
                    .filter_map(|(k, v)| MetricValue::from_json(v).map(|v| (k, v)))
                    .collect(),
            )),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

/// One detector run's nested metrics record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    pub metrics: BTreeMap<String, MetricValue>,
}

impl MetricSnapshot {
    pub fn new(metrics: BTreeMap<String, MetricValue>) -> Self {
        Self {
            recorded_at: None,
            metrics,
        }
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.recorded_at = Some(at);
        self
    }

    /// Build a snapshot from any serializable metrics struct
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_value(value)?;
        let metrics = match MetricValue::from_json(json) {
            Some(MetricValue::Record(map)) => map,
            _ => BTreeMap::new(),
        };
        Ok(Self::new(metrics))
    }
}

/// Flatten a snapshot to dotted numeric keys.
///
/// This is the single flatten function shared by baseline construction and
/// deviation comparison.
pub fn flatten(snapshot: &MetricSnapshot) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for (key, value) in &snapshot.metrics {
        flatten_value(key, value, &mut out);
    }
    out
}

fn flatten_value(prefix: &str, value: &MetricValue, out: &mut BTreeMap<String, f64>) {
    match value {
        MetricValue::Number(n) => {
            if n.is_finite() {
                out.insert(prefix.to_string(), *n);
            }
        }
        MetricValue::Record(map) => {
            for (key, nested) in map {
                flatten_value(&format!("{prefix}.{key}"), nested, out);
            }
        }
        MetricValue::Flag(_) | MetricValue::Text(_) | MetricValue::List(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn snapshot_from_json(value: serde_json::Value) -> MetricSnapshot {
        let metrics = match MetricValue::from_json(value) {
            Some(MetricValue::Record(map)) => map,
            other => panic!("expected record, got {other:?}"),
        };
        MetricSnapshot::new(metrics)
    }

    #[test]
    fn test_flatten_nested_records_with_dotted_keys() {
        let snapshot = snapshot_from_json(json!({
            "vocabulary": {
                "totalWords": 120,
                "typeTokenRatio": 0.62
            },
            "repetitionIndex": 14.5
        }));
        let flat = flatten(&snapshot);

        assert_eq!(flat.len(), 3);
        assert_eq!(flat["vocabulary.totalWords"], 120.0);
        assert_eq!(flat["vocabulary.typeTokenRatio"], 0.62);
        assert_eq!(flat["repetitionIndex"], 14.5);
    }

    #[test]
    fn test_flatten_drops_non_numeric_branches() {
        let snapshot = snapshot_from_json(json!({
            "score": 42.0,
            "label": "medium",
            "flagged": true,
            "phrases": [1, 2, 3],
            "recordedAt": "2026-03-01T10:00:00Z",
            "nested": {
                "trend": "stable",
                "z": 1.5
            }
        }));
        let flat = flatten(&snapshot);

        assert_eq!(flat.len(), 2);
        assert_eq!(flat["score"], 42.0);
        assert_eq!(flat["nested.z"], 1.5);
    }

    #[test]
    fn test_from_json_drops_nulls() {
        let value = MetricValue::from_json(json!({"a": null, "b": 1.0})).unwrap();
        match value {
            MetricValue::Record(map) => {
                assert_eq!(map.len(), 1);
                assert_eq!(map["b"], MetricValue::Number(1.0));
            }
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn test_from_serialize_round_trips_detector_metrics() {
        let metrics = crate::detectors::vocabulary::calculate_metrics(
            "My granddaughter visited yesterday afternoon. We talked about her garden.",
        );
        let snapshot = MetricSnapshot::from_serialize(&metrics).unwrap();
        let flat = flatten(&snapshot);

        assert_eq!(flat["totalWords"], metrics.total_words as f64);
        assert_eq!(flat["complexityScore"], metrics.complexity_score);
        // the most-common-word list is non-numeric and must not leak through
        assert!(flat.keys().all(|k| !k.starts_with("mostCommonWords")));
    }

    #[test]
    fn test_snapshot_serde_round_trip() {
        let snapshot = snapshot_from_json(json!({
            "a": {"b": {"c": 3.0}},
            "d": false
        }))
        .with_timestamp(chrono::Utc::now());
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: MetricSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(flatten(&back), flatten(&snapshot));
    }
}
