//! Per-patient statistical baselines
//!
//! A baseline is a rolling window of flattened metric snapshots plus
//! per-metric descriptive statistics. Later snapshots are scored against it
//! as z-scores so "normal for this patient" is the reference, not a
//! population norm.

pub mod flatten;
mod manager;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::detectors::Confidence;

pub use flatten::{flatten, MetricSnapshot, MetricValue};
pub use manager::BaselineManager;

// ============================================================================
// Statistics
// ============================================================================

/// Descriptive statistics for one metric across baseline points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStats {
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Compute stats over a non-empty slice of observations
pub(crate) fn compute_stats(values: &[f64]) -> MetricStats {
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = if count % 2 == 0 {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    } else {
        sorted[count / 2]
    };

    MetricStats {
        mean,
        median,
        std_dev: variance.sqrt(),
        variance,
        min: sorted[0],
        max: sorted[count - 1],
        count,
    }
}

// ============================================================================
// Baseline record
// ============================================================================

/// One flattened snapshot retained in the baseline window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselinePoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    pub values: BTreeMap<String, f64>,
}

/// A patient's established baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub patient_id: String,
    /// Monotonic, bumped on every successful update
    pub version: u64,
    pub established_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub points: Vec<BaselinePoint>,
    pub stats: BTreeMap<String, MetricStats>,
    /// Monthly adjustment factors per metric family, fixed at establish time
    pub seasonal: BTreeMap<String, [f64; 12]>,
}

impl Baseline {
    /// Recompute per-metric stats from the retained points.
    /// A metric absent from some points is averaged over the points that have it.
    pub(crate) fn recompute_stats(&mut self) {
        let mut grouped: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for point in &self.points {
            for (key, value) in &point.values {
                grouped.entry(key.as_str()).or_default().push(*value);
            }
        }
        self.stats = grouped
            .into_iter()
            .map(|(key, values)| (key.to_string(), compute_stats(&values)))
            .collect();
    }
}

// ============================================================================
// Seasonal adjustment
// ============================================================================

/// Metric families that get seasonal display adjustment. Matching is by
/// substring on the flattened key.
pub const SEASONAL_FAMILIES: [&str; 3] = ["vocabulary", "mood", "cognitive"];

/// January-first monthly factors. Winter months discount mood and cognitive
/// deviations slightly so ordinary seasonal dips read less alarming.
static SEASONAL_COEFFICIENTS: Lazy<BTreeMap<&'static str, [f64; 12]>> = Lazy::new(|| {
    let mut map = BTreeMap::new();
    map.insert(
        "vocabulary",
        [0.95, 0.95, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.95],
    );
    map.insert(
        "mood",
        [0.90, 0.90, 0.95, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.95, 0.90],
    );
    map.insert(
        "cognitive",
        [0.95, 0.95, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.95],
    );
    map
});

/// Seasonal table copied into a baseline at establish time
pub(crate) fn default_seasonal() -> BTreeMap<String, [f64; 12]> {
    SEASONAL_COEFFICIENTS
        .iter()
        .map(|(family, factors)| (family.to_string(), *factors))
        .collect()
}

/// Factor for a metric in a given zero-based month; 1.0 when no family matches
pub(crate) fn seasonal_factor(
    seasonal: &BTreeMap<String, [f64; 12]>,
    metric: &str,
    month0: usize,
) -> f64 {
    let key = metric.to_lowercase();
    for (family, factors) in seasonal {
        if key.contains(family.as_str()) {
            return factors[month0 % 12];
        }
    }
    1.0
}

// ============================================================================
// Deviation and update reports
// ============================================================================

/// One metric scored against the baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDeviation {
    pub metric: String,
    pub value: f64,
    pub baseline_mean: f64,
    pub deviation: f64,
    pub percent_deviation: f64,
    /// 0.0 when the baseline has no spread for this metric
    pub z_score: f64,
    pub is_significant: bool,
    pub seasonal_factor: f64,
    /// Deviation scaled by the seasonal factor, for display only
    pub adjusted_deviation: f64,
}

/// Direction of overall drift relative to the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineTrend {
    Improving,
    #[default]
    Stable,
    Declining,
}

impl std::fmt::Display for BaselineTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BaselineTrend::Improving => "improving",
            BaselineTrend::Stable => "stable",
            BaselineTrend::Declining => "declining",
        };
        write!(f, "{s}")
    }
}

/// A snapshot scored against an established baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviationReport {
    pub patient_id: String,
    pub baseline_version: u64,
    /// Points backing the comparison
    pub point_count: usize,
    pub deviations: Vec<MetricDeviation>,
    pub significant_metrics: Vec<String>,
    pub overall_trend: BaselineTrend,
    pub confidence: Confidence,
}

/// One metric whose mean moved significantly during an update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignificantChange {
    pub metric: String,
    pub old_mean: f64,
    pub new_mean: f64,
    pub z_score: f64,
}

/// Result of folding one snapshot into a baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineUpdate {
    pub version: u64,
    pub point_count: usize,
    /// Points aged out of the rolling window by this update
    pub dropped_points: usize,
    pub significant_changes: Vec<SignificantChange>,
}
