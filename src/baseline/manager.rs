use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::flatten::{flatten, MetricSnapshot};
use super::{
    default_seasonal, seasonal_factor, Baseline, BaselinePoint, BaselineTrend, BaselineUpdate,
    DeviationReport, MetricDeviation, SignificantChange,
};
use crate::config::BaselineConfig;
use crate::detectors::Confidence;
use crate::error::EngineResult;
use crate::storage::BaselineStore;

/// Establishes, updates, and scores per-patient baselines.
///
/// Writes for one patient are serialized through a per-patient lock so
/// concurrent analyses cannot lose updates. Reads take no lock.
pub struct BaselineManager {
    store: Arc<dyn BaselineStore>,
    config: BaselineConfig,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl BaselineManager {
    pub fn new(store: Arc<dyn BaselineStore>) -> Self {
        Self::with_config(store, BaselineConfig::default())
    }

    pub fn with_config(store: Arc<dyn BaselineStore>, config: BaselineConfig) -> Self {
        Self {
            store,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn patient_lock(&self, patient_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(patient_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Create a fresh version-1 baseline from one snapshot.
    /// Replaces any existing baseline for the patient.
    pub async fn establish(
        &self,
        patient_id: &str,
        snapshot: &MetricSnapshot,
    ) -> EngineResult<Baseline> {
        let lock = self.patient_lock(patient_id).await;
        let _guard = lock.lock().await;
        self.establish_locked(patient_id, snapshot).await
    }

    /// Caller must hold the patient lock
    async fn establish_locked(
        &self,
        patient_id: &str,
        snapshot: &MetricSnapshot,
    ) -> EngineResult<Baseline> {
        let now = Utc::now();
        let mut baseline = Baseline {
            patient_id: patient_id.to_string(),
            version: 1,
            established_at: now,
            updated_at: now,
            points: vec![BaselinePoint {
                recorded_at: snapshot.recorded_at,
                values: flatten(snapshot),
            }],
            stats: Default::default(),
            seasonal: default_seasonal(),
        };
        baseline.recompute_stats();
        self.store.put_baseline(&baseline).await?;

        info!(
            patient_id,
            metrics = baseline.stats.len(),
            "baseline established"
        );
        Ok(baseline)
    }

    /// Fold one snapshot into the patient's baseline.
    /// Establishes a new baseline when none exists yet.
    pub async fn update(
        &self,
        patient_id: &str,
        snapshot: &MetricSnapshot,
    ) -> EngineResult<BaselineUpdate> {
        let lock = self.patient_lock(patient_id).await;
        let _guard = lock.lock().await;

        let mut baseline = match self.store.get_baseline(patient_id).await? {
            Some(baseline) => baseline,
            None => {
                let baseline = self.establish_locked(patient_id, snapshot).await?;
                return Ok(BaselineUpdate {
                    version: baseline.version,
                    point_count: baseline.points.len(),
                    dropped_points: 0,
                    significant_changes: Vec::new(),
                });
            }
        };

        let old_stats = baseline.stats.clone();
        baseline.points.push(BaselinePoint {
            recorded_at: snapshot.recorded_at,
            values: flatten(snapshot),
        });

        // Rolling window: dated points age out, undated points are retained
        let cutoff = Utc::now() - Duration::days(self.config.window_days);
        let before = baseline.points.len();
        baseline
            .points
            .retain(|point| point.recorded_at.map_or(true, |at| at >= cutoff));
        let dropped_points = before - baseline.points.len();

        baseline.recompute_stats();

        // Mean drift measured in units of the old spread
        let mut significant_changes = Vec::new();
        for (metric, new_stat) in &baseline.stats {
            if let Some(old_stat) = old_stats.get(metric) {
                if old_stat.std_dev <= 0.0 {
                    continue;
                }
                let z_score = (new_stat.mean - old_stat.mean) / old_stat.std_dev;
                if z_score.abs() >= self.config.significant_change_z {
                    significant_changes.push(SignificantChange {
                        metric: metric.clone(),
                        old_mean: old_stat.mean,
                        new_mean: new_stat.mean,
                        z_score,
                    });
                }
            }
        }

        baseline.version += 1;
        baseline.updated_at = Utc::now();
        self.store.put_baseline(&baseline).await?;

        debug!(
            patient_id,
            version = baseline.version,
            points = baseline.points.len(),
            dropped = dropped_points,
            significant = significant_changes.len(),
            "baseline updated"
        );

        Ok(BaselineUpdate {
            version: baseline.version,
            point_count: baseline.points.len(),
            dropped_points,
            significant_changes,
        })
    }

    /// Score a snapshot against the stored baseline.
    /// Returns `None` when the patient has no baseline yet.
    pub async fn deviation(
        &self,
        patient_id: &str,
        snapshot: &MetricSnapshot,
    ) -> EngineResult<Option<DeviationReport>> {
        let baseline = match self.store.get_baseline(patient_id).await? {
            Some(baseline) => baseline,
            None => return Ok(None),
        };

        let values = flatten(snapshot);
        let month0 = snapshot.recorded_at.unwrap_or_else(Utc::now).month0() as usize;

        let mut deviations = Vec::new();
        for (metric, value) in &values {
            let stats = match baseline.stats.get(metric) {
                Some(stats) => stats,
                None => continue,
            };
            let deviation = value - stats.mean;
            let percent_deviation = if stats.mean != 0.0 {
                deviation / stats.mean * 100.0
            } else {
                0.0
            };
            let z_score = if stats.std_dev > 0.0 {
                deviation / stats.std_dev
            } else {
                0.0
            };
            let factor = seasonal_factor(&baseline.seasonal, metric, month0);

            deviations.push(MetricDeviation {
                metric: metric.clone(),
                value: *value,
                baseline_mean: stats.mean,
                deviation,
                percent_deviation,
                z_score,
                is_significant: z_score.abs() >= self.config.significant_change_z,
                seasonal_factor: factor,
                adjusted_deviation: deviation * factor,
            });
        }

        let significant_metrics = deviations
            .iter()
            .filter(|d| d.is_significant)
            .map(|d| d.metric.clone())
            .collect();

        let overall_trend = if deviations.is_empty() {
            BaselineTrend::Stable
        } else {
            let mean_z =
                deviations.iter().map(|d| d.z_score).sum::<f64>() / deviations.len() as f64;
            if mean_z > 1.0 {
                BaselineTrend::Improving
            } else if mean_z < -1.0 {
                BaselineTrend::Declining
            } else {
                BaselineTrend::Stable
            }
        };

        Ok(Some(DeviationReport {
            patient_id: baseline.patient_id.clone(),
            baseline_version: baseline.version,
            point_count: baseline.points.len(),
            deviations,
            significant_metrics,
            overall_trend,
            confidence: Confidence::from_sample_count(baseline.points.len()),
        }))
    }
}
