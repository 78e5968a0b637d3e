//! Baseline lifecycle integration tests
//!
//! Drives BaselineManager against the real SQLite store: establish, update,
//! rolling-window trimming, z-score deviation, and per-patient write
//! serialization under concurrency.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tempfile::tempdir;

use wellness_risk_engine::baseline::{BaselineManager, BaselineTrend, MetricSnapshot, MetricValue};
use wellness_risk_engine::config::{BaselineConfig, DatabaseConfig};
use wellness_risk_engine::storage::SqliteStore;

async fn create_test_store(db_path: PathBuf) -> SqliteStore {
    let config = DatabaseConfig {
        path: db_path,
        max_connections: 2,
    };
    SqliteStore::new(&config)
        .await
        .expect("Failed to create SQLite store")
}

fn snapshot(values: &[(&str, f64)]) -> MetricSnapshot {
    let metrics: BTreeMap<String, MetricValue> = values
        .iter()
        .map(|(key, value)| (key.to_string(), MetricValue::Number(*value)))
        .collect();
    MetricSnapshot::new(metrics)
}

#[tokio::test]
async fn test_deviation_z_score_against_established_spread() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = Arc::new(create_test_store(dir.path().join("test.db")).await);
    let manager = BaselineManager::new(store);

    // points [8, 12] give mean 10, population stddev 2
    manager.establish("p1", &snapshot(&[("x", 8.0)])).await?;
    manager.update("p1", &snapshot(&[("x", 12.0)])).await?;

    let report = manager
        .deviation("p1", &snapshot(&[("x", 16.0)]))
        .await?
        .expect("baseline exists");

    assert_eq!(report.deviations.len(), 1);
    let dev = &report.deviations[0];
    assert_eq!(dev.baseline_mean, 10.0);
    assert_eq!(dev.deviation, 6.0);
    assert_eq!(dev.z_score, 3.0);
    assert!(dev.is_significant);
    assert_eq!(report.significant_metrics, vec!["x".to_string()]);
    assert_eq!(report.overall_trend, BaselineTrend::Improving);
    Ok(())
}

#[tokio::test]
async fn test_custom_z_threshold_changes_significance() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = Arc::new(create_test_store(dir.path().join("test.db")).await);
    let manager = BaselineManager::with_config(
        store,
        BaselineConfig {
            window_days: 183,
            significant_change_z: 1.0,
        },
    );

    manager.establish("p1", &snapshot(&[("x", 8.0)])).await?;
    manager.update("p1", &snapshot(&[("x", 12.0)])).await?;

    // z = 1.5: below the default 2.0 but significant at 1.0
    let report = manager
        .deviation("p1", &snapshot(&[("x", 13.0)]))
        .await?
        .expect("baseline exists");
    assert_eq!(report.deviations[0].z_score, 1.5);
    assert!(report.deviations[0].is_significant);
    Ok(())
}

#[tokio::test]
async fn test_rolling_window_drops_aged_points() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = Arc::new(create_test_store(dir.path().join("test.db")).await);
    let manager = BaselineManager::with_config(
        store,
        BaselineConfig {
            window_days: 30,
            significant_change_z: 2.0,
        },
    );

    let aged = snapshot(&[("x", 10.0)]).with_timestamp(Utc::now() - Duration::days(40));
    manager.establish("p1", &aged).await?;

    let update = manager
        .update("p1", &snapshot(&[("x", 20.0)]).with_timestamp(Utc::now()))
        .await?;

    assert_eq!(update.version, 2);
    assert_eq!(update.dropped_points, 1);
    assert_eq!(update.point_count, 1);

    // stats now reflect only the surviving point
    let report = manager
        .deviation("p1", &snapshot(&[("x", 20.0)]))
        .await?
        .expect("baseline exists");
    assert_eq!(report.deviations[0].baseline_mean, 20.0);
    Ok(())
}

#[tokio::test]
async fn test_update_reports_significant_mean_shift() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = Arc::new(create_test_store(dir.path().join("test.db")).await);
    let manager = BaselineManager::new(store);

    manager.establish("p1", &snapshot(&[("x", 8.0)])).await?;
    manager.update("p1", &snapshot(&[("x", 12.0)])).await?;

    // old stats: mean 10, stddev 2; new mean over [8, 12, 30] is 16.67
    let update = manager.update("p1", &snapshot(&[("x", 30.0)])).await?;

    assert_eq!(update.significant_changes.len(), 1);
    let change = &update.significant_changes[0];
    assert_eq!(change.metric, "x");
    assert_eq!(change.old_mean, 10.0);
    assert!(change.z_score > 3.0);
    Ok(())
}

#[tokio::test]
async fn test_version_persists_across_store_reopen() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("test.db");

    {
        let store = Arc::new(create_test_store(db_path.clone()).await);
        let manager = BaselineManager::new(store);
        manager.establish("p1", &snapshot(&[("x", 10.0)])).await?;
        manager.update("p1", &snapshot(&[("x", 11.0)])).await?;
        manager.update("p1", &snapshot(&[("x", 12.0)])).await?;
    }

    let store = Arc::new(create_test_store(db_path).await);
    let manager = BaselineManager::new(store);
    let report = manager
        .deviation("p1", &snapshot(&[("x", 11.0)]))
        .await?
        .expect("baseline persisted");
    assert_eq!(report.baseline_version, 3);
    assert_eq!(report.point_count, 3);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_updates_serialize_through_sqlite() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = Arc::new(create_test_store(dir.path().join("test.db")).await);
    let manager = Arc::new(BaselineManager::new(store));

    manager.establish("p1", &snapshot(&[("x", 10.0)])).await?;

    let mut handles = Vec::new();
    for i in 0..8 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager
                .update("p1", &snapshot(&[("x", 10.0 + i as f64)]))
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("task panicked")?;
    }

    // every update landed: 1 establish + 8 updates
    let report = manager
        .deviation("p1", &snapshot(&[("x", 10.0)]))
        .await?
        .expect("baseline exists");
    assert_eq!(report.baseline_version, 9);
    assert_eq!(report.point_count, 9);
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunMetrics {
    vocabulary: VocabularyBlock,
    flagged_phrases: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VocabularyBlock {
    total_words: f64,
    type_token_ratio: f64,
}

#[tokio::test]
async fn test_nested_snapshot_flattens_to_dotted_metrics() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = Arc::new(create_test_store(dir.path().join("test.db")).await);
    let manager = BaselineManager::new(store);

    let first = MetricSnapshot::from_serialize(&RunMetrics {
        vocabulary: VocabularyBlock {
            total_words: 120.0,
            type_token_ratio: 0.62,
        },
        flagged_phrases: vec!["where are my keys".to_string()],
    })?;
    manager.establish("p1", &first).await?;

    let second = MetricSnapshot::from_serialize(&RunMetrics {
        vocabulary: VocabularyBlock {
            total_words: 60.0,
            type_token_ratio: 0.31,
        },
        flagged_phrases: Vec::new(),
    })?;
    let report = manager
        .deviation("p1", &second)
        .await?
        .expect("baseline exists");

    // the string list never becomes a metric; the numeric leaves do
    assert_eq!(report.deviations.len(), 2);
    let words = report
        .deviations
        .iter()
        .find(|d| d.metric == "vocabulary.totalWords")
        .expect("dotted key present");
    assert_eq!(words.deviation, -60.0);
    Ok(())
}
