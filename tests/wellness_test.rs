//! Wellness analyzer integration tests
//!
//! End-to-end runs over real baseline stores: establishing a patient's
//! baseline, scoring later batches against it across analyzer restarts,
//! lexical-decline detection, and the store contract checked through mocked
//! collaborators.

use std::path::PathBuf;
use std::sync::{Arc, Once};

use async_trait::async_trait;
use mockall::mock;
use serde_json::json;
use tempfile::tempdir;

use wellness_risk_engine::baseline::{Baseline, BaselineManager};
use wellness_risk_engine::config::DatabaseConfig;
use wellness_risk_engine::conversation::{Conversation, Message};
use wellness_risk_engine::error::{StoreError, StoreResult};
use wellness_risk_engine::storage::{BaselineStore, MemoryStore, SqliteStore};
use wellness_risk_engine::WellnessAnalyzer;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("wellness_risk_engine=debug")
            .with_test_writer()
            .try_init();
    });
}

mock! {
    Store {}

    #[async_trait]
    impl BaselineStore for Store {
        async fn get_baseline(&self, patient_id: &str) -> StoreResult<Option<Baseline>>;
        async fn put_baseline(&self, baseline: &Baseline) -> StoreResult<()>;
        async fn delete_baseline(&self, patient_id: &str) -> StoreResult<()>;
    }
}

/// Analyzer backed by a SQLite store at the given path
async fn sqlite_analyzer(db_path: PathBuf) -> WellnessAnalyzer {
    let config = DatabaseConfig {
        path: db_path,
        max_connections: 2,
    };
    let store = Arc::new(
        SqliteStore::new(&config)
            .await
            .expect("Failed to create SQLite store"),
    );
    WellnessAnalyzer::new(Arc::new(BaselineManager::new(store)))
}

fn memory_analyzer() -> WellnessAnalyzer {
    let store = Arc::new(MemoryStore::new());
    WellnessAnalyzer::new(Arc::new(BaselineManager::new(store)))
}

fn conversation(texts: &[&str]) -> Conversation {
    Conversation::inline(texts.iter().map(|t| Message::patient(*t)).collect())
}

/// A talkative visit, the kind that sets a healthy vocabulary baseline
fn rich_batch_one() -> Vec<Conversation> {
    vec![conversation(&[
        "We spent the whole morning out on the porch repotting geraniums and trimming \
         the rosemary, then walked down to the bakery for rye bread and talked with \
         the baker about her new wood oven. After lunch I sorted the seed packets into \
         labeled envelopes, swept the garden shed, oiled the squeaky hinges on the \
         gate, and wrote a long letter to my cousin describing the tulip beds, the \
         weather vane repair, and the stubborn old lawnmower that finally started on \
         the third pull.",
    ])]
}

/// A second talkative visit, longer than the first so the stored word counts
/// carry real spread
fn rich_batch_two() -> Vec<Conversation> {
    vec![conversation(&[
        "The whole afternoon went to the photograph albums, matching the lake trip \
         pictures with the dates penciled on the backs and writing captions for the \
         ones from the cabin summers. My granddaughter helped me carry the heavy \
         boxes up from the cellar and we found the old fishing licenses, a ribbon \
         from the county fair, two theater programs, and the recipe cards in my \
         mother's looping handwriting. Later we baked the molasses cookies from one \
         of those cards, burned the first tray, opened the windows to clear the \
         smoke, laughed about it, and ate the second tray warm on the steps while \
         the neighbor's terrier supervised from the fence and the kettle whistled \
         twice because we kept forgetting the tea.",
    ])]
}

/// A third distinct visit for bookkeeping across restarts
fn rich_batch_three() -> Vec<Conversation> {
    vec![conversation(&[
        "This week the quilting circle met at the library and we finished the star \
         pattern blanket for the raffle, then my neighbor drove us past the orchard \
         stand for cider and early apples, and in the evening I mended the kitchen \
         curtains while the radio played the baseball game.",
    ])]
}

/// Long enough to analyze, but nearly empty of content words
fn sparse_batch() -> Vec<Conversation> {
    vec![conversation(&[
        "It was what it was, and that was that. There was not much more to it than \
         that, you know, and so it went on and on for most of the day.",
    ])]
}

#[cfg(test)]
mod sqlite_backed_tests {
    use super::*;

    #[tokio::test]
    async fn test_baseline_survives_analyzer_restarts() {
        init_tracing();
        let dir = tempdir().expect("Failed to create temp dir");
        let db_path = dir.path().join("baselines.db");

        {
            let analyzer = sqlite_analyzer(db_path.clone()).await;

            let first = analyzer
                .analyze_conversations("patient-9", &rich_batch_one())
                .await;
            assert!(first.baseline_deviation.is_none());
            assert_eq!(first.baseline_update.as_ref().map(|u| u.version), Some(1));

            let second = analyzer
                .analyze_conversations("patient-9", &rich_batch_two())
                .await;
            assert_eq!(
                second
                    .baseline_deviation
                    .as_ref()
                    .map(|r| r.baseline_version),
                Some(1)
            );
            assert_eq!(second.baseline_update.as_ref().map(|u| u.version), Some(2));
        }

        // a fresh store over the same file sees the accumulated history
        let analyzer = sqlite_analyzer(db_path).await;
        let third = analyzer
            .analyze_conversations("patient-9", &rich_batch_three())
            .await;

        let report = third.baseline_deviation.expect("deviation against history");
        assert_eq!(report.baseline_version, 2);
        assert_eq!(report.point_count, 2);
        assert_eq!(third.baseline_update.expect("update ran").version, 3);
    }

    #[tokio::test]
    async fn test_patients_get_independent_baselines() {
        let dir = tempdir().expect("Failed to create temp dir");
        let analyzer = sqlite_analyzer(dir.path().join("baselines.db")).await;

        analyzer
            .analyze_conversations("patient-a", &rich_batch_one())
            .await;
        let other = analyzer
            .analyze_conversations("patient-b", &rich_batch_two())
            .await;

        // patient-b starts from scratch regardless of patient-a's history
        assert!(other.baseline_deviation.is_none());
        assert_eq!(other.baseline_update.expect("established").version, 1);
    }
}

#[cfg(test)]
mod decline_tests {
    use super::*;

    #[tokio::test]
    async fn test_vocabulary_collapse_flags_lexical_decline() {
        let analyzer = memory_analyzer();

        analyzer
            .analyze_conversations("p-lex", &rich_batch_one())
            .await;
        analyzer
            .analyze_conversations("p-lex", &rich_batch_two())
            .await;
        let assessment = analyzer.analyze_conversations("p-lex", &sparse_batch()).await;

        let report = assessment.baseline_deviation.expect("deviation report");
        assert!(report
            .significant_metrics
            .iter()
            .any(|m| m == "vocabulary.totalWords"));
        let total_words = report
            .deviations
            .iter()
            .find(|d| d.metric == "vocabulary.totalWords")
            .expect("totalWords scored");
        assert!(total_words.z_score < -2.0);

        assert!(assessment.lexical_risk > 0.0);
        assert!(assessment.overall_risk_score > 0.0);
        assert!(assessment
            .recommendations
            .iter()
            .any(|r| r.action.contains("word-finding")));
        assert!(assessment
            .warnings
            .iter()
            .any(|w| w.contains("deviate significantly")));
    }
}

#[cfg(test)]
mod store_contract_tests {
    use super::*;

    #[tokio::test]
    async fn test_first_run_reads_twice_and_writes_version_one() {
        let mut store = MockStore::new();
        store
            .expect_get_baseline()
            .withf(|id| id == "p-mock")
            .times(2)
            .returning(|_| Ok(None));
        store
            .expect_put_baseline()
            .withf(|b| b.patient_id == "p-mock" && b.version == 1 && b.points.len() == 1)
            .times(1)
            .returning(|_| Ok(()));

        let analyzer = WellnessAnalyzer::new(Arc::new(BaselineManager::new(Arc::new(store))));
        let assessment = analyzer
            .analyze_conversations("p-mock", &rich_batch_one())
            .await;

        assert!(assessment.baseline_deviation.is_none());
        assert_eq!(assessment.baseline_update.expect("established").version, 1);
    }

    #[tokio::test]
    async fn test_no_write_is_attempted_after_failed_reads() {
        let mut store = MockStore::new();
        store.expect_get_baseline().times(2).returning(|_| {
            Err(StoreError::Connection {
                message: "socket reset".to_string(),
            })
        });
        // no put_baseline expectation: a write after a failed read would panic

        let analyzer = WellnessAnalyzer::new(Arc::new(BaselineManager::new(Arc::new(store))));
        let assessment = analyzer
            .analyze_conversations("p-out", &rich_batch_one())
            .await;

        assert!(assessment.baseline_deviation.is_none());
        assert!(assessment.baseline_update.is_none());
        assert!(assessment
            .warnings
            .iter()
            .any(|w| w.contains("Baseline comparison unavailable")));
        assert!(assessment
            .warnings
            .iter()
            .any(|w| w.contains("Baseline update failed")));
        // the linguistic half of the assessment still completed
        assert!(assessment.vocabulary.total_words > 0);
        assert_eq!(assessment.lexical_risk, 0.0);
    }
}

#[cfg(test)]
mod contract_tests {
    use super::*;

    #[tokio::test]
    async fn test_assessment_serializes_baseline_blocks_camel_case() {
        let analyzer = memory_analyzer();

        let first = analyzer
            .analyze_conversations("p-json", &rich_batch_one())
            .await;
        let value = serde_json::to_value(&first).unwrap();
        assert_eq!(value["patientId"], json!("p-json"));
        assert!(value["memoryRisk"].is_number());
        assert!(value["moodRisk"].is_number());
        assert!(value["lexicalRisk"].is_number());
        assert!(value.get("baselineDeviation").is_none());
        assert_eq!(value["baselineUpdate"]["version"], json!(1));
        assert_eq!(value["baselineUpdate"]["droppedPoints"], json!(0));

        let second = analyzer
            .analyze_conversations("p-json", &rich_batch_two())
            .await;
        let value = serde_json::to_value(&second).unwrap();
        assert_eq!(value["baselineDeviation"]["baselineVersion"], json!(1));
        assert!(value["baselineDeviation"]["overallTrend"].is_string());
        assert!(value["baselineDeviation"]["significantMetrics"].is_array());
        assert_eq!(value["baselineUpdate"]["version"], json!(2));
    }
}
