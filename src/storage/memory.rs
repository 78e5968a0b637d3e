use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::BaselineStore;
use crate::baseline::Baseline;
use crate::error::StoreResult;

/// In-memory baseline store for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryStore {
    baselines: RwLock<HashMap<String, Baseline>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored baselines
    pub async fn len(&self) -> usize {
        self.baselines.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.baselines.read().await.is_empty()
    }
}

#[async_trait]
impl BaselineStore for MemoryStore {
    async fn get_baseline(&self, patient_id: &str) -> StoreResult<Option<Baseline>> {
        Ok(self.baselines.read().await.get(patient_id).cloned())
    }

    async fn put_baseline(&self, baseline: &Baseline) -> StoreResult<()> {
        self.baselines
            .write()
            .await
            .insert(baseline.patient_id.clone(), baseline.clone());
        Ok(())
    }

    async fn delete_baseline(&self, patient_id: &str) -> StoreResult<()> {
        self.baselines.write().await.remove(patient_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::baseline::{default_seasonal, BaselinePoint};

    fn sample_baseline(patient_id: &str) -> Baseline {
        let now = Utc::now();
        let mut baseline = Baseline {
            patient_id: patient_id.to_string(),
            version: 1,
            established_at: now,
            updated_at: now,
            points: vec![BaselinePoint {
                recorded_at: Some(now),
                values: [("vocabulary.totalWords".to_string(), 180.0)]
                    .into_iter()
                    .collect(),
            }],
            stats: Default::default(),
            seasonal: default_seasonal(),
        };
        baseline.recompute_stats();
        baseline
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() {
        let store = MemoryStore::new();
        let baseline = sample_baseline("p1");
        store.put_baseline(&baseline).await.unwrap();

        let fetched = store.get_baseline("p1").await.unwrap().unwrap();
        assert_eq!(fetched, baseline);
    }

    #[tokio::test]
    async fn test_get_unknown_patient_is_none() {
        let store = MemoryStore::new();
        assert!(store.get_baseline("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_existing() {
        let store = MemoryStore::new();
        let mut baseline = sample_baseline("p1");
        store.put_baseline(&baseline).await.unwrap();

        baseline.version = 2;
        store.put_baseline(&baseline).await.unwrap();

        let fetched = store.get_baseline("p1").await.unwrap().unwrap();
        assert_eq!(fetched.version, 2);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_removes_baseline() {
        let store = MemoryStore::new();
        store.put_baseline(&sample_baseline("p1")).await.unwrap();
        store.delete_baseline("p1").await.unwrap();
        assert!(store.get_baseline("p1").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }
}
