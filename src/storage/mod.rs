//! Storage layer for baseline persistence.
//!
//! Baselines are whole-record documents: one row per patient, serialized as
//! JSON. The trait keeps the analysis layer independent of the backing store
//! so tests can run against the in-memory implementation.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::baseline::Baseline;
use crate::error::StoreResult;

/// Persistence operations for patient baselines.
///
/// Delete exists only for the patient-removal path; analysis never deletes a
/// baseline.
#[async_trait]
pub trait BaselineStore: Send + Sync {
    /// Fetch a patient's baseline, if one has been established.
    async fn get_baseline(&self, patient_id: &str) -> StoreResult<Option<Baseline>>;

    /// Insert or replace a patient's baseline.
    async fn put_baseline(&self, baseline: &Baseline) -> StoreResult<()>;

    /// Remove a patient's baseline.
    async fn delete_baseline(&self, patient_id: &str) -> StoreResult<()>;
}
