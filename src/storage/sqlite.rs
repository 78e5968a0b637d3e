use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use super::BaselineStore;
use crate::baseline::Baseline;
use crate::config::DatabaseConfig;
use crate::error::{StoreError, StoreResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed baseline store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database and run migrations
    pub async fn new(config: &DatabaseConfig) -> StoreResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StoreError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StoreResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StoreError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl BaselineStore for SqliteStore {
    async fn get_baseline(&self, patient_id: &str) -> StoreResult<Option<Baseline>> {
        let row: Option<BaselineRow> = sqlx::query_as(
            r#"
            SELECT patient_id, payload
            FROM baselines
            WHERE patient_id = ?
            "#,
        )
        .bind(patient_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.decode()).transpose()
    }

    async fn put_baseline(&self, baseline: &Baseline) -> StoreResult<()> {
        let payload = serde_json::to_string(baseline)?;

        sqlx::query(
            r#"
            INSERT INTO baselines (patient_id, payload, version, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(patient_id) DO UPDATE SET
                payload = excluded.payload,
                version = excluded.version,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&baseline.patient_id)
        .bind(&payload)
        .bind(baseline.version as i64)
        .bind(baseline.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_baseline(&self, patient_id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM baselines WHERE patient_id = ?")
            .bind(patient_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// Internal row type for SQLx mapping
#[derive(sqlx::FromRow)]
struct BaselineRow {
    patient_id: String,
    payload: String,
}

impl BaselineRow {
    /// Parse the JSON payload, surfacing corruption instead of masking it
    fn decode(self) -> StoreResult<Baseline> {
        serde_json::from_str(&self.payload).map_err(|e| StoreError::CorruptPayload {
            patient_id: self.patient_id,
            message: e.to_string(),
        })
    }
}
