use thiserror::Error;

/// Engine-level errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Baseline store error: {0}")]
    Store(#[from] StoreError),

    #[error("Message resolution failed: {message}")]
    Resolution { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Baseline store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store connection failed: {message}")]
    Connection { message: String },

    #[error("Store query failed: {message}")]
    Query { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Baseline payload corrupt for patient {patient_id}: {message}")]
    CorruptPayload { patient_id: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for baseline store operations
pub type StoreResult<T> = Result<T, StoreError>;
