//! # Wellness Risk Engine
//!
//! A rule-based analytics engine that screens transcribed patient
//! conversations for early indicators of cognitive decline, mood changes,
//! financial exploitation, and elder abuse.
//!
//! ## Features
//!
//! - **Vocabulary Analysis**: lexical diversity, readability, and complexity
//!   over patient utterances
//! - **Repetition Detection**: repeated phrases within and across
//!   conversations, with severity tiers
//! - **Psychiatric Markers**: pronoun, temporal, absolutist, and mood-marker
//!   composites for depression and anxiety language
//! - **Abuse Indicators**: physical, emotional, and neglect categories with
//!   temporal escalation detection
//! - **Financial Exploitation**: scam, money-request, and transfer-method
//!   screening
//! - **Relationship Patterns**: isolation and controlling-influence tracking
//! - **Patient Baselines**: rolling per-patient statistics with z-score
//!   deviation scoring and seasonal adjustment
//! - **Risk Fusion**: weighted cross-detector fusion with a corroboration
//!   bonus when multiple areas agree
//!
//! ## Architecture
//!
//! ```text
//! Conversations (JSON) → Detectors → Fusion → Assessment
//!                             ↓
//!                      Baselines (SQLite)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wellness_risk_engine::{Config, WellnessAnalyzer};
//! use wellness_risk_engine::baseline::BaselineManager;
//! use wellness_risk_engine::storage::SqliteStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let store = Arc::new(SqliteStore::new(&config.database).await?);
//!     let baselines = Arc::new(BaselineManager::with_config(store, config.baseline));
//!     let analyzer = WellnessAnalyzer::new(baselines);
//!     let assessment = analyzer
//!         .analyze_conversations("patient-7", &conversations)
//!         .await;
//!     println!("{}", serde_json::to_string_pretty(&assessment)?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Risk fusion orchestrators producing caregiver-facing assessments.
pub mod analysis;
/// Per-patient statistical baselines with z-score deviation scoring.
pub mod baseline;
/// Configuration management loaded from the environment.
pub mod config;
/// Conversation model and message-reference resolution.
pub mod conversation;
/// Keyword and composite-score detectors over patient language.
pub mod detectors;
/// Error types and result aliases.
pub mod error;
/// Storage layer for baseline persistence.
pub mod storage;
/// Text segmentation and keyword-matching primitives.
pub mod text;

pub use analysis::fraud_abuse::{FraudAbuseAnalyzer, FraudAbuseAssessment};
pub use analysis::wellness::{WellnessAnalyzer, WellnessAssessment};
pub use config::Config;
pub use error::{EngineError, EngineResult};
