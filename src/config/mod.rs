use std::env;
use std::path::PathBuf;

use crate::error::EngineError;

/// Engine configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub baseline: BaselineConfig,
    pub logging: LoggingConfig,
}

/// Baseline store database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Baseline maintenance thresholds
#[derive(Debug, Clone)]
pub struct BaselineConfig {
    /// Rolling window in days for retained snapshot points
    pub window_days: i64,
    /// Absolute z-score at which a deviation or mean shift counts as significant
    pub significant_change_z: f64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, EngineError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("WELLNESS_DB_PATH").unwrap_or_else(|_| "./data/baselines.db".to_string()),
            ),
            max_connections: env::var("WELLNESS_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let baseline = BaselineConfig {
            window_days: env::var("BASELINE_WINDOW_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(183),
            significant_change_z: env::var("BASELINE_SIGNIFICANT_Z")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2.0),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Config {
            database,
            baseline,
            logging,
        })
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            window_days: 183,
            significant_change_z: 2.0,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/baselines.db"),
            max_connections: 5,
        }
    }
}
