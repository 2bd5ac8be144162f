//! Hive-Scan: a resumable scanner for retail and wholesale food businesses
//!
//! This crate walks an ordered list of locations, queries geocoding and
//! point-of-interest services for grocery-adjacent establishments, classifies
//! each one into a retail or wholesale segment with a NAICS code, and writes
//! the results as CSV files. Progress is kept in a cursor file and a dedup
//! ledger so that repeated runs pick up where the last one stopped without
//! emitting the same establishment twice.

pub mod campaign;
pub mod census;
pub mod classify;
pub mod config;
pub mod locations;
pub mod output;
pub mod provider;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Hive-Scan operations
#[derive(Debug, Error)]
pub enum HiveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] provider::ProviderError),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dedup ledger {path} is corrupt at line {line}: {message}")]
    LedgerCorrupt {
        path: String,
        line: usize,
        message: String,
    },

    #[error("Invalid scheduler transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::SchedulerState,
        to: state::SchedulerState,
    },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Hive-Scan operations
pub type Result<T> = std::result::Result<T, HiveError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use campaign::{run_campaign, BatchScheduler, FetchAndClassify, RetryPolicy};
pub use classify::{Classification, Classifier, OsmTagClassifier, Segment};
pub use config::Config;
pub use locations::LocationTarget;
pub use state::{Cursor, CursorStore, DedupLedger, SchedulerState};
