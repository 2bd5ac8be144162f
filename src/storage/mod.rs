//! Storage module for the checkpoint database
//!
//! This module handles all database operations for the campaign, including:
//! - SQLite database initialization and schema management
//! - Run tracking (start, finish, interrupted runs)
//! - Periodic checkpoints of the dedup ledger and cursor

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteCheckpointStore;
pub use traits::{CheckpointStore, StorageError, StorageResult};

use crate::HiveError;
use std::path::Path;

/// Opens or creates the checkpoint database at `path`
///
/// # Arguments
///
/// * `path` - Location of the SQLite file; parent directories are created
///
/// # Returns
///
/// * `Ok(SqliteCheckpointStore)` - Store with its schema in place
/// * `Err(HiveError)` - The database could not be opened or migrated
pub fn open_checkpoint_store(path: &Path) -> Result<SqliteCheckpointStore, HiveError> {
    SqliteCheckpointStore::new(path)
}

/// Represents a campaign run
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub counters: RunCounters,
}

/// Per-run totals stored alongside the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub locations_processed: u64,
    pub new_records: u64,
    pub failed_locations: u64,
}

/// Status of a campaign run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
