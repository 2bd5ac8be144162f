//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::state::Cursor;
use crate::storage::{RunCounters, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Externally committed copy of the ledger and cursor
///
/// The JSON-lines ledger and cursor file remain the primary state; this
/// store receives periodic checkpoints and can rebuild a lost ledger file.
pub trait CheckpointStore {
    // ===== Run Management =====

    /// Creates a new run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Records the final status and counters of a run
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counters: &RunCounters,
    ) -> StorageResult<()>;

    /// Marks every run still flagged as running as interrupted
    ///
    /// Returns the number of runs updated.
    fn mark_stale_runs_interrupted(&mut self) -> StorageResult<usize>;

    /// Most recent runs first
    fn latest_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;

    // ===== Checkpoints =====

    /// Inserts ledger ids and replaces the cursor in one transaction
    ///
    /// Ids already present are ignored. Returns how many ids were new.
    fn commit_checkpoint(
        &mut self,
        run_id: i64,
        provider_ids: &[String],
        cursor: &Cursor,
    ) -> StorageResult<usize>;

    /// All ledger ids, in insertion order
    fn load_ledger_ids(&self) -> StorageResult<Vec<String>>;

    fn count_ledger(&self) -> StorageResult<u64>;

    /// The last checkpointed cursor, if any
    fn load_cursor(&self) -> StorageResult<Option<Cursor>>;
}
