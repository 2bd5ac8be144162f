//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the CheckpointStore trait.

use crate::state::Cursor;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CheckpointStore, StorageError, StorageResult};
use crate::storage::{RunCounters, RunRecord, RunStatus};
use crate::HiveError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, \
     locations_processed, new_records, failed_locations";

/// SQLite checkpoint backend
pub struct SqliteCheckpointStore {
    conn: Connection,
}

impl SqliteCheckpointStore {
    /// Opens or creates the database at `path`, creating parent directories
    pub fn new(path: &Path) -> Result<Self, HiveError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HiveError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Failed),
        counters: RunCounters {
            locations_processed: row.get::<_, i64>(5)? as u64,
            new_records: row.get::<_, i64>(6)? as u64,
            failed_locations: row.get::<_, i64>(7)? as u64,
        },
    })
}

impl CheckpointStore for SqliteCheckpointStore {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counters: &RunCounters,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, locations_processed = ?3, \
             new_records = ?4, failed_locations = ?5 WHERE id = ?6",
            params![
                status.to_db_string(),
                now,
                counters.locations_processed as i64,
                counters.new_records as i64,
                counters.failed_locations as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn mark_stale_runs_interrupted(&mut self) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE status = ?3",
            params![
                RunStatus::Interrupted.to_db_string(),
                now,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(updated)
    }

    fn latest_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT ?1", RUN_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    // ===== Checkpoints =====

    fn commit_checkpoint(
        &mut self,
        run_id: i64,
        provider_ids: &[String],
        cursor: &Cursor,
    ) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO ledger (provider_id, first_run, inserted_at) VALUES (?1, ?2, ?3)",
            )?;
            for id in provider_ids {
                inserted += stmt.execute(params![id, run_id, now])?;
            }
        }

        tx.execute(
            "INSERT OR REPLACE INTO cursor (id, next_index, total_count, updated_at) VALUES (1, ?1, ?2, ?3)",
            params![cursor.next_index as i64, cursor.total_count as i64, now],
        )?;

        tx.commit()?;
        Ok(inserted)
    }

    fn load_ledger_ids(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT provider_id FROM ledger ORDER BY rowid")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn count_ledger(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM ledger", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn load_cursor(&self) -> StorageResult<Option<Cursor>> {
        let cursor = self
            .conn
            .query_row(
                "SELECT next_index, total_count FROM cursor WHERE id = 1",
                [],
                |row| {
                    Ok(Cursor {
                        next_index: row.get::<_, i64>(0)? as usize,
                        total_count: row.get::<_, i64>(1)? as usize,
                    })
                },
            )
            .optional()?;
        Ok(cursor)
    }
}
