//! Database schema definitions
//!
//! This module contains the SQL schema for the checkpoint database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track campaign runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    locations_processed INTEGER NOT NULL DEFAULT 0,
    new_records INTEGER NOT NULL DEFAULT 0,
    failed_locations INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);

-- Provider ids already emitted; written with INSERT OR IGNORE
CREATE TABLE IF NOT EXISTS ledger (
    provider_id TEXT PRIMARY KEY,
    first_run INTEGER NOT NULL REFERENCES runs(id),
    inserted_at TEXT NOT NULL
);

-- Single-row resumption cursor
CREATE TABLE IF NOT EXISTS cursor (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    next_index INTEGER NOT NULL,
    total_count INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
