//! State module for tracking campaign progress
//!
//! # Components
//!
//! - `Cursor` / `CursorStore`: durable pointer to the next location, written atomically
//! - `DedupLedger`: append-only JSON-lines set of provider ids already emitted
//! - `SchedulerState`: lifecycle states of the batch scheduler

mod cursor;
mod ledger;
mod scheduler_state;

// Re-export main types
pub use cursor::{Cursor, CursorStore};
pub use ledger::DedupLedger;
pub use scheduler_state::SchedulerState;

/// File name of the cursor inside the state directory
pub const CURSOR_FILE: &str = "cursor.json";

/// File name of the dedup ledger inside the state directory
pub const LEDGER_FILE: &str = "state_dedupe.jsonl";
