//! Periodic flush of the ledger and cursor into the checkpoint store

use crate::config::CheckpointConfig;
use crate::state::Cursor;
use crate::storage::{CheckpointStore, RunCounters, RunStatus};
use crate::Result;
use std::time::{Duration, Instant};

/// Buffers newly emitted ids and commits them with the cursor when due
pub struct Checkpointer {
    store: Box<dyn CheckpointStore + Send>,
    run_id: i64,
    every_locations: Option<u32>,
    every: Option<Duration>,
    locations_since: u32,
    last_flush: Instant,
    pending: Vec<String>,
}

impl Checkpointer {
    /// Registers a new run in `store`, closing any run left marked as running
    pub fn begin(
        mut store: Box<dyn CheckpointStore + Send>,
        config_hash: &str,
        config: &CheckpointConfig,
    ) -> Result<Self> {
        let stale = store.mark_stale_runs_interrupted()?;
        if stale > 0 {
            tracing::warn!("Marked {} unfinished run(s) as interrupted", stale);
        }

        let run_id = store.create_run(config_hash)?;
        tracing::info!("Checkpointing run {} to {}", run_id, config.database_path);

        Ok(Self {
            store,
            run_id,
            every_locations: config.every_locations,
            every: config.every_secs.map(Duration::from_secs),
            locations_since: 0,
            last_flush: Instant::now(),
            pending: Vec::new(),
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Notes one processed location and the ids it added to the ledger
    pub fn record(&mut self, new_ids: &[String]) {
        self.locations_since += 1;
        self.pending.extend_from_slice(new_ids);
    }

    /// True when either interval has elapsed since the last flush
    pub fn is_due(&self, now: Instant) -> bool {
        let by_count = self
            .every_locations
            .is_some_and(|n| n > 0 && self.locations_since >= n);
        let by_time = self
            .every
            .is_some_and(|every| now.duration_since(self.last_flush) >= every);
        by_count || by_time
    }

    /// Commits pending ids and `cursor` in one transaction
    pub fn flush(&mut self, cursor: &Cursor) -> Result<usize> {
        let inserted = self
            .store
            .commit_checkpoint(self.run_id, &self.pending, cursor)?;
        tracing::debug!(
            "Checkpoint: {} ids ({} new), cursor {}/{}",
            self.pending.len(),
            inserted,
            cursor.next_index,
            cursor.total_count
        );

        self.pending.clear();
        self.locations_since = 0;
        self.last_flush = Instant::now();
        Ok(inserted)
    }

    /// Flushes what is left and records the run's outcome
    pub fn finish(
        &mut self,
        cursor: &Cursor,
        counters: &RunCounters,
        status: RunStatus,
    ) -> Result<()> {
        self.flush(cursor)?;
        self.store.finish_run(self.run_id, status, counters)?;
        Ok(())
    }

    pub fn store(&self) -> &dyn CheckpointStore {
        self.store.as_ref()
    }
}
