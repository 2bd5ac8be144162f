//! Campaign execution
//!
//! This module contains:
//! - Retry policy for provider calls
//! - Fetch-and-classify for a single location
//! - The batch scheduler that walks the location list across runs
//! - Optional checkpointing into the SQLite store
//!
//! [`run_campaign`] wires these together from a loaded [`Config`].

mod checkpoint;
mod fetch;
mod record;
mod retry;
mod scheduler;

pub use checkpoint::Checkpointer;
pub use fetch::{
    classify_provider_error, default_passes, FetchAndClassify, FetchOutcome, FetchedLocation,
    SearchPass,
};
pub use record::EstablishmentRecord;
pub use retry::{Attempted, RetryClass, RetryPolicy};
pub use scheduler::{format_hms, full_pass_eta, BatchScheduler, StopBudget, StopReason};

use crate::classify::OsmTagClassifier;
use crate::config::Config;
use crate::locations::load_locations;
use crate::output::{CsvOutputSink, RunSummary};
use crate::provider::OsmProvider;
use crate::state::{Cursor, CursorStore, DedupLedger, CURSOR_FILE, LEDGER_FILE};
use crate::storage::{open_checkpoint_store, CheckpointStore, SqliteCheckpointStore};
use crate::Result;
use chrono::Utc;
use std::path::Path;
use std::time::Duration;

/// Label used in run directory names when not running under CI
pub const LOCAL_RUN_LABEL: &str = "local";

/// Run label from a CI run id, falling back to [`LOCAL_RUN_LABEL`]
pub fn run_label(ci_run_id: Option<String>) -> String {
    ci_run_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| LOCAL_RUN_LABEL.to_string())
}

/// Opens the ledger file, rebuilding it from the checkpoint store if the file is gone
pub fn open_ledger(path: &Path, store: Option<&SqliteCheckpointStore>) -> Result<DedupLedger> {
    if !path.exists() {
        if let Some(store) = store {
            let ids = store.load_ledger_ids()?;
            if !ids.is_empty() {
                tracing::warn!(
                    "Ledger {} is missing; restoring {} ids from checkpoint database",
                    path.display(),
                    ids.len()
                );
                return DedupLedger::restore(path, ids);
            }
        }
    }
    DedupLedger::open(path)
}

/// Runs one batch of a campaign
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `config_hash` - Hash of the configuration file, recorded with the run
/// * `fresh` - Reset the cursor to the start of the list; the ledger is kept,
///   so a fresh pass still never re-emits a known establishment
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run stopped on its budget or had no work
/// * `Err(HiveError)` - Setup failed, or output or state could not be persisted
pub async fn run_campaign(config: &Config, config_hash: &str, fresh: bool) -> Result<RunSummary> {
    let targets = load_locations(Path::new(&config.campaign.locations_path))?;

    let state_dir = Path::new(&config.campaign.state_dir);
    std::fs::create_dir_all(state_dir)?;

    let cursor_store = CursorStore::new(state_dir.join(CURSOR_FILE));
    if fresh && !targets.is_empty() {
        tracing::info!("Fresh start requested; resetting cursor to 0");
        cursor_store.save(&Cursor::start(targets.len()))?;
    }

    let checkpoint_store = match &config.checkpoint {
        Some(cp) => Some(open_checkpoint_store(Path::new(&cp.database_path))?),
        None => None,
    };
    let ledger = open_ledger(&state_dir.join(LEDGER_FILE), checkpoint_store.as_ref())?;

    let label = run_label(std::env::var("GITHUB_RUN_ID").ok());
    let sink = CsvOutputSink::for_run(Path::new(&config.campaign.output_dir), Utc::now(), &label)?;
    let output_dir = sink.run_dir().to_path_buf();
    tracing::info!("Output folder: {}", output_dir.display());

    let provider = OsmProvider::new(&config.provider)?;
    let fetcher = FetchAndClassify::new(
        Box::new(provider),
        Box::new(OsmTagClassifier::new()),
        RetryPolicy::from_config(&config.retry),
    );

    let mut scheduler = BatchScheduler::new(
        fetcher,
        ledger,
        cursor_store,
        Box::new(sink),
        StopBudget::from_config(&config.budget),
    )
    .with_location_pause(Duration::from_millis(config.provider.location_pause_ms))
    .with_run_label(label, Some(output_dir));

    if let (Some(store), Some(cp_config)) = (checkpoint_store, &config.checkpoint) {
        let checkpointer = Checkpointer::begin(Box::new(store), config_hash, cp_config)?;
        scheduler = scheduler.with_checkpointer(checkpointer);
    }

    scheduler.run(&targets).await
}
