//! Campaign statistics for `--stats`
//!
//! This module collects the state a campaign has accumulated (location list,
//! cursor, ledger and checkpoint database) and prints it.

use crate::config::Config;
use crate::locations::load_locations;
use crate::state::{Cursor, CursorStore, DedupLedger, CURSOR_FILE, LEDGER_FILE};
use crate::storage::{open_checkpoint_store, CheckpointStore, RunRecord};
use crate::HiveError;
use std::path::Path;

/// Number of runs listed from the checkpoint database
const RECENT_RUNS: usize = 10;

/// Campaign statistics summary
#[derive(Debug, Clone)]
pub struct CampaignStatistics {
    /// Locations in the list, if it could be read
    pub location_count: Option<usize>,

    /// Cursor file contents, unvalidated
    pub cursor: Option<Cursor>,

    pub ledger_entries: usize,

    pub checkpoint: Option<CheckpointStatistics>,
}

/// What the checkpoint database holds
#[derive(Debug, Clone)]
pub struct CheckpointStatistics {
    pub ledger_entries: u64,
    pub cursor: Option<Cursor>,
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics from the campaign's state files
pub fn load_statistics(config: &Config) -> Result<CampaignStatistics, HiveError> {
    let state_dir = Path::new(&config.campaign.state_dir);

    let location_count = match load_locations(Path::new(&config.campaign.locations_path)) {
        Ok(locations) => Some(locations.len()),
        Err(e) => {
            tracing::warn!("Could not read location list: {}", e);
            None
        }
    };

    let cursor = CursorStore::new(state_dir.join(CURSOR_FILE)).load_stored();
    let ledger = DedupLedger::open(state_dir.join(LEDGER_FILE))?;

    let checkpoint = match &config.checkpoint {
        Some(cp) if Path::new(&cp.database_path).exists() => {
            let store = open_checkpoint_store(Path::new(&cp.database_path))?;
            Some(CheckpointStatistics {
                ledger_entries: store.count_ledger()?,
                cursor: store.load_cursor()?,
                recent_runs: store.latest_runs(RECENT_RUNS)?,
            })
        }
        _ => None,
    };

    Ok(CampaignStatistics {
        location_count,
        cursor,
        ledger_entries: ledger.len(),
        checkpoint,
    })
}

fn format_cursor(cursor: Option<&Cursor>) -> String {
    match cursor {
        Some(c) => format!(
            "{} / {} ({:.1}%)",
            c.next_index,
            c.total_count,
            c.progress_percent()
        ),
        None => "none".to_string(),
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CampaignStatistics) {
    println!("=== Campaign Statistics ===\n");

    println!("Overview:");
    match stats.location_count {
        Some(count) => println!("  Locations in list: {}", count),
        None => println!("  Locations in list: unreadable"),
    }
    println!("  Cursor: {}", format_cursor(stats.cursor.as_ref()));
    println!("  Dedup ledger entries: {}", stats.ledger_entries);
    println!();

    if let (Some(count), Some(cursor)) = (stats.location_count, stats.cursor) {
        if cursor.total_count != count {
            println!(
                "Note: cursor was saved for {} locations; the next run restarts at 0",
                cursor.total_count
            );
            println!();
        }
    }

    let Some(checkpoint) = &stats.checkpoint else {
        return;
    };

    println!("Checkpoint Database:");
    println!("  Ledger entries: {}", checkpoint.ledger_entries);
    println!("  Cursor: {}", format_cursor(checkpoint.cursor.as_ref()));
    println!();

    if !checkpoint.recent_runs.is_empty() {
        println!("Recent Runs:");
        for run in &checkpoint.recent_runs {
            println!(
                "  #{} {} [{}] locations={} new={} failed={}",
                run.id,
                run.started_at,
                run.status.to_db_string(),
                run.counters.locations_processed,
                run.counters.new_records,
                run.counters.failed_locations
            );
        }
        println!();
    }
}
