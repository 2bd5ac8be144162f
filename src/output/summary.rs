//! End-of-run summary
//!
//! Printed to stdout, logged, and optionally appended to a CI job-summary
//! file (`GITHUB_STEP_SUMMARY`).

use crate::campaign::StopReason;
use crate::output::traits::OutputResult;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A location whose fetch failed definitively
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFailure {
    pub index: usize,
    pub query: String,
    pub message: String,
}

/// Totals for one run of the batch scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_label: String,
    pub output_dir: Option<PathBuf>,

    /// Locations attempted, including unresolvable and failed ones
    pub locations_processed: u32,
    pub unresolvable: u32,
    pub failures: Vec<LocationFailure>,

    /// Records written that were not already in the ledger
    pub new_records: usize,

    /// Records dropped because the ledger already had their id
    pub duplicates_skipped: usize,

    /// Provider calls that ran out of retries
    pub degraded_calls: u32,

    pub next_index: usize,
    pub total_count: usize,
    pub ledger_size: usize,
    pub elapsed: Duration,
    pub stop_reason: StopReason,
}

impl RunSummary {
    /// An empty summary for a list of `total_count` locations
    pub fn new(run_label: impl Into<String>, total_count: usize) -> Self {
        Self {
            run_label: run_label.into(),
            output_dir: None,
            locations_processed: 0,
            unresolvable: 0,
            failures: Vec::new(),
            new_records: 0,
            duplicates_skipped: 0,
            degraded_calls: 0,
            next_index: 0,
            total_count,
            ledger_size: 0,
            elapsed: Duration::ZERO,
            stop_reason: StopReason::NoWork,
        }
    }

    /// Position through the current pass; a cursor back at 0 counts as a full pass
    pub fn cursor_completed(&self) -> usize {
        if self.next_index == 0 {
            self.total_count
        } else {
            self.next_index
        }
    }

    pub fn cursor_percent(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.cursor_completed() as f64 / self.total_count as f64 * 100.0
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    /// Formats the summary as markdown
    pub fn format_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str("## Hive-Scan Batch Summary\n\n");

        if self.stop_reason == StopReason::NoWork {
            md.push_str("- **No work:** the location list is empty\n");
            return md;
        }

        md.push_str(&format!("- **Run:** {}\n", self.run_label));
        md.push_str(&format!("- **Stopped by:** {}\n", self.stop_reason));
        md.push_str(&format!(
            "- **Processed this run:** {} locations\n",
            self.locations_processed
        ));
        md.push_str(&format!(
            "- **New unique Place IDs added:** {}\n",
            self.new_records
        ));
        md.push_str(&format!(
            "- **Already seen (skipped):** {}\n",
            self.duplicates_skipped
        ));
        md.push_str(&format!("- **Unresolvable locations:** {}\n", self.unresolvable));
        md.push_str(&format!("- **Failed locations:** {}\n", self.failed_count()));
        if self.degraded_calls > 0 {
            md.push_str(&format!(
                "- **Calls degraded after retries:** {}\n",
                self.degraded_calls
            ));
        }
        md.push_str(&format!("- **Elapsed:** {}s\n", self.elapsed.as_secs()));
        md.push_str(&format!(
            "- **Cursor:** {} / {}  (_{:.2}% of list_)\n",
            self.cursor_completed(),
            self.total_count,
            self.cursor_percent()
        ));
        md.push_str(&format!("- **Next start index:** {}\n", self.next_index));
        md.push_str(&format!("- **Ledger size:** {}\n", self.ledger_size));
        if let Some(dir) = &self.output_dir {
            md.push_str(&format!("- **Output folder:** `{}`\n", dir.display()));
        }

        if !self.failures.is_empty() {
            md.push_str("\n### Failed Locations\n\n");
            md.push_str("| # | Location | Error |\n");
            md.push_str("|---|----------|-------|\n");
            for failure in &self.failures {
                md.push_str(&format!(
                    "| {} | {} | {} |\n",
                    failure.index + 1,
                    failure.query,
                    failure.message.replace('|', "/")
                ));
            }
        }

        md
    }
}

/// Prints the summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("\n--- Batch Summary ---");
    println!("{}", summary.format_markdown());
}

/// Appends the markdown summary to a job-summary file
pub fn append_job_summary(summary: &RunSummary, path: &Path) -> OutputResult<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(summary.format_markdown().as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}
