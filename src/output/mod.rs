//! Output module for campaign results and reports
//!
//! This module handles:
//! - Writing classified records to per-run CSV files
//! - Formatting the end-of-run summary (stdout, CI job summary)
//! - Reporting campaign statistics

mod csv_sink;
pub mod stats;
mod summary;
mod traits;

pub use csv_sink::{output_filenames, run_dir_name, CsvOutputSink, CSV_HEADERS};
pub use stats::{load_statistics, print_statistics, CampaignStatistics};
pub use summary::{append_job_summary, print_summary, LocationFailure, RunSummary};
pub use traits::{OutputError, OutputResult, OutputSink, SinkReceipt};
