//! Output sink traits and types
//!
//! This module defines the trait interface for record sinks and
//! associated error types.

use crate::campaign::EstablishmentRecord;
use crate::locations::LocationTarget;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A location's output file could not be created while its directory was usable
    #[error("cannot create {}: {source}", path.display())]
    Target {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OutputError {
    /// True when the failure comes from the location itself rather than the environment
    ///
    /// Such a location can be given up on; any other error ends the run.
    pub fn is_location_specific(&self) -> bool {
        matches!(self, Self::Target { .. })
    }
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// What a sink wrote for one location
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkReceipt {
    pub retail: usize,
    pub wholesale: usize,

    /// Files written or appended to
    pub files: Vec<PathBuf>,
}

impl SinkReceipt {
    pub fn total(&self) -> usize {
        self.retail + self.wholesale
    }
}

/// Durable destination for deduplicated, classified records
///
/// Each call must be complete on disk before it returns; the caller marks
/// the records' ids as seen right after. `records` may be empty.
pub trait OutputSink: Send {
    fn write_location(
        &mut self,
        target: &LocationTarget,
        records: &[EstablishmentRecord],
    ) -> OutputResult<SinkReceipt>;
}
