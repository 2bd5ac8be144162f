//! Durable resumption pointer into the location list

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Position of the next location to process
///
/// `next_index < total_count` holds whenever `total_count > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    #[serde(alias = "index")]
    pub next_index: usize,

    #[serde(alias = "total")]
    pub total_count: usize,
}

impl Cursor {
    /// A cursor at the start of a list of `total_count` locations
    pub fn start(total_count: usize) -> Self {
        Self {
            next_index: 0,
            total_count,
        }
    }

    /// Moves to the next location, wrapping to 0 after the last one
    pub fn advance(&mut self) {
        if self.total_count == 0 {
            self.next_index = 0;
            return;
        }
        self.next_index = (self.next_index + 1) % self.total_count;
    }

    /// Progress through the current pass, 0.0 to 100.0
    pub fn progress_percent(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.next_index as f64 / self.total_count as f64 * 100.0
    }

    fn is_valid_for(&self, total_count: usize) -> bool {
        self.total_count == total_count && self.next_index < total_count
    }
}

/// Reads and writes the cursor file
#[derive(Debug, Clone)]
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the cursor for a list of `total_count` locations
    ///
    /// A missing, unreadable or mismatched cursor resets to the start of the
    /// list. This never fails: the dedup ledger keeps a restart from
    /// re-emitting records.
    pub fn load(&self, total_count: usize) -> Cursor {
        match self.load_stored() {
            Some(cursor) if cursor.is_valid_for(total_count) => cursor,
            Some(cursor) => {
                tracing::warn!(
                    "Cursor {}/{} does not fit a list of {} locations; restarting at 0",
                    cursor.next_index,
                    cursor.total_count,
                    total_count
                );
                Cursor::start(total_count)
            }
            None => Cursor::start(total_count),
        }
    }

    /// Returns the stored cursor as-is, or `None` if absent or unreadable
    pub fn load_stored(&self) -> Option<Cursor> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Could not read cursor {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(cursor) => Some(cursor),
            Err(e) => {
                tracing::warn!("Cursor {} is malformed: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Persists the cursor atomically (temp file, fsync, rename)
    pub fn save(&self, cursor: &Cursor) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let encoded = serde_json::to_vec(cursor)?;
        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(&encoded)?;
        file.sync_all()?;

        fs::rename(temp_path, &self.path)?;
        Ok(())
    }
}
