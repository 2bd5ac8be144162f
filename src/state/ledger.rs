//! Campaign-wide dedup ledger

use crate::{HiveError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One line of the ledger file
#[derive(Debug, Serialize, Deserialize)]
struct LedgerEntry {
    #[serde(alias = "place_id")]
    provider_id: String,
}

/// Append-only set of provider ids already written to output
///
/// Backed by a JSON-lines file. Ids are only ever added; a corrupt file
/// is an error rather than something to silently skip, since losing an id
/// would let its record be emitted twice.
#[derive(Debug)]
pub struct DedupLedger {
    path: PathBuf,
    seen: HashSet<String>,
}

impl DedupLedger {
    /// Opens the ledger, treating a missing file as empty
    ///
    /// A last line without its newline is what an interrupted append leaves
    /// behind. If it parses it is kept and terminated; otherwise it is logged
    /// and cut off. Any other unparseable line is [`HiveError::LedgerCorrupt`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut seen = HashSet::new();

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self { path, seen });
            }
            Err(e) => return Err(e.into()),
        };

        let terminated = bytes.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
        let (body, tail) = bytes.split_at(terminated);

        let body = std::str::from_utf8(body).map_err(|e| HiveError::LedgerCorrupt {
            path: path.display().to_string(),
            line: body[..e.valid_up_to()].iter().filter(|b| **b == b'\n').count() + 1,
            message: e.to_string(),
        })?;

        let mut line_count = 0;
        for (idx, line) in body.lines().enumerate() {
            line_count = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let entry: LedgerEntry =
                serde_json::from_str(line).map_err(|e| HiveError::LedgerCorrupt {
                    path: path.display().to_string(),
                    line: idx + 1,
                    message: e.to_string(),
                })?;
            seen.insert(entry.provider_id);
        }

        if !tail.iter().all(u8::is_ascii_whitespace) {
            match serde_json::from_slice::<LedgerEntry>(tail) {
                Ok(entry) => {
                    seen.insert(entry.provider_id);
                    let mut file = OpenOptions::new().append(true).open(&path)?;
                    file.write_all(b"\n")?;
                    file.sync_all()?;
                }
                Err(e) => {
                    tracing::warn!(
                        "Dropping torn last line {} of {} ({} bytes): {}",
                        line_count + 1,
                        path.display(),
                        tail.len(),
                        e
                    );
                    let file = OpenOptions::new().write(true).open(&path)?;
                    file.set_len(terminated as u64)?;
                    file.sync_all()?;
                }
            }
        }

        tracing::debug!("Loaded {} ledger entries from {}", seen.len(), path.display());
        Ok(Self { path, seen })
    }

    /// Writes a fresh ledger file containing `ids`, then opens it
    ///
    /// Used to rebuild a lost ledger file from the checkpoint store.
    pub fn restore<I, S>(path: impl Into<PathBuf>, ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        File::create(&path)?;

        let mut ledger = Self {
            path,
            seen: HashSet::new(),
        };
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        ledger.append(&ids)?;
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, provider_id: &str) -> bool {
        self.seen.contains(provider_id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Splits `items` into those whose id is not yet in the ledger, and a count of the rest
    pub fn partition_unseen<T, F>(&self, items: Vec<T>, id_of: F) -> (Vec<T>, usize)
    where
        F: Fn(&T) -> &str,
    {
        let before = items.len();
        let unseen: Vec<T> = items
            .into_iter()
            .filter(|item| !self.contains(id_of(item)))
            .collect();
        let skipped = before - unseen.len();
        (unseen, skipped)
    }

    /// Appends ids not already present and syncs the file
    ///
    /// Returns how many ids were new.
    pub fn append(&mut self, ids: &[String]) -> Result<usize> {
        let fresh: Vec<&String> = {
            let mut batch = HashSet::new();
            ids.iter()
                .filter(|id| !id.is_empty() && !self.seen.contains(*id) && batch.insert(*id))
                .collect()
        };
        if fresh.is_empty() {
            return Ok(0);
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        for id in &fresh {
            let line = serde_json::to_string(&LedgerEntry {
                provider_id: (*id).clone(),
            })?;
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;

        let added = fresh.len();
        for id in fresh {
            self.seen.insert(id.clone());
        }
        Ok(added)
    }
}
