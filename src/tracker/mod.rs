
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Persisted per-file modification timestamps, used to skip unchanged files
/// on subsequent ingestion runs.
///
/// A file's record is only written after all of its chunks have been embedded
/// and indexed, so a failure mid-file leaves it eligible for retry.
#[derive(Debug)]
pub struct ChangeTracker {
    path: PathBuf,
    records: HashMap<String, u64>,
}

impl ChangeTracker {
    /// Load the tracker from `path`. A missing or empty file starts an empty
    /// mapping; malformed content is logged and reset to empty, never fatal.
    #[inline]
    pub fn load(path: &Path) -> Self {
        let records = match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => HashMap::new(),
            Ok(content) => match serde_json::from_str(&content) {
                Ok(records) => records,
                Err(e) => {
                    warn!(
                        "Change record {} is invalid ({}), resetting",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        debug!(
            "Loaded {} change records from {}",
            records.len(),
            path.display()
        );
        Self {
            path: path.to_path_buf(),
            records,
        }
    }

    /// Whether `file` needs (re-)ingestion: true unless a record exists and
    /// its stored timestamp exactly equals `mtime`.
    #[inline]
    pub fn should_process(&self, file: &str, mtime: u64) -> bool {
        self.records.get(file) != Some(&mtime)
    }

    /// Record that `file` was fully ingested at `mtime`. Call only after the
    /// file's chunks have been appended to the vector store.
    #[inline]
    pub fn mark_processed(&mut self, file: &str, mtime: u64) {
        self.records.insert(file.to_string(), mtime);
    }

    /// Write the full mapping back to disk.
    #[inline]
    pub fn persist(&self) -> Result<()> {
        let content =
            serde_json::to_string_pretty(&self.records).context("Failed to serialize change records")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Number of tracked files.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A file's modification time as nanoseconds since the Unix epoch.
#[inline]
pub fn modification_nanos(metadata: &fs::Metadata) -> Result<u64> {
    let modified = metadata
        .modified()
        .context("Filesystem does not report modification times")?;
    let nanos = modified
        .duration_since(std::time::UNIX_EPOCH)
        .context("Modification time predates the Unix epoch")?
        .as_nanos();
    u64::try_from(nanos).context("Modification time out of range")
}
