//! Append-only request history.
//!
//! The log is a single JSON array rewritten on every append. There is no
//! locking: two invocations appending at once can lose an entry.

use crate::error::Error;
use crate::protocol::Mode;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One completed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// RFC 3339 timestamp of when the answer was recorded.
    pub timestamp: String,
    pub mode: Mode,
    /// The question, or the command that was explained.
    pub question: String,
    /// The normalized answer text.
    pub answer: String,
}

impl HistoryEntry {
    /// Create an entry stamped with the current time.
    pub fn now(mode: Mode, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            mode,
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Reads and appends the history file.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry, oldest first.
    ///
    /// A missing or corrupt file reads as empty.
    pub fn load(&self) -> Vec<HistoryEntry> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No history file at {}", self.path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to read history file {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(entries) => entries,
            Err(source) => {
                let err = Error::HistoryCorrupt {
                    path: self.path.clone(),
                    source,
                };
                warn!("{}; starting a fresh history", err);
                Vec::new()
            }
        }
    }

    /// The newest `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let mut entries = self.load();
        let skip = entries.len().saturating_sub(limit);
        entries.split_off(skip)
    }

    /// Append one entry and rewrite the file.
    pub fn append(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.load();
        entries.push(entry);
        self.write(&entries)
    }

    /// Replace the log with an empty array.
    pub fn clear(&self) -> Result<()> {
        self.write(&[])
    }

    fn write(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create history directory: {}", parent.display())
            })?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write history file: {}", self.path.display()))?;
        Ok(())
    }
}
