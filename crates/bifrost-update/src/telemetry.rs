//! Local log of update attempts
//!
//! Stored as a JSON array capped to the most recent entries. Recording is
//! best-effort: a telemetry failure never fails an update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;
use crate::fsutil::{atomic_write, FileLock};
use crate::releases::Channel;

/// Number of attempts kept in the log
pub const MAX_TELEMETRY_ENTRIES: usize = 100;

/// One update attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub from_version: String,
    pub to_version: String,
    pub channel: Channel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl TelemetryRecord {
    /// Start a record for an attempt; it counts as failed until marked otherwise
    pub fn attempt(
        from_version: impl Into<String>,
        to_version: impl Into<String>,
        channel: Channel,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            success: false,
            from_version: from_version.into(),
            to_version: to_version.into(),
            channel,
            error_message: None,
        }
    }
}

/// Append-only telemetry log
#[derive(Debug, Clone)]
pub struct TelemetryRecorder {
    path: PathBuf,
    max_entries: usize,
}

impl TelemetryRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_entries: MAX_TELEMETRY_ENTRIES,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `entry`, logging instead of returning any failure
    pub fn record(&self, entry: TelemetryRecord) {
        if let Err(e) = self.try_record(entry) {
            warn!("Failed to save update telemetry: {}", e);
        }
    }

    /// Append `entry` under an exclusive lock, trimming the oldest entries
    pub fn try_record(&self, entry: TelemetryRecord) -> Result<()> {
        let lock = FileLock::acquire(&self.path)?;
        debug!("Holding telemetry lock {}", lock.path().display());

        let mut entries = self.load();
        entries.push(entry);
        if entries.len() > self.max_entries {
            let excess = entries.len() - self.max_entries;
            entries.drain(..excess);
        }

        let content = serde_json::to_vec(&entries)?;
        atomic_write(&self.path, &content)?;
        debug!(
            "Recorded update telemetry ({} entries) in {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Current entries, oldest first; an absent or unreadable log is empty
    pub fn load(&self) -> Vec<TelemetryRecord> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };

        serde_json::from_slice(&content).unwrap_or_else(|e| {
            warn!(
                "Discarding unreadable telemetry log {}: {}",
                self.path.display(),
                e
            );
            Vec::new()
        })
    }
}
