//! Update check cache
//!
//! Remembers the outcome of the last successful discovery so repeated checks
//! within the TTL do not hit the network.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;
use crate::fsutil::atomic_write;
use crate::releases::{Channel, ReleaseInfo};

/// Outcome of the last discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCache {
    /// When the discovery ran
    pub last_check: DateTime<Utc>,

    /// Latest version on the channel, `None` when nothing was found
    pub latest_version: Option<String>,

    /// Channel the discovery ran on
    pub channel: Channel,

    /// How long this entry is trusted, in seconds
    pub ttl_secs: u64,

    /// The discovered release, so a fresh entry can answer without network
    #[serde(default)]
    pub release: Option<ReleaseInfo>,
}

impl UpdateCache {
    /// Record a discovery that just completed
    pub fn new(release: Option<&ReleaseInfo>, channel: Channel, ttl: Duration) -> Self {
        Self {
            last_check: Utc::now(),
            latest_version: release.map(|r| r.version.to_string()),
            channel,
            ttl_secs: ttl.as_secs(),
            release: release.cloned(),
        }
    }

    /// TTL as a duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Whether the entry can be trusted for `channel` right now
    pub fn is_fresh(&self, channel: Channel) -> bool {
        self.is_fresh_at(Utc::now(), channel)
    }

    /// Whether the entry can be trusted for `channel` at `now`.
    ///
    /// Entries stamped in the future (clock moved backwards) are stale.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, channel: Channel) -> bool {
        if self.channel != channel {
            return false;
        }

        let age = now - self.last_check;
        match age.to_std() {
            Ok(age) => age <= self.ttl(),
            Err(_) => false,
        }
    }
}

/// Cache persisted as JSON on disk
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cache; absent or unreadable files count as no cache
    pub fn load(&self) -> Option<UpdateCache> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No update cache at {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice(&content) {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!("Ignoring corrupt update cache {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Persist `cache` atomically
    pub fn save(&self, cache: &UpdateCache) -> Result<()> {
        let content = serde_json::to_vec_pretty(cache)?;
        atomic_write(&self.path, &content)?;
        debug!("Update cache written to {}", self.path.display());
        Ok(())
    }
}
