//! Self-update engine for the bifrost-backups CLI
//!
//! Provides:
//! - Release discovery on stable and beta channels
//! - A cached version gate against the running version
//! - Artifact download with SHA-256 and ed25519 verification
//! - Backup, replacement and rollback of the running executable
//! - A capped local log of update attempts
//! - Relaunching the original command after an update

pub mod cache;
pub mod config;
pub mod download;
pub mod error;
mod fsutil;
pub mod releases;
pub mod replace;
pub mod restart;
pub mod telemetry;
pub mod updater;
pub mod verify;
pub mod version;

pub use cache::{CacheStore, UpdateCache};
pub use config::{StatePaths, UpdaterConfig};
pub use download::ArtifactFetcher;
pub use error::{Result, UpdateError};
pub use releases::{
    Channel, GitHubSource, Platform, Release, ReleaseAsset, ReleaseCatalog, ReleaseInfo,
    ReleaseSource,
};
pub use replace::ReplacementManager;
pub use restart::{Relaunch, RestartInfo, RestartOrchestrator};
pub use telemetry::{TelemetryRecord, TelemetryRecorder, MAX_TELEMETRY_ENTRIES};
pub use updater::{UpdateOutcome, UpdateStage, Updater};
pub use version::VersionInfo;

/// Current CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
