//! Update check and installation with automatic rollback
//!
//! An update runs through these stages:
//! 1. Move the running executable to its `.backup` path
//! 2. Download the release artifact
//! 3. Verify its checksum and, when available, its signature
//! 4. Unpack and write the new executable into place
//!
//! A failure after the backup restores it. Every attempt is recorded in the
//! telemetry log.

use ed25519_dalek::VerifyingKey;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheStore, UpdateCache};
use crate::config::{StatePaths, UpdaterConfig};
use crate::download::ArtifactFetcher;
use crate::error::{Result, UpdateError};
use crate::releases::{split_repository, Channel, GitHubSource, ReleaseCatalog, ReleaseInfo};
use crate::replace::{unpack_artifact, ReplacementManager};
use crate::telemetry::{TelemetryRecord, TelemetryRecorder};
use crate::verify::{verify_checksum, verify_signature};
use crate::version::{is_newer, parse_tolerant};

/// Position of an update in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    Idle,
    BackingUp,
    Downloading,
    Verifying,
    Replacing,
    Done,
    RollingBack,
    Failed,
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateStage::Idle => "idle",
            UpdateStage::BackingUp => "backing-up",
            UpdateStage::Downloading => "downloading",
            UpdateStage::Verifying => "verifying",
            UpdateStage::Replacing => "replacing",
            UpdateStage::Done => "done",
            UpdateStage::RollingBack => "rolling-back",
            UpdateStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a completed update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub from_version: String,
    pub to_version: String,
    pub executable: PathBuf,
    /// Previous executable, kept for manual recovery
    pub backup: PathBuf,
}

/// Checks for and installs updates of the running executable
pub struct Updater {
    current_version: String,
    repository: String,
    channel: Channel,
    catalog: ReleaseCatalog,
    fetcher: ArtifactFetcher,
    cache: CacheStore,
    telemetry: TelemetryRecorder,
    cache_ttl: Duration,
    public_key: Option<VerifyingKey>,
    require_signature: bool,
    executable: Option<PathBuf>,
    binary_name: String,
}

impl Updater {
    /// Create an updater storing its state under `paths`
    pub fn new(
        current_version: impl Into<String>,
        repository: impl Into<String>,
        channel: Channel,
        catalog: ReleaseCatalog,
        fetcher: ArtifactFetcher,
        paths: &StatePaths,
    ) -> Self {
        let defaults = UpdaterConfig::default();
        Self {
            current_version: current_version.into(),
            repository: repository.into(),
            channel,
            catalog,
            fetcher,
            cache: CacheStore::new(&paths.cache),
            telemetry: TelemetryRecorder::new(&paths.telemetry),
            cache_ttl: defaults.cache_ttl(),
            public_key: None,
            require_signature: false,
            executable: None,
            binary_name: defaults.binary_name,
        }
    }

    /// Build an updater against GitHub from configuration
    pub fn from_config(config: &UpdaterConfig, current_version: impl Into<String>) -> Result<Self> {
        let source = GitHubSource::from_config(config)?;
        let catalog = ReleaseCatalog::new(Box::new(source), &config.product);
        let fetcher = ArtifactFetcher::from_config(config)?;
        let paths = StatePaths::resolve(config)?;

        let mut updater = Self::new(
            current_version,
            &config.repository,
            config.channel,
            catalog,
            fetcher,
            &paths,
        )
        .with_cache_ttl(config.cache_ttl())
        .with_binary_name(&config.binary_name)
        .with_required_signature(config.require_signature);
        updater.public_key = config.verifying_key()?;
        Ok(updater)
    }

    /// Switch release channel
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Require signatures made with `key`
    pub fn with_public_key(mut self, key: VerifyingKey) -> Self {
        self.public_key = Some(key);
        self
    }

    /// Refuse releases that publish no signature
    pub fn with_required_signature(mut self, required: bool) -> Self {
        self.require_signature = required;
        self
    }

    /// Replace `path` instead of the current executable
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Show a progress bar while downloading
    pub fn with_progress(mut self, show: bool) -> Self {
        self.fetcher = self.fetcher.with_progress(show);
        self
    }

    /// Entry name to extract from release archives
    pub fn with_binary_name(mut self, name: impl Into<String>) -> Self {
        self.binary_name = name.into();
        self
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    /// Path that an update replaces
    pub fn executable(&self) -> Result<PathBuf> {
        match &self.executable {
            Some(path) => Ok(path.clone()),
            None => Ok(std::env::current_exe()?),
        }
    }

    /// Return the newest release on the channel if it is newer than the
    /// running version.
    ///
    /// A fresh cache entry answers without network access.
    pub async fn check(&self) -> Result<Option<ReleaseInfo>> {
        let current = parse_tolerant(&self.current_version)?;
        split_repository(&self.repository)?;

        if let Some(release) = self.check_cached(&current) {
            return Ok(release);
        }

        info!(
            "Checking {} for {} releases newer than {}",
            self.repository, self.channel, current
        );
        let release = self.catalog.discover(&self.repository, self.channel).await?;

        let entry = UpdateCache::new(release.as_ref(), self.channel, self.cache_ttl);
        if let Err(e) = self.cache.save(&entry) {
            warn!("Failed to save update cache: {}", e);
        }

        Ok(release.filter(|r| is_newer(&r.version, &current)))
    }

    /// Answer from the cache; `None` means the cache cannot decide
    fn check_cached(&self, current: &semver::Version) -> Option<Option<ReleaseInfo>> {
        let cache = self.cache.load()?;
        if !cache.is_fresh(self.channel) {
            debug!("Update cache is stale");
            return None;
        }

        let Some(latest) = cache.latest_version.as_deref() else {
            debug!("Cached check found no release");
            return Some(None);
        };

        let latest = match parse_tolerant(latest) {
            Ok(latest) => latest,
            Err(e) => {
                debug!("Ignoring cached version: {}", e);
                return None;
            }
        };

        if !is_newer(&latest, current) {
            debug!("Cached latest version {} is not newer", latest);
            return Some(None);
        }

        match cache.release {
            Some(release) if release.version == latest => {
                debug!("Using cached release {}", release.version);
                Some(Some(release))
            }
            _ => None,
        }
    }

    /// Release notes of `release`
    pub fn changelog<'a>(&self, release: &'a ReleaseInfo) -> &'a str {
        &release.release_notes
    }

    /// Install `release` over the executable
    pub async fn update(&self, release: &ReleaseInfo) -> Result<UpdateOutcome> {
        info!(
            "Updating from {} to {}",
            self.current_version, release.version
        );

        let mut record = TelemetryRecord::attempt(
            &self.current_version,
            release.version.to_string(),
            self.channel,
        );

        let result = self.apply(release).await;
        match &result {
            Ok(_) => record.success = true,
            Err(e) => record.error_message = Some(e.to_string()),
        }
        self.telemetry.record(record);

        result
    }

    async fn apply(&self, release: &ReleaseInfo) -> Result<UpdateOutcome> {
        let manager = ReplacementManager::new(self.executable()?);

        enter(UpdateStage::BackingUp);
        if let Err(e) = manager.backup() {
            enter(UpdateStage::Failed);
            return Err(e);
        }

        match self.install(&manager, release).await {
            Ok(()) => {
                enter(UpdateStage::Done);
                Ok(UpdateOutcome {
                    from_version: self.current_version.clone(),
                    to_version: release.version.to_string(),
                    executable: manager.executable().to_path_buf(),
                    backup: manager.backup_path().to_path_buf(),
                })
            }
            Err(e) => {
                error!("Update failed: {}", e);
                enter(UpdateStage::RollingBack);
                let result = match manager.rollback() {
                    Ok(()) => Err(e),
                    Err(rollback) => {
                        error!("Rollback failed: {}", rollback);
                        Err(UpdateError::rollback_failed(e, rollback))
                    }
                };
                enter(UpdateStage::Failed);
                result
            }
        }
    }

    async fn install(&self, manager: &ReplacementManager, release: &ReleaseInfo) -> Result<()> {
        enter(UpdateStage::Downloading);
        let bytes = self.fetcher.fetch(&release.asset_url).await?;

        enter(UpdateStage::Verifying);
        self.verify(&bytes, release)?;

        enter(UpdateStage::Replacing);
        let binary = unpack_artifact(&release.asset_name, &bytes, &self.binary_name)?;
        manager.replace(&binary)
    }

    fn verify(&self, bytes: &[u8], release: &ReleaseInfo) -> Result<()> {
        verify_checksum(bytes, &release.checksum)?;
        debug!("Checksum verified for {}", release.asset_name);

        match (&release.signature, &self.public_key) {
            (Some(signature), key) => {
                verify_signature(bytes, signature, key.as_ref())?;
                debug!("Signature verified for {}", release.asset_name);
            }
            (None, Some(_)) => {
                return Err(UpdateError::signature_invalid(format!(
                    "release {} is not signed",
                    release.version
                )));
            }
            (None, None) if self.require_signature => {
                return Err(UpdateError::signature_invalid(format!(
                    "release {} is not signed",
                    release.version
                )));
            }
            (None, None) => {
                warn!(
                    "Skipping signature verification for {}: no signature published",
                    release.asset_name
                );
            }
        }
        Ok(())
    }
}

fn enter(stage: UpdateStage) {
    info!(%stage, "Update stage");
}

