//! Updater configuration and local state locations
//!
//! Configuration is read from an optional YAML file; every field falls back to
//! a built-in default so an absent file is equivalent to an empty one.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::download::DEFAULT_MAX_DOWNLOAD_BYTES;
use crate::error::{Result, UpdateError};
use crate::releases::Channel;
use crate::verify::parse_public_key;

/// Application name used for the per-user config directory
pub const APP_NAME: &str = "bifrost-backup";

/// Cache file name
pub const CACHE_FILE: &str = "update-cache.json";

/// Telemetry log file name
pub const TELEMETRY_FILE: &str = "update-telemetry.json";

/// Restart info file name
pub const RESTART_FILE: &str = "restart-info.json";

/// Updater config file name inside the config directory
pub const CONFIG_FILE: &str = "update.yaml";

/// Updater configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UpdaterConfig {
    /// Product name used as the release asset prefix
    #[serde(default = "default_product")]
    pub product: String,

    /// Executable name inside release archives
    #[serde(default = "default_binary_name")]
    pub binary_name: String,

    /// Upstream repository in `owner/name` form
    #[serde(default = "default_repository")]
    pub repository: String,

    /// Release channel
    #[serde(default)]
    pub channel: Channel,

    /// How long a discovery result is trusted, in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// GitHub API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// User agent string for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for catalog and manifest requests, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Timeout for artifact downloads, in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// TCP connect timeout, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Largest artifact accepted for download, in bytes
    #[serde(default = "default_max_download_bytes")]
    pub max_download_bytes: u64,

    /// Hex-encoded ed25519 public key for artifact signatures
    #[serde(default)]
    pub public_key: Option<String>,

    /// Refuse releases that publish no signature
    #[serde(default)]
    pub require_signature: bool,

    /// Directory for cache, telemetry and restart files
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            product: default_product(),
            binary_name: default_binary_name(),
            repository: default_repository(),
            channel: Channel::default(),
            cache_ttl_secs: default_cache_ttl(),
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
            download_timeout_secs: default_download_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_download_bytes: default_max_download_bytes(),
            public_key: None,
            require_signature: false,
            state_dir: None,
        }
    }
}

fn default_product() -> String {
    "bifrost-backups".to_string()
}
fn default_binary_name() -> String {
    "bifrost-backups".to_string()
}
fn default_repository() -> String {
    "martient/bifrost-backup".to_string()
}
fn default_cache_ttl() -> u64 {
    24 * 60 * 60 // 24 hours
}
fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_user_agent() -> String {
    format!(
        "bifrost-backups/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
fn default_request_timeout() -> u64 {
    30
}
fn default_download_timeout() -> u64 {
    300 // 5 minutes
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_max_download_bytes() -> u64 {
    DEFAULT_MAX_DOWNLOAD_BYTES
}

impl UpdaterConfig {
    /// Load configuration from a YAML file, falling back to defaults when the
    /// file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No updater config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| UpdateError::config(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty map
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(content).map_err(|e| UpdateError::config(e.to_string()))
    }

    /// Cache TTL as a duration
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Catalog request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Artifact download timeout
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// TCP connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Decode the configured public key, if any
    pub fn verifying_key(&self) -> Result<Option<ed25519_dalek::VerifyingKey>> {
        self.public_key
            .as_deref()
            .map(parse_public_key)
            .transpose()
    }
}

/// Locations of the updater's persisted state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    /// Update cache file
    pub cache: PathBuf,

    /// Telemetry log file
    pub telemetry: PathBuf,

    /// Restart info file
    pub restart: PathBuf,
}

impl StatePaths {
    /// Lay out the state files inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            cache: dir.join(CACHE_FILE),
            telemetry: dir.join(TELEMETRY_FILE),
            restart: dir.join(RESTART_FILE),
        }
    }

    /// Resolve the state directory from configuration (or the per-user config
    /// directory) and create it if needed
    pub fn resolve(config: &UpdaterConfig) -> Result<Self> {
        let dir = match &config.state_dir {
            Some(dir) => dir.clone(),
            None => default_state_dir()?,
        };

        fs::create_dir_all(&dir)?;
        Ok(Self::in_dir(&dir))
    }
}

/// Default updater config file location
pub fn default_config_path() -> Result<PathBuf> {
    Ok(default_state_dir()?.join(CONFIG_FILE))
}

/// Per-user config directory for bifrost
pub fn default_state_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| UpdateError::config("Could not determine user config directory"))
}
