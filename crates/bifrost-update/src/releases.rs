//! Release discovery against an upstream release listing
//!
//! The listing itself is reached through [`ReleaseSource`], so the channel
//! selection policy and asset resolution in [`ReleaseCatalog`] work the same
//! for GitHub or any other source that can describe releases as tags, flags
//! and named assets.

use async_trait::async_trait;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Result, UpdateError};
use crate::version::parse_tolerant;

/// Suffix of detached signature assets
const SIGNATURE_SUFFIX: &str = ".sig";

/// Release track selected by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Releases only, pre-releases excluded
    #[default]
    Stable,
    /// Pre-releases included
    Beta,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Stable => "stable",
            Channel::Beta => "beta",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stable" => Ok(Channel::Stable),
            "beta" => Ok(Channel::Beta),
            other => Err(UpdateError::config(format!(
                "unknown channel '{}' (expected stable or beta)",
                other
            ))),
        }
    }
}

/// Release as described by the upstream listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    /// Release tag (e.g., "v2.0.0")
    pub tag_name: String,

    /// Release body (changelog)
    #[serde(default)]
    pub body: Option<String>,

    /// Whether this is a prerelease
    #[serde(default)]
    pub prerelease: bool,

    /// Whether this is a draft
    #[serde(default)]
    pub draft: bool,

    /// Release assets
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// Release asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseAsset {
    /// Asset name
    pub name: String,

    /// Download URL
    pub browser_download_url: String,

    /// Asset size in bytes
    #[serde(default)]
    pub size: u64,
}

impl Release {
    fn asset(&self, name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

/// A release selected for this platform and channel, ready to install
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    /// Semantic version parsed from the tag
    pub version: Version,

    /// Channel the release was discovered on
    pub channel: Channel,

    /// Name of the platform asset
    pub asset_name: String,

    /// Download URL of the platform asset
    pub asset_url: String,

    /// Expected hex SHA-256, empty when the release has no manifest
    pub checksum: String,

    /// Hex ed25519 signature over the asset bytes
    #[serde(default)]
    pub signature: Option<String>,

    /// Release notes, verbatim
    #[serde(default)]
    pub release_notes: String,
}

/// Narrow view of an upstream release listing
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Releases for `owner/name`, newest first as provided upstream
    async fn list_releases(&self, owner: &str, name: &str) -> Result<Vec<Release>>;

    /// Text content of a small asset such as a checksum manifest
    async fn fetch_text(&self, asset: &ReleaseAsset) -> Result<String>;
}

/// GitHub releases API
pub struct GitHubSource {
    client: reqwest::Client,
    api_url: String,
}

impl GitHubSource {
    /// Create a source with explicit HTTP settings
    pub fn new(
        api_url: impl Into<String>,
        user_agent: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| UpdateError::catalog(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a source from updater configuration
    pub fn from_config(config: &crate::config::UpdaterConfig) -> Result<Self> {
        Self::new(
            config.api_url.clone(),
            &config.user_agent,
            config.request_timeout(),
            config.connect_timeout(),
        )
    }
}

#[async_trait]
impl ReleaseSource for GitHubSource {
    async fn list_releases(&self, owner: &str, name: &str) -> Result<Vec<Release>> {
        let url = format!(
            "{}/repos/{}/{}/releases?per_page=100",
            self.api_url, owner, name
        );
        debug!("Fetching releases from: {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| UpdateError::catalog(format!("failed to fetch releases: {}", e)))?;

        if !response.status().is_success() {
            return Err(UpdateError::catalog(format!(
                "failed to list releases: {}",
                response.status()
            )));
        }

        response
            .json::<Vec<Release>>()
            .await
            .map_err(|e| UpdateError::catalog(format!("invalid release listing: {}", e)))
    }

    async fn fetch_text(&self, asset: &ReleaseAsset) -> Result<String> {
        debug!("Fetching {} from {}", asset.name, asset.browser_download_url);

        let response = self
            .client
            .get(&asset.browser_download_url)
            .send()
            .await
            .map_err(|e| UpdateError::catalog(format!("failed to fetch {}: {}", asset.name, e)))?;

        if !response.status().is_success() {
            return Err(UpdateError::catalog(format!(
                "failed to fetch {}: {}",
                asset.name,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| UpdateError::catalog(format!("failed to read {}: {}", asset.name, e)))
    }
}

/// Operating system and architecture as they appear in asset names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    /// Build a platform from any OS/arch spelling
    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: normalize_os(os).to_string(),
            arch: normalize_arch(arch).to_string(),
        }
    }

    /// Platform of the running binary
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Asset name prefix: `<product>_<os>_<arch>`
    pub fn asset_prefix(&self, product: &str) -> String {
        format!("{}_{}_{}", product, self.os, self.arch)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.os, self.arch)
    }
}

/// Map an architecture name to the release naming convention
pub fn normalize_arch(arch: &str) -> &str {
    match arch {
        "amd64" | "x86_64" => "x86_64",
        "386" | "x86" => "i386",
        "aarch64" => "arm64",
        other => other,
    }
}

/// Map an OS name to the release naming convention
pub fn normalize_os(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

/// Apply the channel policy to a listing, newest first.
///
/// Drafts are always skipped. `stable` takes the first non-prerelease.
/// `beta` starts from the first release seen and lets every later
/// prerelease replace it, so a prerelease further down the listing wins
/// over a stable release above it.
pub fn select_release(releases: &[Release], channel: Channel) -> Option<&Release> {
    let mut selected: Option<&Release> = None;

    for release in releases.iter().filter(|r| !r.draft) {
        match channel {
            Channel::Stable => {
                if !release.prerelease {
                    return Some(release);
                }
            }
            Channel::Beta => {
                if selected.is_none() || release.prerelease {
                    selected = Some(release);
                }
            }
        }
    }

    selected
}

/// Find the checksum for `asset_name` in a `<hex> <name>` manifest.
///
/// A line naming the asset exactly wins; otherwise the first line that
/// mentions it anywhere is used.
pub fn lookup_checksum(manifest: &str, asset_name: &str) -> Result<String> {
    let mut partial: Option<&str> = None;

    for line in manifest.lines() {
        let mut fields = line.split_whitespace();
        let Some(checksum) = fields.next() else {
            continue;
        };

        // `sha256sum -b` marks binary mode with a leading '*'
        if fields.next().map(|n| n.trim_start_matches('*')) == Some(asset_name) {
            return Ok(checksum.to_string());
        }
        if partial.is_none() && line.contains(asset_name) {
            partial = Some(checksum);
        }
    }

    partial
        .map(String::from)
        .ok_or_else(|| UpdateError::ChecksumNotFound {
            asset: asset_name.to_string(),
        })
}

/// Discovers installable releases for one product on one platform
pub struct ReleaseCatalog {
    source: Box<dyn ReleaseSource>,
    product: String,
    platform: Platform,
}

impl ReleaseCatalog {
    /// Create a catalog for `product` on the current platform
    pub fn new(source: Box<dyn ReleaseSource>, product: impl Into<String>) -> Self {
        Self {
            source,
            product: product.into(),
            platform: Platform::current(),
        }
    }

    /// Target a different platform
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Platform assets are resolved for
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Name of the checksum manifest asset
    pub fn manifest_name(&self) -> String {
        format!("{}_checksums.txt", self.product)
    }

    /// Find the release `channel` should install, if any
    pub async fn discover(&self, repository: &str, channel: Channel) -> Result<Option<ReleaseInfo>> {
        let (owner, name) = split_repository(repository)?;

        let releases = self.source.list_releases(owner, name).await?;
        debug!("Listed {} releases for {}", releases.len(), repository);

        let Some(release) = select_release(&releases, channel) else {
            info!("No {} release found for {}", channel, repository);
            return Ok(None);
        };

        self.resolve(release, channel).await.map(Some)
    }

    /// Turn a selected release into a [`ReleaseInfo`] for this platform
    pub async fn resolve(&self, release: &Release, channel: Channel) -> Result<ReleaseInfo> {
        let version = parse_tolerant(&release.tag_name)?;

        let prefix = self.platform.asset_prefix(&self.product);
        let asset = release
            .assets
            .iter()
            .find(|a| a.name.starts_with(&prefix) && !a.name.ends_with(SIGNATURE_SUFFIX))
            .ok_or_else(|| UpdateError::NoCompatibleAsset {
                platform: self.platform.to_string(),
            })?;
        debug!("Selected asset {} for {}", asset.name, self.platform);

        let checksum = match release.asset(&self.manifest_name()) {
            Some(manifest) => {
                let content = self.source.fetch_text(manifest).await?;
                lookup_checksum(&content, &asset.name)?
            }
            None => {
                debug!("Release {} has no checksum manifest", release.tag_name);
                String::new()
            }
        };

        let signature_name = format!("{}{}", asset.name, SIGNATURE_SUFFIX);
        let signature = match release.asset(&signature_name) {
            Some(sig) => Some(self.source.fetch_text(sig).await?.trim().to_string()),
            None => None,
        };

        Ok(ReleaseInfo {
            version,
            channel,
            asset_name: asset.name.clone(),
            asset_url: asset.browser_download_url.clone(),
            checksum,
            signature,
            release_notes: release.body.clone().unwrap_or_default(),
        })
    }
}

pub(crate) fn split_repository(repository: &str) -> Result<(&str, &str)> {
    match repository.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => Ok((owner, name)),
        _ => Err(UpdateError::InvalidRepositoryFormat {
            repository: repository.to_string(),
        }),
    }
}
