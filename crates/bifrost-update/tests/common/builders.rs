//! Builder patterns for test data construction

use bifrost_update::releases::{Release, ReleaseAsset};

use super::constants::*;

/// Builder for constructing Release objects with sensible test defaults
#[derive(Debug, Clone)]
pub struct ReleaseBuilder {
    tag_name: String,
    body: Option<String>,
    prerelease: bool,
    draft: bool,
    assets: Vec<ReleaseAsset>,
}

impl ReleaseBuilder {
    pub fn new() -> Self {
        Self {
            tag_name: TAG_V2_0_0.to_string(),
            body: None,
            prerelease: false,
            draft: false,
            assets: Vec::new(),
        }
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tag_name = tag.to_string();
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn prerelease(mut self) -> Self {
        self.prerelease = true;
        self
    }

    pub fn draft(mut self) -> Self {
        self.draft = true;
        self
    }

    /// Add an asset served from `base_url`
    pub fn asset(mut self, base_url: &str, name: &str) -> Self {
        self.assets.push(
            ReleaseAssetBuilder::new(name)
                .url(&format!("{}/download/{}", base_url, name))
                .build(),
        );
        self
    }

    /// Add the platform binary and checksum manifest
    pub fn with_standard_assets(self, base_url: &str) -> Self {
        self.asset(base_url, ASSET_NAME)
            .asset(base_url, MANIFEST_NAME)
    }

    pub fn build(self) -> Release {
        Release {
            tag_name: self.tag_name,
            body: self.body,
            prerelease: self.prerelease,
            draft: self.draft,
            assets: self.assets,
        }
    }
}

impl Default for ReleaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing ReleaseAsset objects
#[derive(Debug, Clone)]
pub struct ReleaseAssetBuilder {
    name: String,
    browser_download_url: String,
    size: u64,
}

impl ReleaseAssetBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            browser_download_url: format!("https://example.com/download/{}", name),
            size: 1024,
        }
    }

    pub fn url(mut self, url: &str) -> Self {
        self.browser_download_url = url.to_string();
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn build(self) -> ReleaseAsset {
        ReleaseAsset {
            name: self.name,
            browser_download_url: self.browser_download_url,
            size: self.size,
        }
    }
}
