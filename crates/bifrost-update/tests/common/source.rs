//! In-memory release source

use async_trait::async_trait;
use bifrost_update::releases::{Release, ReleaseAsset, ReleaseSource};
use bifrost_update::{Result, UpdateError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Release source answering from memory and counting listing requests
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    releases: Vec<Release>,
    texts: HashMap<String, String>,
    calls: Arc<AtomicUsize>,
}

impl StaticSource {
    pub fn new(releases: Vec<Release>) -> Self {
        Self {
            releases,
            ..Default::default()
        }
    }

    /// Serve `content` for the asset called `name`
    pub fn with_text(mut self, name: &str, content: &str) -> Self {
        self.texts.insert(name.to_string(), content.to_string());
        self
    }

    /// Shared counter of `list_releases` calls
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ReleaseSource for StaticSource {
    async fn list_releases(&self, _owner: &str, _name: &str) -> Result<Vec<Release>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.releases.clone())
    }

    async fn fetch_text(&self, asset: &ReleaseAsset) -> Result<String> {
        self.texts
            .get(&asset.name)
            .cloned()
            .ok_or_else(|| UpdateError::catalog(format!("no content for {}", asset.name)))
    }
}
