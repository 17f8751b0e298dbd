//! Artifact download
//!
//! Fetches release assets into memory with:
//! - An explicit per-request timeout
//! - Optional progress tracking using indicatif
//! - A size limit checked against `Content-Length` and the streamed body
//! - A single attempt; callers retry the whole update if they want to

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::CONTENT_LENGTH;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::UpdaterConfig;
use crate::error::{Result, UpdateError};

/// Default limit on artifact size (512 MiB)
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 512 * 1024 * 1024;

/// Upper bound on the buffer reserved from `Content-Length`
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Downloads release artifacts over HTTP
pub struct ArtifactFetcher {
    /// HTTP client
    client: reqwest::Client,

    /// Timeout for a whole download
    timeout: Duration,

    /// Largest accepted artifact
    max_size: u64,

    /// Enable progress bars
    show_progress: bool,
}

impl ArtifactFetcher {
    /// Create a fetcher with explicit HTTP settings
    pub fn new(user_agent: &str, timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| UpdateError::download("", format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout,
            max_size: DEFAULT_MAX_DOWNLOAD_BYTES,
            show_progress: false,
        })
    }

    /// Create a fetcher from updater configuration
    pub fn from_config(config: &UpdaterConfig) -> Result<Self> {
        Ok(Self::new(
            &config.user_agent,
            config.download_timeout(),
            config.connect_timeout(),
        )?
        .with_max_size(config.max_download_bytes))
    }

    /// Reject artifacts larger than `bytes`
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    /// Enable or disable progress bars
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Configured download timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Configured size limit
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Fetch the raw bytes at `url`
    pub async fn fetch(&self, url: &str) -> Result<Bytes> {
        debug!("Downloading {}", url);

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| UpdateError::download(url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(UpdateError::download(
                url,
                format!("Download failed with status: {}", response.status()),
            ));
        }

        let total_size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|ct| ct.to_str().ok())
            .and_then(|ct| ct.parse::<u64>().ok());

        if let Some(total) = total_size.filter(|total| *total > self.max_size) {
            return Err(UpdateError::download(
                url,
                format!(
                    "artifact size {} exceeds limit of {}",
                    human_readable_size(total),
                    human_readable_size(self.max_size)
                ),
            ));
        }

        let progress = match (self.show_progress, total_size) {
            (true, Some(total)) => Some(progress_bar(total, url)),
            _ => None,
        };

        let capacity = total_size.unwrap_or(0).min(MAX_PREALLOCATION);
        let mut buffer = BytesMut::with_capacity(capacity as usize);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                UpdateError::download(url, format!("Failed to read download chunk: {}", e))
            })?;
            if (buffer.len() + chunk.len()) as u64 > self.max_size {
                return Err(UpdateError::download(
                    url,
                    format!(
                        "artifact exceeds limit of {}",
                        human_readable_size(self.max_size)
                    ),
                ));
            }
            buffer.extend_from_slice(&chunk);

            if let Some(pb) = &progress {
                pb.set_position(buffer.len() as u64);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        info!("Downloaded {}", human_readable_size(buffer.len() as u64));
        Ok(buffer.freeze())
    }
}

fn progress_bar(total: u64, url: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    let name = url.rsplit('/').next().unwrap_or(url);
    pb.set_message(format!("Downloading {}", name));
    pb
}

/// Convert bytes to human-readable size
fn human_readable_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}
