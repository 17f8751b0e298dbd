//! Error types for bifrost-update

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using bifrost-update's error type
pub type Result<T> = std::result::Result<T, UpdateError>;

/// Everything that can go wrong while discovering, applying or resuming an update
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Repository identifier is not in `owner/name` form
    #[error("Invalid repository format: {repository} (expected owner/name)")]
    InvalidRepositoryFormat { repository: String },

    /// A version string or release tag is not semver
    #[error("Invalid version format: {version}: {source}")]
    VersionParse {
        version: String,
        #[source]
        source: semver::Error,
    },

    /// The release listing could not be fetched or decoded
    #[error("Failed to query release catalog: {message}")]
    Catalog { message: String },

    /// The release has no asset for this platform
    #[error("No compatible binary found for {platform}")]
    NoCompatibleAsset { platform: String },

    /// The checksum manifest exists but lists nothing for the asset
    #[error("Checksum not found for {asset}")]
    ChecksumNotFound { asset: String },

    /// Artifact download failed
    #[error("Failed to download {url}: {message}")]
    Download { url: String, message: String },

    /// SHA-256 of the artifact does not match the manifest
    #[error("Checksum verification failed: expected {expected:?}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// The ed25519 signature is malformed or does not verify
    #[error("Signature verification failed: {reason}")]
    SignatureInvalid { reason: String },

    /// A signature check is required but no public key is configured
    #[error("No public key available for signature verification")]
    NoPublicKey,

    /// The running executable could not be moved aside
    #[error("Failed to back up {}: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The new executable could not be written into place
    #[error("Failed to replace {}: {source}", path.display())]
    Replace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rollback was requested but the backup file is gone
    #[error("No backup found at {}", path.display())]
    NoBackupFound { path: PathBuf },

    /// An update stage failed and restoring the backup failed too
    #[error("{error}; rollback also failed: {rollback}")]
    RollbackFailed {
        error: Box<UpdateError>,
        rollback: Box<UpdateError>,
    },

    /// The downloaded archive could not be unpacked
    #[error("Failed to unpack {asset}: {message}")]
    Archive { asset: String, message: String },

    /// Restart information is absent or unreadable
    #[error("No restart information found at {}: {reason}", path.display())]
    NoRestartInfo { path: PathBuf, reason: String },

    /// The relaunched process could not be started
    #[error("Failed to restart {}: {source}", program.display())]
    RestartSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid updater configuration
    #[error("Invalid updater configuration: {message}")]
    Config { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while persisting local state
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UpdateError {
    /// Create a catalog error
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Create a download error
    pub fn download(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Download {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a signature error
    pub fn signature_invalid(reason: impl Into<String>) -> Self {
        Self::SignatureInvalid {
            reason: reason.into(),
        }
    }

    /// Create an archive error
    pub fn archive(asset: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Archive {
            asset: asset.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing restart info error
    pub fn no_restart_info(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::NoRestartInfo {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Combine a stage failure with the failure of its rollback
    pub fn rollback_failed(error: UpdateError, rollback: UpdateError) -> Self {
        Self::RollbackFailed {
            error: Box::new(error),
            rollback: Box::new(rollback),
        }
    }

    /// The rollback failure carried by [`UpdateError::RollbackFailed`], if any
    pub fn rollback_error(&self) -> Option<&UpdateError> {
        match self {
            Self::RollbackFailed { rollback, .. } => Some(rollback),
            _ => None,
        }
    }
}
