//! Executable backup, replacement and rollback
//!
//! The running executable is moved aside to `<path>.backup`, the new bytes
//! are written next to it and renamed into place. Between the backup rename
//! and the final rename the original path is empty; the `.backup` file is
//! the only copy of the previous binary during that window.

use flate2::read::GzDecoder;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::{debug, info, warn};

use crate::error::{Result, UpdateError};

/// Backup file suffix
const BACKUP_SUFFIX: &str = ".backup";

/// Staging file suffix for the incoming binary
const STAGING_SUFFIX: &str = ".new";

/// Upper bound on the buffer reserved from a tar entry header
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Manages the running executable during an update
#[derive(Debug, Clone)]
pub struct ReplacementManager {
    executable: PathBuf,
    backup: PathBuf,
}

impl ReplacementManager {
    /// Manage `executable`; its backup lives at `<executable>.backup`
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        let executable = executable.into();
        let backup = with_suffix(&executable, BACKUP_SUFFIX);
        Self { executable, backup }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    pub fn backup_exists(&self) -> bool {
        self.backup.exists()
    }

    /// Move the executable to its backup path
    pub fn backup(&self) -> Result<()> {
        debug!(
            "Creating backup: {:?} -> {:?}",
            self.executable, self.backup
        );

        fs::rename(&self.executable, &self.backup).map_err(|source| UpdateError::Backup {
            path: self.executable.clone(),
            source,
        })?;

        info!("Backup created: {:?}", self.backup);
        Ok(())
    }

    /// Write `bytes` as the new executable
    pub fn replace(&self, bytes: &[u8]) -> Result<()> {
        let staging = with_suffix(&self.executable, STAGING_SUFFIX);
        debug!("Replacing binary: {:?} -> {:?}", staging, self.executable);

        let result = write_executable(&staging, bytes)
            .and_then(|()| fs::rename(&staging, &self.executable));

        if let Err(source) = result {
            if staging.exists() {
                if let Err(e) = fs::remove_file(&staging) {
                    warn!("Failed to remove staged binary {:?}: {}", staging, e);
                }
            }
            return Err(UpdateError::Replace {
                path: self.executable.clone(),
                source,
            });
        }

        info!("Binary replaced successfully");
        Ok(())
    }

    /// Restore the executable from its backup
    pub fn rollback(&self) -> Result<()> {
        warn!("Rolling back to backup: {:?}", self.backup);

        if !self.backup.exists() {
            return Err(UpdateError::NoBackupFound {
                path: self.backup.clone(),
            });
        }

        if self.executable.exists() {
            debug!("Removing partial binary {:?}", self.executable);
            fs::remove_file(&self.executable).map_err(|source| UpdateError::Replace {
                path: self.executable.clone(),
                source,
            })?;
        }

        fs::rename(&self.backup, &self.executable).map_err(|source| UpdateError::Replace {
            path: self.executable.clone(),
            source,
        })?;

        info!("Rollback completed successfully");
        Ok(())
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

fn write_executable(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(())
}

/// Extract the executable from a downloaded artifact.
///
/// `.tar.gz` and `.tgz` archives are unpacked in memory and the entry named
/// `binary_name` is returned; any other artifact is the executable itself.
pub fn unpack_artifact(asset_name: &str, bytes: &[u8], binary_name: &str) -> Result<Vec<u8>> {
    if !(asset_name.ends_with(".tar.gz") || asset_name.ends_with(".tgz")) {
        return Ok(bytes.to_vec());
    }

    debug!("Extracting {} from {}", binary_name, asset_name);
    let wanted = [binary_name.to_string(), format!("{}.exe", binary_name)];

    let mut archive = Archive::new(GzDecoder::new(bytes));
    let entries = archive
        .entries()
        .map_err(|e| UpdateError::archive(asset_name, e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| UpdateError::archive(asset_name, e.to_string()))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry
            .path()
            .map_err(|e| UpdateError::archive(asset_name, e.to_string()))?;
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| wanted.iter().any(|w| w == n));
        if !matches {
            continue;
        }

        let mut content = Vec::with_capacity(entry.size().min(MAX_PREALLOCATION) as usize);
        entry
            .read_to_end(&mut content)
            .map_err(|e| UpdateError::archive(asset_name, e.to_string()))?;
        info!("Found binary {} in {}", binary_name, asset_name);
        return Ok(content);
    }

    Err(UpdateError::archive(
        asset_name,
        format!("archive does not contain {}", binary_name),
    ))
}
