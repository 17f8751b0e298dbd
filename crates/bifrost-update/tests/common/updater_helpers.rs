//! Helpers for updater testing
//!
//! Every test gets its own temp directory holding a fake executable and the
//! updater's state files.

use bifrost_update::config::StatePaths;
use bifrost_update::releases::{Channel, GitHubSource, Platform, ReleaseCatalog, ReleaseInfo};
use bifrost_update::verify::sha256_hex;
use bifrost_update::{ArtifactFetcher, Updater};
use ed25519_dalek::{Signer, SigningKey};
use flate2::write::GzEncoder;
use flate2::Compression;
use semver::Version;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

use super::constants::*;
use super::source::StaticSource;

/// Isolated filesystem for one updater
pub struct TestEnv {
    pub temp: TempDir,
    pub paths: StatePaths,
    pub executable: PathBuf,
}

impl TestEnv {
    /// Temp dir with a fake executable containing [`OLD_BINARY`]
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let state = temp.path().join("state");
        fs::create_dir_all(&state).unwrap();

        let bin = temp.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let executable = bin.join(PRODUCT);
        create_fake_binary(&executable, OLD_BINARY).unwrap();

        Self {
            paths: StatePaths::in_dir(&state),
            executable,
            temp,
        }
    }

    pub fn executable_bytes(&self) -> Vec<u8> {
        fs::read(&self.executable).unwrap()
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.executable.file_name().unwrap().to_os_string();
        name.push(".backup");
        self.executable.with_file_name(name)
    }
}

/// Create a fake binary file with the given content
pub fn create_fake_binary(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}

pub fn test_platform() -> Platform {
    Platform::new(TEST_OS, TEST_ARCH)
}

pub fn test_fetcher() -> ArtifactFetcher {
    ArtifactFetcher::new("bifrost-update-tests", Duration::from_secs(10), Duration::from_secs(5))
        .unwrap()
}

/// Catalog reading the listing from `server`
pub fn github_catalog(server: &MockServer) -> ReleaseCatalog {
    let source = GitHubSource::new(
        server.uri(),
        "bifrost-update-tests",
        Duration::from_secs(10),
        Duration::from_secs(5),
    )
    .unwrap();
    ReleaseCatalog::new(Box::new(source), PRODUCT).with_platform(test_platform())
}

pub fn static_catalog(source: StaticSource) -> ReleaseCatalog {
    ReleaseCatalog::new(Box::new(source), PRODUCT).with_platform(test_platform())
}

/// Updater on the stable channel over `env`'s executable
pub fn test_updater(env: &TestEnv, catalog: ReleaseCatalog, current_version: &str) -> Updater {
    Updater::new(
        current_version,
        REPOSITORY,
        Channel::Stable,
        catalog,
        test_fetcher(),
        &env.paths,
    )
    .with_executable(&env.executable)
}

pub fn github_updater(server: &MockServer, env: &TestEnv, current_version: &str) -> Updater {
    test_updater(env, github_catalog(server), current_version)
}

/// Release pointing at an asset served by `server`
pub fn release_info(server: &MockServer, asset_name: &str, checksum: &str) -> ReleaseInfo {
    ReleaseInfo {
        version: Version::new(2, 0, 0),
        channel: Channel::Stable,
        asset_name: asset_name.to_string(),
        asset_url: format!("{}/download/{}", server.uri(), asset_name),
        checksum: checksum.to_string(),
        signature: None,
        release_notes: RELEASE_NOTES.to_string(),
    }
}

pub fn sha256(bytes: &[u8]) -> String {
    sha256_hex(bytes)
}

pub fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&SIGNING_KEY_BYTES)
}

/// Hex ed25519 signature over `bytes` with [`signing_key`]
pub fn sign(bytes: &[u8]) -> String {
    hex::encode(signing_key().sign(bytes).to_bytes())
}

/// Gzipped tarball holding `entries`
pub fn tarball(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, name, *content).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}
