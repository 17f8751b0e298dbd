//! Shared constants for test infrastructure

// Versions
pub const VERSION_1_0_0: &str = "1.0.0";
pub const VERSION_1_2_0: &str = "1.2.0";
pub const VERSION_2_0_0: &str = "2.0.0";

// Tags as published upstream
pub const TAG_V1_0_0: &str = "v1.0.0";
pub const TAG_V1_2_0: &str = "v1.2.0";
pub const TAG_V2_0_0: &str = "v2.0.0";
pub const TAG_V2_1_0_BETA: &str = "v2.1.0-beta.1";

// Repository and product
pub const REPOSITORY: &str = "martient/bifrost-backup";
pub const PRODUCT: &str = "bifrost-backups";
pub const RELEASES_PATH: &str = "/repos/martient/bifrost-backup/releases";

// Platform used by every test catalog
pub const TEST_OS: &str = "linux";
pub const TEST_ARCH: &str = "x86_64";
pub const ASSET_NAME: &str = "bifrost-backups_linux_x86_64";
pub const TARBALL_NAME: &str = "bifrost-backups_linux_x86_64.tar.gz";
pub const MANIFEST_NAME: &str = "bifrost-backups_checksums.txt";

// Binary contents
pub const OLD_BINARY: &[u8] = b"#!/bin/sh\necho bifrost-backups 1.0.0\n";
pub const NEW_BINARY: &[u8] = b"#!/bin/sh\necho bifrost-backups 2.0.0\n";

pub const RELEASE_NOTES: &str = "## What's new\n\n- Incremental backups\n";

pub const WRONG_CHECKSUM: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Fixed key so signatures are reproducible
pub const SIGNING_KEY_BYTES: [u8; 32] = [42u8; 32];
