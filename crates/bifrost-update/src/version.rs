//! Version information and comparison

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::{Result, UpdateError};

/// Parse a release tag or version string into a semantic version.
///
/// Tolerates surrounding whitespace, a leading non-numeric prefix such as
/// `v` or `release-`, and a missing minor or patch component (`1.2` parses
/// as `1.2.0`). Pre-release and build metadata are kept intact, so
/// `2.1.0-beta.1` orders below `2.1.0`.
pub fn parse_tolerant(tag: &str) -> Result<Version> {
    let stripped = tag
        .trim()
        .trim_start_matches(|c: char| !c.is_ascii_digit());

    let core_end = stripped.find(['-', '+']).unwrap_or(stripped.len());
    let (core, suffix) = stripped.split_at(core_end);

    let normalized = match core.split('.').count() {
        1 => format!("{}.0.0{}", core, suffix),
        2 => format!("{}.0{}", core, suffix),
        _ => stripped.to_string(),
    };

    Version::parse(&normalized).map_err(|source| UpdateError::VersionParse {
        version: tag.to_string(),
        source,
    })
}

/// Strict greater-than under semver precedence
pub fn is_newer(candidate: &Version, current: &Version) -> bool {
    candidate > current
}

/// Version information for the running build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Semantic version
    pub version: String,

    /// Git commit SHA (short)
    pub commit: Option<String>,

    /// Target triple
    pub target: Option<String>,
}

impl VersionInfo {
    /// Create version info for current build
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            commit: option_env!("GIT_SHA").map(String::from),
            target: option_env!("TARGET").map(String::from),
        }
    }

    /// Parse semantic version
    pub fn semver(&self) -> Result<Version> {
        parse_tolerant(&self.version)
    }

    /// Format as display string
    pub fn display(&self) -> String {
        let mut parts = vec![format!("bifrost-backups {}", self.version)];

        if let Some(commit) = &self.commit {
            parts.push(format!("({})", commit));
        }

        if let Some(target) = &self.target {
            parts.push(target.clone());
        }

        parts.join(" ")
    }
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self::current()
    }
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
