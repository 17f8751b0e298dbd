//! Common test infrastructure for bifrost-update tests
//!
//! # Usage
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `constants`: Versions, platform and asset names, binary contents
//! - `builders`: Fluent builders for Release and ReleaseAsset
//! - `mock_server`: Wiremock setup for release listings and downloads
//! - `source`: In-memory release source that counts calls
//! - `updater_helpers`: Fake executables and updater construction

// Each test binary uses a different subset of the helpers
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod builders;
pub mod constants;
pub mod mock_server;
pub mod source;
pub mod updater_helpers;

pub use builders::*;
pub use constants::*;
pub use mock_server::*;
pub use source::*;
pub use updater_helpers::*;
