//! Easel Test - Shared test utilities for Easel crates.
//!
//! Add as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! easel-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use easel_test::{ArchiveBuilder, RecordingConfigStore, manifest_json};
//!
//! let zip = tmp.path().join("foo.zip");
//! ArchiveBuilder::new()
//!     .file("foo/package.json", manifest_json("foo", "Foo", &[], &[]).as_bytes())
//!     .file("foo/../../escape.txt", b"evil")
//!     .write_to(&zip);
//!
//! let store = RecordingConfigStore::new();
//! assert_eq!(store.writes(), 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod archive;
pub mod fixtures;
pub mod mocks;

pub use archive::*;
pub use fixtures::*;
pub use mocks::*;
