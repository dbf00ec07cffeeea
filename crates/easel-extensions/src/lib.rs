#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![warn(unreachable_pub)]
//! Extension management for the Easel editor.
//!
//! An extension is a directory holding a `package.json` manifest and the
//! assets it contributes (themes, palettes). The [`ExtensionRegistry`]:
//!
//! - scans the builtin and user extension directories at startup
//! - installs zip archives into the user directory
//! - enables, disables and uninstalls extensions, persisting the enabled flag
//!   through a [`ConfigStore`](easel_config::ConfigStore)
//! - answers theme and palette lookups over the enabled extensions
//! - publishes [`ExtensionEvent`]s on its [`EventBus`]
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use easel_config::{Config, EaselHome, Preferences};
//! use easel_extensions::{ExtensionContext, ExtensionRegistry, StandardLocator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let home = EaselHome::resolve()?;
//! let config = Config::load(&home)?;
//! let prefs = Arc::new(Preferences::load(home.preferences_path())?);
//!
//! let locator = StandardLocator::new(&home, &config);
//! let mut registry = ExtensionRegistry::new(&locator, ExtensionContext::shared(prefs))?;
//!
//! let id = registry.install_compressed_extension(Path::new("pixel-palettes.zip"))?;
//! println!("installed {}", registry.get(id).map_or("?", |ext| ext.name()));
//! # Ok(())
//! # }
//! ```
//!
//! All operations are synchronous and block on disk I/O. The registry is
//! meant to be driven from one thread.

pub mod archive;
pub mod context;
pub mod error;
pub mod events;
pub mod extension;
pub mod locator;
pub mod manifest;
pub mod registry;

pub use context::ExtensionContext;
pub use error::{ExtensionError, ExtensionResult};
pub use events::{
    EventBus, EventFilter, EventSubscriber, ExtensionEvent, FilterSubscriber, SubscriberId,
    SubscriberRegistry,
};
pub use extension::{DEFAULT_THEME_EXTENSION, Extension, ExtensionItems};
pub use locator::{ResourceLocator, StandardLocator};
pub use manifest::{Contribution, ExtensionManifest, MANIFEST_FILE_NAME};
pub use registry::{ExtensionId, ExtensionRegistry};
