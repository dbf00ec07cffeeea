#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration and preference storage for Easel.
//!
//! Two kinds of state live here:
//!
//! - [`Config`]: hand-edited application settings (`~/.easel/config.toml`)
//!   layered over embedded defaults.
//! - [`Preferences`]: state the application writes at runtime
//!   (`~/.easel/preferences.toml`), exposed to the rest of the workspace
//!   through the [`ConfigStore`] and [`CurrentTheme`] traits.
//!
//! ```rust,no_run
//! use easel_config::{Config, ConfigStore, EaselHome, Preferences};
//!
//! let home = EaselHome::resolve().unwrap();
//! let config = Config::load(&home).unwrap();
//! let prefs = Preferences::load(home.preferences_path()).unwrap();
//! println!("log level: {}", config.logging.level);
//! println!("enabled: {}", prefs.get_bool("extensions", "pixel-palettes", true));
//! ```
//!
//! This crate has no dependencies on other internal easel crates.

/// Easel home directory layout.
pub mod dirs;
/// Configuration error types.
pub mod error;
/// Configuration file loading.
pub mod loader;
/// Runtime preferences file.
pub mod preferences;
/// Capability traits for flag storage and theme selection.
pub mod store;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use dirs::EaselHome;
pub use error::{ConfigError, ConfigResult};
pub use preferences::{DEFAULT_THEME_ID, Preferences};
pub use store::{ConfigStore, CurrentTheme, EXTENSIONS_SECTION};
pub use types::*;

impl Config {
    /// Load configuration for `home` (defaults → user file → env).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the user file is malformed or the result
    /// fails validation.
    pub fn load(home: &EaselHome) -> ConfigResult<Self> {
        loader::load(home)
    }

    /// Load configuration from a single file (no layering).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
