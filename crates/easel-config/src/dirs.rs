//! Directory layout of the Easel home directory.
//!
//! # Layout
//!
//! ```text
//! ~/.easel/                       (EaselHome)
//! ├── data/
//! │   └── extensions/               (user-installed extensions)
//! ├── logs/                         (log files when logging.to_file is set)
//! ├── config.toml                   (hand-edited application config)
//! └── preferences.toml              (runtime state: enable flags, theme)
//! ```

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

/// Environment variable that relocates the home directory.
pub const HOME_ENV_VAR: &str = "EASEL_HOME";

/// Global Easel home directory (`~/.easel/` or `$EASEL_HOME`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EaselHome {
    root: PathBuf,
}

impl EaselHome {
    /// Resolve the home directory.
    ///
    /// Checks `$EASEL_HOME` first, then falls back to `<home>/.easel/`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if `$EASEL_HOME` is relative,
    /// or [`ConfigError::NoHomeDir`] if no home directory can be found.
    pub fn resolve() -> ConfigResult<Self> {
        if let Ok(custom) = std::env::var(HOME_ENV_VAR) {
            let root = PathBuf::from(&custom);
            if !root.is_absolute() {
                return Err(ConfigError::ValidationError {
                    field: HOME_ENV_VAR.to_owned(),
                    message: format!("'{custom}' must be an absolute path"),
                });
            }
            return Ok(Self { root });
        }

        directories::BaseDirs::new()
            .map(|d| Self {
                root: d.home_dir().join(".easel"),
            })
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Create from an explicit path (useful for testing).
    #[must_use]
    pub fn from_path(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the directory skeleton.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a directory cannot be created.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.user_extensions_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }

    /// Root directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Data directory (`~/.easel/data/`).
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// User-installed extensions (`~/.easel/data/extensions/`).
    #[must_use]
    pub fn user_extensions_dir(&self) -> PathBuf {
        self.data_dir().join("extensions")
    }

    /// Logs directory (`~/.easel/logs/`).
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Application configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Preferences file.
    #[must_use]
    pub fn preferences_path(&self) -> PathBuf {
        self.root.join("preferences.toml")
    }
}
