//! Configuration types for Easel.
//!
//! Every struct implements [`Default`] so that a bare `[section]` header in
//! TOML produces a working configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root application configuration, loaded from `~/.easel/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
    /// Where to look for extensions besides the user directory.
    pub extensions: ExtensionsSection,
}

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"` or `"json"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["easel_extensions=debug"]`).
    pub directives: Vec<String>,
    /// Write logs to `~/.easel/logs/` instead of stderr.
    pub to_file: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            to_file: false,
        }
    }
}

/// Extension discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionsSection {
    /// Additional absolute directories scanned for built-in extensions.
    pub search_paths: Vec<PathBuf>,
    /// Also scan `<executable dir>/data/extensions`.
    pub include_install_dir: bool,
}

impl Default for ExtensionsSection {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            include_install_dir: true,
        }
    }
}
