//! Config file loading.
//!
//! 1. Parse the embedded `defaults.toml`
//! 2. Merge `~/.easel/config.toml` over it when present
//! 3. Apply the `EASEL_LOG` level override
//! 4. Deserialize and validate

use std::path::Path;

use tracing::{debug, info};

use crate::dirs::EaselHome;
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Environment variable overriding `logging.level`.
pub const LOG_ENV_VAR: &str = "EASEL_LOG";

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load the application configuration for `home`.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the user file is malformed or the merged
/// configuration fails validation.
pub fn load(home: &EaselHome) -> ConfigResult<Config> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let user_path = home.config_path();
    if let Some(overlay) = try_load_file(&user_path)? {
        deep_merge(&mut merged, overlay);
        info!(path = %user_path.display(), "loaded user config");
    }

    if let Ok(level) = std::env::var(LOG_ENV_VAR) {
        if let Some(logging) = merged.get_mut("logging").and_then(toml::Value::as_table_mut) {
            debug!(level = %level, "applying {LOG_ENV_VAR} override");
            logging.insert("level".to_owned(), toml::Value::String(level));
        }
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Load a config from a specific file path (no defaults layer).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let content = read_bounded(path)?;
    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Try to load a file, returning `None` if it doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match read_bounded(path) {
        Ok(c) => c,
        Err(ConfigError::ReadError { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => return Err(e),
    };

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

fn read_bounded(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    Ok(content)
}

/// Recursively merge `overlay` into `base`. Tables merge key by key, any
/// other value replaces the base value.
fn deep_merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_table.insert(key, value);
                    },
                }
            }
        },
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_deserialize_to_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "compact");
        assert!(config.extensions.search_paths.is_empty());
        assert!(config.extensions.include_install_dir);
    }

    #[test]
    fn user_file_overrides_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let home = EaselHome::from_path(tmp.path());
        std::fs::write(
            home.config_path(),
            "[logging]\nformat = \"json\"\n\n[extensions]\nsearch_paths = [\"/opt/easel/extensions\"]\n",
        )
        .unwrap();

        let config = load(&home).unwrap();
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.extensions.search_paths.len(), 1);
    }

    #[test]
    fn missing_user_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = load(&EaselHome::from_path(tmp.path())).unwrap();
        assert!(config.extensions.include_install_dir);
    }

    #[test]
    fn invalid_user_file_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let home = EaselHome::from_path(tmp.path());
        std::fs::write(home.config_path(), "[logging]\nformat = \"loud\"\n").unwrap();
        assert!(matches!(
            load(&home),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn load_file_nonexistent() {
        let result = load_file(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("huge.toml");
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        std::fs::write(&file_path, data).unwrap();

        assert!(matches!(
            try_load_file(&file_path),
            Err(ConfigError::ValidationError { .. })
        ));
    }
}
