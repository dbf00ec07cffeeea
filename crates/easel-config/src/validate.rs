//! Post-load configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Accepted values for `logging.level`.
const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Accepted values for `logging.format`.
const VALID_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Validate a deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_logging(config)?;
    validate_extensions(config)?;
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    if !VALID_LEVELS.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                VALID_LEVELS.join(", ")
            ),
        });
    }

    if !VALID_FORMATS.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                VALID_FORMATS.join(", ")
            ),
        });
    }

    Ok(())
}

fn validate_extensions(config: &Config) -> ConfigResult<()> {
    if let Some(relative) = config
        .extensions
        .search_paths
        .iter()
        .find(|p| !p.is_absolute())
    {
        return Err(ConfigError::ValidationError {
            field: "extensions.search_paths".to_owned(),
            message: format!("search path '{}' must be absolute", relative.display()),
        });
    }
    Ok(())
}
