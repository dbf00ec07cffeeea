//! Configuration error types.

use thiserror::Error;

/// Errors produced while loading, validating, or persisting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path of the file that failed to read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration file is not valid TOML or does not match the schema.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path of the file that failed to parse.
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// A configuration file could not be written back to disk.
    #[error("failed to write config file {path}: {message}")]
    WriteError {
        /// Path of the file that failed to write.
        path: String,
        /// Description of the failure.
        message: String,
    },

    /// A configuration value is outside its accepted range.
    #[error("invalid config value for {field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field (e.g. `logging.format`).
        field: String,
        /// Why the value was rejected.
        message: String,
    },

    /// Neither `$EASEL_HOME` nor a user home directory could be determined.
    #[error("could not determine the user's home directory")]
    NoHomeDir,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
