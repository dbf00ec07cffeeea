//! Logging configuration and subscriber installation.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{TelemetryError, TelemetryResult};

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human-friendly output.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// Newline-delimited JSON objects.
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::ConfigError(format!(
                "unknown log format '{other}'"
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogTarget {
    /// Standard error.
    #[default]
    Stderr,
    /// Daily-rolling files `<dir>/<prefix>.YYYY-MM-DD`.
    File {
        /// Directory holding the log files.
        dir: PathBuf,
        /// File name prefix.
        prefix: String,
    },
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base level filter (`"info"`, `"debug"`, ...).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Extra `target=level` directives.
    pub directives: Vec<String>,
    /// Output destination.
    pub target: LogTarget,
}

impl LogConfig {
    /// Create a configuration with the given base level, compact format, and
    /// stderr output.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
            directives: Vec::new(),
            target: LogTarget::default(),
        }
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Add a `target=level` directive.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Set the output destination.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Build the level filter. `RUST_LOG` wins over the configured level
    /// when it is set; directives are always appended.
    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&self.level).map_err(|e| {
                TelemetryError::ConfigError(format!("invalid log level '{}': {e}", self.level))
            })?,
        };

        for directive in &self.directives {
            let parsed = directive.parse().map_err(|e| {
                TelemetryError::ConfigError(format!("invalid directive '{directive}': {e}"))
            })?;
            filter = filter.add_directive(parsed);
        }

        Ok(filter)
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

/// Install the global tracing subscriber described by `config`.
///
/// # Errors
///
/// Returns [`TelemetryError::ConfigError`] for an unparsable level or
/// directive, [`TelemetryError::IoError`] if the log directory cannot be
/// created, and [`TelemetryError::InitError`] if a global subscriber is
/// already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.build_filter()?;

    let (writer, ansi) = match &config.target {
        LogTarget::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
        LogTarget::File { dir, prefix } => {
            std::fs::create_dir_all(dir)?;
            (
                BoxMakeWriter::new(tracing_appender::rolling::daily(dir, prefix)),
                false,
            )
        },
    };

    let fmt_layer = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::InitError(e.to_string()))
}

/// Install a compact `info`-level subscriber on stderr.
///
/// # Errors
///
/// Same as [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::default())
}
