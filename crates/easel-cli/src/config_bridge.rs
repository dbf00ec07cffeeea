//! Bridge from `easel_config::Config` to telemetry types.

use easel_config::{Config, EaselHome};
use easel_telemetry::{LogConfig, LogFormat, LogTarget};

/// File name prefix of rolling log files.
const LOG_FILE_PREFIX: &str = "easel.log";

/// Convert config to [`LogConfig`]. Unknown formats fall back to compact.
pub fn to_log_config(cfg: &Config, home: &EaselHome) -> LogConfig {
    let format = cfg.logging.format.parse().unwrap_or(LogFormat::Compact);

    let mut log_config = LogConfig::new(&cfg.logging.level).with_format(format);

    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }

    if cfg.logging.to_file {
        log_config = log_config.with_target(LogTarget::File {
            dir: home.logs_dir(),
            prefix: LOG_FILE_PREFIX.to_owned(),
        });
    }

    log_config
}
