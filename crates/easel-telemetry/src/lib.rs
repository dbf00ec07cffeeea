//! Easel Telemetry - Logging setup for Easel.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats
//! - Stderr or daily-rolling file output
//! - Integration with the tracing ecosystem
//!
//! # Example
//!
//! ```rust,no_run
//! use easel_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), easel_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("easel_extensions=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("Logging initialized");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
