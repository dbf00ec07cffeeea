//! Easel CLI - extension manager
//!
//! Lists, installs, enables, disables and removes editor extensions, and
//! resolves theme and palette ids to the files extensions contribute.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
pub mod config_bridge;
mod formatter;
mod theme;

use commands::extension;
use formatter::OutputFormat;

/// Easel - extension manager
#[derive(Parser)]
#[command(name = "easel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (pretty, json)
    #[arg(long, global = true, default_value = "pretty")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage extensions
    Extension {
        #[command(subcommand)]
        command: ExtensionCommands,
    },
}

#[derive(Subcommand)]
enum ExtensionCommands {
    /// List discovered extensions
    List,

    /// Install an extension from a zip archive
    Install {
        /// Path to the archive
        archive: PathBuf,
    },

    /// Enable an extension
    Enable {
        /// Extension name
        name: String,
    },

    /// Disable an extension
    Disable {
        /// Extension name
        name: String,
    },

    /// Remove an installed extension from disk
    Uninstall {
        /// Extension name
        name: String,
    },

    /// Print the file of a theme contributed by an enabled extension
    ThemePath {
        /// Theme id
        id: String,
    },

    /// Print the file of a palette contributed by an enabled extension
    PalettePath {
        /// Palette id
        id: String,
    },

    /// List every palette contributed by enabled extensions
    Palettes,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let home = easel_config::EaselHome::resolve();
    let config = match &home {
        Ok(home) => easel_config::Config::load(home)
            .map_err(|e| eprintln!("Failed to load config: {e}"))
            .ok(),
        Err(_) => None,
    };

    // Set up logging from config, with --verbose override.
    let log_config = if let (Ok(home), Some(cfg)) = (&home, &config) {
        let mut lc = config_bridge::to_log_config(cfg, home);
        if cli.verbose {
            "debug".clone_into(&mut lc.level);
        }
        lc
    } else {
        let level = if cli.verbose { "debug" } else { "info" };
        easel_telemetry::LogConfig::new(level).with_format(easel_telemetry::LogFormat::Compact)
    };
    if let Err(e) = easel_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let output_format = match cli.format.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Pretty,
    };

    let home = home?;
    let config = config.unwrap_or_default();

    match cli.command {
        Commands::Extension { command } => {
            handle_extensions(command, &home, &config, output_format)?;
        },
    }

    Ok(())
}

fn handle_extensions(
    command: ExtensionCommands,
    home: &easel_config::EaselHome,
    config: &easel_config::Config,
    format: OutputFormat,
) -> Result<()> {
    let session = extension::Session::open(home, config)?;
    match command {
        ExtensionCommands::List => extension::list(&session, format)?,
        ExtensionCommands::Install { archive } => {
            extension::install(session, &archive, format)?;
        },
        ExtensionCommands::Enable { name } => extension::set_enabled(session, &name, true)?,
        ExtensionCommands::Disable { name } => extension::set_enabled(session, &name, false)?,
        ExtensionCommands::Uninstall { name } => extension::uninstall(session, &name)?,
        ExtensionCommands::ThemePath { id } => extension::theme_path(&session, &id, format)?,
        ExtensionCommands::PalettePath { id } => {
            extension::palette_path(&session, &id, format)?;
        },
        ExtensionCommands::Palettes => extension::palettes(&session, format)?,
    }
    Ok(())
}
