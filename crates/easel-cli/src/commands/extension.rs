//! Extension management commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use easel_config::{Config, EaselHome, Preferences};
use easel_extensions::{
    EventFilter, Extension, ExtensionContext, ExtensionEvent, ExtensionId, ExtensionRegistry,
    FilterSubscriber, StandardLocator,
};
use serde_json::json;
use tracing::debug;

use crate::formatter::{OutputFormat, print_json};
use crate::theme::{EXTENSION_COLUMNS, ExtensionState, Theme};

/// An extension registry backed by the user preferences file.
pub(crate) struct Session {
    registry: ExtensionRegistry,
}

impl Session {
    /// Load preferences and scan every extension root.
    pub(crate) fn open(home: &EaselHome, config: &Config) -> anyhow::Result<Self> {
        home.ensure()
            .with_context(|| format!("Failed to create {}", home.root().display()))?;
        let prefs_path = home.preferences_path();
        debug!(path = %prefs_path.display(), "Loading preferences");
        let prefs = Arc::new(Preferences::load(prefs_path)?);
        let locator = StandardLocator::new(home, config);
        let registry = ExtensionRegistry::new(&locator, ExtensionContext::shared(prefs))
            .context("Failed to load extensions")?;
        Ok(Self { registry })
    }

    fn lookup(&self, name: &str) -> anyhow::Result<(ExtensionId, &Extension)> {
        let id = self
            .registry
            .find(name)
            .with_context(|| format!("Extension '{name}' not found"))?;
        let ext = self
            .registry
            .get(id)
            .with_context(|| format!("Extension '{name}' not found"))?;
        Ok((id, ext))
    }
}

pub(crate) fn list(session: &Session, format: OutputFormat) -> anyhow::Result<()> {
    let registry = &session.registry;

    if format == OutputFormat::Json {
        let items: Vec<_> = registry.iter().map(|(_, ext)| extension_json(ext)).collect();
        return print_json(&json!(items));
    }

    if registry.is_empty() {
        println!("{}", Theme::info("No extensions found"));
        return Ok(());
    }

    let [name_w, state_w, source_w, themes_w, palettes_w] = EXTENSION_COLUMNS;
    println!("{}", Theme::header("Extensions"));
    println!(
        "  {:<name_w$} {:<state_w$} {:<source_w$} {:>themes_w$} {:>palettes_w$}",
        "NAME", "STATE", "SOURCE", "THEMES", "PALETTES"
    );
    println!("{}", Theme::rule(&EXTENSION_COLUMNS));
    for (_, ext) in registry.iter() {
        let state = if !ext.is_installed() {
            ExtensionState::Removed
        } else if ext.is_enabled() {
            ExtensionState::Enabled
        } else {
            ExtensionState::Disabled
        };
        let source = if ext.is_builtin_extension() { "builtin" } else { "user" };
        println!(
            "  {:<name_w$} {} {:<source_w$} {:>themes_w$} {:>palettes_w$}",
            ext.name(),
            Theme::state(state, state_w),
            source,
            ext.themes().len(),
            ext.palettes().len()
        );
    }
    println!(
        "\n{}",
        Theme::dimmed(&format!("{} extension(s)", registry.len()))
    );
    println!(
        "{}",
        Theme::dimmed(&format!(
            "User extensions: {}",
            registry.user_extensions_path().display()
        ))
    );
    Ok(())
}

pub(crate) fn install(
    mut session: Session,
    archive: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if format == OutputFormat::Pretty {
        let notices = FilterSubscriber::new("cli-notices", |event| {
            let (kind, items) = match event {
                ExtensionEvent::ThemesChange(ext) => ("theme", ext.themes()),
                ExtensionEvent::PalettesChange(ext) => ("palette", ext.palettes()),
                ExtensionEvent::NewExtension(_) => return,
            };
            for id in items.keys() {
                eprintln!("{}", Theme::dimmed(&format!("  New {kind}: {id}")));
            }
        })
        .with_filter(EventFilter::types(["themes_change", "palettes_change"]));
        session
            .registry
            .events()
            .registry()
            .register(Arc::new(notices));
    }

    let id = session
        .registry
        .install_compressed_extension(archive)
        .with_context(|| format!("Failed to install {}", archive.display()))?;
    let ext = session
        .registry
        .get(id)
        .context("Installed extension missing from registry")?;

    if format == OutputFormat::Json {
        return print_json(&extension_json(ext));
    }

    println!(
        "{}",
        Theme::success(&format!("Installed extension '{}'", ext.name()))
    );
    println!(
        "{}",
        Theme::dimmed(&format!("  Location: {}", ext.path().display()))
    );
    Ok(())
}

pub(crate) fn set_enabled(mut session: Session, name: &str, state: bool) -> anyhow::Result<()> {
    let (id, ext) = session.lookup(name)?;
    let verb = if state { "enabled" } else { "disabled" };

    if ext.is_enabled() == state {
        println!("{}", Theme::info(&format!("Extension '{name}' is already {verb}")));
        return Ok(());
    }
    if !state && let Some(reason) = disable_refusal(ext) {
        bail!("Cannot disable '{name}': {reason}");
    }

    session.registry.enable_extension(id, state)?;
    println!("{}", Theme::success(&format!("Extension '{name}' {verb}")));
    Ok(())
}

pub(crate) fn uninstall(mut session: Session, name: &str) -> anyhow::Result<()> {
    let (id, ext) = session.lookup(name)?;
    if let Some(reason) = uninstall_refusal(ext) {
        bail!("Cannot uninstall '{name}': {reason}");
    }
    let path = ext.path().to_path_buf();

    session.registry.uninstall_extension(id)?;
    println!("{}", Theme::success(&format!("Uninstalled extension '{name}'")));
    println!("{}", Theme::dimmed(&format!("  Removed: {}", path.display())));
    Ok(())
}

pub(crate) fn theme_path(session: &Session, id: &str, format: OutputFormat) -> anyhow::Result<()> {
    let Some(path) = session.registry.theme_path(id) else {
        bail!("No enabled extension provides theme '{id}'");
    };
    print_path(id, path, format)
}

pub(crate) fn palette_path(
    session: &Session,
    id: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let Some(path) = session.registry.palette_path(id) else {
        bail!("No enabled extension provides palette '{id}'");
    };
    print_path(id, path, format)
}

pub(crate) fn palettes(session: &Session, format: OutputFormat) -> anyhow::Result<()> {
    let palettes = session.registry.palettes();

    if format == OutputFormat::Json {
        return print_json(&json!(palettes));
    }

    if palettes.is_empty() {
        println!("{}", Theme::info("No palettes available"));
        return Ok(());
    }
    let width = palettes.keys().map(String::len).max().unwrap_or(0);
    println!("{}", Theme::header("Palettes"));
    for (id, path) in &palettes {
        println!("{}", Theme::contribution(id, &path.display().to_string(), width));
    }
    Ok(())
}

fn print_path(id: &str, path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(&json!({ "id": id, "path": path })),
        OutputFormat::Pretty => {
            println!("{}", path.display());
            Ok(())
        },
    }
}

/// Why `ext` may not be disabled, if it may not.
fn disable_refusal(ext: &Extension) -> Option<&'static str> {
    if ext.can_be_disabled() {
        None
    } else if ext.is_current_theme() {
        Some("it provides the selected theme")
    } else if ext.is_default_theme() {
        Some("it provides the default theme")
    } else {
        Some("it is not enabled")
    }
}

/// Why `ext` may not be uninstalled, if it may not.
fn uninstall_refusal(ext: &Extension) -> Option<&'static str> {
    if ext.can_be_uninstalled() {
        None
    } else if ext.is_builtin_extension() {
        Some("built-in extensions cannot be removed")
    } else if ext.is_current_theme() {
        Some("it provides the selected theme")
    } else if ext.is_default_theme() {
        Some("it provides the default theme")
    } else {
        Some("it is not installed")
    }
}

fn extension_json(ext: &Extension) -> serde_json::Value {
    json!({
        "name": ext.name(),
        "display_name": ext.display_name(),
        "path": ext.path(),
        "enabled": ext.is_enabled(),
        "installed": ext.is_installed(),
        "builtin": ext.is_builtin_extension(),
        "themes": ext.themes(),
        "palettes": ext.palettes(),
    })
}
