//! A single installed or bundled extension.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use easel_config::EXTENSIONS_SECTION;
use tracing::{debug, info, trace, warn};

use crate::context::ExtensionContext;
use crate::error::{ExtensionError, ExtensionResult};

/// Name of the extension carrying the default theme. It can never be
/// disabled or uninstalled.
pub const DEFAULT_THEME_EXTENSION: &str = "easel-theme";

/// Contribution id → absolute path.
pub type ExtensionItems = BTreeMap<String, PathBuf>;

/// An extension known to the registry.
///
/// Lifecycle: loaded (enabled or disabled) until [`uninstall`](Self::uninstall)
/// succeeds, after which it is permanently uninstalled. The object stays in
/// the registry either way.
#[derive(Debug)]
pub struct Extension {
    path: PathBuf,
    name: String,
    display_name: String,
    is_enabled: bool,
    is_installed: bool,
    is_builtin: bool,
    themes: ExtensionItems,
    palettes: ExtensionItems,
    context: ExtensionContext,
}

impl Extension {
    /// Create a loaded extension rooted at `path`.
    #[must_use]
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        display_name: impl Into<String>,
        is_enabled: bool,
        is_builtin: bool,
        context: ExtensionContext,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            display_name: display_name.into(),
            is_enabled,
            is_installed: true,
            is_builtin,
            themes: ExtensionItems::new(),
            palettes: ExtensionItems::new(),
            context,
        }
    }

    /// Register a theme. A repeated id replaces the earlier path.
    pub fn add_theme(&mut self, id: impl Into<String>, path: impl Into<PathBuf>) {
        self.themes.insert(id.into(), path.into());
    }

    /// Register a palette. A repeated id replaces the earlier path.
    pub fn add_palette(&mut self, id: impl Into<String>, path: impl Into<PathBuf>) {
        self.palettes.insert(id.into(), path.into());
    }

    /// Directory holding the extension's files.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stable name; also the configuration key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable label.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Whether the extension's contributions are active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    /// `false` once the extension has been uninstalled.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.is_installed
    }

    /// Whether the extension lives outside the user extensions directory.
    #[must_use]
    pub fn is_builtin_extension(&self) -> bool {
        self.is_builtin
    }

    /// Contributed themes.
    #[must_use]
    pub fn themes(&self) -> &ExtensionItems {
        &self.themes
    }

    /// Contributed palettes.
    #[must_use]
    pub fn palettes(&self) -> &ExtensionItems {
        &self.palettes
    }

    /// Whether this extension provides the currently selected theme.
    #[must_use]
    pub fn is_current_theme(&self) -> bool {
        self.themes
            .contains_key(&self.context.theme().selected_theme())
    }

    /// Whether this is the reserved default-theme extension.
    #[must_use]
    pub fn is_default_theme(&self) -> bool {
        self.name == DEFAULT_THEME_EXTENSION
    }

    /// Whether disabling is allowed: enabled, not providing the selected
    /// theme, and not the default-theme extension.
    #[must_use]
    pub fn can_be_disabled(&self) -> bool {
        self.is_enabled && !self.is_current_theme() && !self.is_default_theme()
    }

    /// Whether uninstalling is allowed: still installed, not builtin, not
    /// providing the selected theme, and not the default-theme extension.
    #[must_use]
    pub fn can_be_uninstalled(&self) -> bool {
        self.is_installed
            && !self.is_builtin
            && !self.is_current_theme()
            && !self.is_default_theme()
    }

    /// Enable or disable the extension, persisting the flag.
    ///
    /// Nothing is written when `state` already matches or the extension has
    /// been uninstalled. Callers disabling an extension are expected to check
    /// [`can_be_disabled`](Self::can_be_disabled) first.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::Config`] if the store cannot be flushed. The
    /// previous flag is written back to the store and the in-memory state is
    /// left unchanged in that case.
    pub fn enable(&mut self, state: bool) -> ExtensionResult<()> {
        if self.is_enabled == state || !self.is_installed {
            return Ok(());
        }

        let config = self.context.config();
        config.set_bool(EXTENSIONS_SECTION, &self.name, state);
        if let Err(e) = config.flush() {
            config.set_bool(EXTENSIONS_SECTION, &self.name, self.is_enabled);
            warn!(name = %self.name, error = %e, "Failed to persist extension state");
            return Err(e.into());
        }

        self.is_enabled = state;
        debug!(name = %self.name, enabled = state, "Extension state changed");
        Ok(())
    }

    /// Delete the extension's directory and mark it uninstalled.
    ///
    /// A second call is a no-op. So is a call on an extension that
    /// [cannot be uninstalled](Self::can_be_uninstalled); that case is only
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::Uninstall`] naming the first file or
    /// directory that could not be removed. The extension stays installed.
    pub fn uninstall(&mut self) -> ExtensionResult<()> {
        if !self.is_installed {
            return Ok(());
        }
        if !self.can_be_uninstalled() {
            warn!(name = %self.name, "Refusing to uninstall extension");
            return Ok(());
        }

        match std::fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.file_type().is_symlink() => {
                remove_link(&self.path).map_err(uninstall_error(&self.path))?;
                trace!(path = %self.path.display(), "Deleted link");
            },
            Ok(_) => {
                remove_dir_contents(&self.path)?;
                std::fs::remove_dir(&self.path).map_err(|source| ExtensionError::Uninstall {
                    path: self.path.clone(),
                    source,
                })?;
                trace!(path = %self.path.display(), "Deleted directory");
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Extension directory already gone");
            },
            Err(source) => {
                return Err(ExtensionError::Uninstall {
                    path: self.path.clone(),
                    source,
                });
            },
        }

        self.is_enabled = false;
        self.is_installed = false;
        info!(name = %self.name, path = %self.path.display(), "Uninstalled extension");
        Ok(())
    }
}

/// Empty `dir`: its files first, then each subdirectory (contents before the
/// directory itself).
fn remove_dir_contents(dir: &Path) -> ExtensionResult<()> {
    let mut subdirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(uninstall_error(dir))? {
        let entry = entry.map_err(uninstall_error(dir))?;
        let path = entry.path();
        if entry.file_type().map_err(uninstall_error(&path))?.is_dir() {
            subdirs.push(path);
        } else {
            std::fs::remove_file(&path).map_err(uninstall_error(&path))?;
            trace!(path = %path.display(), "Deleted file");
        }
    }

    for subdir in subdirs {
        remove_dir_contents(&subdir)?;
        std::fs::remove_dir(&subdir).map_err(uninstall_error(&subdir))?;
        trace!(path = %subdir.display(), "Deleted directory");
    }

    Ok(())
}

/// Remove a symlink without touching what it points to.
#[cfg(windows)]
fn remove_link(path: &Path) -> std::io::Result<()> {
    std::fs::remove_dir(path).or_else(|_| std::fs::remove_file(path))
}

#[cfg(not(windows))]
fn remove_link(path: &Path) -> std::io::Result<()> {
    std::fs::remove_file(path)
}

fn uninstall_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExtensionError + use<> {
    let path = path.to_path_buf();
    move |source| ExtensionError::Uninstall { path, source }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use easel_test::{FixedTheme, RecordingConfigStore};

    use super::*;

    fn context(store: &Arc<RecordingConfigStore>, theme: &str) -> ExtensionContext {
        ExtensionContext::new(store.clone(), Arc::new(FixedTheme::new(theme)))
    }

    fn extension(name: &str, builtin: bool, ctx: ExtensionContext) -> Extension {
        Extension::new("/nonexistent/ext", name, name.to_uppercase(), true, builtin, ctx)
    }

    #[test]
    fn new_extension_is_installed() {
        let store = Arc::new(RecordingConfigStore::new());
        let ext = extension("foo", false, context(&store, "default"));
        assert!(ext.is_installed());
        assert!(ext.is_enabled());
        assert_eq!(ext.display_name(), "FOO");
        assert!(ext.can_be_disabled());
        assert!(ext.can_be_uninstalled());
    }

    #[test]
    fn builtin_cannot_be_uninstalled() {
        let store = Arc::new(RecordingConfigStore::new());
        for enabled in [true, false] {
            for name in ["foo", DEFAULT_THEME_EXTENSION] {
                let mut ext = Extension::new(
                    "/builtin/ext",
                    name,
                    "Builtin",
                    enabled,
                    true,
                    context(&store, "t1"),
                );
                assert!(!ext.can_be_uninstalled());
                ext.add_theme("t1", "/builtin/ext/t1");
                assert!(!ext.can_be_uninstalled());
            }
        }
    }

    #[test]
    fn default_theme_extension_is_protected() {
        let store = Arc::new(RecordingConfigStore::new());
        let ext = extension(DEFAULT_THEME_EXTENSION, false, context(&store, "other"));
        assert!(ext.is_default_theme());
        assert!(!ext.can_be_disabled());
        assert!(!ext.can_be_uninstalled());
    }

    #[test]
    fn selected_theme_is_protected() {
        let store = Arc::new(RecordingConfigStore::new());
        let mut ext = extension("dark-themes", false, context(&store, "dark"));
        ext.add_theme("dark", "/x/dark");
        assert!(ext.is_current_theme());
        assert!(!ext.can_be_disabled());
        assert!(!ext.can_be_uninstalled());

        let mut other = extension("light-themes", false, context(&store, "dark"));
        other.add_theme("light", "/x/light");
        assert!(!other.is_current_theme());
        assert!(other.can_be_disabled());
    }

    #[test]
    fn enable_twice_writes_config_once() {
        let store = Arc::new(RecordingConfigStore::new());
        let mut ext = Extension::new("/x", "foo", "Foo", false, false, context(&store, "default"));

        ext.enable(true).unwrap();
        ext.enable(true).unwrap();

        assert!(ext.is_enabled());
        assert_eq!(store.writes(), 1);
        assert_eq!(store.flushes(), 1);
        assert_eq!(store.value(EXTENSIONS_SECTION, "foo"), Some(true));
    }

    #[test]
    fn enable_to_current_state_is_noop() {
        let store = Arc::new(RecordingConfigStore::new());
        let mut ext = extension("foo", false, context(&store, "default"));
        ext.enable(true).unwrap();
        assert_eq!(store.writes(), 0);

        ext.enable(false).unwrap();
        assert!(!ext.is_enabled());
        assert_eq!(store.value(EXTENSIONS_SECTION, "foo"), Some(false));
        assert!(!ext.can_be_disabled());
    }

    #[test]
    fn failed_flush_keeps_state() {
        let store = Arc::new(RecordingConfigStore::new().failing_flush());
        let mut ext = extension("foo", false, context(&store, "default"));

        let err = ext.enable(false).unwrap_err();
        assert!(matches!(err, ExtensionError::Config(_)));
        assert!(ext.is_enabled());
        assert_eq!(store.value(EXTENSIONS_SECTION, "foo"), Some(true));
        assert!(ext.context.config().get_bool(EXTENSIONS_SECTION, "foo", false));
    }

    #[cfg(unix)]
    #[test]
    fn uninstall_of_symlinked_directory_removes_only_the_link() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("dev/foo");
        std::fs::create_dir_all(target.join("theme")).unwrap();
        std::fs::write(target.join("package.json"), b"{}").unwrap();
        std::fs::write(target.join("theme/theme.xml"), b"<theme/>").unwrap();

        let user = tmp.path().join("user");
        std::fs::create_dir_all(&user).unwrap();
        let link = user.join("foo");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let store = Arc::new(RecordingConfigStore::new());
        let mut ext = Extension::new(&link, "foo", "Foo", true, false, context(&store, "default"));
        ext.uninstall().unwrap();

        assert!(!ext.is_installed());
        assert!(std::fs::symlink_metadata(&link).is_err());
        assert!(target.join("package.json").exists());
        assert!(target.join("theme/theme.xml").exists());
    }

    #[test]
    fn uninstall_removes_tree_and_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("foo");
        std::fs::create_dir_all(dir.join("theme/t1/deep")).unwrap();
        std::fs::create_dir_all(dir.join("palettes")).unwrap();
        std::fs::write(dir.join("package.json"), b"{}").unwrap();
        std::fs::write(dir.join("theme/t1/theme.xml"), b"<theme/>").unwrap();
        std::fs::write(dir.join("theme/t1/deep/sheet.png"), b"png").unwrap();

        let store = Arc::new(RecordingConfigStore::new());
        let mut ext = Extension::new(&dir, "foo", "Foo", true, false, context(&store, "default"));

        ext.uninstall().unwrap();
        assert!(!ext.is_installed());
        assert!(!ext.is_enabled());
        assert!(!dir.exists());
        assert!(tmp.path().exists());

        ext.uninstall().unwrap();
        assert!(!ext.can_be_uninstalled());
        assert!(!ext.can_be_disabled());
    }

    #[test]
    fn uninstall_of_builtin_is_silent_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("bundled");
        std::fs::create_dir_all(&dir).unwrap();

        let store = Arc::new(RecordingConfigStore::new());
        let mut ext = Extension::new(&dir, "bundled", "B", true, true, context(&store, "default"));

        ext.uninstall().unwrap();
        assert!(ext.is_installed());
        assert!(dir.exists());
    }

    #[test]
    fn uninstalled_extension_ignores_enable() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("foo");
        std::fs::create_dir_all(&dir).unwrap();

        let store = Arc::new(RecordingConfigStore::new());
        let mut ext = Extension::new(&dir, "foo", "Foo", true, false, context(&store, "default"));
        ext.uninstall().unwrap();

        ext.enable(true).unwrap();
        assert!(!ext.is_enabled());
        assert_eq!(store.writes(), 0);
    }
}
