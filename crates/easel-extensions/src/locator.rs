//! Where extensions are looked for.

use std::io;
use std::path::{Path, PathBuf};

use easel_config::{Config, EaselHome};

/// Directory names below an installation's data directory.
const INSTALL_EXTENSIONS_DIR: [&str; 2] = ["data", "extensions"];

/// Resolves the directories the registry scans.
pub trait ResourceLocator {
    /// The user-writable extensions directory, created if missing.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    fn user_extensions_dir(&self) -> io::Result<PathBuf>;

    /// Every directory whose subdirectories may be extensions, in scan order.
    /// Missing directories are allowed.
    fn extension_roots(&self) -> Vec<PathBuf>;
}

/// Locator scanning builtin roots first and the user directory last.
///
/// For a normal installation the builtin roots are the directory beside the
/// executable and the configured search paths. Duplicates are scanned once.
#[derive(Debug, Clone)]
pub struct StandardLocator {
    user_dir: PathBuf,
    builtin_roots: Vec<PathBuf>,
}

impl StandardLocator {
    /// Build the locator from the home layout and loaded configuration.
    #[must_use]
    pub fn new(home: &EaselHome, config: &Config) -> Self {
        let mut builtin_roots = Vec::new();
        if config.extensions.include_install_dir
            && let Some(dir) = install_extensions_dir()
        {
            builtin_roots.push(dir);
        }
        builtin_roots.extend(config.extensions.search_paths.iter().cloned());

        Self {
            user_dir: home.user_extensions_dir(),
            builtin_roots,
        }
    }

    /// Scan only `user_dir`, plus roots added with
    /// [`with_builtin_root`](Self::with_builtin_root).
    #[must_use]
    pub fn from_user_dir(user_dir: impl Into<PathBuf>) -> Self {
        Self {
            user_dir: user_dir.into(),
            builtin_roots: Vec::new(),
        }
    }

    /// Also scan `root`, before the user directory.
    #[must_use]
    pub fn with_builtin_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.builtin_roots.push(root.into());
        self
    }
}

impl ResourceLocator for StandardLocator {
    fn user_extensions_dir(&self) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.user_dir)?;
        Ok(self.user_dir.clone())
    }

    fn extension_roots(&self) -> Vec<PathBuf> {
        let mut unique: Vec<PathBuf> = Vec::new();
        for root in self
            .builtin_roots
            .iter()
            .chain(std::iter::once(&self.user_dir))
        {
            if !unique.iter().any(|seen| same_dir(seen, root)) {
                unique.push(root.clone());
            }
        }
        unique
    }
}

/// `<executable dir>/data/extensions`, if the executable path is known.
fn install_extensions_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let mut dir = exe.parent()?.to_path_buf();
    dir.extend(INSTALL_EXTENSIONS_DIR);
    Some(dir)
}

/// Compare directories by canonical path when both exist.
pub(crate) fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
