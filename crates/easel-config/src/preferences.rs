//! User preferences persisted as a sectioned TOML file.
//!
//! The file (`~/.easel/preferences.toml`) holds the state the application
//! changes at runtime, as opposed to [`Config`](crate::Config) which the user
//! edits by hand:
//!
//! ```toml
//! [extensions]
//! pixel-palettes = false
//!
//! [theme]
//! selected = "dark"
//! ```
//!
//! Reads are served from memory. Writes mark the document dirty and only
//! reach the disk on [`ConfigStore::flush`].

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use fs2::FileExt;
use toml::{Table, Value};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::store::{ConfigStore, CurrentTheme};

/// Section holding theme selection.
const THEME_SECTION: &str = "theme";

/// Key of the selected theme inside [`THEME_SECTION`].
const THEME_SELECTED_KEY: &str = "selected";

/// Theme reported when the user never picked one.
pub const DEFAULT_THEME_ID: &str = "default";

/// Preferences file store.
#[derive(Debug)]
pub struct Preferences {
    path: PathBuf,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    document: Table,
    dirty: bool,
}

impl Preferences {
    /// Load preferences from `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file exists but cannot be read or is
    /// not a TOML table.
    pub fn load(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let _lock_guard = acquire_lock(&path, LockMode::Shared)?;

        let document = match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str::<Table>(&content).map_err(|e| {
                ConfigError::ParseError {
                    path: path.display().to_string(),
                    source: e,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Table::new(),
            Err(e) => {
                return Err(ConfigError::ReadError {
                    path: path.display().to_string(),
                    source: e,
                });
            },
        };

        debug!(path = %path.display(), sections = document.len(), "Loaded preferences");

        Ok(Self {
            path,
            state: Mutex::new(State {
                document,
                dirty: false,
            }),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a string value.
    #[must_use]
    pub fn get_string(&self, section: &str, key: &str) -> Option<String> {
        lookup(&self.lock().document, section, key)
            .and_then(Value::as_str)
            .map(str::to_owned)
    }

    /// Set a string value.
    pub fn set_string(&self, section: &str, key: &str, value: &str) {
        self.insert(section, key, Value::String(value.to_owned()));
    }

    /// Change the selected theme. Call [`ConfigStore::flush`] to persist it.
    pub fn select_theme(&self, theme_id: &str) {
        self.set_string(THEME_SECTION, THEME_SELECTED_KEY, theme_id);
    }

    /// Whether there are writes that have not been flushed yet.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    fn insert(&self, section: &str, key: &str, value: Value) {
        let mut state = self.lock();
        let slot = state
            .document
            .entry(section.to_owned())
            .or_insert_with(|| Value::Table(Table::new()));
        if !slot.is_table() {
            *slot = Value::Table(Table::new());
        }
        if let Value::Table(table) = slot {
            table.insert(key.to_owned(), value);
        }
        state.dirty = true;
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&self, document: &Table) -> ConfigResult<()> {
        let write_err = |message: String| ConfigError::WriteError {
            path: self.path.display().to_string(),
            message,
        };

        let parent = self.path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent)
            .map_err(|e| write_err(format!("failed to create parent directory: {e}")))?;

        let _lock_guard = acquire_lock(&self.path, LockMode::Exclusive)?;

        let body = toml::to_string_pretty(document)
            .map_err(|e| write_err(format!("failed to serialize preferences: {e}")))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| write_err(format!("failed to create temp file: {e}")))?;
        tmp.write_all(body.as_bytes())
            .map_err(|e| write_err(format!("failed to write temp file: {e}")))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| write_err(format!("failed to sync temp file: {e}")))?;
        tmp.persist(&self.path)
            .map_err(|e| write_err(format!("failed to replace preferences file: {e}")))?;

        debug!(path = %self.path.display(), "Saved preferences");
        Ok(())
    }
}

impl ConfigStore for Preferences {
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        lookup(&self.lock().document, section, key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    fn set_bool(&self, section: &str, key: &str, value: bool) {
        self.insert(section, key, Value::Boolean(value));
    }

    fn flush(&self) -> ConfigResult<()> {
        let mut state = self.lock();
        if !state.dirty {
            return Ok(());
        }
        self.save(&state.document)?;
        state.dirty = false;
        Ok(())
    }
}

impl CurrentTheme for Preferences {
    fn selected_theme(&self) -> String {
        self.get_string(THEME_SECTION, THEME_SELECTED_KEY)
            .unwrap_or_else(|| DEFAULT_THEME_ID.to_owned())
    }
}

fn lookup<'a>(document: &'a Table, section: &str, key: &str) -> Option<&'a Value> {
    document
        .get(section)
        .and_then(Value::as_table)
        .and_then(|table| table.get(key))
}

#[derive(Debug, Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

/// Take an advisory lock on the `.lk` sibling of `path`.
///
/// In shared mode a missing lock file means no writer ever ran, so no lock is
/// taken and no file is created.
fn acquire_lock(path: &Path, mode: LockMode) -> ConfigResult<Option<std::fs::File>> {
    let lock_path = path.with_extension("lk");
    let lock_err = |message: String| ConfigError::WriteError {
        path: path.display().to_string(),
        message,
    };

    match mode {
        LockMode::Shared => match std::fs::OpenOptions::new().read(true).open(&lock_path) {
            Ok(file) => {
                file.lock_shared()
                    .map_err(|e| lock_err(format!("failed to acquire shared lock: {e}")))?;
                Ok(Some(file))
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(lock_err(format!("failed to open lock file: {e}"))),
        },
        LockMode::Exclusive => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .read(true)
                .open(&lock_path)
                .map_err(|e| lock_err(format!("failed to open lock file: {e}")))?;
            file.lock_exclusive()
                .map_err(|e| lock_err(format!("failed to acquire exclusive lock: {e}")))?;
            Ok(Some(file))
        },
    }
}
