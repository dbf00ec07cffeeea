//! Fake implementations of the configuration capabilities.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use easel_config::{ConfigError, ConfigResult, ConfigStore, CurrentTheme};

/// In-memory [`ConfigStore`] that counts writes and flushes.
#[derive(Debug, Default)]
pub struct RecordingConfigStore {
    values: Mutex<HashMap<(String, String), bool>>,
    writes: AtomicUsize,
    flushes: AtomicUsize,
    fail_flush: bool,
}

impl RecordingConfigStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every [`flush`](ConfigStore::flush) fail.
    #[must_use]
    pub fn failing_flush(mut self) -> Self {
        self.fail_flush = true;
        self
    }

    /// Seed a value without counting it as a write.
    pub fn preset(&self, section: &str, key: &str, value: bool) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((section.to_owned(), key.to_owned()), value);
    }

    /// Current value of `section.key`, if set.
    #[must_use]
    pub fn value(&self, section: &str, key: &str) -> Option<bool> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(section.to_owned(), key.to_owned()))
            .copied()
    }

    /// Number of [`set_bool`](ConfigStore::set_bool) calls.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of [`flush`](ConfigStore::flush) calls.
    #[must_use]
    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl ConfigStore for RecordingConfigStore {
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.value(section, key).unwrap_or(default)
    }

    fn set_bool(&self, section: &str, key: &str, value: bool) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.preset(section, key, value);
    }

    fn flush(&self) -> ConfigResult<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        if self.fail_flush {
            return Err(ConfigError::WriteError {
                path: "<memory>".to_owned(),
                message: "flush disabled".to_owned(),
            });
        }
        Ok(())
    }
}

/// [`CurrentTheme`] with a settable selection.
#[derive(Debug)]
pub struct FixedTheme {
    selected: Mutex<String>,
}

impl FixedTheme {
    /// Report `theme_id` as selected.
    #[must_use]
    pub fn new(theme_id: impl Into<String>) -> Self {
        Self {
            selected: Mutex::new(theme_id.into()),
        }
    }

    /// Change the selection.
    pub fn select(&self, theme_id: impl Into<String>) {
        *self.selected.lock().unwrap_or_else(PoisonError::into_inner) = theme_id.into();
    }
}

impl CurrentTheme for FixedTheme {
    fn selected_theme(&self) -> String {
        self.selected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
