//! Capability traits consumed by the extension layer.
//!
//! The extension registry never talks to a concrete preferences file. It
//! receives these two narrow interfaces instead, which keeps it testable with
//! in-memory fakes.

use crate::error::ConfigResult;

/// Section under which extension enable flags are stored.
pub const EXTENSIONS_SECTION: &str = "extensions";

/// A persistent store of named boolean flags, grouped in sections.
///
/// Writes may be buffered; [`flush`](Self::flush) makes them durable.
pub trait ConfigStore: Send + Sync {
    /// Read a flag, returning `default` when it has never been set.
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Set a flag. The value is visible to subsequent reads immediately.
    fn set_bool(&self, section: &str, key: &str, value: bool);

    /// Persist all pending writes.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`](crate::ConfigError) if the backing storage
    /// cannot be written.
    fn flush(&self) -> ConfigResult<()>;
}

/// Read access to the theme the host application currently displays.
pub trait CurrentTheme: Send + Sync {
    /// Identifier of the selected theme (e.g. `"dark"`).
    fn selected_theme(&self) -> String;
}
