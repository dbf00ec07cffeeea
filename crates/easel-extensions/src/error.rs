//! Extension error types.

use std::path::PathBuf;

use easel_config::ConfigError;

use crate::registry::ExtensionId;

/// Errors from extension operations.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    /// The archive file could not be opened or is not a recognised container.
    #[error("error opening archive {}: {message}", path.display())]
    ArchiveOpen {
        /// Path of the archive.
        path: PathBuf,
        /// Diagnostic from the underlying subsystem.
        message: String,
        /// OS error number, when there is one.
        code: Option<i32>,
    },

    /// Advancing to the next archive entry failed.
    #[error("error uncompressing extension: {message}")]
    ArchiveFormat {
        /// Diagnostic from the underlying subsystem.
        message: String,
    },

    /// Reading an entry's data failed.
    #[error("error reading archive data: {message}")]
    ArchiveData {
        /// Diagnostic from the underlying subsystem.
        message: String,
    },

    /// Creating or writing an extracted file failed.
    #[error("error writing {}: {message}", path.display())]
    DiskWrite {
        /// Target path on disk.
        path: PathBuf,
        /// Diagnostic from the underlying subsystem.
        message: String,
        /// OS error number, when there is one.
        code: Option<i32>,
    },

    /// A manifest is missing, unreadable, or has a malformed field.
    #[error("manifest error in {}: {message}", path.display())]
    Manifest {
        /// Manifest file (or archive) the error came from.
        path: PathBuf,
        /// What is wrong with it.
        message: String,
    },

    /// The extracted extension could not be registered.
    #[error("install failed: {0}")]
    Install(String),

    /// An archive entry would land outside the destination directory.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending entry path.
        path: String,
    },

    /// Unsafe entry type in archive (e.g. symlink).
    #[error("unsafe archive entry type '{entry_type}' at {path}")]
    UnsafeEntryType {
        /// The entry type that was rejected.
        entry_type: String,
        /// The path of the entry.
        path: String,
    },

    /// The extension name cannot be used as a directory name.
    #[error("invalid extension name: {0:?}")]
    InvalidName(String),

    /// No extension is registered under this id.
    #[error("extension not found: {0}")]
    NotFound(ExtensionId),

    /// Removing an extension's files failed.
    #[error("failed to uninstall {}: {source}", path.display())]
    Uninstall {
        /// File or directory that could not be removed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Persisting the enabled flag failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtensionError {
    pub(crate) fn disk_write(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::DiskWrite {
            path: path.into(),
            message: err.to_string(),
            code: err.raw_os_error(),
        }
    }
}

/// Result type for extension operations.
pub type ExtensionResult<T> = Result<T, ExtensionError>;
