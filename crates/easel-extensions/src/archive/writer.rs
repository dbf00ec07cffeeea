//! Disk materialisation of archive entries.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::trace;

use crate::archive::reader::{BlockSink, EntryHandle, EntryKind, ReadArchive};
use crate::error::{ExtensionError, ExtensionResult};

/// Writes archive entries below a fixed root directory.
#[derive(Debug, Clone)]
pub struct WriteArchive {
    root: PathBuf,
}

impl WriteArchive {
    /// Create a writer confined to `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory entries are confined to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Materialise `entry` at `target`, streaming its data from `reader`.
    ///
    /// Directories are created as needed. A file's bytes go to a temporary
    /// file next to `target` which is renamed over it once complete, so a
    /// failed entry never leaves a truncated file behind. Entries written
    /// before a failure stay on disk.
    ///
    /// # Errors
    ///
    /// - [`ExtensionError::PathTraversal`] if `target` is not below the root
    /// - [`ExtensionError::UnsafeEntryType`] for symlink entries
    /// - [`ExtensionError::DiskWrite`] if creating or writing fails
    /// - any error from [`ReadArchive::copy_data_to`]
    pub fn write_entry(
        &self,
        reader: &mut ReadArchive,
        entry: &EntryHandle,
        target: &Path,
    ) -> ExtensionResult<()> {
        if !self.contains(target) {
            return Err(ExtensionError::PathTraversal {
                path: entry.path().to_owned(),
            });
        }

        match entry.kind() {
            EntryKind::Symlink => Err(ExtensionError::UnsafeEntryType {
                entry_type: entry.kind().as_str().to_owned(),
                path: entry.path().to_owned(),
            }),
            EntryKind::Directory => {
                std::fs::create_dir_all(target)
                    .map_err(|e| ExtensionError::disk_write(target, &e))?;
                self.ensure_resolved_inside(target, entry)?;
                trace!(path = %target.display(), "Created directory");
                Ok(())
            },
            EntryKind::File => self.write_file(reader, entry, target),
        }
    }

    fn write_file(
        &self,
        reader: &mut ReadArchive,
        entry: &EntryHandle,
        target: &Path,
    ) -> ExtensionResult<()> {
        let parent = target.parent().ok_or_else(|| ExtensionError::PathTraversal {
            path: entry.path().to_owned(),
        })?;
        std::fs::create_dir_all(parent).map_err(|e| ExtensionError::disk_write(parent, &e))?;
        self.ensure_resolved_inside(parent, entry)?;

        let file =
            NamedTempFile::new_in(parent).map_err(|e| ExtensionError::disk_write(target, &e))?;
        let mut pending = PendingFile { file, target };
        let bytes = reader.copy_data_to(entry, &mut pending)?;
        pending.commit(entry.unix_mode())?;

        trace!(path = %target.display(), bytes, "Wrote file");
        Ok(())
    }

    /// Lexical containment: `target` is the root or below it through normal
    /// components only.
    fn contains(&self, target: &Path) -> bool {
        target.strip_prefix(&self.root).is_ok_and(|rel| {
            rel.components()
                .all(|component| matches!(component, Component::Normal(_)))
        })
    }

    /// Catch escapes through symlinked directories that already exist on disk.
    fn ensure_resolved_inside(&self, dir: &Path, entry: &EntryHandle) -> ExtensionResult<()> {
        let root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        let resolved = dir
            .canonicalize()
            .map_err(|e| ExtensionError::disk_write(dir, &e))?;
        if resolved.starts_with(&root) {
            Ok(())
        } else {
            Err(ExtensionError::PathTraversal {
                path: entry.path().to_owned(),
            })
        }
    }
}

/// A file being extracted, not yet visible at its final path.
struct PendingFile<'a> {
    file: NamedTempFile,
    target: &'a Path,
}

impl PendingFile<'_> {
    fn commit(self, unix_mode: Option<u32>) -> ExtensionResult<()> {
        let target = self.target;
        self.file
            .as_file()
            .sync_all()
            .map_err(|e| ExtensionError::disk_write(target, &e))?;
        apply_mode(self.file.as_file(), unix_mode)
            .map_err(|e| ExtensionError::disk_write(target, &e))?;
        self.file
            .persist(target)
            .map_err(|e| ExtensionError::disk_write(target, &e.error))?;
        Ok(())
    }
}

impl BlockSink for PendingFile<'_> {
    fn write_block(&mut self, block: &[u8]) -> ExtensionResult<()> {
        self.file
            .write_all(block)
            .map_err(|e| ExtensionError::disk_write(self.target, &e))
    }
}

#[cfg(unix)]
fn apply_mode(file: &std::fs::File, unix_mode: Option<u32>) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match unix_mode.map(|mode| mode & 0o777) {
        Some(bits) if bits != 0 => file.set_permissions(std::fs::Permissions::from_mode(bits)),
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn apply_mode(_file: &std::fs::File, _unix_mode: Option<u32>) -> std::io::Result<()> {
    Ok(())
}

/// Validate that an archive-relative path has no traversal components and is
/// not absolute.
///
/// # Errors
///
/// Returns [`ExtensionError::PathTraversal`] naming the offending path.
pub fn validate_entry_path(path: &Path) -> ExtensionResult<()> {
    let traversal = || ExtensionError::PathTraversal {
        path: path.display().to_string(),
    };

    if path.is_absolute() {
        return Err(traversal());
    }

    for component in path.components() {
        if matches!(
            component,
            Component::ParentDir | Component::Prefix(_) | Component::RootDir
        ) {
            return Err(traversal());
        }
    }

    Ok(())
}
