//! Sequential archive reader.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::{ExtensionError, ExtensionResult};

/// Maximum number of entries allowed in an archive.
pub const MAX_ENTRY_COUNT: usize = 10_000;

/// Maximum number of bytes streamed out of one archive (500 MB).
pub const MAX_EXTRACTED_SIZE: u64 = 500_000_000;

const BLOCK_SIZE: usize = 65_536;

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// Declared type of an archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory marker.
    Directory,
    /// Symbolic link (never extracted).
    Symlink,
}

impl EntryKind {
    /// Lowercase name for diagnostics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
        }
    }
}

/// One entry of a [`ReadArchive`].
///
/// The handle only describes the entry; its data is streamed through the
/// reader that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHandle {
    index: usize,
    path: String,
    kind: EntryKind,
    unix_mode: Option<u32>,
    size: u64,
}

impl EntryHandle {
    /// Path as stored in the archive. Untrusted.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Declared entry type.
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Unix mode bits stored in the archive, if any.
    #[must_use]
    pub fn unix_mode(&self) -> Option<u32> {
        self.unix_mode
    }

    /// Declared uncompressed size.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Base file name of the entry (empty for directory markers).
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str())
    }
}

/// Destination for streamed entry data.
pub trait BlockSink {
    /// Accept the next block of uncompressed bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the block cannot be stored.
    fn write_block(&mut self, block: &[u8]) -> ExtensionResult<()>;
}

impl BlockSink for Vec<u8> {
    fn write_block(&mut self, block: &[u8]) -> ExtensionResult<()> {
        self.extend_from_slice(block);
        Ok(())
    }
}

/// Forward-only reader over a zip archive on disk.
///
/// A reader is not rewindable: a second pass needs a fresh [`ReadArchive::open`].
pub struct ReadArchive {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
    next: usize,
    extracted: u64,
    max_extracted: u64,
}

impl ReadArchive {
    /// Open `path` as a zip archive.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::ArchiveOpen`] if the file cannot be opened or
    /// is not a zip container, and [`ExtensionError::ArchiveFormat`] if it
    /// holds more than [`MAX_ENTRY_COUNT`] entries.
    pub fn open(path: impl AsRef<Path>) -> ExtensionResult<Self> {
        let path = path.as_ref().to_path_buf();

        let file = File::open(&path).map_err(|e| ExtensionError::ArchiveOpen {
            path: path.clone(),
            message: e.to_string(),
            code: e.raw_os_error(),
        })?;
        let archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| ExtensionError::ArchiveOpen {
                path: path.clone(),
                message: e.to_string(),
                code: None,
            })?;

        if archive.len() > MAX_ENTRY_COUNT {
            return Err(ExtensionError::ArchiveFormat {
                message: format!("archive exceeds maximum entry count ({MAX_ENTRY_COUNT})"),
            });
        }

        Ok(Self {
            path,
            archive,
            next: 0,
            extracted: 0,
            max_extracted: MAX_EXTRACTED_SIZE,
        })
    }

    /// Override the extracted-size limit.
    #[cfg(test)]
    pub(crate) fn with_size_limit(mut self, limit: u64) -> Self {
        self.max_extracted = limit;
        self
    }

    /// Path of the archive file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Advance to the next entry, or `None` once all entries were visited.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::ArchiveFormat`] if the entry header cannot
    /// be read.
    pub fn next_entry(&mut self) -> ExtensionResult<Option<EntryHandle>> {
        if self.next >= self.archive.len() {
            return Ok(None);
        }
        let index = self.next;
        self.next = self.next.saturating_add(1);

        let file = self
            .archive
            .by_index(index)
            .map_err(|e| ExtensionError::ArchiveFormat {
                message: format!("entry #{index}: {e}"),
            })?;

        let unix_mode = file.unix_mode();
        let kind = if unix_mode.is_some_and(|mode| mode & S_IFMT == S_IFLNK) {
            EntryKind::Symlink
        } else if file.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };

        Ok(Some(EntryHandle {
            index,
            path: file.name().to_owned(),
            kind,
            unix_mode,
            size: file.size(),
        }))
    }

    /// Stream the uncompressed data of `entry` into `sink`, returning the
    /// number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::ArchiveData`] if a block cannot be read or
    /// the archive exceeds [`MAX_EXTRACTED_SIZE`], or whatever error the sink
    /// reports.
    pub fn copy_data_to(
        &mut self,
        entry: &EntryHandle,
        sink: &mut dyn BlockSink,
    ) -> ExtensionResult<u64> {
        let mut file =
            self.archive
                .by_index(entry.index)
                .map_err(|e| ExtensionError::ArchiveData {
                    message: format!("{}: {e}", entry.path),
                })?;

        let mut buf = vec![0u8; BLOCK_SIZE];
        let mut copied: u64 = 0;
        loop {
            let n = match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(ExtensionError::ArchiveData {
                        message: format!("{}: {e}", entry.path),
                    });
                },
            };

            let block = u64::try_from(n).unwrap_or(u64::MAX);
            copied = copied.saturating_add(block);
            self.extracted = self.extracted.saturating_add(block);
            if self.extracted > self.max_extracted {
                return Err(ExtensionError::ArchiveData {
                    message: format!(
                        "archive exceeds maximum extracted size ({} bytes)",
                        self.max_extracted
                    ),
                });
            }

            sink.write_block(&buf[..n])?;
        }

        Ok(copied)
    }

    /// Read the whole of `entry` into memory.
    ///
    /// # Errors
    ///
    /// Same as [`ReadArchive::copy_data_to`].
    pub fn read_to_vec(&mut self, entry: &EntryHandle) -> ExtensionResult<Vec<u8>> {
        let mut out = Vec::new();
        self.copy_data_to(entry, &mut out)?;
        Ok(out)
    }
}

impl std::fmt::Debug for ReadArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadArchive")
            .field("path", &self.path)
            .field("entries", &self.archive.len())
            .field("next", &self.next)
            .finish_non_exhaustive()
    }
}
