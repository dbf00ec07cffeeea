//! In-memory zip archive builder.

use std::io::{Cursor, Write};
use std::path::Path;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

enum Entry {
    File {
        name: String,
        data: Vec<u8>,
        mode: u32,
    },
    Dir {
        name: String,
    },
    Symlink {
        name: String,
        target: String,
    },
}

/// Builds zip archives for tests.
///
/// Entry names are stored exactly as given, so `../` and absolute names can
/// be used to build malicious archives.
#[derive(Default)]
pub struct ArchiveBuilder {
    entries: Vec<Entry>,
}

impl ArchiveBuilder {
    /// Start an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a regular file with mode `0644`.
    #[must_use]
    pub fn file(self, name: &str, data: &[u8]) -> Self {
        self.file_with_mode(name, data, 0o644)
    }

    /// Add a regular file with explicit permission bits.
    #[must_use]
    pub fn file_with_mode(mut self, name: &str, data: &[u8], mode: u32) -> Self {
        self.entries.push(Entry::File {
            name: name.to_owned(),
            data: data.to_vec(),
            mode,
        });
        self
    }

    /// Add a directory entry. `name` should end with `/`.
    #[must_use]
    pub fn dir(mut self, name: &str) -> Self {
        self.entries.push(Entry::Dir {
            name: name.to_owned(),
        });
        self
    }

    /// Add a symbolic link entry pointing at `target`.
    #[must_use]
    pub fn symlink(mut self, name: &str, target: &str) -> Self {
        self.entries.push(Entry::Symlink {
            name: name.to_owned(),
            target: target.to_owned(),
        });
        self
    }

    /// Encode the archive.
    ///
    /// # Panics
    ///
    /// Panics if the zip writer fails.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in self.entries {
            match entry {
                Entry::File { name, data, mode } => {
                    let options = SimpleFileOptions::default().unix_permissions(mode);
                    writer.start_file(name, options).expect("start zip file entry");
                    writer.write_all(&data).expect("write zip file entry");
                },
                Entry::Dir { name } => {
                    writer
                        .add_directory(name, SimpleFileOptions::default())
                        .expect("add zip directory entry");
                },
                Entry::Symlink { name, target } => {
                    writer
                        .add_symlink(name, target, SimpleFileOptions::default())
                        .expect("add zip symlink entry");
                },
            }
        }
        writer.finish().expect("finish zip archive").into_inner()
    }

    /// Encode the archive and write it to `path`.
    ///
    /// # Panics
    ///
    /// Panics if encoding or writing fails.
    pub fn write_to(self, path: &Path) {
        std::fs::write(path, self.build()).expect("write zip archive");
    }
}
