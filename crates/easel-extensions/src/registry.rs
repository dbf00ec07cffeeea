//! Extension registry.
//!
//! Owns every [`Extension`] found at startup or installed since, and
//! publishes [`ExtensionEvent`]s when they change. The collection is
//! append-only: uninstalled extensions stay in it, marked as such, so an
//! [`ExtensionId`] stays valid for the registry's lifetime.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

use easel_config::EXTENSIONS_SECTION;
use tracing::{debug, info, warn};

use crate::archive::{ReadArchive, WriteArchive, validate_entry_path};
use crate::context::ExtensionContext;
use crate::error::{ExtensionError, ExtensionResult};
use crate::events::{EventBus, ExtensionEvent, publish_contribution_changes};
use crate::extension::{Extension, ExtensionItems};
use crate::locator::{ResourceLocator, same_dir};
use crate::manifest::{ExtensionManifest, MANIFEST_FILE_NAME, validate_directory_name};

/// Position of an extension in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtensionId(usize);

impl ExtensionId {
    /// Zero-based registration index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registry of builtin and user-installed extensions.
#[derive(Debug)]
pub struct ExtensionRegistry {
    user_extensions_path: PathBuf,
    extensions: Vec<Extension>,
    context: ExtensionContext,
    events: EventBus,
}

impl ExtensionRegistry {
    /// Resolve the user extensions directory and load every extension below
    /// the locator's roots.
    ///
    /// A subdirectory whose manifest fails to load is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::Io`] if the user extensions directory cannot
    /// be created.
    pub fn new(locator: &dyn ResourceLocator, context: ExtensionContext) -> ExtensionResult<Self> {
        Self::with_events(locator, context, EventBus::new())
    }

    /// Like [`new`](Self::new), publishing on an existing bus.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_events(
        locator: &dyn ResourceLocator,
        context: ExtensionContext,
        events: EventBus,
    ) -> ExtensionResult<Self> {
        let user_extensions_path = locator.user_extensions_dir()?;
        info!(path = %user_extensions_path.display(), "User extensions path");

        let mut registry = Self {
            user_extensions_path,
            extensions: Vec::new(),
            context,
            events,
        };
        for root in locator.extension_roots() {
            registry.scan_root(&root);
        }

        info!(count = registry.len(), "Extension registry ready");
        Ok(registry)
    }

    fn scan_root(&mut self, root: &Path) {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(root = %root.display(), error = %e, "Skipping extensions root");
                return;
            },
        };

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        let is_builtin = !same_dir(root, &self.user_extensions_path);
        for dir in dirs {
            let manifest_path = dir.join(MANIFEST_FILE_NAME);
            if !manifest_path.is_file() {
                debug!(path = %manifest_path.display(), "Manifest not found");
                continue;
            }
            if let Err(e) = self.load(&dir, &manifest_path, is_builtin) {
                warn!(
                    path = %manifest_path.display(),
                    error = %e,
                    "Failed to load extension manifest"
                );
            }
        }
    }

    /// Load the extension at `path` from `manifest_path` and register it.
    ///
    /// The enabled flag comes from the configuration store (default `true`);
    /// contribution paths are resolved against `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::Manifest`] if the manifest cannot be read or
    /// parsed. Nothing is registered in that case.
    pub fn load(
        &mut self,
        path: &Path,
        manifest_path: &Path,
        is_builtin: bool,
    ) -> ExtensionResult<ExtensionId> {
        let manifest = ExtensionManifest::load(manifest_path)?;
        let is_enabled = self
            .context
            .config()
            .get_bool(EXTENSIONS_SECTION, &manifest.name, true);

        let mut extension = Extension::new(
            path,
            manifest.name,
            manifest.display_name,
            is_enabled,
            is_builtin,
            self.context.clone(),
        );
        for theme in manifest.themes {
            let theme_path = path.join(&theme.path);
            debug!(
                name = %extension.name(),
                id = %theme.id,
                path = %theme_path.display(),
                "Theme contributed"
            );
            extension.add_theme(theme.id, theme_path);
        }
        for palette in manifest.palettes {
            let palette_path = path.join(&palette.path);
            debug!(
                name = %extension.name(),
                id = %palette.id,
                path = %palette_path.display(),
                "Palette contributed"
            );
            extension.add_palette(palette.id, palette_path);
        }

        info!(
            name = %extension.name(),
            path = %path.display(),
            builtin = is_builtin,
            enabled = is_enabled,
            "Extension loaded"
        );

        let id = ExtensionId(self.extensions.len());
        self.extensions.push(extension);
        Ok(id)
    }

    /// Install a zip archive into the user extensions directory and load it.
    ///
    /// The archive is read twice. The first pass finds the first
    /// `package.json` entry: its directory inside the archive becomes the
    /// package prefix and its `name` the destination directory. Without one,
    /// the destination is named after the archive file and nothing is
    /// stripped. The second pass extracts every entry below the prefix,
    /// with the prefix removed, and skips everything else.
    ///
    /// Publishes [`ExtensionEvent::NewExtension`] followed by the contribution
    /// events. Files already written stay on disk when a later step fails.
    ///
    /// # Errors
    ///
    /// - archive, disk and manifest errors from either pass
    /// - [`ExtensionError::PathTraversal`] / [`ExtensionError::UnsafeEntryType`]
    ///   for malicious entries
    /// - [`ExtensionError::InvalidName`] if the destination name is not a
    ///   plain directory name
    /// - [`ExtensionError::Install`] if no manifest ended up in the
    ///   destination directory
    pub fn install_compressed_extension(
        &mut self,
        archive_path: &Path,
    ) -> ExtensionResult<ExtensionId> {
        let (common_path, destination) = self.locate_package(archive_path)?;
        info!(
            archive = %archive_path.display(),
            destination = %destination.display(),
            "Installing extension"
        );

        let previous = self.installed_at(&destination);
        extract_package(archive_path, &common_path, &destination)?;

        let manifest_path = destination.join(MANIFEST_FILE_NAME);
        if !manifest_path.is_file() {
            return Err(ExtensionError::Install(format!(
                "error adding the new extension: no {MANIFEST_FILE_NAME} in {}",
                destination.display()
            )));
        }

        let id = self.load(&destination, &manifest_path, false)?;
        if let Some(previous) = previous {
            warn!(
                previous = %previous,
                current = %id,
                path = %destination.display(),
                "Extension installed over an existing installation"
            );
        }
        let extension = self
            .extensions
            .get(id.0)
            .ok_or_else(|| ExtensionError::Install("error adding the new extension".into()))?;

        info!(name = %extension.name(), path = %extension.path().display(), "Installed extension");
        self.events.publish(&ExtensionEvent::NewExtension(extension));
        publish_contribution_changes(&self.events, extension);
        Ok(id)
    }

    /// First pass: find the package prefix and destination directory.
    fn locate_package(&self, archive_path: &Path) -> ExtensionResult<(String, PathBuf)> {
        let mut reader = ReadArchive::open(archive_path)?;
        while let Some(entry) = reader.next_entry()? {
            if entry.file_name() != MANIFEST_FILE_NAME {
                continue;
            }

            let common_path = common_path_of(entry.path());
            let bytes = reader.read_to_vec(&entry)?;
            let manifest = ExtensionManifest::from_slice(&bytes, archive_path)?;
            validate_directory_name(&manifest.name)?;

            debug!(
                entry = entry.path(),
                common_path = %common_path,
                name = %manifest.name,
                "Found manifest in archive"
            );
            return Ok((common_path, self.user_extensions_path.join(&manifest.name)));
        }

        let title = archive_path
            .file_stem()
            .and_then(OsStr::to_str)
            .ok_or_else(|| ExtensionError::InvalidName(archive_path.display().to_string()))?;
        validate_directory_name(title)?;
        debug!(title, "No manifest in archive, using archive name");
        Ok((String::new(), self.user_extensions_path.join(title)))
    }

    /// Enable or disable an extension and publish its contribution events.
    ///
    /// Events are published even when the state did not change.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::NotFound`] for an unknown id, or the error
    /// from [`Extension::enable`].
    pub fn enable_extension(&mut self, id: ExtensionId, state: bool) -> ExtensionResult<()> {
        let extension = self
            .extensions
            .get_mut(id.0)
            .ok_or(ExtensionError::NotFound(id))?;
        extension.enable(state)?;
        publish_contribution_changes(&self.events, extension);
        Ok(())
    }

    /// Uninstall an extension and publish its contribution events.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::NotFound`] for an unknown id, or the error
    /// from [`Extension::uninstall`].
    pub fn uninstall_extension(&mut self, id: ExtensionId) -> ExtensionResult<()> {
        let extension = self
            .extensions
            .get_mut(id.0)
            .ok_or(ExtensionError::NotFound(id))?;
        extension.uninstall()?;
        publish_contribution_changes(&self.events, extension);
        Ok(())
    }

    /// Path of theme `id` from the first enabled extension providing it.
    #[must_use]
    pub fn theme_path(&self, id: &str) -> Option<&Path> {
        self.enabled()
            .find_map(|extension| extension.themes().get(id))
            .map(PathBuf::as_path)
    }

    /// Path of palette `id` from the first enabled extension providing it.
    #[must_use]
    pub fn palette_path(&self, id: &str) -> Option<&Path> {
        self.enabled()
            .find_map(|extension| extension.palettes().get(id))
            .map(PathBuf::as_path)
    }

    /// All palettes of enabled extensions. On a repeated id the extension
    /// registered last wins.
    #[must_use]
    pub fn palettes(&self) -> ExtensionItems {
        let mut palettes = ExtensionItems::new();
        for extension in self.enabled() {
            for (id, path) in extension.palettes() {
                palettes.insert(id.clone(), path.clone());
            }
        }
        palettes
    }

    /// Look up an extension.
    #[must_use]
    pub fn get(&self, id: ExtensionId) -> Option<&Extension> {
        self.extensions.get(id.0)
    }

    /// All extensions in registration order, uninstalled ones included.
    pub fn iter(&self) -> impl Iterator<Item = (ExtensionId, &Extension)> {
        self.extensions
            .iter()
            .enumerate()
            .map(|(index, extension)| (ExtensionId(index), extension))
    }

    /// First installed extension named `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<ExtensionId> {
        self.iter()
            .find(|(_, extension)| extension.is_installed() && extension.name() == name)
            .map(|(id, _)| id)
    }

    /// First installed extension living in `path`.
    #[must_use]
    pub fn installed_at(&self, path: &Path) -> Option<ExtensionId> {
        self.iter()
            .find(|(_, extension)| extension.is_installed() && extension.path() == path)
            .map(|(id, _)| id)
    }

    /// Number of registered extensions, uninstalled ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Whether no extension was ever registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Directory user extensions are installed into.
    #[must_use]
    pub fn user_extensions_path(&self) -> &Path {
        &self.user_extensions_path
    }

    /// Bus the registry publishes on.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn enabled(&self) -> impl Iterator<Item = &Extension> {
        self.extensions.iter().filter(|extension| extension.is_enabled())
    }
}

/// Second pass: extract the entries below `common_path` into `destination`.
fn extract_package(
    archive_path: &Path,
    common_path: &str,
    destination: &Path,
) -> ExtensionResult<()> {
    std::fs::create_dir_all(destination)
        .map_err(|e| ExtensionError::disk_write(destination, &e))?;

    let mut reader = ReadArchive::open(archive_path)?;
    let writer = WriteArchive::new(destination);
    while let Some(entry) = reader.next_entry()? {
        let Some(relative) = entry.path().strip_prefix(common_path) else {
            debug!(entry = entry.path(), "Skipping entry outside the package directory");
            continue;
        };
        if relative.is_empty() {
            continue;
        }

        let relative = Path::new(relative);
        validate_entry_path(relative)?;
        let target = destination.join(relative);

        debug!(entry = entry.path(), target = %target.display(), "Extracting entry");
        writer.write_entry(&mut reader, &entry, &target)?;
    }

    Ok(())
}

/// Directory part of an archive entry path, with its trailing separator.
/// Empty for top-level entries.
fn common_path_of(entry_path: &str) -> String {
    match entry_path.rfind(['/', '\\']) {
        None | Some(0) => String::new(),
        Some(separator) => entry_path[..=separator].to_owned(),
    }
}
