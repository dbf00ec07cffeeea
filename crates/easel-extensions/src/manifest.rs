//! Extension manifest (`package.json`) parsing.
//!
//! Only the fields the registry needs are extracted:
//!
//! ```json
//! {
//!   "name": "pixel-palettes",
//!   "displayName": "Pixel Palettes",
//!   "contributes": {
//!     "themes":   [{ "id": "dark-pixel", "path": "themes/dark" }],
//!     "palettes": [{ "id": "db32", "path": "palettes/db32.gpl" }]
//!   }
//! }
//! ```
//!
//! A `contributes` value that is not an object, or a `themes`/`palettes`
//! value that is not an array, is ignored. Inside an array every element must
//! be an object with string `id` and `path` fields.

use std::path::{Component, Path};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ExtensionError, ExtensionResult};

/// Manifest file name inside an extension directory.
pub const MANIFEST_FILE_NAME: &str = "package.json";

/// One `{id, path}` element of a contribution list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Contribution {
    /// Contribution id, unique within its category.
    pub id: String,
    /// Path relative to the extension directory.
    pub path: String,
}

/// The parts of a manifest the registry uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionManifest {
    /// Stable extension name.
    pub name: String,
    /// Human-readable label.
    pub display_name: String,
    /// `contributes.themes`.
    pub themes: Vec<Contribution>,
    /// `contributes.palettes`.
    pub palettes: Vec<Contribution>,
}

impl ExtensionManifest {
    /// Read and parse the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::Manifest`] if the file cannot be read or is
    /// not a valid manifest.
    pub fn load(path: &Path) -> ExtensionResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| manifest_error(path, e.to_string()))?;
        Self::from_slice(&bytes, path)
    }

    /// Parse manifest bytes. `origin` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::Manifest`] on invalid JSON, a missing or
    /// non-string `name`/`displayName`, or a malformed contribution element.
    pub fn from_slice(bytes: &[u8], origin: &Path) -> ExtensionResult<Self> {
        let root: Value =
            serde_json::from_slice(bytes).map_err(|e| manifest_error(origin, e.to_string()))?;

        let name = required_string(&root, "name", origin)?;
        let display_name = required_string(&root, "displayName", origin)?;

        let (themes, palettes) = match root.get("contributes") {
            Some(contributes @ Value::Object(_)) => (
                contribution_list(contributes, "themes", origin)?,
                contribution_list(contributes, "palettes", origin)?,
            ),
            _ => (Vec::new(), Vec::new()),
        };

        Ok(Self {
            name,
            display_name,
            themes,
            palettes,
        })
    }
}

fn required_string(root: &Value, field: &str, origin: &Path) -> ExtensionResult<String> {
    root.get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| manifest_error(origin, format!("missing or non-string field '{field}'")))
}

fn contribution_list(
    contributes: &Value,
    category: &str,
    origin: &Path,
) -> ExtensionResult<Vec<Contribution>> {
    let Some(Value::Array(items)) = contributes.get(category) else {
        return Ok(Vec::new());
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            Contribution::deserialize(item).map_err(|e| {
                manifest_error(origin, format!("malformed {category}[{index}]: {e}"))
            })
        })
        .collect()
}

fn manifest_error(path: &Path, message: String) -> ExtensionError {
    ExtensionError::Manifest {
        path: path.to_path_buf(),
        message,
    }
}

/// Check that `name` can be used as a single directory name below the user
/// extensions directory.
///
/// # Errors
///
/// Returns [`ExtensionError::InvalidName`] for empty names, names with a
/// path separator, and `.`/`..`.
pub fn validate_directory_name(name: &str) -> ExtensionResult<()> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if single_normal && !name.contains(['/', '\\']) {
        Ok(())
    } else {
        Err(ExtensionError::InvalidName(name.to_owned()))
    }
}
