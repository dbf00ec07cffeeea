//! Manifest and extension directory fixtures.

use std::path::Path;

/// Render a `package.json` manifest. `themes` and `palettes` are
/// `(id, path)` pairs.
#[must_use]
pub fn manifest_json(
    name: &str,
    display_name: &str,
    themes: &[(&str, &str)],
    palettes: &[(&str, &str)],
) -> String {
    let items = |pairs: &[(&str, &str)]| -> Vec<serde_json::Value> {
        pairs
            .iter()
            .map(|(id, path)| serde_json::json!({ "id": id, "path": path }))
            .collect()
    };

    serde_json::json!({
        "name": name,
        "displayName": display_name,
        "contributes": {
            "themes": items(themes),
            "palettes": items(palettes),
        }
    })
    .to_string()
}

/// Create `dir` with a `package.json` holding `manifest`.
///
/// # Panics
///
/// Panics if the directory or file cannot be written.
pub fn write_extension(dir: &Path, manifest: &str) {
    std::fs::create_dir_all(dir).expect("create extension dir");
    std::fs::write(dir.join("package.json"), manifest).expect("write package.json");
}
