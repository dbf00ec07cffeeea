//! End-to-end archive installation tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use easel_extensions::{
    DEFAULT_THEME_EXTENSION, ExtensionContext, ExtensionError, ExtensionRegistry,
    FilterSubscriber, StandardLocator,
};
use easel_test::{ArchiveBuilder, FixedTheme, RecordingConfigStore, manifest_json};

struct Harness {
    tmp: tempfile::TempDir,
    user: PathBuf,
    store: Arc<RecordingConfigStore>,
    theme: Arc<FixedTheme>,
}

impl Harness {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let user = tmp.path().join("home/data/extensions");
        Self {
            tmp,
            user,
            store: Arc::new(RecordingConfigStore::new()),
            theme: Arc::new(FixedTheme::new("default")),
        }
    }

    fn registry(&self) -> ExtensionRegistry {
        let ctx = ExtensionContext::new(self.store.clone(), self.theme.clone());
        ExtensionRegistry::new(&StandardLocator::from_user_dir(&self.user), ctx).unwrap()
    }

    fn archive(&self, file_name: &str, builder: ArchiveBuilder) -> PathBuf {
        let path = self.tmp.path().join(file_name);
        builder.write_to(&path);
        path
    }
}

fn record_events(registry: &ExtensionRegistry) -> Arc<Mutex<Vec<String>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    registry
        .events()
        .registry()
        .register(Arc::new(FilterSubscriber::new("recorder", move |event| {
            sink.lock()
                .unwrap()
                .push(format!("{}:{}", event.event_type(), event.extension().name()));
        })));
    seen
}

fn files_below(root: &Path) -> Vec<String> {
    fn walk(dir: &Path, root: &Path, out: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(&path, root, out);
            } else {
                out.push(
                    path.strip_prefix(root)
                        .unwrap()
                        .to_string_lossy()
                        .replace('\\', "/"),
                );
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}

#[test]
fn install_theme_extension() {
    let h = Harness::new();
    let mut registry = h.registry();
    let seen = record_events(&registry);

    let zip = h.archive(
        "foo-1.0.zip",
        ArchiveBuilder::new()
            .file(
                "foo/package.json",
                manifest_json("foo", "Foo", &[("t1", "theme/t1")], &[]).as_bytes(),
            )
            .file("foo/theme/t1/theme.xml", b"<theme/>"),
    );

    let id = registry.install_compressed_extension(&zip).unwrap();
    let ext = registry.get(id).unwrap();

    assert_eq!(ext.name(), "foo");
    assert_eq!(ext.path(), h.user.join("foo"));
    assert!(ext.is_installed());
    assert!(ext.is_enabled());
    assert!(!ext.is_builtin_extension());
    assert_eq!(ext.themes()["t1"], h.user.join("foo/theme/t1"));
    assert!(h.user.join("foo/theme/t1/theme.xml").is_file());

    assert_eq!(
        *seen.lock().unwrap(),
        ["new_extension:foo", "themes_change:foo"]
    );
    assert_eq!(registry.theme_path("t1"), Some(h.user.join("foo/theme/t1").as_path()));
}

#[test]
fn install_name_independent_of_nesting_depth() {
    let h = Harness::new();
    let mut registry = h.registry();

    for (index, prefix) in ["", "a/", "a/b/", "a/b/c/d/"].into_iter().enumerate() {
        let name = format!("nested-{index}");
        let zip = h.archive(
            &format!("archive-{index}.zip"),
            ArchiveBuilder::new()
                .file(
                    &format!("{prefix}package.json"),
                    manifest_json(&name, "Nested", &[], &[]).as_bytes(),
                )
                .file(&format!("{prefix}palettes/p.gpl"), b"GIMP Palette"),
        );

        let id = registry.install_compressed_extension(&zip).unwrap();
        let ext = registry.get(id).unwrap();
        assert_eq!(ext.name(), name);
        assert!(ext.path().ends_with(&name));
        assert_eq!(
            files_below(ext.path()),
            ["package.json", "palettes/p.gpl"],
            "prefix {prefix:?}"
        );
    }
}

#[test]
fn install_strips_common_path_and_skips_foreign_entries() {
    let h = Harness::new();
    let mut registry = h.registry();

    let zip = h.archive(
        "bundle.zip",
        ArchiveBuilder::new()
            .file("readme.txt", b"top-level readme")
            .dir("bundle/")
            .file("bundle/other.txt", b"sibling of sub")
            .dir("bundle/sub/")
            .file(
                "bundle/sub/package.json",
                manifest_json("sub-ext", "Sub", &[], &[("p", "palettes/p.gpl")]).as_bytes(),
            )
            .file("bundle/sub/palettes/p.gpl", b"GIMP Palette"),
    );

    let id = registry.install_compressed_extension(&zip).unwrap();
    let ext = registry.get(id).unwrap();
    let root = h.user.join("sub-ext");

    assert_eq!(ext.path(), root);
    assert_eq!(files_below(&root), ["package.json", "palettes/p.gpl"]);
    assert!(!h.user.join("readme.txt").exists());
    assert!(!root.join("readme.txt").exists());
    assert!(!root.join("bundle").exists());
    assert_eq!(registry.palette_path("p"), Some(root.join("palettes/p.gpl").as_path()));
}

#[test]
fn install_without_common_path_extracts_everything() {
    let h = Harness::new();
    let mut registry = h.registry();

    let zip = h.archive(
        "flat.zip",
        ArchiveBuilder::new()
            .file("package.json", manifest_json("flat", "Flat", &[], &[]).as_bytes())
            .file("extra/notes.txt", b"notes"),
    );

    let id = registry.install_compressed_extension(&zip).unwrap();
    assert_eq!(
        files_below(registry.get(id).unwrap().path()),
        ["extra/notes.txt", "package.json"]
    );
}

#[test]
fn parent_dir_entry_is_rejected() {
    let h = Harness::new();
    let mut registry = h.registry();
    let seen = record_events(&registry);

    let zip = h.archive(
        "evil.zip",
        ArchiveBuilder::new()
            .file("foo/package.json", manifest_json("foo", "Foo", &[], &[]).as_bytes())
            .file("foo/../../escape.txt", b"malicious"),
    );

    let err = registry.install_compressed_extension(&zip).unwrap_err();
    assert!(
        matches!(err, ExtensionError::PathTraversal { .. }),
        "expected path traversal error, got: {err}"
    );
    assert!(!h.user.join("escape.txt").exists());
    assert!(!h.user.parent().unwrap().join("escape.txt").exists());
    assert!(registry.is_empty());
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn absolute_entry_is_rejected() {
    let h = Harness::new();
    let mut registry = h.registry();
    let outside = h.tmp.path().join("outside.txt");

    let zip = h.archive(
        "abs.zip",
        ArchiveBuilder::new()
            .file("package.json", manifest_json("abs", "Abs", &[], &[]).as_bytes())
            .file(&outside.to_string_lossy(), b"malicious"),
    );

    let err = registry.install_compressed_extension(&zip).unwrap_err();
    assert!(
        matches!(err, ExtensionError::PathTraversal { .. }),
        "expected path traversal error, got: {err}"
    );
    assert!(!outside.exists());
    assert!(registry.is_empty());
}

#[test]
fn symlink_entry_is_rejected() {
    let h = Harness::new();
    let mut registry = h.registry();

    let zip = h.archive(
        "link.zip",
        ArchiveBuilder::new()
            .file("foo/package.json", manifest_json("foo", "Foo", &[], &[]).as_bytes())
            .symlink("foo/passwd", "/etc/passwd"),
    );

    let err = registry.install_compressed_extension(&zip).unwrap_err();
    assert!(matches!(err, ExtensionError::UnsafeEntryType { .. }), "{err}");
    assert!(!h.user.join("foo/passwd").exists());
}

#[test]
fn manifest_name_must_be_a_directory_name() {
    let h = Harness::new();
    let mut registry = h.registry();

    let zip = h.archive(
        "sneaky.zip",
        ArchiveBuilder::new()
            .file("package.json", manifest_json("../sneaky", "Sneaky", &[], &[]).as_bytes()),
    );

    let err = registry.install_compressed_extension(&zip).unwrap_err();
    assert!(matches!(err, ExtensionError::InvalidName(_)), "{err}");
    assert!(!h.tmp.path().join("home/data/sneaky").exists());
}

#[test]
fn corrupt_manifest_fails_install() {
    let h = Harness::new();
    let mut registry = h.registry();

    let zip = h.archive(
        "broken.zip",
        ArchiveBuilder::new().file("broken/package.json", br#"{ "displayName": "No name" }"#),
    );

    let err = registry.install_compressed_extension(&zip).unwrap_err();
    assert!(matches!(err, ExtensionError::Manifest { .. }), "{err}");
    assert!(registry.is_empty());
}

#[test]
fn archive_without_manifest_fails_after_extracting_to_file_title() {
    let h = Harness::new();
    let mut registry = h.registry();

    let zip = h.archive(
        "loose-files.zip",
        ArchiveBuilder::new().file("palettes/p.gpl", b"GIMP Palette"),
    );

    let err = registry.install_compressed_extension(&zip).unwrap_err();
    assert!(matches!(err, ExtensionError::Install(_)), "{err}");
    // No rollback: the extracted files stay where the archive name put them.
    assert!(h.user.join("loose-files/palettes/p.gpl").is_file());
    assert!(registry.is_empty());
}

#[test]
fn missing_or_invalid_archive_fails_to_open() {
    let h = Harness::new();
    let mut registry = h.registry();

    let err = registry
        .install_compressed_extension(&h.tmp.path().join("missing.zip"))
        .unwrap_err();
    assert!(matches!(err, ExtensionError::ArchiveOpen { .. }), "{err}");

    let garbage = h.tmp.path().join("garbage.zip");
    std::fs::write(&garbage, b"PK but not really").unwrap();
    let err = registry.install_compressed_extension(&garbage).unwrap_err();
    assert!(matches!(err, ExtensionError::ArchiveOpen { .. }), "{err}");
}

#[test]
fn installed_extension_survives_restart() {
    let h = Harness::new();
    let zip = h.archive(
        "pal.zip",
        ArchiveBuilder::new()
            .file(
                "pal/package.json",
                manifest_json("pal", "Pal", &[], &[("P", "p.gpl")]).as_bytes(),
            )
            .file("pal/p.gpl", b"GIMP Palette"),
    );

    {
        let mut registry = h.registry();
        let id = registry.install_compressed_extension(&zip).unwrap();
        registry.enable_extension(id, false).unwrap();
    }

    let registry = h.registry();
    let id = registry.find("pal").unwrap();
    let ext = registry.get(id).unwrap();
    assert!(!ext.is_builtin_extension());
    assert!(!ext.is_enabled());
    assert!(registry.palettes().is_empty());
}

#[test]
fn reinstall_appends_and_keeps_first_entry() {
    let h = Harness::new();
    let mut registry = h.registry();
    let zip = h.archive(
        "foo.zip",
        ArchiveBuilder::new().file(
            "foo/package.json",
            manifest_json("foo", "Foo", &[("t1", "t1")], &[]).as_bytes(),
        ),
    );

    assert_eq!(registry.installed_at(&h.user.join("foo")), None);
    let first = registry.install_compressed_extension(&zip).unwrap();
    let second = registry.install_compressed_extension(&zip).unwrap();

    assert_ne!(first, second);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.installed_at(&h.user.join("foo")), Some(first));
    assert_eq!(registry.find("foo"), Some(first));
    assert_eq!(registry.theme_path("t1"), Some(h.user.join("foo/t1").as_path()));
}

#[test]
fn uninstall_installed_extension() {
    let h = Harness::new();
    let mut registry = h.registry();
    let zip = h.archive(
        "gone.zip",
        ArchiveBuilder::new()
            .file("gone/package.json", manifest_json("gone", "Gone", &[], &[]).as_bytes())
            .file("gone/a/b/c.txt", b"deep"),
    );
    let id = registry.install_compressed_extension(&zip).unwrap();

    registry.uninstall_extension(id).unwrap();
    let ext = registry.get(id).unwrap();
    assert!(!ext.is_installed());
    assert!(!h.user.join("gone").exists());
    assert!(h.user.is_dir());

    // Second call is a no-op even though the directory is gone.
    registry.uninstall_extension(id).unwrap();
    assert!(!registry.get(id).unwrap().is_installed());
}

#[test]
fn selected_theme_and_default_theme_are_protected() {
    let h = Harness::new();
    let mut registry = h.registry();

    let dark = h.archive(
        "dark.zip",
        ArchiveBuilder::new().file(
            "package.json",
            manifest_json("dark", "Dark", &[("dark", "dark")], &[]).as_bytes(),
        ),
    );
    let default = h.archive(
        "default.zip",
        ArchiveBuilder::new().file(
            "package.json",
            manifest_json(DEFAULT_THEME_EXTENSION, "Default", &[("default", "d")], &[]).as_bytes(),
        ),
    );
    let dark = registry.install_compressed_extension(&dark).unwrap();
    let default = registry.install_compressed_extension(&default).unwrap();

    h.theme.select("dark");
    let ext = registry.get(dark).unwrap();
    assert!(!ext.can_be_disabled());
    assert!(!ext.can_be_uninstalled());

    h.theme.select("something-else");
    assert!(registry.get(dark).unwrap().can_be_uninstalled());

    let ext = registry.get(default).unwrap();
    assert!(!ext.can_be_disabled());
    assert!(!ext.can_be_uninstalled());

    // Bypassing the check leaves the extension in place.
    registry.uninstall_extension(default).unwrap();
    assert!(registry.get(default).unwrap().is_installed());
    assert!(h.user.join(DEFAULT_THEME_EXTENSION).is_dir());
}

#[test]
fn enable_twice_writes_once() {
    let h = Harness::new();
    let mut registry = h.registry();
    let zip = h.archive(
        "toggle.zip",
        ArchiveBuilder::new()
            .file("package.json", manifest_json("toggle", "Toggle", &[], &[]).as_bytes()),
    );
    let id = registry.install_compressed_extension(&zip).unwrap();

    registry.enable_extension(id, false).unwrap();
    registry.enable_extension(id, true).unwrap();
    registry.enable_extension(id, true).unwrap();

    assert_eq!(h.store.writes(), 2);
    assert_eq!(h.store.flushes(), 2);
    assert_eq!(h.store.value("extensions", "toggle"), Some(true));
}
