//! Archive adapter: unpack one library archive into a package-scoped,
//! classified view on disk.
//!
//! ```text
//! <unpack_root>/
//! └── com.example.widget/      # package name from AndroidManifest.xml
//!     ├── AndroidManifest.xml
//!     ├── classes.jar
//!     ├── R.txt
//!     ├── res/...
//!     ├── assets/...
//!     ├── libs/*.jar
//!     └── jni/<abi>/*.so
//! ```
//!
//! The package name is resolved before anything is written, since the
//! target directory depends on it. Two archives declaring the same package
//! unpack into the same directory; their symbol tables are merged later by
//! the engine.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use aarmerge_schema::content::{MANIFEST_FILE, RES_DIR};
use aarmerge_schema::{ContentKind, PackageName};
use tracing::{debug, info};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::BuildError;
use crate::manifest::{self, ManifestError};

/// An unpacked, classified library archive.
///
/// Identity (equality and hashing) is the source archive path only.
#[derive(Debug, Clone)]
pub struct ArchiveView {
    path: PathBuf,
    simple_name: String,
    package: PackageName,
    directory: PathBuf,
    manifest: PathBuf,
    classes_jar: Option<PathBuf>,
    symbol_file: Option<PathBuf>,
    res_directory: Option<PathBuf>,
    resources: BTreeSet<PathBuf>,
    assets: BTreeSet<PathBuf>,
    libraries: BTreeSet<PathBuf>,
    natives: BTreeSet<PathBuf>,
}

impl ArchiveView {
    /// Unpack `archive_path` into `<unpack_root>/<package>/` and classify
    /// every extracted file.
    ///
    /// # Errors
    ///
    /// Any failure is fatal for the build: an unreadable container
    /// ([`BuildError::Archive`]), a missing or malformed manifest
    /// ([`BuildError::Manifest`]), an entry escaping the target directory
    /// ([`BuildError::UnsafeEntry`]) or a filesystem error
    /// ([`BuildError::Io`]).
    pub fn unpack(archive_path: &Path, unpack_root: &Path) -> Result<Self, BuildError> {
        let archive_err = |source| BuildError::Archive {
            archive: archive_path.to_path_buf(),
            source,
        };

        let file = File::open(archive_path).map_err(|e| BuildError::io(archive_path, e))?;
        let mut zip = ZipArchive::new(file).map_err(archive_err)?;

        let package = read_package(&mut zip, archive_path)?;
        let directory = unpack_root.join(package.as_str());
        fs::create_dir_all(&directory).map_err(|e| BuildError::io(&directory, e))?;

        let simple_name = archive_path
            .file_stem()
            .map_or_else(|| package.to_string(), |s| s.to_string_lossy().into_owned());

        let mut view = Self {
            path: archive_path.to_path_buf(),
            simple_name,
            manifest: directory.join(MANIFEST_FILE),
            package,
            directory,
            classes_jar: None,
            symbol_file: None,
            res_directory: None,
            resources: BTreeSet::new(),
            assets: BTreeSet::new(),
            libraries: BTreeSet::new(),
            natives: BTreeSet::new(),
        };

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(archive_err)?;
            let relative = entry
                .enclosed_name()
                .and_then(|p| normalize(&p))
                .ok_or_else(|| BuildError::UnsafeEntry {
                    archive: archive_path.to_path_buf(),
                    entry: entry.name().to_string(),
                })?;
            let target = view.directory.join(&relative);

            // Directory entries are optional; parents are created below anyway.
            if entry.is_dir() {
                fs::create_dir_all(&target).map_err(|e| BuildError::io(&target, e))?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
            }
            let mut out = File::create(&target).map_err(|e| BuildError::io(&target, e))?;
            io::copy(&mut entry, &mut out).map_err(|e| BuildError::io(&target, e))?;

            let kind = ContentKind::classify(&relative);
            debug!(entry = %relative.display(), kind = ?kind, "extracted");
            view.catalogue(kind, target);
        }

        let res_dir = view.directory.join(RES_DIR);
        if res_dir.is_dir() {
            view.res_directory = Some(res_dir);
        }

        info!(
            archive = %archive_path.display(),
            package = %view.package,
            resources = view.resources.len(),
            assets = view.assets.len(),
            libraries = view.libraries.len(),
            natives = view.natives.len(),
            "unpacked archive"
        );

        Ok(view)
    }

    /// Read only the package name, without unpacking anything.
    ///
    /// # Errors
    ///
    /// Same as the manifest stage of [`ArchiveView::unpack`].
    pub fn peek_package_name(archive_path: &Path) -> Result<PackageName, BuildError> {
        let file = File::open(archive_path).map_err(|e| BuildError::io(archive_path, e))?;
        let mut zip = ZipArchive::new(file).map_err(|source| BuildError::Archive {
            archive: archive_path.to_path_buf(),
            source,
        })?;
        read_package(&mut zip, archive_path)
    }

    fn catalogue(&mut self, kind: Option<ContentKind>, target: PathBuf) {
        match kind {
            Some(ContentKind::Classes) => self.classes_jar = Some(target),
            Some(ContentKind::Symbols) => self.symbol_file = Some(target),
            Some(ContentKind::Resource) => {
                self.resources.insert(target);
            }
            Some(ContentKind::Asset) => {
                self.assets.insert(target);
            }
            Some(ContentKind::Library) => {
                self.libraries.insert(target);
            }
            Some(ContentKind::Native) => {
                self.natives.insert(target);
            }
            // The manifest path is fixed up front; everything else is kept on
            // disk but not catalogued.
            Some(ContentKind::Manifest) | None => {}
        }
    }

    /// Source archive path (the identity).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Archive file stem, e.g. `lib-a` for `lib-a.aar`.
    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    /// Package name declared by the manifest.
    pub fn package_name(&self) -> &PackageName {
        &self.package
    }

    /// `<unpack_root>/<package>`.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Extracted `AndroidManifest.xml`.
    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    /// Extracted `classes.jar`, if the archive has one.
    pub fn classes_jar(&self) -> Option<&Path> {
        self.classes_jar.as_deref()
    }

    /// Extracted `R.txt`, if the archive has one.
    pub fn symbol_file(&self) -> Option<&Path> {
        self.symbol_file.as_deref()
    }

    /// The `res/` directory, only if it exists on disk.
    pub fn res_directory(&self) -> Option<&Path> {
        self.res_directory.as_deref()
    }

    /// Files below `res/`.
    pub fn resources(&self) -> &BTreeSet<PathBuf> {
        &self.resources
    }

    /// Files below `assets/`.
    pub fn assets(&self) -> &BTreeSet<PathBuf> {
        &self.assets
    }

    /// Jars below `libs/`.
    pub fn libraries(&self) -> &BTreeSet<PathBuf> {
        &self.libraries
    }

    /// Files below `jni/`.
    pub fn natives(&self) -> &BTreeSet<PathBuf> {
        &self.natives
    }

    /// All catalogued files of one kind.
    pub fn files_of(&self, kind: ContentKind) -> Vec<&Path> {
        match kind {
            ContentKind::Manifest => vec![self.manifest.as_path()],
            ContentKind::Classes => self.classes_jar().into_iter().collect(),
            ContentKind::Symbols => self.symbol_file().into_iter().collect(),
            ContentKind::Resource => self.resources.iter().map(PathBuf::as_path).collect(),
            ContentKind::Asset => self.assets.iter().map(PathBuf::as_path).collect(),
            ContentKind::Library => self.libraries.iter().map(PathBuf::as_path).collect(),
            ContentKind::Native => self.natives.iter().map(PathBuf::as_path).collect(),
        }
    }
}

impl PartialEq for ArchiveView {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for ArchiveView {}

impl Hash for ArchiveView {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

fn read_package(
    zip: &mut ZipArchive<File>,
    archive_path: &Path,
) -> Result<PackageName, BuildError> {
    let manifest_err = |source| BuildError::Manifest {
        archive: archive_path.to_path_buf(),
        source,
    };

    let mut entry = match zip.by_name(MANIFEST_FILE) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Err(manifest_err(ManifestError::Missing)),
        Err(source) => {
            return Err(BuildError::Archive {
                archive: archive_path.to_path_buf(),
                source,
            });
        }
    };

    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| BuildError::io(archive_path, e))?;

    manifest::package_name(&bytes).map_err(manifest_err)
}

/// Collapse `.`/`..` so classification sees the real location. `None` if
/// the path climbs above its root.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    const MANIFEST_A: &str = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example.a"/>"#;

    fn write_archive(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, data) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(data.as_bytes()).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_unpack_mirrors_entries_under_package_dir() {
        let tmp = tempdir().unwrap();
        let aar = tmp.path().join("lib-a.aar");
        write_archive(
            &aar,
            &[
                ("AndroidManifest.xml", MANIFEST_A),
                ("classes.jar", "PK"),
                ("R.txt", "int string greeting 0x7f010001\n"),
                ("res/values/strings.xml", "<resources/>"),
                ("assets/data/config.json", "{}"),
                ("libs/okio.jar", "PK"),
                ("jni/arm64-v8a/libfoo.so", "\x7fELF"),
                ("proguard.txt", "-keep class *"),
            ],
        );

        let root = tmp.path().join("unpack");
        let view = ArchiveView::unpack(&aar, &root).unwrap();
        let dir = root.join("com.example.a");

        assert_eq!(view.package_name(), &PackageName::new("com.example.a"));
        assert_eq!(view.simple_name(), "lib-a");
        assert_eq!(view.directory(), dir);
        assert_eq!(view.manifest(), dir.join("AndroidManifest.xml"));
        assert_eq!(view.classes_jar(), Some(dir.join("classes.jar").as_path()));
        assert_eq!(view.symbol_file(), Some(dir.join("R.txt").as_path()));
        assert_eq!(view.res_directory(), Some(dir.join("res").as_path()));

        assert!(view.resources().contains(&dir.join("res/values/strings.xml")));
        assert!(view.assets().contains(&dir.join("assets/data/config.json")));
        assert!(view.libraries().contains(&dir.join("libs/okio.jar")));
        assert!(view.natives().contains(&dir.join("jni/arm64-v8a/libfoo.so")));

        // Unclassified files are still extracted.
        assert!(dir.join("proguard.txt").is_file());
        assert_eq!(
            fs::read_to_string(dir.join("assets/data/config.json")).unwrap(),
            "{}"
        );
    }

    #[test]
    fn test_no_res_directory_is_not_recorded() {
        let tmp = tempdir().unwrap();
        let aar = tmp.path().join("lib-b.aar");
        write_archive(&aar, &[("AndroidManifest.xml", MANIFEST_A)]);

        let view = ArchiveView::unpack(&aar, tmp.path()).unwrap();
        assert!(view.res_directory().is_none());
        assert!(view.classes_jar().is_none());
        assert!(view.symbol_file().is_none());
        assert!(view.resources().is_empty());
        assert_eq!(view.files_of(ContentKind::Manifest).len(), 1);
    }

    #[test]
    fn test_explicit_empty_res_directory_is_recorded() {
        let tmp = tempdir().unwrap();
        let aar = tmp.path().join("lib.aar");
        write_archive(&aar, &[("AndroidManifest.xml", MANIFEST_A), ("res/", "")]);

        let view = ArchiveView::unpack(&aar, tmp.path()).unwrap();
        assert!(view.res_directory().is_some());
        assert!(view.resources().is_empty());
    }

    #[test]
    fn test_missing_manifest_is_fatal() {
        let tmp = tempdir().unwrap();
        let aar = tmp.path().join("broken.aar");
        write_archive(&aar, &[("classes.jar", "PK")]);

        let err = ArchiveView::unpack(&aar, tmp.path()).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Manifest {
                source: ManifestError::Missing,
                ..
            }
        ));
        // Nothing was unpacked before the package name was known.
        assert!(!tmp.path().join("classes.jar").exists());
    }

    #[test]
    fn test_malformed_manifest_is_fatal() {
        let tmp = tempdir().unwrap();
        let aar = tmp.path().join("broken.aar");
        write_archive(&aar, &[("AndroidManifest.xml", "<manifest>")]);

        assert!(matches!(
            ArchiveView::unpack(&aar, tmp.path()),
            Err(BuildError::Manifest { .. })
        ));
    }

    #[test]
    fn test_not_a_zip_is_fatal() {
        let tmp = tempdir().unwrap();
        let aar = tmp.path().join("garbage.aar");
        fs::write(&aar, "definitely not a zip").unwrap();

        assert!(matches!(
            ArchiveView::unpack(&aar, tmp.path()),
            Err(BuildError::Archive { .. })
        ));
        assert!(matches!(
            ArchiveView::unpack(&tmp.path().join("missing.aar"), tmp.path()),
            Err(BuildError::Io { .. })
        ));
    }

    #[test]
    fn test_escaping_entry_is_fatal() {
        let tmp = tempdir().unwrap();
        let aar = tmp.path().join("evil.aar");
        write_archive(
            &aar,
            &[("AndroidManifest.xml", MANIFEST_A), ("../../evil.txt", "x")],
        );

        let root = tmp.path().join("unpack");
        assert!(matches!(
            ArchiveView::unpack(&aar, &root),
            Err(BuildError::UnsafeEntry { .. })
        ));
        assert!(!tmp.path().join("evil.txt").exists());
    }

    #[test]
    fn test_identity_is_source_path() {
        let tmp = tempdir().unwrap();
        let aar = tmp.path().join("lib-a.aar");
        write_archive(&aar, &[("AndroidManifest.xml", MANIFEST_A)]);

        let first = ArchiveView::unpack(&aar, &tmp.path().join("one")).unwrap();
        let second = ArchiveView::unpack(&aar, &tmp.path().join("two")).unwrap();
        assert_eq!(first, second);

        let mut set = std::collections::HashSet::new();
        set.insert(first);
        assert!(!set.insert(second));
    }

    #[test]
    fn test_peek_package_name_does_not_unpack() {
        let tmp = tempdir().unwrap();
        let aar = tmp.path().join("lib-a.aar");
        write_archive(&aar, &[("AndroidManifest.xml", MANIFEST_A)]);

        let package = ArchiveView::peek_package_name(&aar).unwrap();
        assert_eq!(package, "com.example.a");
        assert!(!tmp.path().join("com.example.a").exists());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("res/./values/../raw/a.bin")),
            Some(PathBuf::from("res/raw/a.bin"))
        );
        assert_eq!(normalize(Path::new("../a")), None);
        assert_eq!(normalize(Path::new(".")), None);
    }
}
