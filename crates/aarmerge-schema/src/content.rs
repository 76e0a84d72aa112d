//! Archive content classification.
//!
//! Every file extracted from an archive maps to at most one [`ContentKind`],
//! decided purely by its path relative to the archive root.

use std::path::{Component, Path};

/// Manifest entry name at the archive root.
pub const MANIFEST_FILE: &str = "AndroidManifest.xml";
/// Compiled classes bundle at the archive root.
pub const CLASSES_FILE: &str = "classes.jar";
/// Flat-text resource symbol table at the archive root.
pub const SYMBOLS_FILE: &str = "R.txt";
/// Resource tree directory.
pub const RES_DIR: &str = "res";
/// Raw assets directory.
pub const ASSETS_DIR: &str = "assets";
/// Bundled jar libraries directory.
pub const LIBS_DIR: &str = "libs";
/// Native libraries directory.
pub const JNI_DIR: &str = "jni";

/// The kind of content a file inside an archive represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentKind {
    /// `AndroidManifest.xml`
    Manifest,
    /// `classes.jar`
    Classes,
    /// `R.txt`
    Symbols,
    /// Anything below `res/`
    Resource,
    /// Anything below `assets/`
    Asset,
    /// A `.jar` below `libs/`
    Library,
    /// Anything below `jni/`
    Native,
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    /// Exact file name at the archive root.
    File(&'static str),
    /// Any file below a top-level directory, optionally filtered by extension.
    Dir(&'static str, Option<&'static str>),
}

const TABLE: [(Rule, ContentKind); 7] = [
    (Rule::File(MANIFEST_FILE), ContentKind::Manifest),
    (Rule::File(CLASSES_FILE), ContentKind::Classes),
    (Rule::File(SYMBOLS_FILE), ContentKind::Symbols),
    (Rule::Dir(RES_DIR, None), ContentKind::Resource),
    (Rule::Dir(ASSETS_DIR, None), ContentKind::Asset),
    (Rule::Dir(LIBS_DIR, Some("jar")), ContentKind::Library),
    (Rule::Dir(JNI_DIR, None), ContentKind::Native),
];

impl ContentKind {
    /// Every kind, in table order.
    pub const ALL: [ContentKind; 7] = [
        Self::Manifest,
        Self::Classes,
        Self::Symbols,
        Self::Resource,
        Self::Asset,
        Self::Library,
        Self::Native,
    ];

    /// Classify a path relative to the archive root.
    ///
    /// Returns `None` for anything outside the fixed table (e.g. `proguard.txt`,
    /// `public.txt`, or a non-jar file under `libs/`). Paths that are not
    /// plain relative paths (absolute, `..`) are never classified.
    pub fn classify(relative: &Path) -> Option<Self> {
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }

        let (first, rest) = parts.split_first()?;
        TABLE.iter().find_map(|(rule, kind)| {
            let hit = match *rule {
                Rule::File(name) => rest.is_empty() && *first == name,
                Rule::Dir(dir, extension) => {
                    *first == dir
                        && !rest.is_empty()
                        && extension.is_none_or(|ext| {
                            rest.last().is_some_and(|file| {
                                Path::new(file)
                                    .extension()
                                    .is_some_and(|e| e.eq_ignore_ascii_case(ext))
                            })
                        })
                }
            };
            hit.then_some(*kind)
        })
    }

    /// Human-readable label used in listings.
    pub fn label(self) -> &'static str {
        match self {
            Self::Manifest => "manifest",
            Self::Classes => "classes",
            Self::Symbols => "symbols",
            Self::Resource => "resource",
            Self::Asset => "asset",
            Self::Library => "library",
            Self::Native => "native",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
