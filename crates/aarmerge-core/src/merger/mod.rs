//! Resource merging across an ordered list of resource sets.
//!
//! Sets are applied in the order they were added and later sets win: a
//! file resource replaces any earlier file with the same folder and
//! resource name, and a value resource replaces any earlier value with the
//! same folder, type and name. The project's own set goes last so it
//! overrides every dependency.
//!
//! ```text
//! res/
//!   drawable-hdpi/icon.png     file item  (drawable-hdpi, icon)
//!   layout/main.xml            file item  (layout, main)
//!   values/strings.xml         value items (values, string, greeting) ...
//!   values-fr/strings.xml      value items (values-fr, string, greeting) ...
//! ```

mod values;
mod writer;

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use aarmerge_schema::ResourceSet;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

pub use values::ValueItem;
pub use writer::{MergeSummary, MergedResourceWriter};

/// Resource folder types recognised under a resource root. Qualifiers
/// follow the type after a `-` (`values-fr`, `drawable-hdpi-v4`).
pub const FOLDER_TYPES: &[&str] = &[
    "anim",
    "animator",
    "color",
    "drawable",
    "font",
    "interpolator",
    "layout",
    "menu",
    "mipmap",
    "navigation",
    "raw",
    "transition",
    "values",
    "xml",
];

/// Errors from loading or writing merged resources.
#[derive(Error, Debug)]
pub enum MergeError {
    /// Filesystem failure.
    #[error("IO error at {}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A values file is not well-formed XML.
    #[error("Malformed XML in {}", path.display())]
    Xml {
        /// The values file.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: quick_xml::Error,
    },

    /// A values file is well-formed but not a valid resource document.
    #[error("Invalid values file {}: {reason}", path.display())]
    InvalidValues {
        /// The values file.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// A directory under a resource root is not a known resource type.
    #[error("Unknown resource folder {}", path.display())]
    InvalidFolder {
        /// The folder.
        path: PathBuf,
    },

    /// The cruncher rejected an image.
    #[error("Failed to crunch {}: {reason}", path.display())]
    Crunch {
        /// The source image.
        path: PathBuf,
        /// Cruncher diagnostics.
        reason: String,
    },

    /// The output directory contains one of the merge inputs.
    #[error("Merge output {} would overwrite its own input", path.display())]
    OutputOverlapsInput {
        /// The output directory.
        path: PathBuf,
    },
}

impl MergeError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A file resource (`layout/main.xml`, `drawable-hdpi/icon.9.png`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    /// Folder name including qualifiers.
    pub folder: String,
    /// Resource name: the file name up to its first `.`.
    pub name: String,
    /// File name as it will be written.
    pub file_name: String,
    /// Where the winning copy lives.
    pub source: PathBuf,
    /// Name of the resource set it came from.
    pub set: String,
}

/// Values of one values folder.
#[derive(Debug, Default)]
pub(crate) struct ValuesFolder {
    /// `xmlns:*` declarations collected from every contributing root element.
    pub(crate) namespaces: BTreeMap<String, String>,
    /// Items keyed by `(type, name)`.
    pub(crate) items: BTreeMap<(String, String), ValueItem>,
}

/// Merges an ordered list of [`ResourceSet`]s.
#[derive(Debug, Default)]
pub struct ResourceMerger {
    sets: Vec<ResourceSet>,
}

impl ResourceMerger {
    /// An empty merger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a set. It overrides every set added before it.
    pub fn add_set(&mut self, set: ResourceSet) {
        self.sets.push(set);
    }

    /// The sets, lowest priority first.
    pub fn sets(&self) -> &[ResourceSet] {
        &self.sets
    }

    /// Load every set and resolve overrides.
    ///
    /// Roots that do not exist contribute nothing.
    ///
    /// # Errors
    ///
    /// Returns a [`MergeError`] for unreadable directories, unknown resource
    /// folders and malformed values files.
    pub fn merge(&self) -> Result<MergedResources, MergeError> {
        let mut merged = MergedResources::default();
        for set in &self.sets {
            for root in set.roots() {
                merged.load_root(set.name(), root)?;
            }
        }
        debug!(
            files = merged.files.len(),
            values = merged.value_count(),
            "merged resource sets"
        );
        Ok(merged)
    }
}

/// The result of a merge, ready to be written.
#[derive(Debug, Default)]
pub struct MergedResources {
    roots: Vec<PathBuf>,
    files: BTreeMap<(String, String), FileItem>,
    values: BTreeMap<String, ValuesFolder>,
    shadowed: Vec<PathBuf>,
}

impl MergedResources {
    /// Look up a file resource.
    pub fn file(&self, folder: &str, name: &str) -> Option<&FileItem> {
        self.files.get(&(folder.to_string(), name.to_string()))
    }

    /// Look up a value resource.
    pub fn value(&self, folder: &str, res_type: &str, name: &str) -> Option<&ValueItem> {
        self.values
            .get(folder)?
            .items
            .get(&(res_type.to_string(), name.to_string()))
    }

    /// File resources in `(folder, name)` order.
    pub fn files(&self) -> impl Iterator<Item = &FileItem> {
        self.files.values()
    }

    /// Value resources in `(folder, type, name)` order.
    pub fn values(&self) -> impl Iterator<Item = &ValueItem> {
        self.values.values().flat_map(|folder| folder.items.values())
    }

    /// Number of value resources.
    pub fn value_count(&self) -> usize {
        self.values.values().map(|f| f.items.len()).sum()
    }

    /// Whether nothing was merged.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.value_count() == 0
    }

    /// Every input root, including ones that did not exist.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Sources whose resource was replaced by another file of the same set.
    pub fn shadowed(&self) -> &[PathBuf] {
        &self.shadowed
    }

    pub(crate) fn value_folders(&self) -> impl Iterator<Item = (&String, &ValuesFolder)> {
        self.values.iter()
    }

    fn load_root(&mut self, set: &str, root: &Path) -> Result<(), MergeError> {
        self.roots.push(root.to_path_buf());
        if !root.is_dir() {
            warn!(set, root = %root.display(), "resource root does not exist, skipping");
            return Ok(());
        }

        for folder_entry in children(root)? {
            let Some(folder) = visible_name(&folder_entry) else {
                continue;
            };
            if !folder_entry.path().is_dir() {
                debug!(
                    path = %folder_entry.path().display(),
                    "ignoring loose file in resource root"
                );
                continue;
            }
            let res_type = folder.split('-').next().unwrap_or(folder);
            if !FOLDER_TYPES.contains(&res_type) {
                return Err(MergeError::InvalidFolder {
                    path: folder_entry.path().to_path_buf(),
                });
            }

            for file_entry in children(folder_entry.path())? {
                let Some(file_name) = visible_name(&file_entry) else {
                    continue;
                };
                let path = file_entry.path();
                if path.is_dir() {
                    debug!(path = %path.display(), "ignoring nested directory");
                    continue;
                }

                if res_type == "values" {
                    if path.extension() != Some(OsStr::new("xml")) {
                        debug!(path = %path.display(), "ignoring non-XML file in values folder");
                        continue;
                    }
                    self.load_values(set, folder, path)?;
                } else {
                    let name = file_name.split('.').next().unwrap_or(file_name).to_string();
                    let item = FileItem {
                        folder: folder.to_string(),
                        name: name.clone(),
                        file_name: file_name.to_string(),
                        source: path.to_path_buf(),
                        set: set.to_string(),
                    };
                    if let Some(previous) = self.files.insert((folder.to_string(), name), item) {
                        self.overridden(set, &previous.set, &previous.source, path);
                    }
                }
            }
        }
        Ok(())
    }

    fn load_values(&mut self, set: &str, folder: &str, path: &Path) -> Result<(), MergeError> {
        let parsed = values::parse(path, folder, set)?;
        let target = self.values.entry(folder.to_string()).or_default();
        target.namespaces.extend(parsed.namespaces);
        for item in parsed.items {
            let key = (item.res_type.clone(), item.name.clone());
            if let Some(previous) = target.items.insert(key, item) {
                if previous.set == set {
                    warn!(
                        set,
                        res_type = %previous.res_type,
                        name = %previous.name,
                        first = %previous.source.display(),
                        second = %path.display(),
                        "value resource defined twice in one set, keeping the later file"
                    );
                    self.shadowed.push(previous.source);
                } else {
                    debug!(
                        res_type = %previous.res_type,
                        name = %previous.name,
                        overridden = %previous.set,
                        by = set,
                        "value resource overridden"
                    );
                }
            }
        }
        Ok(())
    }

    fn overridden(&mut self, set: &str, previous_set: &str, previous: &Path, by: &Path) {
        if previous_set == set {
            warn!(
                set,
                first = %previous.display(),
                second = %by.display(),
                "file resource defined twice in one set, keeping the later file"
            );
            self.shadowed.push(previous.to_path_buf());
        } else {
            debug!(
                overridden = %previous.display(),
                by = set,
                "file resource overridden"
            );
        }
    }
}

/// Direct children of `dir`, sorted by file name.
fn children(dir: &Path) -> Result<Vec<DirEntry>, MergeError> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            let path = e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
            MergeError::Io {
                path,
                source: e.into(),
            }
        })
}

/// The entry's name, unless it is hidden, a backup file or not UTF-8.
fn visible_name(entry: &DirEntry) -> Option<&str> {
    let name = entry.file_name().to_str()?;
    if name.starts_with('.') || name.ends_with('~') {
        debug!(path = %entry.path().display(), "ignoring hidden or backup file");
        return None;
    }
    Some(name)
}
