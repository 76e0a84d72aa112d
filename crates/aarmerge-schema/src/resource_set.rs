//! Named groups of resource roots.

use std::path::PathBuf;

/// A named, ordered list of resource trees.
///
/// Within a merge, sets are applied in order and later sets override earlier
/// ones for identically-named, identically-typed resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSet {
    name: String,
    roots: Vec<PathBuf>,
}

impl ResourceSet {
    /// Create an empty set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roots: Vec::new(),
        }
    }

    /// Builder-style variant of [`ResourceSet::add_root`].
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.add_root(root);
        self
    }

    /// Append a resource tree (a directory holding `values/`, `drawable/`, ...).
    pub fn add_root(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }

    /// Name used in merge diagnostics (archive simple name, or `main`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resource trees in precedence order (later wins).
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}
