//! Writing merged resources to an output resource directory.

use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use super::{MergeError, MergedResources, ValuesFolder};
use crate::cruncher::ImageCruncher;

/// Counts of what a write produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// File resources written (crunched ones included).
    pub files: usize,
    /// PNG files that went through the cruncher.
    pub crunched: usize,
    /// Value resources written.
    pub values: usize,
    /// Generated values documents (one per values folder).
    pub value_files: usize,
}

/// Writes [`MergedResources`] into a fresh output directory.
///
/// File resources keep their file name. Values of each folder are written
/// to a single `<folder>/<folder>.xml`, ordered by type then name.
pub struct MergedResourceWriter<'a> {
    output_dir: PathBuf,
    cruncher: &'a dyn ImageCruncher,
    source_markers: bool,
}

impl fmt::Debug for MergedResourceWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedResourceWriter")
            .field("output_dir", &self.output_dir)
            .field("source_markers", &self.source_markers)
            .finish_non_exhaustive()
    }
}

impl<'a> MergedResourceWriter<'a> {
    /// A writer targeting `output_dir`, crunching PNGs through `cruncher`.
    pub fn new(output_dir: impl Into<PathBuf>, cruncher: &'a dyn ImageCruncher) -> Self {
        Self {
            output_dir: output_dir.into(),
            cruncher,
            source_markers: false,
        }
    }

    /// Precede every value with a `<!-- From: file:... -->` comment naming
    /// the file it came from.
    pub fn with_source_markers(mut self, enabled: bool) -> Self {
        self.source_markers = enabled;
        self
    }

    /// Replace the output directory's contents with `merged`.
    ///
    /// # Errors
    ///
    /// Returns a [`MergeError`] if the output directory overlaps an input,
    /// a file cannot be written, or the cruncher fails.
    pub fn write(&self, merged: &MergedResources) -> Result<MergeSummary, MergeError> {
        let output = resolve(&self.output_dir);
        let overlaps = merged.roots().iter().map(|root| resolve(root.as_path())).any(|root| {
            root.starts_with(&output) || output.starts_with(&root)
        });
        if overlaps {
            return Err(MergeError::OutputOverlapsInput {
                path: self.output_dir.clone(),
            });
        }

        if self.output_dir.exists() {
            fs::remove_dir_all(&self.output_dir)
                .map_err(|e| MergeError::io(&self.output_dir, e))?;
        }
        fs::create_dir_all(&self.output_dir).map_err(|e| MergeError::io(&self.output_dir, e))?;

        let mut summary = MergeSummary::default();

        for item in merged.files() {
            let target = self.output_dir.join(&item.folder).join(&item.file_name);
            if is_png(&item.file_name) {
                self.cruncher
                    .crunch(&item.source, &target)
                    .map_err(|e| MergeError::Crunch {
                        path: item.source.clone(),
                        reason: format!("{e:#}"),
                    })?;
                summary.crunched += 1;
            } else {
                create_parent(&target)?;
                fs::copy(&item.source, &target).map_err(|e| MergeError::io(&item.source, e))?;
            }
            summary.files += 1;
        }

        for (folder, contents) in merged.value_folders() {
            let target = self.output_dir.join(folder).join(format!("{folder}.xml"));
            create_parent(&target)?;
            fs::write(&target, self.render(contents)).map_err(|e| MergeError::io(&target, e))?;
            debug!(path = %target.display(), items = contents.items.len(), "wrote values");
            summary.values += contents.items.len();
            summary.value_files += 1;
        }

        info!(
            output = %self.output_dir.display(),
            files = summary.files,
            crunched = summary.crunched,
            values = summary.values,
            "wrote merged resources"
        );
        Ok(summary)
    }

    fn render(&self, folder: &ValuesFolder) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<resources");
        for (key, value) in &folder.namespaces {
            let _ = write!(out, " {key}=\"{value}\"");
        }
        out.push_str(">\n");

        for item in folder.items.values() {
            if self.source_markers {
                let _ = writeln!(out, "    <!-- From: {} -->", marker_url(&item.source));
            }
            let _ = writeln!(out, "    {}", item.xml);
        }

        out.push_str("</resources>\n");
        out
    }
}

/// `file:` URL of `path`, with `--` broken up so it is legal in a comment.
fn marker_url(path: &Path) -> String {
    format!("file:{}", path.display()).replace("--", "-%2D")
}

/// Absolute form of `path` without `.`/`..`, with symlinks resolved for the
/// part that exists.
fn resolve(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                lexical.pop();
            }
            Component::CurDir => {}
            other => lexical.push(other),
        }
    }

    for existing in lexical.ancestors() {
        if let Ok(real) = fs::canonicalize(existing) {
            return match lexical.strip_prefix(existing) {
                Ok(rest) if !rest.as_os_str().is_empty() => real.join(rest),
                _ => real,
            };
        }
    }
    lexical
}

fn is_png(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

fn create_parent(path: &Path) -> Result<(), MergeError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| MergeError::io(parent, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cruncher::CopyCruncher;
    use crate::merger::ResourceMerger;
    use aarmerge_schema::ResourceSet;
    use std::cell::RefCell;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingCruncher {
        seen: RefCell<Vec<PathBuf>>,
    }

    impl ImageCruncher for RecordingCruncher {
        fn crunch(&self, from: &Path, to: &Path) -> anyhow::Result<()> {
            self.seen.borrow_mut().push(from.to_path_buf());
            CopyCruncher.crunch(from, to)
        }
    }

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_pngs_go_through_cruncher() {
        let dir = tempdir().unwrap();
        let res = dir.path().join("res");
        write(&res, "drawable/icon.png", "png");
        write(&res, "drawable/frame.9.png", "nine");
        write(&res, "layout/main.xml", "<FrameLayout/>");

        let mut merger = ResourceMerger::new();
        merger.add_set(ResourceSet::new("lib").with_root(&res));
        let merged = merger.merge().unwrap();

        let cruncher = RecordingCruncher::default();
        let out = dir.path().join("out");
        let summary = MergedResourceWriter::new(&out, &cruncher).write(&merged).unwrap();

        assert_eq!(summary.files, 3);
        assert_eq!(summary.crunched, 2);
        assert_eq!(cruncher.seen.borrow().len(), 2);
        assert!(out.join("drawable/frame.9.png").is_file());
        assert_eq!(
            fs::read_to_string(out.join("layout/main.xml")).unwrap(),
            "<FrameLayout/>"
        );
    }

    #[test]
    fn test_values_sorted_with_markers() {
        let dir = tempdir().unwrap();
        let res = dir.path().join("res");
        write(
            &res,
            "values/strings.xml",
            r#"<resources xmlns:tools="http://schemas.android.com/tools"><string name="b">B</string><color name="z">#000</color><string name="a">A</string></resources>"#,
        );

        let mut merger = ResourceMerger::new();
        merger.add_set(ResourceSet::new("lib").with_root(&res));
        let merged = merger.merge().unwrap();

        let out = dir.path().join("out");
        MergedResourceWriter::new(&out, &CopyCruncher)
            .with_source_markers(true)
            .write(&merged)
            .unwrap();

        let doc = fs::read_to_string(out.join("values/values.xml")).unwrap();
        assert!(doc.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n"));
        assert!(doc.contains("<resources xmlns:tools=\"http://schemas.android.com/tools\">"));
        let color = doc.find("name=\"z\"").unwrap();
        let a = doc.find("name=\"a\"").unwrap();
        let b = doc.find("name=\"b\"").unwrap();
        assert!(color < a && a < b);
        assert_eq!(doc.matches("<!-- From: file:").count(), 3);
    }

    #[test]
    fn test_output_is_replaced() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        write(&out, "layout/stale.xml", "<old/>");

        MergedResourceWriter::new(&out, &CopyCruncher)
            .write(&MergedResources::default())
            .unwrap();
        assert!(out.is_dir());
        assert!(!out.join("layout/stale.xml").exists());
    }

    #[test]
    fn test_refuses_to_overwrite_input() {
        let dir = tempdir().unwrap();
        let res = dir.path().join("res");
        write(&res, "layout/main.xml", "<FrameLayout/>");

        let mut merger = ResourceMerger::new();
        merger.add_set(ResourceSet::new("main").with_root(&res));
        let merged = merger.merge().unwrap();

        let err = MergedResourceWriter::new(dir.path(), &CopyCruncher)
            .write(&merged)
            .unwrap_err();
        assert!(matches!(err, MergeError::OutputOverlapsInput { .. }));
        assert!(res.join("layout/main.xml").is_file());
    }

    #[test]
    fn test_refuses_parent_reached_through_dot_dot() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("proj");
        let res = project.join("res");
        write(&res, "layout/main.xml", "<FrameLayout/>");

        let mut merger = ResourceMerger::new();
        merger.add_set(ResourceSet::new("main").with_root(&res));
        let merged = merger.merge().unwrap();

        let output = dir.path().join("missing/../proj");
        let err = MergedResourceWriter::new(&output, &CopyCruncher)
            .write(&merged)
            .unwrap_err();
        assert!(matches!(err, MergeError::OutputOverlapsInput { .. }));
        assert!(res.join("layout/main.xml").is_file());
    }

    #[test]
    fn test_refuses_to_replace_an_empty_root() {
        let dir = tempdir().unwrap();
        let lib = dir.path().join("lib/res");
        fs::create_dir_all(&lib).unwrap();
        fs::write(lib.join("keep.txt"), "loose file, not a resource").unwrap();

        let mut merger = ResourceMerger::new();
        merger.add_set(ResourceSet::new("lib").with_root(&lib));
        let merged = merger.merge().unwrap();
        assert!(merged.is_empty());

        let err = MergedResourceWriter::new(dir.path().join("lib"), &CopyCruncher)
            .write(&merged)
            .unwrap_err();
        assert!(matches!(err, MergeError::OutputOverlapsInput { .. }));
        assert!(lib.join("keep.txt").is_file());
    }

    #[test]
    fn test_refuses_output_inside_an_input() {
        let dir = tempdir().unwrap();
        let res = dir.path().join("res");
        write(&res, "layout/main.xml", "<FrameLayout/>");

        let mut merger = ResourceMerger::new();
        merger.add_set(ResourceSet::new("main").with_root(&res));
        let merged = merger.merge().unwrap();

        let err = MergedResourceWriter::new(res.join("merged"), &CopyCruncher)
            .write(&merged)
            .unwrap_err();
        assert!(matches!(err, MergeError::OutputOverlapsInput { .. }));
    }

    #[test]
    fn test_resolve_collapses_parent_components() {
        let dir = tempdir().unwrap();
        let real = fs::canonicalize(dir.path()).unwrap();
        assert_eq!(resolve(&dir.path().join("a/../b/./c")), real.join("b/c"));
        assert_eq!(resolve(dir.path()), real);
    }

    #[test]
    fn test_marker_url_is_comment_safe() {
        assert_eq!(marker_url(Path::new("/a--b/c.xml")), "file:/a-%2Db/c.xml");
    }
}
