//! The merge engine: an append-only set of unpacked library archives.
//!
//! Archives are added once, in order. The engine accumulates their class
//! jars, resource files, assets, native libraries and symbol tables, and
//! drives the two build steps that need all of them at once:
//!
//! 1. [`AarLibraries::merge_resources`] merges every archive's `res/` with
//!    the project's own resources (project wins).
//! 2. [`AarLibraries::write_symbol_classes`] writes one `R.java` per
//!    library package with IDs from the project's final symbol table and
//!    compiles them in a single batch.
//!
//! Re-running either step is allowed and rewrites its outputs.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use aarmerge_schema::{MAIN_SET_NAME, PackageName, ResourceSet, SymbolTable};
use tracing::{debug, error, info, warn};

use crate::archive::ArchiveView;
use crate::compiler::{BatchCompiler, CompileRequest};
use crate::cruncher::ImageCruncher;
use crate::error::{BuildError, StepResult, StepStatus};
use crate::merger::{MergedResourceWriter, ResourceMerger};
use crate::symbols::SymbolWriter;

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Nothing added yet.
    Empty,
    /// Archives are being added.
    Accumulating,
    /// Resources have been merged at least once.
    Merged,
    /// Symbol classes have been written and compiled at least once.
    Compiled,
}

/// An ordered, duplicate-free collection of unpacked library archives.
#[derive(Debug)]
pub struct AarLibraries {
    generated_dir: PathBuf,
    archives: Vec<ArchiveView>,
    identities: HashSet<PathBuf>,
    classes: BTreeSet<PathBuf>,
    resources: BTreeSet<PathBuf>,
    assets: BTreeSet<PathBuf>,
    natives: BTreeSet<PathBuf>,
    symbols: BTreeMap<PackageName, Vec<SymbolTable>>,
    state: EngineState,
}

impl AarLibraries {
    /// An empty engine writing generated sources under `generated_dir`.
    pub fn new(generated_dir: impl Into<PathBuf>) -> Self {
        Self {
            generated_dir: generated_dir.into(),
            archives: Vec::new(),
            identities: HashSet::new(),
            classes: BTreeSet::new(),
            resources: BTreeSet::new(),
            assets: BTreeSet::new(),
            natives: BTreeSet::new(),
            symbols: BTreeMap::new(),
            state: EngineState::Empty,
        }
    }

    /// Add an unpacked archive.
    ///
    /// Returns `Ok(false)` if an archive with the same path was already
    /// added; nothing changes in that case.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::SymbolLoad`] if the archive ships a symbol table
    /// that cannot be read. The engine is left unchanged.
    pub fn add(&mut self, archive: ArchiveView) -> Result<bool, BuildError> {
        if self.identities.contains(archive.path()) {
            debug!(archive = %archive.path().display(), "archive already added");
            return Ok(false);
        }

        let table = archive
            .symbol_file()
            .map(|path| {
                SymbolTable::load(path).map_err(|source| BuildError::SymbolLoad {
                    path: path.to_path_buf(),
                    source,
                })
            })
            .transpose()?;

        if matches!(self.state, EngineState::Merged | EngineState::Compiled) {
            warn!(
                archive = %archive.path().display(),
                "archive added after a build step ran; re-run it to include this archive"
            );
        }

        self.identities.insert(archive.path().to_path_buf());
        self.classes.extend(archive.classes_jar().map(Path::to_path_buf));
        self.classes.extend(archive.libraries().iter().cloned());
        self.resources.extend(archive.resources().iter().cloned());
        self.assets.extend(archive.assets().iter().cloned());
        self.natives.extend(archive.natives().iter().cloned());
        if let Some(table) = table {
            self.symbols
                .entry(archive.package_name().clone())
                .or_default()
                .push(table);
        }

        info!(
            archive = %archive.simple_name(),
            package = %archive.package_name(),
            "added library archive"
        );
        self.archives.push(archive);
        if self.state == EngineState::Empty {
            self.state = EngineState::Accumulating;
        }
        Ok(true)
    }

    /// Unpack `archive_path` under `unpack_root` and add it, unless an
    /// archive with that path is already present, in which case nothing is
    /// unpacked.
    ///
    /// # Errors
    ///
    /// Returns the unpack or symbol-load error that aborts the build.
    pub fn add_archive(
        &mut self,
        archive_path: &Path,
        unpack_root: &Path,
    ) -> Result<bool, BuildError> {
        if self.contains(archive_path) {
            debug!(archive = %archive_path.display(), "archive already added");
            return Ok(false);
        }
        self.add(ArchiveView::unpack(archive_path, unpack_root)?)
    }

    /// Archives cannot be removed once added.
    ///
    /// # Errors
    ///
    /// Always returns [`BuildError::ContractViolation`].
    pub fn remove(&self, archive: &ArchiveView) -> Result<(), BuildError> {
        warn!(
            archive = %archive.path().display(),
            held = self.archives.len(),
            "attempted to remove a library archive"
        );
        Err(BuildError::ContractViolation(
            "library archives cannot be removed once added",
        ))
    }

    /// Number of archives added.
    pub fn len(&self) -> usize {
        self.archives.len()
    }

    /// Whether no archive was added.
    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    /// Archives in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ArchiveView> {
        self.archives.iter()
    }

    /// Whether an archive with this path was added.
    pub fn contains(&self, archive_path: &Path) -> bool {
        self.identities.contains(archive_path)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Root under which `R.java` files are written.
    pub fn generated_dir(&self) -> &Path {
        &self.generated_dir
    }

    /// Class jars: every `classes.jar` plus every `libs/*.jar`.
    pub fn classes(&self) -> &BTreeSet<PathBuf> {
        &self.classes
    }

    /// Every file under any archive's `res/`.
    pub fn resources(&self) -> &BTreeSet<PathBuf> {
        &self.resources
    }

    /// Every file under any archive's `assets/`.
    pub fn assets(&self) -> &BTreeSet<PathBuf> {
        &self.assets
    }

    /// Every file under any archive's `jni/`.
    pub fn natives(&self) -> &BTreeSet<PathBuf> {
        &self.natives
    }

    /// Packages that have at least one symbol table, in name order.
    pub fn symbol_packages(&self) -> impl Iterator<Item = &PackageName> {
        self.symbols.keys()
    }

    /// Symbol tables contributed under `package`, in insertion order.
    pub fn symbols_for(&self, package: &PackageName) -> &[SymbolTable] {
        self.symbols.get(package).map(Vec::as_slice).unwrap_or_default()
    }

    /// One resource set per archive that has a `res/` directory, named
    /// after the archive, in insertion order.
    pub fn resource_sets(&self) -> Vec<ResourceSet> {
        self.archives
            .iter()
            .filter_map(|archive| {
                archive
                    .res_directory()
                    .map(|dir| ResourceSet::new(archive.simple_name()).with_root(dir))
            })
            .collect()
    }

    /// Merge every archive's resources with the project's into
    /// `output_dir`. The project's resources take precedence.
    ///
    /// Failures are logged and reported as [`StepStatus::Failed`].
    pub fn merge_resources(
        &mut self,
        output_dir: &Path,
        project_res_dir: &Path,
        cruncher: &dyn ImageCruncher,
    ) -> StepStatus {
        let mut merger = ResourceMerger::new();
        for set in self.resource_sets() {
            merger.add_set(set);
        }
        merger.add_set(ResourceSet::new(MAIN_SET_NAME).with_root(project_res_dir));

        let result = merger.merge().and_then(|merged| {
            MergedResourceWriter::new(output_dir, cruncher)
                .with_source_markers(true)
                .write(&merged)
        });
        self.state = EngineState::Merged;

        match result {
            Ok(summary) => {
                info!(
                    sets = merger.sets().len(),
                    files = summary.files,
                    values = summary.values,
                    "resource merge succeeded"
                );
                StepStatus::Succeeded
            }
            Err(e) => {
                let reason = format!("{:#}", anyhow::Error::new(e));
                error!(output = %output_dir.display(), "resource merge failed: {reason}");
                StepStatus::failed(reason)
            }
        }
    }

    /// Write one `R.java` per library package under the generated directory
    /// and compile them all into `output_dir` in one compiler invocation.
    ///
    /// Values come from `project_symbols`, the project's final symbol table.
    /// Every library package gets a class, `project_package` included.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`BuildError`] if the project table cannot be loaded
    /// or a source file cannot be written. A compiler failure is reported as
    /// [`StepStatus::Failed`].
    pub fn write_symbol_classes(
        &mut self,
        output_dir: &Path,
        project_package: &PackageName,
        project_symbols: &Path,
        compiler: &dyn BatchCompiler,
    ) -> StepResult {
        let base = SymbolTable::load(project_symbols).map_err(|source| BuildError::SymbolLoad {
            path: project_symbols.to_path_buf(),
            source,
        })?;

        let mut sources = Vec::with_capacity(self.symbols.len());
        for (package, tables) in &self.symbols {
            let mut writer = SymbolWriter::new(&self.generated_dir, package.clone(), &base);
            for table in tables {
                writer.add_symbols(table);
            }
            let path = writer
                .write()
                .map_err(|e| BuildError::io(writer.source_path(), e))?;
            debug!(package = %package, path = %path.display(), "wrote symbol class");
            sources.push(path);
        }
        info!(
            project = %project_package,
            classes = sources.len(),
            "generated library symbol classes"
        );

        let request = CompileRequest {
            sources,
            source_dir: self.generated_dir.clone(),
            output_dir: output_dir.to_path_buf(),
        };
        let outcome = compiler.compile(&request);
        self.state = EngineState::Compiled;

        Ok(match outcome {
            Ok(true) => StepStatus::Succeeded,
            Ok(false) => {
                error!("symbol class compilation failed");
                StepStatus::failed("symbol class compilation failed")
            }
            Err(e) => {
                error!("symbol class compilation could not run: {e:#}");
                StepStatus::failed(format!("{e:#}"))
            }
        })
    }
}

impl<'a> IntoIterator for &'a AarLibraries {
    type Item = &'a ArchiveView;
    type IntoIter = std::slice::Iter<'a, ArchiveView>;

    fn into_iter(self) -> Self::IntoIter {
        self.archives.iter()
    }
}
