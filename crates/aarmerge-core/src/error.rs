//! Error taxonomy for a merge build.
//!
//! Two outcomes are kept apart:
//!
//! - [`BuildError`]: the build must be aborted. Unpack and symbol-load
//!   failures land here because no partially-catalogued dependency can
//!   produce a trustworthy binary.
//! - [`StepStatus::Failed`]: the step did not succeed but the worker keeps
//!   running and reports it (resource merge and compile failures).
//!
//! [`StepResult`] combines both into one tagged result.

use std::path::{Path, PathBuf};
use thiserror::Error;

use aarmerge_schema::SymbolError;

use crate::manifest::ManifestError;

/// A fatal error that aborts the build.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The archive could not be opened or one of its entries is corrupt.
    #[error("Failed to read archive {}", archive.display())]
    Archive {
        /// Archive being unpacked.
        archive: PathBuf,
        /// Underlying container error.
        #[source]
        source: zip::result::ZipError,
    },

    /// The archive's manifest is missing or does not yield a package name.
    #[error("Invalid manifest in {}", archive.display())]
    Manifest {
        /// Archive being unpacked.
        archive: PathBuf,
        /// What went wrong with the manifest.
        #[source]
        source: ManifestError,
    },

    /// An entry name would escape the unpack directory.
    #[error("Unsafe entry '{entry}' in archive {}", archive.display())]
    UnsafeEntry {
        /// Archive being unpacked.
        archive: PathBuf,
        /// Raw entry name.
        entry: String,
    },

    /// A symbol table is present but cannot be loaded.
    #[error("Failed to load symbol table {}", path.display())]
    SymbolLoad {
        /// Path of the table.
        path: PathBuf,
        /// Read or parse failure.
        #[source]
        source: SymbolError,
    },

    /// Filesystem failure while unpacking or writing generated sources.
    #[error("IO error at {}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The caller broke the engine's usage contract.
    #[error("Contract violation: {0}")]
    ContractViolation(&'static str),
}

impl BuildError {
    /// Wrap an I/O error with the path it happened at.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Outcome of a recoverable build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// The step completed.
    Succeeded,
    /// The step failed; the build reports it instead of crashing.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
}

impl StepStatus {
    /// Build a failed status from anything displayable.
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self::Failed {
            reason: reason.to_string(),
        }
    }

    /// Whether the step succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Pipeline step-result convention: `0` on success, `1` on failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Succeeded => 0,
            Self::Failed { .. } => 1,
        }
    }
}

impl From<bool> for StepStatus {
    fn from(ok: bool) -> Self {
        if ok {
            Self::Succeeded
        } else {
            Self::failed("step reported failure")
        }
    }
}

/// Either a step status, or a fatal error that aborts the build.
pub type StepResult = Result<StepStatus, BuildError>;
