//! Library archive (AAR) merge engine.
//!
//! Unpacks Android library archives, merges their resources with the
//! consuming project's, and regenerates each library's `R` class with the
//! project's final resource IDs.
//!
//! The entry point is [`AarLibraries`]; [`ArchiveView`] is the unpacked
//! form of a single archive.

pub mod archive;
pub mod compiler;
pub mod config;
pub mod cruncher;
pub mod engine;
pub mod error;
pub mod exec;
pub mod manifest;
pub mod merger;
pub mod paths;
pub mod symbols;

pub use archive::ArchiveView;
pub use compiler::{BatchCompiler, CompileRequest, JavacCompiler};
pub use config::BuildConfig;
pub use cruncher::{AaptCruncher, CopyCruncher, ImageCruncher};
pub use engine::{AarLibraries, EngineState};
pub use error::{BuildError, StepResult, StepStatus};
pub use merger::{MergeError, ResourceMerger};
pub use symbols::SymbolWriter;

/// Re-exported shared types.
pub use aarmerge_schema as schema;
