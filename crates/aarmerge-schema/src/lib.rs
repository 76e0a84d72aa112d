//! Shared types for aarmerge.
//!
//! Everything here is pure data plus light parsing: package names, the fixed
//! archive content classification table, resource-ID symbol tables and
//! resource sets. The I/O-heavy work (unpacking, merging, compiling) lives in
//! `aarmerge-core`.

pub mod content;
pub mod resource_set;
pub mod symbols;
pub mod types;

// Re-exports
pub use content::ContentKind;
pub use resource_set::ResourceSet;
pub use symbols::{JavaType, SymbolEntry, SymbolError, SymbolTable, SymbolValue};
pub use types::{PackageName, PackageNameError};

/// Name of the resource set holding the project's own resources.
///
/// This set is always merged last so that it wins over every dependency.
pub const MAIN_SET_NAME: &str = "main";
