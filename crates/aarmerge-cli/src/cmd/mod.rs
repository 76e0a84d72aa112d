//! Subcommand implementations.

pub mod build;
pub mod inspect;
pub mod symbols;
