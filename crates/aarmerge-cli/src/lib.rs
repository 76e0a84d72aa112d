//! aarmerge - merge Android library archives into one build.
//!
//! ```text
//! aarmerge build               # unpack, merge resources, regenerate R classes
//! aarmerge inspect lib.aar     # list what an archive contains
//! aarmerge symbols R.txt ...   # regenerate one R.java without compiling
//! ```
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]

pub mod cmd;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "aarmerge")]
#[command(version = env!("AARMERGE_VERSION"), about = "aarmerge - merge Android library archives into one build")]
pub struct Cli {
    /// Log at debug level and stream javac/aapt output (RUST_LOG overrides the level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Unpack archives, merge resources and compile library R classes
    Build(BuildArgs),
    /// Show the classified contents of an archive
    Inspect {
        /// Archive to inspect
        archive: PathBuf,
        /// Only read the package name, do not unpack
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate one rebased R.java without compiling it
    Symbols {
        /// The library's R.txt
        symbols: PathBuf,
        /// The project's final R.txt supplying the values
        #[arg(long)]
        base: PathBuf,
        /// Package of the generated class
        #[arg(long)]
        package: String,
        /// Source root to write into
        #[arg(long, default_value = "generated")]
        out: PathBuf,
        /// Also write the rebased symbols as an R.txt here
        #[arg(long, value_name = "PATH")]
        r_txt: Option<PathBuf>,
    },
}

/// Arguments of `aarmerge build`. Flags override the config file.
#[derive(Debug, Default, Args)]
pub struct BuildArgs {
    /// Config file (defaults to ./aarmerge.toml when present)
    #[arg(long, short, env = "AARMERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Library archive to merge; repeat for several, in override order
    #[arg(long = "archive", value_name = "AAR")]
    pub archives: Vec<PathBuf>,

    /// The project's own resource directory
    #[arg(long, value_name = "DIR")]
    pub project_res: Option<PathBuf>,

    /// The project's package name
    #[arg(long, value_name = "PKG")]
    pub project_package: Option<String>,

    /// The project's final R.txt
    #[arg(long, value_name = "R.txt")]
    pub project_symbols: Option<PathBuf>,

    /// Base output directory
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Kill javac/aapt after this many seconds
    #[arg(long, value_name = "SECS")]
    pub compile_timeout: Option<u64>,

    /// Copy PNGs instead of crunching them with aapt
    #[arg(long)]
    pub no_crunch: bool,
}
