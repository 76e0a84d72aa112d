//! aarmerge - merge Android library archives into one build

use std::process::ExitCode;

use aarmerge_cli::cmd;
use aarmerge_cli::{Cli, Commands};
use aarmerge_core::StepStatus;
use clap::Parser;
use crossterm::style::Stylize;
use tracing_subscriber::EnvFilter;

/// Exit code for errors that abort the build.
const EXIT_FATAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Build(args) => cmd::build::build(args, cli.verbose).await,
        Commands::Inspect { archive, dry_run } => {
            cmd::inspect::inspect(&archive, dry_run).map(|()| StepStatus::Succeeded)
        }
        Commands::Symbols {
            symbols,
            base,
            package,
            out,
            r_txt,
        } => cmd::symbols::symbols(&symbols, &base, &package, &out, r_txt.as_deref())
            .map(|_| StepStatus::Succeeded),
    };

    match result {
        Ok(status) => ExitCode::from(u8::try_from(status.exit_code()).unwrap_or(1)),
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::from(EXIT_FATAL)
        }
    }
}
