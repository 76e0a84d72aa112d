//! Build command

use std::path::{Path, PathBuf};

use aarmerge_core::config::CONFIG_FILE;
use aarmerge_core::exec::ExecConfig;
use aarmerge_core::schema::PackageName;
use aarmerge_core::{
    AaptCruncher, AarLibraries, BuildConfig, CopyCruncher, ImageCruncher, JavacCompiler,
    StepStatus,
};
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use tracing::{info, warn};

use crate::BuildArgs;

/// Everything a build needs, resolved from config, environment and flags.
#[derive(Debug)]
struct Plan {
    config: BuildConfig,
    package: PackageName,
    project_res: PathBuf,
    project_symbols: PathBuf,
    crunch: bool,
    stream_output: bool,
}

impl Plan {
    /// Tool settings: the configured timeout, plus streamed output when
    /// running verbosely.
    fn exec_config(&self) -> ExecConfig {
        self.config
            .tools
            .exec_config()
            .inherit_output(self.stream_output)
    }
}

/// Run a full merge build.
///
/// Fatal errors (bad archive, unreadable symbol table, missing settings)
/// are returned as `Err`. A failed merge or compile is returned as
/// [`StepStatus::Failed`].
///
/// With `verbose`, `javac` and `aapt` write straight to the terminal.
pub async fn build(args: BuildArgs, verbose: bool) -> Result<StepStatus> {
    let config = load_config(args.config.as_deref()).await?;
    let mut plan = plan(config, args)?;
    plan.stream_output = verbose;

    tokio::task::spawn_blocking(move || run(&plan))
        .await
        .context("Build task panicked")?
}

async fn load_config(explicit: Option<&Path>) -> Result<BuildConfig> {
    let mut config = match explicit {
        Some(path) => BuildConfig::load(path).await?,
        None if Path::new(CONFIG_FILE).is_file() => {
            BuildConfig::load(Path::new(CONFIG_FILE)).await?
        }
        None => BuildConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

fn plan(mut config: BuildConfig, args: BuildArgs) -> Result<Plan> {
    config.dependencies.archives.extend(args.archives);
    if let Some(out) = args.out {
        config.output.dir = out;
    }
    if let Some(secs) = args.compile_timeout {
        config.tools.compile_timeout_secs = Some(secs);
    }

    let package = match args.project_package {
        Some(name) => PackageName::validated(&name)?,
        None => config
            .project
            .package
            .clone()
            .context("No project package: set [project] package or pass --project-package")?,
    };
    let project_res = args
        .project_res
        .or_else(|| config.project.res_dir.clone())
        .context("No project resources: set [project] res_dir or pass --project-res")?;
    let project_symbols = args
        .project_symbols
        .or_else(|| config.project.symbols.clone())
        .context("No project symbol table: set [project] symbols or pass --project-symbols")?;

    Ok(Plan {
        config,
        package,
        project_res,
        project_symbols,
        crunch: !args.no_crunch,
        stream_output: false,
    })
}

fn run(plan: &Plan) -> Result<StepStatus> {
    let config = &plan.config;
    let output = &config.output;
    let exec = plan.exec_config();

    if config.dependencies.archives.is_empty() {
        warn!("no library archives configured");
    }

    let mut engine = AarLibraries::new(output.generated_dir());
    let unpack_root = output.unpack_root();
    for archive in &config.dependencies.archives {
        engine.add_archive(archive, &unpack_root)?;
    }

    let cruncher: Box<dyn ImageCruncher> = match &config.tools.aapt {
        Some(aapt) if plan.crunch => Box::new(AaptCruncher::new(aapt).with_exec(exec.clone())),
        _ => Box::new(CopyCruncher),
    };
    let merged_res = output.merged_res_dir();
    let status = engine.merge_resources(&merged_res, &plan.project_res, cruncher.as_ref());
    if let StepStatus::Failed { reason } = &status {
        eprintln!("{} {reason}", "Resource merge failed:".red().bold());
        return Ok(status);
    }

    let compiler = JavacCompiler::new(&config.tools.javac)
        .with_language_level(&config.tools.language_level)
        .with_exec(exec);
    let classes = output.classes_dir();
    let status =
        engine.write_symbol_classes(&classes, &plan.package, &plan.project_symbols, &compiler)?;
    if let StepStatus::Failed { reason } = &status {
        eprintln!("{} {reason}", "Symbol class compilation failed:".red().bold());
        return Ok(status);
    }

    info!(archives = engine.len(), "build finished");
    println!(
        "{} {} archive(s), {} package(s)",
        "Merged".green().bold(),
        engine.len(),
        engine.symbol_packages().count()
    );
    println!("  {:<10}{}", "resources", merged_res.display().to_string().dark_grey());
    println!(
        "  {:<10}{}",
        "sources",
        engine.generated_dir().display().to_string().dark_grey()
    );
    println!("  {:<10}{}", "classes", classes.display().to_string().dark_grey());
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> BuildArgs {
        BuildArgs {
            project_res: Some(PathBuf::from("app/res")),
            project_symbols: Some(PathBuf::from("app/R.txt")),
            project_package: Some("com.example.app".to_string()),
            ..BuildArgs::default()
        }
    }

    #[test]
    fn test_flags_override_config() {
        let config = BuildConfig::parse(
            r#"
[project]
package = "com.example.fromfile"
res_dir = "file/res"

[dependencies]
archives = ["a.aar"]

[tools]
compile_timeout_secs = 10
"#,
        )
        .unwrap();

        let mut args = args();
        args.archives = vec![PathBuf::from("b.aar")];
        args.out = Some(PathBuf::from("out"));
        args.compile_timeout = Some(99);

        let plan = plan(config, args).unwrap();
        assert_eq!(plan.package, "com.example.app");
        assert_eq!(plan.project_res, Path::new("app/res"));
        assert_eq!(
            plan.config.dependencies.archives,
            [PathBuf::from("a.aar"), PathBuf::from("b.aar")]
        );
        assert_eq!(plan.config.output.classes_dir(), Path::new("out/classes"));
        assert_eq!(plan.config.tools.compile_timeout_secs, Some(99));
        assert!(plan.crunch);
    }

    #[test]
    fn test_missing_settings_are_reported() {
        let err = plan(BuildConfig::default(), BuildArgs::default()).unwrap_err();
        assert!(err.to_string().contains("--project-package"));

        let mut args = args();
        args.project_symbols = None;
        let err = plan(BuildConfig::default(), args).unwrap_err();
        assert!(err.to_string().contains("--project-symbols"));
    }

    #[test]
    fn test_verbose_streams_tool_output() {
        let config = BuildConfig::parse("[tools]\ncompile_timeout_secs = 5\n").unwrap();
        let mut plan = plan(config, args()).unwrap();
        assert!(!plan.exec_config().inherit_output);

        plan.stream_output = true;
        let exec = plan.exec_config();
        assert!(exec.inherit_output);
        assert_eq!(exec.timeout, Some(std::time::Duration::from_secs(5)));
    }

    #[test]
    fn test_invalid_package_flag() {
        let mut args = args();
        args.project_package = Some("1com.example".to_string());
        assert!(plan(BuildConfig::default(), args).is_err());
    }
}
