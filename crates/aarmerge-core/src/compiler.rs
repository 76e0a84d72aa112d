//! Batch compilation of generated symbol classes.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::exec::{self, ExecConfig};

/// Default Java source/target level for generated `R` classes.
pub const DEFAULT_LANGUAGE_LEVEL: &str = "1.7";

/// One compiler invocation over a batch of sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    /// Source files to compile.
    pub sources: Vec<PathBuf>,
    /// Root of the generated source tree (`-sourcepath`).
    pub source_dir: PathBuf,
    /// Where class files go (`-d`).
    pub output_dir: PathBuf,
}

/// Something that can compile a batch of Java sources.
pub trait BatchCompiler {
    /// Compile `request` in a single invocation.
    ///
    /// Returns `Ok(false)` when the compiler ran and reported errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the compiler could not be run at all.
    fn compile(&self, request: &CompileRequest) -> Result<bool>;
}

/// `javac` driven as a child process.
#[derive(Debug, Clone)]
pub struct JavacCompiler {
    javac: PathBuf,
    language_level: String,
    exec: ExecConfig,
}

impl JavacCompiler {
    /// Use the `javac` at `javac` (a bare name is looked up on `PATH`).
    pub fn new(javac: impl Into<PathBuf>) -> Self {
        Self {
            javac: javac.into(),
            language_level: DEFAULT_LANGUAGE_LEVEL.to_string(),
            exec: ExecConfig::default(),
        }
    }

    /// Override `-source`/`-target`.
    pub fn with_language_level(mut self, level: impl Into<String>) -> Self {
        self.language_level = level.into();
        self
    }

    /// Run `javac` under `exec`.
    pub fn with_exec(mut self, exec: ExecConfig) -> Self {
        self.exec = exec;
        self
    }

    /// The command line that [`compile`](BatchCompiler::compile) runs.
    pub fn command(&self, request: &CompileRequest) -> Command {
        let mut cmd = Command::new(&self.javac);
        cmd.arg("-source")
            .arg(&self.language_level)
            .arg("-target")
            .arg(&self.language_level)
            .arg("-d")
            .arg(&request.output_dir)
            .arg("-sourcepath")
            .arg(&request.source_dir)
            .args(&request.sources);
        cmd
    }
}

impl BatchCompiler for JavacCompiler {
    fn compile(&self, request: &CompileRequest) -> Result<bool> {
        if request.sources.is_empty() {
            debug!("no sources to compile");
            return Ok(true);
        }

        fs::create_dir_all(&request.output_dir)
            .with_context(|| format!("Failed to create {}", request.output_dir.display()))?;

        debug!(sources = request.sources.len(), "running javac");
        let output = exec::run(self.command(request), &self.exec)
            .with_context(|| format!("Failed to run {}", self.javac.display()))?;

        if !output.success() {
            warn!(
                code = ?output.code,
                stderr = %output.stderr.trim(),
                "javac reported errors"
            );
        }
        Ok(output.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn request(root: &std::path::Path, sources: &[&str]) -> CompileRequest {
        CompileRequest {
            sources: sources.iter().map(|s| root.join(s)).collect(),
            source_dir: root.join("gen"),
            output_dir: root.join("classes"),
        }
    }

    #[test]
    fn test_command_line() {
        let req = request(std::path::Path::new("/b"), &["gen/com/a/R.java"]);
        let cmd = JavacCompiler::new("javac").command(&req);
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            [
                "-source",
                "1.7",
                "-target",
                "1.7",
                "-d",
                "/b/classes",
                "-sourcepath",
                "/b/gen",
                "/b/gen/com/a/R.java"
            ]
        );
    }

    #[test]
    fn test_language_level_override() {
        let req = request(std::path::Path::new("/b"), &[]);
        let cmd = JavacCompiler::new("javac")
            .with_language_level("1.8")
            .command(&req);
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args[1], "1.8");
        assert_eq!(args[3], "1.8");
    }

    #[test]
    fn test_empty_batch_does_not_spawn() {
        let dir = tempdir().unwrap();
        let compiler = JavacCompiler::new("aarmerge-no-such-javac");
        assert!(compiler.compile(&request(dir.path(), &[])).unwrap());
    }

    #[test]
    fn test_missing_javac_is_an_error() {
        let dir = tempdir().unwrap();
        let compiler = JavacCompiler::new("aarmerge-no-such-javac");
        assert!(compiler.compile(&request(dir.path(), &["gen/R.java"])).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_javac_reports_false() {
        let dir = tempdir().unwrap();
        let compiler = JavacCompiler::new("/bin/false");
        assert!(!compiler.compile(&request(dir.path(), &["gen/R.java"])).unwrap());
        assert!(dir.path().join("classes").is_dir());
    }
}
