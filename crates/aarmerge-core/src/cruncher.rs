//! PNG crunching during resource merge.
//!
//! Every `.png` file resource (9-patch included) passes through an
//! [`ImageCruncher`] on its way to the merged output.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::exec::{self, ExecConfig};

/// Copies an image from `from` to `to`, optimizing it on the way.
pub trait ImageCruncher {
    /// Crunch one image. Parent directories of `to` may not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be read, processed or written.
    fn crunch(&self, from: &Path, to: &Path) -> Result<()>;
}

/// A cruncher that copies bytes unchanged.
///
/// Used when no `aapt` is configured, and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyCruncher;

impl ImageCruncher for CopyCruncher {
    fn crunch(&self, from: &Path, to: &Path) -> Result<()> {
        ensure_parent(to)?;
        fs::copy(from, to)
            .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
        Ok(())
    }
}

/// Crunches through `aapt singleCrunch`.
#[derive(Debug, Clone)]
pub struct AaptCruncher {
    aapt: PathBuf,
    exec: ExecConfig,
}

impl AaptCruncher {
    /// Use the `aapt` binary at `aapt` (a bare name is looked up on `PATH`).
    pub fn new(aapt: impl Into<PathBuf>) -> Self {
        Self {
            aapt: aapt.into(),
            exec: ExecConfig::default(),
        }
    }

    /// Run `aapt` under `exec`.
    pub fn with_exec(mut self, exec: ExecConfig) -> Self {
        self.exec = exec;
        self
    }

    fn command(&self, from: &Path, to: &Path) -> Command {
        let mut cmd = Command::new(&self.aapt);
        cmd.arg("singleCrunch").arg("-i").arg(from).arg("-o").arg(to);
        cmd
    }
}

impl ImageCruncher for AaptCruncher {
    fn crunch(&self, from: &Path, to: &Path) -> Result<()> {
        ensure_parent(to)?;
        debug!(from = %from.display(), to = %to.display(), "aapt singleCrunch");

        let output = exec::run(self.command(from, to), &self.exec)
            .with_context(|| format!("Failed to run {}", self.aapt.display()))?;
        if !output.success() {
            bail!(
                "aapt failed to crunch {} (exit {:?}): {}",
                from.display(),
                output.code,
                output.stderr.trim()
            );
        }
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_copy_cruncher_creates_parents() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("icon.png");
        fs::write(&from, b"\x89PNG fake").unwrap();
        let to = dir.path().join("out/drawable-hdpi/icon.png");

        CopyCruncher.crunch(&from, &to).unwrap();
        assert_eq!(fs::read(&to).unwrap(), b"\x89PNG fake");
    }

    #[test]
    fn test_aapt_command_line() {
        let cruncher = AaptCruncher::new("/sdk/build-tools/aapt");
        let cmd = cruncher.command(Path::new("in/a.9.png"), Path::new("out/a.9.png"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(cmd.get_program(), "/sdk/build-tools/aapt");
        assert_eq!(args, ["singleCrunch", "-i", "in/a.9.png", "-o", "out/a.9.png"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_aapt_failure_is_reported() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("icon.png");
        fs::write(&from, b"png").unwrap();

        let err = AaptCruncher::new("/bin/false")
            .crunch(&from, &dir.path().join("out/icon.png"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("aapt failed"));
    }
}
