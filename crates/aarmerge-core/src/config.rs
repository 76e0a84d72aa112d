//! Build configuration parsed from `aarmerge.toml`.
//!
//! ```toml
//! [project]
//! package = "com.example.app"
//! res_dir = "src/main/res"
//! symbols = "build/R.txt"
//!
//! [dependencies]
//! archives = ["libs/widget.aar", "libs/analytics.aar"]
//!
//! [output]
//! dir = "build/aarmerge"
//!
//! [tools]
//! javac = "/usr/lib/jvm/java-8/bin/javac"
//! aapt = "/opt/android-sdk/build-tools/23.0.3/aapt"
//! compile_timeout_secs = 120
//! ```
//!
//! Every section is optional. Relative paths are resolved against the
//! directory holding the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use aarmerge_schema::PackageName;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::compiler::DEFAULT_LANGUAGE_LEVEL;
use crate::exec::ExecConfig;

/// Default config file name.
pub const CONFIG_FILE: &str = "aarmerge.toml";

/// Top-level build configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// The consuming project.
    pub project: ProjectConfig,
    /// Library archives to merge.
    pub dependencies: DependenciesConfig,
    /// Output locations.
    pub output: OutputConfig,
    /// External tools.
    pub tools: ToolsConfig,
}

/// The `[project]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Package of the consuming application.
    pub package: Option<PackageName>,
    /// The project's own resource directory.
    pub res_dir: Option<PathBuf>,
    /// The project's final `R.txt`.
    pub symbols: Option<PathBuf>,
}

/// The `[dependencies]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DependenciesConfig {
    /// Archives in merge order (later ones override earlier ones).
    pub archives: Vec<PathBuf>,
}

/// The `[output]` section. Unset locations default to subdirectories of
/// `dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Base output directory.
    pub dir: PathBuf,
    /// Where archives are unpacked.
    pub unpack_root: Option<PathBuf>,
    /// Where `R.java` sources are written.
    pub generated_dir: Option<PathBuf>,
    /// Where merged resources are written.
    pub merged_res_dir: Option<PathBuf>,
    /// Where compiled classes are written.
    pub classes_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("build"),
            unpack_root: None,
            generated_dir: None,
            merged_res_dir: None,
            classes_dir: None,
        }
    }
}

impl OutputConfig {
    /// Unpack root, defaulting to `<dir>/exploded-aar`.
    pub fn unpack_root(&self) -> PathBuf {
        self.unpack_root
            .clone()
            .unwrap_or_else(|| self.dir.join("exploded-aar"))
    }

    /// Generated sources, defaulting to `<dir>/generated`.
    pub fn generated_dir(&self) -> PathBuf {
        self.generated_dir
            .clone()
            .unwrap_or_else(|| self.dir.join("generated"))
    }

    /// Merged resources, defaulting to `<dir>/res`.
    pub fn merged_res_dir(&self) -> PathBuf {
        self.merged_res_dir
            .clone()
            .unwrap_or_else(|| self.dir.join("res"))
    }

    /// Compiled classes, defaulting to `<dir>/classes`.
    pub fn classes_dir(&self) -> PathBuf {
        self.classes_dir
            .clone()
            .unwrap_or_else(|| self.dir.join("classes"))
    }
}

/// The `[tools]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// `javac` binary.
    pub javac: PathBuf,
    /// `aapt` binary. Without it PNGs are copied uncrunched.
    pub aapt: Option<PathBuf>,
    /// `-source`/`-target` level for generated classes.
    pub language_level: String,
    /// Kill `javac`/`aapt` after this many seconds.
    pub compile_timeout_secs: Option<u64>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            javac: PathBuf::from("javac"),
            aapt: None,
            language_level: DEFAULT_LANGUAGE_LEVEL.to_string(),
            compile_timeout_secs: None,
        }
    }
}

impl ToolsConfig {
    /// Process settings for tool invocations.
    pub fn exec_config(&self) -> ExecConfig {
        let mut exec = ExecConfig::default();
        if let Some(secs) = self.compile_timeout_secs {
            exec = exec.with_timeout(Duration::from_secs(secs));
        }
        exec
    }
}

impl BuildConfig {
    /// Asynchronously load a config file and resolve its relative paths
    /// against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    /// matching the schema.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Parse TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not match the schema.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `AARMERGE_*` environment overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `AARMERGE_*` overrides from `lookup`.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `AARMERGE_JAVAC` | `tools.javac` |
    /// | `AARMERGE_AAPT` | `tools.aapt` |
    /// | `AARMERGE_LANGUAGE_LEVEL` | `tools.language_level` |
    /// | `AARMERGE_COMPILE_TIMEOUT` | `tools.compile_timeout_secs` |
    ///
    /// Empty values and unparseable timeouts are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(javac) = get("AARMERGE_JAVAC") {
            self.tools.javac = PathBuf::from(javac);
        }
        if let Some(aapt) = get("AARMERGE_AAPT") {
            self.tools.aapt = Some(PathBuf::from(aapt));
        }
        if let Some(level) = get("AARMERGE_LANGUAGE_LEVEL") {
            self.tools.language_level = level.trim().to_string();
        }
        if let Some(secs) = get("AARMERGE_COMPILE_TIMEOUT").and_then(|v| v.trim().parse().ok()) {
            self.tools.compile_timeout_secs = Some(secs);
        }
    }

    /// Make every relative path absolute against `base`.
    ///
    /// Tool paths are left alone when they are bare names, so that they are
    /// still looked up on `PATH`.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        let join_tool = |p: &mut PathBuf| {
            if p.components().count() > 1 && p.is_relative() {
                *p = base.join(&*p);
            }
        };

        self.project.res_dir.iter_mut().for_each(join);
        self.project.symbols.iter_mut().for_each(join);
        self.dependencies.archives.iter_mut().for_each(join);
        join(&mut self.output.dir);
        self.output.unpack_root.iter_mut().for_each(join);
        self.output.generated_dir.iter_mut().for_each(join);
        self.output.merged_res_dir.iter_mut().for_each(join);
        self.output.classes_dir.iter_mut().for_each(join);
        join_tool(&mut self.tools.javac);
        self.tools.aapt.iter_mut().for_each(join_tool);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
[project]
package = "com.example.app"
res_dir = "src/main/res"
symbols = "build/R.txt"

[dependencies]
archives = ["libs/a.aar", "/abs/b.aar"]

[output]
dir = "out"
classes_dir = "/tmp/classes"

[tools]
aapt = "sdk/aapt"
compile_timeout_secs = 30
"#;

    #[test]
    fn test_parse_with_defaults() {
        let config = BuildConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.project.package.unwrap(), "com.example.app");
        assert_eq!(config.dependencies.archives.len(), 2);
        assert_eq!(config.output.generated_dir(), Path::new("out/generated"));
        assert_eq!(config.output.classes_dir(), Path::new("/tmp/classes"));
        assert_eq!(config.tools.javac, Path::new("javac"));
        assert_eq!(config.tools.language_level, "1.7");
        assert_eq!(
            config.tools.exec_config().timeout,
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_empty_config() {
        let config = BuildConfig::parse("").unwrap();
        assert!(config.project.package.is_none());
        assert_eq!(config.output.merged_res_dir(), Path::new("build/res"));
        assert!(config.tools.exec_config().timeout.is_none());
    }

    #[test]
    fn test_invalid_package_rejected() {
        assert!(BuildConfig::parse("[project]\npackage = \"com..app\"\n").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("AARMERGE_JAVAC", "/jdk/bin/javac"),
            ("AARMERGE_LANGUAGE_LEVEL", "1.8"),
            ("AARMERGE_COMPILE_TIMEOUT", "not-a-number"),
            ("AARMERGE_AAPT", ""),
        ]
        .into_iter()
        .collect();

        let mut config = BuildConfig::parse(SAMPLE).unwrap();
        config.apply_overrides(|k| env.get(k).map(ToString::to_string));

        assert_eq!(config.tools.javac, Path::new("/jdk/bin/javac"));
        assert_eq!(config.tools.language_level, "1.8");
        assert_eq!(config.tools.compile_timeout_secs, Some(30));
        assert_eq!(config.tools.aapt.as_deref(), Some(Path::new("sdk/aapt")));
    }

    #[tokio::test]
    async fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        tokio::fs::write(&path, SAMPLE).await.unwrap();

        let config = BuildConfig::load(&path).await.unwrap();
        assert_eq!(
            config.project.res_dir.unwrap(),
            dir.path().join("src/main/res")
        );
        assert_eq!(config.dependencies.archives[0], dir.path().join("libs/a.aar"));
        assert_eq!(config.dependencies.archives[1], Path::new("/abs/b.aar"));
        assert_eq!(config.output.dir, dir.path().join("out"));
        assert_eq!(config.tools.javac, Path::new("javac"));
        assert_eq!(config.tools.aapt.unwrap(), dir.path().join("sdk/aapt"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = BuildConfig::load(Path::new("/nonexistent/aarmerge.toml"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
