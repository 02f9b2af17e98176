//! Configuration for citemark paths and matching.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CITEMARK_HOME, CITEMARK_OUTPUT)
//! 2. Config file (.citemark/config.yaml)
//! 3. Defaults (~/.citemark)
//!
//! Config file discovery:
//! - Searches current directory and parents for .citemark/config.yaml
//! - `paths.home` is relative to the .citemark/ directory
//! - `paths.output` is relative to the project root (parent of .citemark/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::{EngineSettings, DEFAULT_LINE_TOLERANCE};
use crate::layout::LayoutOptions;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub matching: Option<MatchingConfig>,
    #[serde(default)]
    pub layout: Option<LayoutConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory holding the ledger (relative to .citemark/)
    pub home: Option<String>,
    /// Directory for annotated documents (relative to project root)
    pub output: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    pub line_tolerance: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayoutConfig {
    pub word_margin: Option<f32>,
    pub line_break_ratio: Option<f32>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory (ledger)
    pub home: PathBuf,
    /// Default directory for annotated documents
    pub output: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Engine tunables
    pub engine: EngineSettings,
}

impl ResolvedConfig {
    /// Default annotated output path for an input document: `<output>/<stem>.highlighted.pdf`
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        self.output.join(format!("{}.highlighted.pdf", stem))
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".citemark").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Engine settings from the config file, defaults for anything unset
fn engine_settings(config: &ConfigFile) -> EngineSettings {
    let defaults = LayoutOptions::default();
    let layout = config.layout.as_ref();

    EngineSettings {
        line_tolerance: config
            .matching
            .as_ref()
            .and_then(|m| m.line_tolerance)
            .unwrap_or(DEFAULT_LINE_TOLERANCE),
        layout: LayoutOptions {
            word_margin: layout
                .and_then(|l| l.word_margin)
                .unwrap_or(defaults.word_margin),
            line_break_ratio: layout
                .and_then(|l| l.line_break_ratio)
                .unwrap_or(defaults.line_break_ratio),
        },
    }
}

/// Resolve configuration from an optional config file and an environment lookup
fn resolve_config(
    config_file: Option<PathBuf>,
    default_home: PathBuf,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let (home, output, engine) = if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;

        // .citemark/ and the project root above it
        let citemark_dir = config_path.parent().unwrap_or(Path::new("."));
        let base_dir = citemark_dir.parent().unwrap_or(Path::new("."));

        let home = if let Some(env_home) = env("CITEMARK_HOME") {
            PathBuf::from(env_home)
        } else if let Some(ref home_path) = config.paths.home {
            resolve_path(citemark_dir, home_path)
        } else {
            default_home
        };

        let output = if let Some(env_out) = env("CITEMARK_OUTPUT") {
            PathBuf::from(env_out)
        } else if let Some(ref out_path) = config.paths.output {
            resolve_path(base_dir, out_path)
        } else {
            home.join("highlighted")
        };

        let engine = engine_settings(&config);
        (home, output, engine)
    } else {
        // No config file - use env vars or defaults
        let home = env("CITEMARK_HOME")
            .map(PathBuf::from)
            .unwrap_or(default_home);

        let output = env("CITEMARK_OUTPUT")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("highlighted"));

        (home, output, EngineSettings::default())
    };

    Ok(ResolvedConfig {
        home,
        output,
        config_file,
        engine,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".citemark");

    resolve_config(find_config_file(), default_home, |key| std::env::var(key).ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Get the ledger directory ($CITEMARK_HOME)
pub fn ledger_dir() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(temp: &TempDir, body: &str) -> PathBuf {
        let citemark_dir = temp.path().join(".citemark");
        std::fs::create_dir_all(&citemark_dir).unwrap();
        let config_path = citemark_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "{}", body).unwrap();
        config_path
    }

    #[test]
    fn test_defaults_without_file() {
        let home = PathBuf::from("/users/test/.citemark");
        let config = resolve_config(None, home.clone(), no_env).unwrap();

        assert_eq!(config.home, home);
        assert_eq!(config.output, home.join("highlighted"));
        assert!(config.config_file.is_none());
        assert_eq!(config.engine, EngineSettings::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [("CITEMARK_HOME", "/state"), ("CITEMARK_OUTPUT", "/out")]
            .into_iter()
            .collect();
        let config = resolve_config(None, PathBuf::from("/unused"), |k| {
            env.get(k).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.home, PathBuf::from("/state"));
        assert_eq!(config.output, PathBuf::from("/out"));
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
paths:
  home: ./
  output: ../highlighted
matching:
  line_tolerance: 3.5
layout:
  word_margin: 0.2
"#,
        );

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.paths.home, Some("./".to_string()));
        assert_eq!(config.paths.output, Some("../highlighted".to_string()));

        let engine = engine_settings(&config);
        assert_eq!(engine.line_tolerance, 3.5);
        assert_eq!(engine.layout.word_margin, 0.2);
        assert_eq!(engine.layout.line_break_ratio, 0.5);
    }

    #[test]
    fn test_config_file_paths_resolve() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
paths:
  output: out
"#,
        );

        let config = resolve_config(Some(config_path), PathBuf::from("/default"), no_env).unwrap();
        assert_eq!(config.home, PathBuf::from("/default"));
        assert_eq!(config.output, temp.path().join("out"));
        assert_eq!(config.engine.line_tolerance, DEFAULT_LINE_TOLERANCE);
    }

    #[test]
    fn test_output_path_for() {
        let config = resolve_config(None, PathBuf::from("/h"), no_env).unwrap();
        assert_eq!(
            config.output_path_for(Path::new("/docs/contract.pdf")),
            PathBuf::from("/h/highlighted/contract.highlighted.pdf")
        );
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
