use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::{Cli, DEFAULT_INTERVAL, DEFAULT_MODE, DEFAULT_OUTPUT, DEFAULT_TIMEOUT};

/// Extensions tried, in order, at each search location
const EXTENSIONS: [&str; 4] = ["json", "toml", "yaml", "yml"];

/// Settings read from a config file. Every key is optional and unknown keys
/// are ignored, so a file only needs the values it wants to change.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    pub mode: Option<String>,
    pub interval: Option<u64>,
    pub timeout: Option<u64>,
    pub max_cycles: Option<u64>,
    pub output: Option<String>,
    pub save: Option<String>,
    pub history_file: Option<String>,
    pub rate_limit: Option<f64>,
    pub verbose: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Detect format from file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(ConfigFormat::Json),
            "toml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            _ => None,
        }
    }

    fn parse(self, contents: &str) -> Result<Config> {
        Ok(match self {
            ConfigFormat::Json => serde_json::from_str(contents)?,
            ConfigFormat::Toml => toml::from_str(contents)?,
            ConfigFormat::Yaml => serde_yaml::from_str(contents)?,
        })
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigFormat::Json => "JSON",
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
        })
    }
}

/// `$XDG_CONFIG_HOME`, or `~/.config` when it is unset or empty
fn config_home() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
}

/// Keep the CLI value unless it is still the clap default
fn prefer_cli<T: PartialEq>(cli: T, default: T, file: Option<T>) -> T {
    if cli != default {
        cli
    } else {
        file.unwrap_or(cli)
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path)
            .with_context(|| format!("Unsupported config file format: {}", path.display()))?;
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        format
            .parse(&contents)
            .with_context(|| format!("Failed to parse {} config: {}", format, path.display()))
    }

    /// Search order: `./seowatch.<ext>`, then `<config home>/seowatch/config.<ext>`
    pub fn default_paths() -> Vec<PathBuf> {
        let local = EXTENSIONS
            .iter()
            .map(|ext| PathBuf::from(format!("seowatch.{ext}")));
        let user = config_home()
            .map(|home| home.join("seowatch"))
            .into_iter()
            .flat_map(|dir| {
                EXTENSIONS
                    .iter()
                    .map(move |ext| dir.join(format!("config.{ext}")))
            });

        local.chain(user).collect()
    }

    /// Load the first file in `default_paths` that exists. A file that exists
    /// but fails to parse is an error, not a reason to keep searching.
    pub fn from_default_paths() -> Result<Option<Self>> {
        Self::default_paths()
            .into_iter()
            .find(|path| path.is_file())
            .map(|path| Self::from_file(&path))
            .transpose()
    }

    /// Fill in whatever the command line left at its default
    pub fn merge_with_cli(self, cli: Cli) -> Cli {
        Cli {
            mode: prefer_cli(cli.mode, DEFAULT_MODE.to_string(), self.mode),
            interval: prefer_cli(cli.interval, DEFAULT_INTERVAL, self.interval),
            timeout: prefer_cli(cli.timeout, DEFAULT_TIMEOUT, self.timeout),
            output: prefer_cli(cli.output, DEFAULT_OUTPUT.to_string(), self.output),
            max_cycles: cli.max_cycles.or(self.max_cycles),
            save: cli.save.or(self.save),
            history_file: cli.history_file.or(self.history_file),
            rate_limit: cli.rate_limit.or(self.rate_limit),
            verbose: cli.verbose || self.verbose.unwrap_or(false),
            ..cli
        }
    }
}
