use crate::cli::Cli;
use crate::request::{HeaderSet, TargetUrl};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid header in configuration: {0}")]
    InvalidHeader(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

const CONFIG_NAMES: [&str; 4] = [
    "validate-openapi.toml",
    "validate-openapi.json",
    ".validate-openapi.toml",
    ".validate-openapi.json",
];

/// Settings read from a configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct FileConfig {
    /// Validator endpoint
    pub url: Option<String>,
    /// Baseline verbosity before `-v`/`-q` are applied
    pub verbosity: i32,
    /// Extra request headers
    pub headers: BTreeMap<String, String>,
}

/// Effective settings after defaults, file and command line are merged
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub url: Option<TargetUrl>,
    pub headers: HeaderSet,
    pub verbosity: i32,
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let file_config = match &cli.config {
            Some(path) => Self::load_from_file(path).await?,
            None => Self::find_config_file().await?.unwrap_or_default(),
        };
        Self::merge_with_cli(file_config, cli)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<FileConfig> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<FileConfig>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<FileConfig>> {
        let mut candidates: Vec<PathBuf> = CONFIG_NAMES.iter().map(PathBuf::from).collect();
        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("validate-openapi");
            candidates.extend(CONFIG_NAMES.iter().map(|name| app_config_dir.join(name)));
        }

        for path in candidates {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                tracing::debug!(path = %path.display(), "using configuration file");
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }
        Ok(None)
    }

    /// Merge CLI arguments with file configuration (CLI takes precedence)
    pub fn merge_with_cli(file: FileConfig, cli: &Cli) -> Result<Config> {
        let mut headers = HeaderSet::new();
        for (name, value) in &file.headers {
            if name.trim().is_empty() || name.contains(char::is_whitespace) {
                return Err(ConfigError::InvalidHeader(name.clone()));
            }
            headers.insert(name.as_str(), value.as_str());
        }
        headers.merge(&cli.header_set());

        let url = cli.url.clone().or(file.url).map(TargetUrl::from);

        Ok(Config {
            url,
            headers,
            verbosity: file.verbosity.saturating_add(cli.verbosity_delta()),
        })
    }
}
