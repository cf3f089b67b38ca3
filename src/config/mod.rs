use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::TopicFormat;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    pub name: Option<String>,
    pub rpc: Option<String>,
    pub ipc: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TopicFormatConfig {
    #[default]
    Legacy,
    Tagged,
}

impl From<TopicFormatConfig> for TopicFormat {
    fn from(value: TopicFormatConfig) -> Self {
        match value {
            TopicFormatConfig::Legacy => TopicFormat::Legacy,
            TopicFormatConfig::Tagged => TopicFormat::Tagged,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,

    /// Data contract address, hex
    #[serde(default)]
    pub contract_address: Option<String>,

    /// Node-managed account used for submissions, hex
    #[serde(default)]
    pub sender: Option<String>,

    #[serde(default)]
    pub strict_decode: bool,

    #[serde(default)]
    pub topic_format: TopicFormatConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// First endpoint with a usable transport
    pub fn default_endpoint(&self) -> Option<&EndpointConfig> {
        self.endpoints
            .iter()
            .find(|endpoint| endpoint.rpc.is_some() || endpoint.ipc.is_some())
    }
}

/// Read the config file; a missing file means defaults
pub fn load() -> Result<Config> {
    let Some(path) = config_path() else {
        return Ok(Config::default());
    };
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Config::default()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()))
        }
    };
    parse(&content).with_context(|| format!("invalid config file {}", path.display()))
}

pub fn parse(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("ACTIVATE_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("activate").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("activate").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "activate", "activate")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
