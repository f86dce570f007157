//! YAML configuration loader.
//!
//! Everything carries a default so a missing or partial `config.yaml`
//! still yields a usable setup. API keys never live in the file; they
//! come from the environment (see `llms`).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderKind,
    pub openai: OpenAiConfig,
    pub anthropic: AnthropicConfig,
    pub ollama: OllamaConfig,
    pub data_dir: DataDir,
    pub vault: VaultConfig,
    pub logging: LoggingConfig,
}

/// Which provider answers questions and derives summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Openai,
    Anthropic,
    Ollama,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Any OpenAI-compatible endpoint (OpenAI, DeepSeek, Qianfan, ...).
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            timeout_secs: 60,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self { model: "claude-sonnet-4-5".to_string(), timeout_secs: 60, max_retries: 3 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

/// Newtype so the data directory can default to `data/`.
#[derive(Debug, Clone, Deserialize)]
pub struct DataDir(pub PathBuf);

impl Default for DataDir {
    fn default() -> Self {
        Self(PathBuf::from("data"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Root of the notes vault; filing is disabled when unset.
    pub path: Option<PathBuf>,
    pub assets_folder: String,
    pub default_tags: Vec<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            path: None,
            assets_folder: "assets".to_string(),
            default_tags: vec!["paper".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: PathBuf,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { file: PathBuf::from("logs/reader.log"), level: "info".to_string() }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read config: {}", e),
            ConfigError::Parse(e) => write!(f, "cannot parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load from `path`; a missing file yields the defaults, a present
    /// but malformed file is an error (silently ignoring it would hide
    /// typos in provider settings).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_yaml::from_str(&content).map_err(ConfigError::Parse)
    }
}
