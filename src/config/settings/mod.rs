
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml::Value;
use url::Url;

/// Keys that must be present in the `[DEFAULT]` table of the config file.
pub const REQUIRED_KEYS: &[&str] = &[
    "ElasticCloudPassword",
    "IndexName",
    "LLMModel",
    "OpenAIAPIKey",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub elastic_cloud_password: String,
    pub index_name: String,
    pub llm_model: String,
    pub openai_api_key: String,
    pub elasticsearch: ElasticsearchConfig,
    pub openai: OpenAiConfig,
    pub chat: ChatConfig,
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub username: String,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            username: "elastic".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub embedding_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    /// Number of nearest chunks fetched per query
    pub top_k: usize,
    /// Character window size used when splitting documents
    pub chunk_size: usize,
    /// Character overlap between adjacent windows
    pub chunk_overlap: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            chunk_size: 2000,
            chunk_overlap: 200,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("DEFAULT section not found in config file")]
    MissingSection,
    #[error("{0} key not found in config file under DEFAULT section")]
    MissingKey(&'static str),
    #[error("{0} key is empty in config file under DEFAULT section")]
    EmptyKey(&'static str),
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid top_k: {0} (must be between 1 and 50)")]
    InvalidTopK(usize),
    #[error("Invalid chunk size: {0} (must be between 200 and 8000)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1})")]
    InvalidChunkOverlap(usize, usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Config {
    /// Load the configuration from `config.toml` inside the given directory.
    ///
    /// All four `[DEFAULT]` keys are required; a missing key fails with an
    /// error naming that key.
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Err(ConfigError::NotFound(config_path).into());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::parse(&content, config_dir.as_ref())
            .with_context(|| format!("Failed to load config file: {}", config_path.display()))?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    fn parse(content: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let table: toml::Table = content.parse()?;

        let default = table
            .get("DEFAULT")
            .and_then(Value::as_table)
            .ok_or(ConfigError::MissingSection)?;

        let elastic_cloud_password = required_key(default, "ElasticCloudPassword")?;
        let index_name = required_key(default, "IndexName")?;
        let llm_model = required_key(default, "LLMModel")?;
        let openai_api_key = required_key(default, "OpenAIAPIKey")?;

        let elasticsearch = optional_section(&table, "elasticsearch")?;
        let openai = optional_section(&table, "openai")?;
        let chat = optional_section(&table, "chat")?;

        Ok(Self {
            elastic_cloud_password,
            index_name,
            llm_model,
            openai_api_key,
            elasticsearch,
            openai,
            chat,
            base_dir: base_dir.to_path_buf(),
        })
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.elastic_url()?;
        self.openai_url()?;

        if self.chat.top_k == 0 || self.chat.top_k > 50 {
            return Err(ConfigError::InvalidTopK(self.chat.top_k));
        }

        if !(200..=8000).contains(&self.chat.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(self.chat.chunk_size));
        }

        if self.chat.chunk_overlap >= self.chat.chunk_size {
            return Err(ConfigError::InvalidChunkOverlap(
                self.chat.chunk_overlap,
                self.chat.chunk_size,
            ));
        }

        Ok(())
    }

    #[inline]
    pub fn elastic_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.elasticsearch.url)
            .map_err(|_| ConfigError::InvalidUrl(self.elasticsearch.url.clone()))
    }

    #[inline]
    pub fn openai_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.openai.base_url)
            .map_err(|_| ConfigError::InvalidUrl(self.openai.base_url.clone()))
    }

    /// Path of the JSON ledger recording which files each index already holds
    #[inline]
    pub fn tracking_file_path(&self) -> PathBuf {
        self.base_dir.join("indexed_files.json")
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }
}

fn required_key(table: &toml::Table, key: &'static str) -> Result<String, ConfigError> {
    let value = table
        .get(key)
        .and_then(Value::as_str)
        .ok_or(ConfigError::MissingKey(key))?;

    if value.trim().is_empty() {
        return Err(ConfigError::EmptyKey(key));
    }

    Ok(value.to_string())
}

fn optional_section<T>(table: &toml::Table, name: &str) -> Result<T, ConfigError>
where
    T: Default + serde::de::DeserializeOwned,
{
    match table.get(name) {
        Some(value) => Ok(value.clone().try_into()?),
        None => Ok(T::default()),
    }
}
