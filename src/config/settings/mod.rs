#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::chunking::ChunkingConfig;
use crate::embeddings::ollama::DEFAULT_EMBEDDING_DIMENSION;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// The watched folder of documents
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,
    /// Override for the config/data directory; `None` uses the platform dir
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub embed_model: String,
    pub generate_model: String,
    pub batch_size: u32,
    pub embedding_dimension: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved to ground an answer
    pub top_k: usize,
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("files")
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            docs_dir: default_docs_dir(),
            base_dir: None,
        }
    }
}

impl Default for OllamaConfig {
    #[inline]
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            embed_model: "nomic-embed-text:latest".to_string(),
            generate_model: "mistral:latest".to_string(),
            batch_size: 16,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryUnavailable,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid model name: {0:?} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(usize),
    #[error("Invalid top-k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Line overlap ({1}) must be smaller than max lines ({0})")]
    InvalidLineWindow(usize, usize),
    #[error("Char overlap ({1}) must be smaller than max chars ({0})")]
    InvalidCharBudget(usize, usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load the configuration from the platform config directory, or defaults
    /// when no config file exists yet.
    #[inline]
    pub fn load() -> Result<Self> {
        let base_dir = platform_base_dir()?;
        Self::load_from(&base_dir)
    }

    /// Load the configuration rooted at an explicit base directory.
    #[inline]
    pub fn load_from(base_dir: &Path) -> Result<Self> {
        let config_path = base_dir.join("config.toml");

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?
        } else {
            Config::default()
        };
        config.base_dir = Some(base_dir.to_path_buf());

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let base_dir = self.base_dir()?;
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("Failed to create config directory: {}", base_dir.display()))?;

        let config_path = self.config_file_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;

        if !(1..=100).contains(&self.retrieval.top_k) {
            return Err(ConfigError::InvalidTopK(self.retrieval.top_k));
        }

        let chunking = &self.chunking;
        if chunking.max_lines == 0 || chunking.line_overlap >= chunking.max_lines {
            return Err(ConfigError::InvalidLineWindow(
                chunking.max_lines,
                chunking.line_overlap,
            ));
        }
        if chunking.max_chars == 0 || chunking.char_overlap >= chunking.max_chars {
            return Err(ConfigError::InvalidCharBudget(
                chunking.max_chars,
                chunking.char_overlap,
            ));
        }

        Ok(())
    }

    /// The directory holding the config file and the persisted index state.
    #[inline]
    pub fn base_dir(&self) -> Result<PathBuf, ConfigError> {
        self.base_dir.clone().map_or_else(platform_base_dir, Ok)
    }

    #[inline]
    pub fn config_file_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.base_dir()?.join("config.toml"))
    }

    /// Path of the persisted vector index.
    #[inline]
    pub fn index_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.base_dir()?.join("index.bin"))
    }

    /// Path of the persisted chunk-metadata sequence.
    #[inline]
    pub fn chunks_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.base_dir()?.join("chunks.json"))
    }

    /// Path of the persisted per-file change records.
    #[inline]
    pub fn filemeta_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.base_dir()?.join("filemeta.json"))
    }
}

fn platform_base_dir() -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join("askdocs"))
        .ok_or(ConfigError::DirectoryUnavailable)
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;

        if self.embed_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embed_model.clone()));
        }
        if self.generate_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.generate_model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        Ok(())
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}
