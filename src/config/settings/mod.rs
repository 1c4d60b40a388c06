#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::chunking::ChunkingConfig;

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;
pub const DEFAULT_GENERATION_TIMEOUT_SECONDS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub qdrant: QdrantConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QdrantConfig {
    pub url: String,
    pub collection: String,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:6333".to_string(),
            collection: "kb_chunks".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub embedding_model: String,
    pub embedding_dimension: u32,
    pub generation_model: String,
    pub batch_size: u32,
    pub generation_timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            embedding_model: "nomic-embed-text:latest".to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            generation_model: "gemma3:4b".to_string(),
            batch_size: 16,
            generation_timeout_seconds: DEFAULT_GENERATION_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { top_k: 6 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 86_400 }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid collection name: {0} (cannot be empty)")]
    InvalidCollection(String),
    #[error("Invalid max chunk words: {0} (must be between 1 and 4096)")]
    InvalidMaxWords(usize),
    #[error("Chunk overlap ({0}) must be less than max chunk words ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid top_k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Invalid cache TTL: {0} (must be greater than zero)")]
    InvalidCacheTtl(u64),
    #[error("Invalid generation timeout: {0} (must be between 1 and 3600 seconds)")]
    InvalidGenerationTimeout(u64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from `config.toml` under the given directory,
    /// falling back to defaults when the file does not exist.
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(config_dir.as_ref()).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.as_ref().display()
            )
        })?;

        let config_path = config_dir.as_ref().join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Platform configuration directory for kb-assist.
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir().ok_or(ConfigError::DirectoryError)?;
        Ok(base.join("kb-assist"))
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.qdrant.validate()?;
        self.ollama.validate()?;
        self.validate_chunking()?;

        if self.search.top_k == 0 || self.search.top_k > 100 {
            return Err(ConfigError::InvalidTopK(self.search.top_k));
        }

        if self.cache.ttl_seconds == 0 {
            return Err(ConfigError::InvalidCacheTtl(self.cache.ttl_seconds));
        }

        Ok(())
    }

    // The chunker enforces the same precondition at call time, but a bad
    // overlap should be rejected before any ingestion starts.
    fn validate_chunking(&self) -> Result<(), ConfigError> {
        let chunking = &self.chunking;

        if chunking.max_words == 0 || chunking.max_words > 4096 {
            return Err(ConfigError::InvalidMaxWords(chunking.max_words));
        }

        if chunking.overlap >= chunking.max_words {
            return Err(ConfigError::OverlapTooLarge(
                chunking.overlap,
                chunking.max_words,
            ));
        }

        Ok(())
    }

    /// Path of the SQLite database backing the audit log.
    #[inline]
    pub fn audit_db_path<P: AsRef<Path>>(config_dir: P) -> PathBuf {
        config_dir.as_ref().join("audit.db")
    }
}

impl QdrantConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_url()?;

        if self.collection.trim().is_empty() {
            return Err(ConfigError::InvalidCollection(self.collection.clone()));
        }

        Ok(())
    }

    pub fn parsed_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.url).map_err(|_| ConfigError::InvalidUrl(self.url.clone()))
    }
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        self.ollama_url()?;

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }

        if self.generation_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.generation_model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        if self.generation_timeout_seconds == 0 || self.generation_timeout_seconds > 3600 {
            return Err(ConfigError::InvalidGenerationTimeout(
                self.generation_timeout_seconds,
            ));
        }

        Ok(())
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}
