// Configuration management module
// Handles the TOML configuration file and runtime settings

pub mod settings;

pub use settings::{CacheConfig, Config, ConfigError, OllamaConfig, QdrantConfig, SearchConfig};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
