use super::*;
use crate::chunking::ChunkingConfig;
use tempfile::TempDir;

#[test]
fn default_config_is_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.qdrant.collection, "kb_chunks");
    assert_eq!(config.ollama.embedding_dimension, 768);
    assert_eq!(config.search.top_k, 6);
    assert_eq!(config.cache.ttl_seconds, 86_400);
    assert_eq!(config.chunking.max_words, 250);
    assert_eq!(config.chunking.overlap, 50);
}

#[test]
fn load_missing_file_returns_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::load(dir.path()).expect("load should succeed");
    assert_eq!(config, Config::default());
}

#[test]
fn save_and_reload_round_trip() {
    let dir = TempDir::new().expect("tempdir");

    let mut config = Config::default();
    config.qdrant.collection = "support_kb".to_string();
    config.ollama.embedding_model = "custom-embed:latest".to_string();
    config.search.top_k = 12;

    config.save(dir.path()).expect("save should succeed");
    let loaded = Config::load(dir.path()).expect("load should succeed");

    assert_eq!(loaded, config);
}

#[test]
fn partial_file_fills_in_defaults() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(
        dir.path().join("config.toml"),
        "[qdrant]\ncollection = \"manuals\"\n",
    )
    .expect("write config");

    let config = Config::load(dir.path()).expect("load should succeed");
    assert_eq!(config.qdrant.collection, "manuals");
    assert_eq!(config.ollama, OllamaConfig::default());
    assert_eq!(config.search.top_k, 6);
}

#[test]
fn rejects_overlap_not_less_than_max_words() {
    let config = Config {
        chunking: ChunkingConfig {
            max_words: 50,
            overlap: 50,
        },
        ..Config::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::OverlapTooLarge(50, 50))
    ));
}

#[test]
fn rejects_invalid_qdrant_url() {
    let config = Config {
        qdrant: QdrantConfig {
            url: "not a url".to_string(),
            ..QdrantConfig::default()
        },
        ..Config::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidUrl(_))
    ));
}

#[test]
fn rejects_zero_top_k() {
    let config = Config {
        search: SearchConfig { top_k: 0 },
        ..Config::default()
    };

    assert!(matches!(config.validate(), Err(ConfigError::InvalidTopK(0))));
}

#[test]
fn rejects_empty_generation_model() {
    let config = Config {
        ollama: OllamaConfig {
            generation_model: "  ".to_string(),
            ..OllamaConfig::default()
        },
        ..Config::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidModel(_))
    ));
}

#[test]
fn invalid_file_fails_to_load() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(
        dir.path().join("config.toml"),
        "[search]\ntop_k = 0\n",
    )
    .expect("write config");

    assert!(Config::load(dir.path()).is_err());
}
