use super::*;
use crate::config::OllamaConfig;

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        embedding_model: "test-model".to_string(),
        batch_size: 128,
        ..OllamaConfig::default()
    };
    let client = OllamaEmbedder::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let config = OllamaConfig::default();
    let client = OllamaEmbedder::new(&config)
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);

    assert_eq!(client.retry_attempts, 5);
}

#[test]
fn empty_batch_skips_the_network() {
    // No server is running on this port; an empty input must still succeed.
    let config = OllamaConfig {
        host: "127.0.0.1".to_string(),
        port: 1,
        ..OllamaConfig::default()
    };
    let client = OllamaEmbedder::new(&config).expect("Failed to create client");

    let vectors = crate::embeddings::EmbeddingProvider::embed_batch(&client, &[])
        .expect("empty batch should succeed");
    assert!(vectors.is_empty());
}

#[test]
fn embed_request_serialization() {
    let texts = vec!["first".to_string(), "second".to_string()];
    let request = EmbedRequest {
        model: "nomic-embed-text:latest",
        input: &texts,
    };

    let value = serde_json::to_value(&request).expect("serialize request");
    assert_eq!(value["model"], "nomic-embed-text:latest");
    assert_eq!(value["input"][1], "second");
}

#[test]
fn embed_response_parsing() {
    let body = r#"{"model":"nomic-embed-text:latest","embeddings":[[0.1,0.2],[0.3,0.4]]}"#;
    let response: EmbedResponse = serde_json::from_str(body).expect("parse response");

    assert_eq!(response.embeddings.len(), 2);
    assert_eq!(response.embeddings[0], vec![0.1, 0.2]);
}
