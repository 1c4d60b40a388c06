// Embedding generation module

pub mod ollama;

pub use ollama::OllamaEmbedder;

use anyhow::Result;

/// Converts text into fixed-dimension vectors.
///
/// Implementations must be length- and order-preserving: the vector at
/// position `i` of the output corresponds to `texts[i]`. When the backend is
/// unavailable the call fails with an error; degenerate stand-in vectors are
/// never substituted because they would silently corrupt similarity search.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts in as few model invocations as possible.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
