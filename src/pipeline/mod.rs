#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::anyhow;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::AnswerCache;
use crate::embeddings::EmbeddingProvider;
use crate::generation::TextGenerator;
use crate::index::ChunkPayload;
use crate::prompt::build_prompt;
use crate::retrieval::Retriever;
use crate::{KbError, Result};

/// Response for one query: the answer, the payloads it was grounded on, and
/// whether it came from the cache or a relaxed-filter search.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<ChunkPayload>,
    pub cached: bool,
    pub fallback_used: bool,
}

/// Query-path orchestrator: cache → embed → retrieve → prompt → generate →
/// cache.
///
/// All clients are injected once at construction and shared across
/// concurrent callers. The blocking embedding, search, and generation calls
/// run on the tokio blocking pool so a slow backend call cannot stall
/// unrelated requests on the async dispatch loop.
pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    retriever: Arc<Retriever>,
    generator: Arc<dyn TextGenerator>,
    cache: Arc<AnswerCache>,
    top_k: usize,
}

impl QueryPipeline {
    #[inline]
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        retriever: Arc<Retriever>,
        generator: Arc<dyn TextGenerator>,
        cache: Arc<AnswerCache>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            retriever,
            generator,
            cache,
            top_k,
        }
    }

    /// Answer a question scoped to a language and module.
    ///
    /// Cache failures degrade to a miss; embedding, index, and generation
    /// failures abort the query rather than fabricating an answer.
    #[inline]
    pub async fn answer(&self, question: &str, lang: &str, module: &str) -> Result<QueryAnswer> {
        if let Some(cached) = self.cache.get(question, lang, module) {
            info!("Answering from cache (module='{}', lang='{}')", module, lang);
            return Ok(QueryAnswer {
                answer: cached.answer,
                sources: cached.sources,
                cached: true,
                fallback_used: false,
            });
        }

        let vector = {
            let embedder = Arc::clone(&self.embedder);
            let text = question.to_string();
            tokio::task::spawn_blocking(move || embedder.embed(&text))
                .await
                .map_err(|e| KbError::Other(anyhow!("Embedding task failed: {}", e)))?
                .map_err(|e| KbError::Embedding(e.to_string()))?
        };

        let retrieval = {
            let retriever = Arc::clone(&self.retriever);
            let lang = lang.to_string();
            let module = module.to_string();
            let top_k = self.top_k;
            tokio::task::spawn_blocking(move || {
                retriever.retrieve(&vector, &lang, &module, top_k)
            })
            .await
            .map_err(|e| KbError::Other(anyhow!("Retrieval task failed: {}", e)))??
        };

        debug!(
            "Retrieved {} hits (fallback_used={})",
            retrieval.hits.len(),
            retrieval.fallback_used
        );

        let prompt = build_prompt(question, &retrieval.hits, lang);

        let answer = {
            let generator = Arc::clone(&self.generator);
            tokio::task::spawn_blocking(move || generator.generate(&prompt))
                .await
                .map_err(|e| KbError::Other(anyhow!("Generation task failed: {}", e)))?
                .map_err(|e| KbError::Generation(e.to_string()))?
        };

        let sources: Vec<ChunkPayload> = retrieval
            .hits
            .into_iter()
            .map(|hit| hit.payload)
            .collect();

        self.cache.put(question, lang, module, &answer, sources.clone());

        Ok(QueryAnswer {
            answer,
            sources,
            cached: false,
            fallback_used: retrieval.fallback_used,
        })
    }

    /// Drop cached answers for a module, used alongside module teardown.
    #[inline]
    pub fn invalidate_module(&self, module: &str) {
        self.cache.invalidate_module(module);
    }
}
