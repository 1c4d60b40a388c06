
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chunking::{ChunkingConfig, split};
use crate::embeddings::EmbeddingProvider;
use crate::extract::extract_text;
use crate::index::{ChunkPayload, Point, VectorIndex};
use crate::{KbError, Result};

pub const REASON_NO_TEXT_EXTRACTED: &str = "no_text_extracted";
pub const REASON_NO_CHUNKS: &str = "no_chunks";

/// Outcome of a single ingestion call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IngestOutcome {
    pub ok: bool,
    pub chunk_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl IngestOutcome {
    #[inline]
    pub fn success(chunk_count: usize) -> Self {
        Self {
            ok: true,
            chunk_count,
            reason: None,
        }
    }

    #[inline]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            chunk_count: 0,
            reason: Some(reason.into()),
        }
    }
}

/// Drives a document through extract → chunk → embed → upsert.
pub struct Ingestor {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    collection: String,
    chunking: ChunkingConfig,
    dimension: usize,
}

impl Ingestor {
    #[inline]
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        collection: impl Into<String>,
        chunking: ChunkingConfig,
        dimension: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            collection: collection.into(),
            chunking,
            dimension,
        }
    }

    /// Ingest one document into a module.
    ///
    /// Early exits: empty or unsupported input reports `no_text_extracted`,
    /// a chunker miss reports `no_chunks`, and an embedding failure aborts
    /// before any upsert. A store failure after embedding comes back as a
    /// non-ok outcome carrying the store error; nothing was made visible.
    ///
    /// Point ids are fresh v4 UUIDs, so re-ingesting a filename adds new
    /// points next to the old ones rather than replacing them.
    #[inline]
    pub fn ingest(&self, module: &str, filepath: &Path, lang: &str) -> Result<IngestOutcome> {
        info!(
            "Ingesting {} into module '{}' (lang '{}')",
            filepath.display(),
            module,
            lang
        );

        let text = extract_text(filepath)?;
        if text.trim().is_empty() {
            warn!("No text extracted from {}", filepath.display());
            return Ok(IngestOutcome::rejected(REASON_NO_TEXT_EXTRACTED));
        }

        let chunks =
            split(&text, &self.chunking).map_err(|e| KbError::BadInput(e.to_string()))?;
        if chunks.is_empty() {
            return Ok(IngestOutcome::rejected(REASON_NO_CHUNKS));
        }

        let vectors = self
            .embedder
            .embed_batch(&chunks)
            .map_err(|e| KbError::Embedding(e.to_string()))?;

        // A wrong-sized vector would silently poison similarity search, so
        // it is fatal for the batch.
        for vector in &vectors {
            if vector.len() != self.dimension {
                return Err(KbError::BadInput(format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    self.dimension,
                    vector.len()
                )));
            }
        }

        let filename = filepath
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("unknown");

        let points: Vec<Point> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (chunk, vector))| Point {
                id: Uuid::new_v4(),
                vector,
                payload: ChunkPayload {
                    module: module.to_string(),
                    filename: filename.to_string(),
                    lang: lang.to_string(),
                    chunk_index: u32::try_from(i).unwrap_or(u32::MAX),
                    text: chunk,
                },
            })
            .collect();

        let chunk_count = points.len();

        match self.index.upsert(&self.collection, points) {
            Ok(()) => {
                info!(
                    "Ingested {} chunks from {} into module '{}'",
                    chunk_count,
                    filepath.display(),
                    module
                );
                Ok(IngestOutcome::success(chunk_count))
            }
            Err(e) => {
                // Embedded chunks are discarded; the caller may retry the
                // whole ingest call.
                warn!("Upsert failed for {}: {}", filepath.display(), e);
                Ok(IngestOutcome::rejected(e.to_string()))
            }
        }
    }
}
