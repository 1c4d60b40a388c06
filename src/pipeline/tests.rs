use super::*;
use crate::index::{Filter, Point, SearchHit, VectorIndex};
use anyhow::anyhow;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

struct StubEmbedder {
    vector: Vec<f32>,
    fail: bool,
}

impl EmbeddingProvider for StubEmbedder {
    fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        if self.fail {
            return Err(anyhow!("embedding backend unavailable"));
        }
        Ok(self.vector.clone())
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

struct StubIndex {
    hits: Vec<SearchHit>,
    fail: bool,
}

impl VectorIndex for StubIndex {
    fn ensure_collection(&self, _collection: &str, _dimension: usize) -> crate::Result<()> {
        Ok(())
    }

    fn upsert(&self, _collection: &str, _points: Vec<Point>) -> crate::Result<()> {
        Ok(())
    }

    fn search(
        &self,
        _collection: &str,
        _vector: &[f32],
        _limit: usize,
        filter: &Filter,
    ) -> crate::Result<Vec<SearchHit>> {
        if self.fail {
            return Err(crate::KbError::Index("index unreachable".to_string()));
        }

        let hits = self
            .hits
            .iter()
            .filter(|hit| {
                filter.must.iter().all(|cond| match cond.key.as_str() {
                    "module" => hit.payload.module == cond.matches.value,
                    "lang" => hit.payload.lang == cond.matches.value,
                    _ => false,
                })
            })
            .cloned()
            .collect();
        Ok(hits)
    }

    fn delete_by_field(&self, _collection: &str, _field: &str, _value: &str) -> crate::Result<()> {
        Ok(())
    }

    fn count(&self, _collection: &str) -> crate::Result<u64> {
        Ok(self.hits.len() as u64)
    }
}

struct StubGenerator {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    fail: bool,
}

impl StubGenerator {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextGenerator for StubGenerator {
    fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().expect("lock").push(prompt.to_string());
        if self.fail {
            return Err(anyhow!("model server unavailable"));
        }
        Ok("Generated answer.".to_string())
    }
}

fn hit(module: &str, lang: &str, text: &str) -> SearchHit {
    SearchHit {
        id: uuid::Uuid::new_v4().to_string(),
        score: 0.8,
        payload: ChunkPayload {
            module: module.to_string(),
            filename: "doc.txt".to_string(),
            lang: lang.to_string(),
            chunk_index: 0,
            text: text.to_string(),
        },
    }
}

fn pipeline(
    index: StubIndex,
    generator: Arc<StubGenerator>,
    embedder_fails: bool,
) -> QueryPipeline {
    let retriever = Arc::new(Retriever::new(Arc::new(index), "kb_chunks"));
    QueryPipeline::new(
        Arc::new(StubEmbedder {
            vector: vec![1.0, 0.0],
            fail: embedder_fails,
        }),
        retriever,
        generator,
        Arc::new(AnswerCache::new(60)),
        5,
    )
}

#[tokio::test]
async fn miss_then_hit_generates_once() {
    let generator = Arc::new(StubGenerator::new());
    let pipeline = pipeline(
        StubIndex {
            hits: vec![hit("billing", "en", "invoice chunk")],
            fail: false,
        },
        Arc::clone(&generator),
        false,
    );

    let first = pipeline
        .answer("How do I pay?", "en", "billing")
        .await
        .expect("first answer");
    assert!(!first.cached);
    assert_eq!(first.answer, "Generated answer.");
    assert_eq!(first.sources.len(), 1);
    assert_eq!(generator.call_count(), 1);

    // Same question with whitespace/case noise must come from the cache.
    let second = pipeline
        .answer("  how do I PAY? ", "en", "billing")
        .await
        .expect("second answer");
    assert!(second.cached);
    assert_eq!(second.answer, first.answer);
    assert_eq!(second.sources, first.sources);
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn prompt_carries_context_and_question() {
    let generator = Arc::new(StubGenerator::new());
    let pipeline = pipeline(
        StubIndex {
            hits: vec![hit("billing", "en", "pay via the billing portal")],
            fail: false,
        },
        Arc::clone(&generator),
        false,
    );

    pipeline
        .answer("How do I pay?", "en", "billing")
        .await
        .expect("answer");

    let prompts = generator.prompts.lock().expect("lock");
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("pay via the billing portal"));
    assert!(prompts[0].contains("How do I pay?"));
    assert!(prompts[0].contains("Answer concisely in en."));
}

#[tokio::test]
async fn fallback_flag_propagates() {
    let generator = Arc::new(StubGenerator::new());
    // Only English content exists; a Japanese query triggers the fallback.
    let pipeline = pipeline(
        StubIndex {
            hits: vec![hit("billing", "en", "english only")],
            fail: false,
        },
        Arc::clone(&generator),
        false,
    );

    let answer = pipeline
        .answer("質問", "ja", "billing")
        .await
        .expect("answer");
    assert!(answer.fallback_used);
    assert_eq!(answer.sources[0].lang, "en");
}

#[tokio::test]
async fn embedder_failure_aborts_without_generation() {
    let generator = Arc::new(StubGenerator::new());
    let pipeline = pipeline(
        StubIndex {
            hits: Vec::new(),
            fail: false,
        },
        Arc::clone(&generator),
        true,
    );

    let result = pipeline.answer("How do I pay?", "en", "billing").await;
    assert!(matches!(result, Err(KbError::Embedding(_))));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn index_failure_aborts_the_query() {
    let generator = Arc::new(StubGenerator::new());
    let pipeline = pipeline(
        StubIndex {
            hits: Vec::new(),
            fail: true,
        },
        Arc::clone(&generator),
        false,
    );

    let result = pipeline.answer("How do I pay?", "en", "billing").await;
    assert!(matches!(result, Err(KbError::Index(_))));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn generation_failure_is_surfaced_and_not_cached() {
    let generator = Arc::new(StubGenerator {
        fail: true,
        ..StubGenerator::new()
    });
    let pipeline = pipeline(
        StubIndex {
            hits: vec![hit("billing", "en", "chunk")],
            fail: false,
        },
        Arc::clone(&generator),
        false,
    );

    let result = pipeline.answer("How do I pay?", "en", "billing").await;
    assert!(matches!(result, Err(KbError::Generation(_))));

    // A failed generation must not poison the cache.
    let retry = pipeline.answer("How do I pay?", "en", "billing").await;
    assert!(matches!(retry, Err(KbError::Generation(_))));
    assert_eq!(generator.call_count(), 2);
}

#[tokio::test]
async fn invalidate_module_forces_regeneration() {
    let generator = Arc::new(StubGenerator::new());
    let pipeline = pipeline(
        StubIndex {
            hits: vec![hit("billing", "en", "chunk")],
            fail: false,
        },
        Arc::clone(&generator),
        false,
    );

    pipeline
        .answer("How do I pay?", "en", "billing")
        .await
        .expect("answer");
    pipeline.invalidate_module("billing");
    let again = pipeline
        .answer("How do I pay?", "en", "billing")
        .await
        .expect("answer");

    assert!(!again.cached);
    assert_eq!(generator.call_count(), 2);
}
