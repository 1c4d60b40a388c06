
use std::sync::Arc;

use tracing::{debug, warn};

use crate::Result;
use crate::index::{Filter, SearchHit, VectorIndex};

/// Result of a retrieval pass. `fallback_used` marks a degraded search:
/// the language constraint was dropped because the primary filter matched
/// nothing, which usually means a language-coverage gap in the module.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub hits: Vec<SearchHit>,
    pub fallback_used: bool,
}

/// Two-phase filtered similarity search over a vector index collection.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    collection: String,
}

impl Retriever {
    #[inline]
    pub fn new(index: Arc<dyn VectorIndex>, collection: impl Into<String>) -> Self {
        Self {
            index,
            collection: collection.into(),
        }
    }

    /// Search with a module + language filter, relaxing to module-only when
    /// the primary filter matches nothing.
    ///
    /// At most two index queries are issued. The fallback fires only on a
    /// strict zero-hit primary search with both `module` and `lang` set; it
    /// never crosses module boundaries.
    #[inline]
    pub fn retrieve(
        &self,
        vector: &[f32],
        lang: &str,
        module: &str,
        top_k: usize,
    ) -> Result<Retrieval> {
        let mut primary = Filter::new();
        if !module.is_empty() {
            primary = primary.must_match("module", module);
        }
        if !lang.is_empty() {
            primary = primary.must_match("lang", lang);
        }

        let hits = self
            .index
            .search(&self.collection, vector, top_k, &primary)?;

        if !hits.is_empty() {
            debug!(
                "Primary search returned {} hits (module='{}', lang='{}')",
                hits.len(),
                module,
                lang
            );
            return Ok(Retrieval {
                hits,
                fallback_used: false,
            });
        }

        if module.is_empty() || lang.is_empty() {
            // Nothing to relax: the narrow filter was never applied.
            return Ok(Retrieval {
                hits,
                fallback_used: false,
            });
        }

        warn!(
            "No hits for module '{}' with lang '{}', retrying module-only",
            module, lang
        );

        let relaxed = Filter::new().must_match("module", module);
        let fallback_hits = self
            .index
            .search(&self.collection, vector, top_k, &relaxed)?;

        debug!("Fallback search returned {} hits", fallback_hits.len());

        Ok(Retrieval {
            hits: fallback_hits,
            fallback_used: true,
        })
    }
}
