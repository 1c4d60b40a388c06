#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::index::ChunkPayload;

/// A previously computed answer together with the payloads it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAnswer {
    pub answer: String,
    pub sources: Vec<ChunkPayload>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    answer: String,
    sources: Vec<ChunkPayload>,
    module: String,
    expires_at: DateTime<Utc>,
}

/// TTL cache for generated answers, keyed on the full query identity.
///
/// The cache is advisory: lock poisoning or any other anomaly degrades to a
/// miss, never to a failure of the query path. Expiry is lazy; expired
/// entries are dropped when read.
pub struct AnswerCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

/// Normalize question text for cache identity: trim, case-fold, collapse
/// internal whitespace. Two queries differing only in casing or spacing
/// share one entry.
#[inline]
pub fn normalize_question(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.push_str(&word.to_lowercase());
    }
    normalized
}

/// Derive the cache key from (normalized question, lang, module).
///
/// Each field is length-prefixed before hashing so that no concatenation of
/// values can collide across field boundaries. Keying on all three fields
/// keeps answers from leaking between modules or languages that happen to
/// share question text.
#[inline]
pub fn cache_key(question: &str, lang: &str, module: &str) -> String {
    let normalized = normalize_question(question);

    let mut hasher = Sha256::new();
    for field in [normalized.as_str(), lang, module] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }

    format!("qa:{:x}", hasher.finalize())
}

impl AnswerCache {
    #[inline]
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(i64::try_from(ttl_seconds).unwrap_or(i64::MAX)),
        }
    }

    /// Look up an answer. Expired entries are treated as absent and removed.
    #[inline]
    pub fn get(&self, question: &str, lang: &str, module: &str) -> Option<CachedAnswer> {
        let key = cache_key(question, lang, module);

        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(e) => {
                warn!("Answer cache unavailable, treating as miss: {}", e);
                return None;
            }
        };

        match entries.get(&key) {
            Some(entry) if Utc::now() < entry.expires_at => {
                debug!("Cache hit for key {}", key);
                Some(CachedAnswer {
                    answer: entry.answer.clone(),
                    sources: entry.sources.clone(),
                })
            }
            Some(_) => {
                debug!("Cache entry expired for key {}", key);
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Store an answer under the composite key with the configured TTL.
    #[inline]
    pub fn put(
        &self,
        question: &str,
        lang: &str,
        module: &str,
        answer: &str,
        sources: Vec<ChunkPayload>,
    ) {
        let key = cache_key(question, lang, module);
        let entry = CacheEntry {
            answer: answer.to_string(),
            sources,
            module: module.to_string(),
            expires_at: Utc::now() + self.ttl,
        };

        match self.entries.lock() {
            Ok(mut entries) => {
                debug!("Caching answer under key {}", key);
                entries.insert(key, entry);
            }
            Err(e) => warn!("Answer cache unavailable, skipping store: {}", e),
        }
    }

    /// Drop every cached answer for a module. Called on module teardown so
    /// stale answers cannot outlive their source content.
    #[inline]
    pub fn invalidate_module(&self, module: &str) {
        match self.entries.lock() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|_, entry| entry.module != module);
                debug!(
                    "Invalidated {} cached answers for module '{}'",
                    before - entries.len(),
                    module
                );
            }
            Err(e) => warn!("Answer cache unavailable, skipping invalidation: {}", e),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
