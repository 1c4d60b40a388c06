
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for word-window chunking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum number of words per chunk
    pub max_words: usize,
    /// Number of words shared between adjacent chunks
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_words: 250,
            overlap: 50,
        }
    }
}

/// Collapse all runs of whitespace to a single space and trim the ends.
#[inline]
pub fn normalize_whitespace(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.push_str(word);
    }
    normalized
}

/// Split text into overlapping word windows of at most `max_words` words.
///
/// The input is whitespace-normalized before splitting. Text at or under
/// `max_words` words comes back as a single chunk; longer text is windowed
/// with a forward step of `max_words - overlap`, and the final window always
/// ends exactly at the last word. Requires `overlap < max_words`, otherwise
/// the window would never advance.
#[inline]
pub fn split(text: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    let ChunkingConfig { max_words, overlap } = *config;

    if overlap >= max_words {
        bail!(
            "chunk overlap ({}) must be less than max words ({})",
            overlap,
            max_words
        );
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Ok(Vec::new());
    }

    if words.len() <= max_words {
        return Ok(vec![words.join(" ")]);
    }

    let step = max_words - overlap;
    let mut chunks = Vec::with_capacity(words.len().div_ceil(step));
    let mut start = 0;

    loop {
        let end = (start + max_words).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }

    debug!(
        "Split {} words into {} chunks (max_words={}, overlap={})",
        words.len(),
        chunks.len(),
        max_words,
        overlap
    );

    Ok(chunks)
}
