
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::QdrantConfig;
use crate::{KbError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Metadata stored alongside each vector. Filtering happens on `module` and
/// `lang`; `text` is carried so answers can be assembled without a second
/// store lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkPayload {
    pub module: String,
    pub filename: String,
    pub lang: String,
    pub chunk_index: u32,
    pub text: String,
}

/// A vector-index record: embedding plus payload, keyed by a fresh UUID.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Point {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

/// A ranked similarity hit, ephemeral per query.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub payload: ChunkPayload,
}

/// Conjunction of exact-match payload constraints.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Filter {
    pub must: Vec<FieldCondition>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldCondition {
    pub key: String,
    #[serde(rename = "match")]
    pub matches: MatchValue,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatchValue {
    pub value: String,
}

impl Filter {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn must_match(mut self, key: &str, value: &str) -> Self {
        self.must.push(FieldCondition {
            key: key.to_string(),
            matches: MatchValue {
                value: value.to_string(),
            },
        });
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }
}

/// Named-collection vector store: upsert, filtered similarity search, and
/// bulk deletion by payload field.
pub trait VectorIndex: Send + Sync {
    /// Create the collection with cosine distance if it does not exist yet.
    fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<()>;

    /// Insert or overwrite points by id. The whole batch becomes visible to
    /// subsequent searches together; a failure means no caller-observable
    /// partial ingest.
    fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()>;

    /// Similarity search ordered by descending cosine score. An empty filter
    /// searches the whole collection.
    fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: &Filter,
    ) -> Result<Vec<SearchHit>>;

    /// Remove every point whose payload `field` equals `value`.
    fn delete_by_field(&self, collection: &str, field: &str, value: &str) -> Result<()>;

    /// Number of points currently stored in the collection.
    fn count(&self, collection: &str) -> Result<u64>;
}

/// Qdrant HTTP client implementing [`VectorIndex`].
#[derive(Debug, Clone)]
pub struct QdrantIndex {
    base_url: Url,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct CreateCollectionRequest {
    vectors: VectorParams,
}

#[derive(Debug, Serialize)]
struct VectorParams {
    size: usize,
    distance: &'static str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    points: &'a [Point],
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a Filter>,
}

#[derive(Debug, Serialize)]
struct DeleteByFilterRequest {
    filter: Filter,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionDescription {
    points_count: Option<u64>,
}

impl QdrantIndex {
    #[inline]
    pub fn new(config: &QdrantConfig) -> Result<Self> {
        let base_url = config
            .parsed_url()
            .map_err(|e| KbError::Config(e.to_string()))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| KbError::Index(format!("Failed to build URL for {}: {}", path, e)))
    }

    fn collection_exists(&self, collection: &str) -> Result<bool> {
        let url = self.endpoint(&format!("/collections/{}", collection))?;

        match self.agent.get(url.as_str()).call() {
            Ok(_) => Ok(true),
            Err(ureq::Error::StatusCode(404)) => Ok(false),
            Err(e) => Err(KbError::Index(format!(
                "Failed to check collection '{}': {}",
                collection, e
            ))),
        }
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> std::result::Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                warn!("Client error (status {}), not retrying", status);
                                return Err(KbError::Index(format!("Client error: HTTP {}", status)));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => {
                            warn!("Non-retryable error: {}", error);
                            false
                        }
                    };

                    if !should_retry {
                        return Err(KbError::Index(format!("Non-retryable error: {}", error)));
                    }

                    last_error = Some(KbError::Index(format!("Request error: {}", error)));

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        let delay = Duration::from_millis(delay_ms);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", self.base_url);

        Err(last_error
            .unwrap_or_else(|| KbError::Index("Request failed after retries".to_string())))
    }

    fn post_json<B: Serialize>(&self, url: &Url, body: &B) -> Result<String> {
        let body_json = serde_json::to_string(body)
            .map_err(|e| KbError::Index(format!("Failed to serialize request body: {}", e)))?;

        self.make_request_with_retry(|| {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&body_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
    }

    fn put_json<B: Serialize>(&self, url: &Url, body: &B) -> Result<String> {
        let body_json = serde_json::to_string(body)
            .map_err(|e| KbError::Index(format!("Failed to serialize request body: {}", e)))?;

        self.make_request_with_retry(|| {
            self.agent
                .put(url.as_str())
                .header("Content-Type", "application/json")
                .send(&body_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
    }
}

impl VectorIndex for QdrantIndex {
    #[inline]
    fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<()> {
        if self.collection_exists(collection)? {
            debug!("Collection '{}' already exists", collection);
            return Ok(());
        }

        info!(
            "Creating collection '{}' with dimension {} (cosine distance)",
            collection, dimension
        );

        let url = self.endpoint(&format!("/collections/{}", collection))?;
        let request = CreateCollectionRequest {
            vectors: VectorParams {
                size: dimension,
                distance: "Cosine",
            },
        };

        self.put_json(&url, &request)?;
        Ok(())
    }

    #[inline]
    fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        if points.is_empty() {
            debug!("No points to upsert");
            return Ok(());
        }

        debug!(
            "Upserting {} points into collection '{}'",
            points.len(),
            collection
        );

        // wait=true makes the whole batch visible to searches atomically
        // from the caller's perspective.
        let url = self.endpoint(&format!("/collections/{}/points?wait=true", collection))?;
        let request = UpsertRequest { points: &points };

        self.put_json(&url, &request)?;

        info!(
            "Upserted {} points into collection '{}'",
            points.len(),
            collection
        );
        Ok(())
    }

    #[inline]
    fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: &Filter,
    ) -> Result<Vec<SearchHit>> {
        debug!(
            "Searching collection '{}' with limit {} and {} filter conditions",
            collection,
            limit,
            filter.must.len()
        );

        let url = self.endpoint(&format!("/collections/{}/points/search", collection))?;
        let request = SearchRequest {
            vector,
            limit,
            with_payload: true,
            filter: (!filter.is_empty()).then_some(filter),
        };

        let response_text = self.post_json(&url, &request)?;
        let response: ApiResponse<Vec<SearchHit>> = serde_json::from_str(&response_text)
            .map_err(|e| KbError::Index(format!("Failed to parse search response: {}", e)))?;

        debug!("Search returned {} hits", response.result.len());
        Ok(response.result)
    }

    #[inline]
    fn delete_by_field(&self, collection: &str, field: &str, value: &str) -> Result<()> {
        info!(
            "Deleting points from '{}' where {} = '{}'",
            collection, field, value
        );

        let url = self.endpoint(&format!(
            "/collections/{}/points/delete?wait=true",
            collection
        ))?;
        let request = DeleteByFilterRequest {
            filter: Filter::new().must_match(field, value),
        };

        self.post_json(&url, &request)?;
        Ok(())
    }

    #[inline]
    fn count(&self, collection: &str) -> Result<u64> {
        let url = self.endpoint(&format!("/collections/{}", collection))?;

        let response_text = self.make_request_with_retry(|| {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let response: ApiResponse<CollectionDescription> = serde_json::from_str(&response_text)
            .map_err(|e| KbError::Index(format!("Failed to parse collection info: {}", e)))?;

        Ok(response.result.points_count.unwrap_or(0))
    }
}
