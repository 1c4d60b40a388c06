
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::OllamaConfig;

/// Produces a single text completion for a prompt.
///
/// Collaborator boundary: the pipeline only relies on this contract, not on
/// any particular model server.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Ollama generation client for `/api/generate`.
///
/// Generation can legitimately take minutes on large prompts, so the agent
/// timeout comes from configuration (default 300 s) and there is no retry:
/// a timed-out generation fails the query instead of hanging the caller.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    base_url: Url,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.generation_timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.generation_model.clone(),
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }
}

impl TextGenerator for OllamaGenerator {
    #[inline]
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            "Generating completion with model {} (prompt length: {})",
            self.model,
            prompt.len()
        );

        let url = self
            .base_url
            .join("/api/generate")
            .context("Failed to build generation URL")?;

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generation request")?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| match e {
                ureq::Error::Timeout(_) => anyhow::anyhow!("Generation timed out: {}", e),
                other => anyhow::anyhow!("Generation request failed: {}", other),
            })?;

        let response: GenerateResponse =
            serde_json::from_str(&response_text).context("Failed to parse generation response")?;

        info!(
            "Generated completion of {} characters",
            response.response.len()
        );
        Ok(response.response)
    }
}
