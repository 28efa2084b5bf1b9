#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::RecommenderError;
use crate::config::OllamaConfig;
use crate::embeddings::Embedder;
use crate::embeddings::normalize::l2_normalize_in_place;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u32 = 2;
const PROBE_TEXT: &str = "assessment";

/// Blocking client for Ollama's `/api/embed` endpoint
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    model: String,
    batch_size: u32,
    agent: ureq::Agent,
    retry_attempts: u32,
    backoff_unit: Duration,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TaggedModel>,
}

#[derive(Debug, Deserialize)]
struct TaggedModel {
    name: String,
}

/// What to do after a failed HTTP attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Retry,
    Fail,
}

fn classify(error: &ureq::Error) -> Disposition {
    match error {
        ureq::Error::StatusCode(status) if *status >= 500 => Disposition::Retry,
        ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Io(_) => Disposition::Retry,
        _ => Disposition::Fail,
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        Ok(Self {
            base_url,
            model: config.model.clone(),
            batch_size: config.batch_size.max(1),
            agent: build_agent(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff_unit: Duration::from_secs(1),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Base delay between retries; doubles on every attempt
    #[inline]
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check that the configured model is installed and can embed text.
    ///
    /// Returns the model's embedding dimension.
    #[inline]
    pub fn health_check(&self) -> Result<usize> {
        debug!("Checking Ollama at {} for model {}", self.base_url, self.model);

        let installed = self.model_names().context("Failed to list models")?;
        if !installed.iter().any(|name| *name == self.model) {
            warn!("Model {} not installed. Available: {:?}", self.model, installed);
            return Err(anyhow::anyhow!(
                "Model '{}' is not available. Available models: {:?}",
                self.model,
                installed
            ));
        }

        let dimension = self
            .generate_embeddings(&[PROBE_TEXT.to_string()])
            .context("Probe embedding failed")?
            .first()
            .map_or(0, Vec::len);
        if dimension == 0 {
            return Err(anyhow::anyhow!("Model '{}' returned an empty embedding", self.model));
        }

        info!(
            "Ollama at {} ready: model {} embeds into {} dimensions",
            self.base_url, self.model, dimension
        );
        Ok(dimension)
    }

    /// Names of the models installed on the server
    #[inline]
    pub fn model_names(&self) -> Result<Vec<String>> {
        let tags: TagsResponse = self.get_json("/api/tags")?;
        debug!("Server lists {} models", tags.models.len());
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// L2-normalized embeddings for every text, `batch_size` texts per request
    #[inline]
    pub fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for (index, batch) in texts.chunks(self.batch_size as usize).enumerate() {
            let response: EmbedResponse = self
                .post_json(
                    "/api/embed",
                    &EmbedRequest {
                        model: &self.model,
                        input: batch,
                    },
                )
                .with_context(|| format!("Embedding batch {index} ({} texts) failed", batch.len()))?;

            if response.embeddings.len() != batch.len() {
                return Err(anyhow::anyhow!(
                    "Ollama returned {} embeddings for {} texts",
                    response.embeddings.len(),
                    batch.len()
                ));
            }

            embeddings.extend(response.embeddings.into_iter().map(|mut embedding| {
                l2_normalize_in_place(&mut embedding);
                embedding
            }));
        }

        debug!("Embedded {} texts with {}", embeddings.len(), self.model);
        Ok(embeddings)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Failed to build URL for {path}"))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        let body = self.send_with_retry(&url, || {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;
        serde_json::from_str(&body).with_context(|| format!("Unexpected response from {url}"))
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.endpoint(path)?;
        let payload = serde_json::to_string(body).context("Failed to encode request")?;
        let response = self.send_with_retry(&url, || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&payload)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;
        serde_json::from_str(&response).with_context(|| format!("Unexpected response from {url}"))
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_unit * EXPONENTIAL_BACKOFF_BASE.pow(attempt.saturating_sub(1))
    }

    /// Run `request` until it succeeds, fails permanently, or attempts run out.
    ///
    /// 5xx responses and transport failures are retried with exponential
    /// backoff; anything else fails immediately.
    fn send_with_retry<F>(&self, url: &Url, mut request: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut attempt = 1;
        loop {
            let error = match request() {
                Ok(body) => return Ok(body),
                Err(error) => error,
            };

            if classify(&error) == Disposition::Fail {
                warn!("Request to {} failed: {}", url, error);
                return Err(anyhow::anyhow!("Request to {url} failed: {error}"));
            }

            if attempt >= self.retry_attempts {
                error!(
                    "Request to {} failed after {} attempts: {}",
                    url, attempt, error
                );
                return Err(anyhow::anyhow!(
                    "Request to {url} failed after {attempt} attempts: {error}"
                ));
            }

            let delay = self.backoff_delay(attempt);
            warn!(
                "Attempt {}/{} to {} failed ({}), retrying in {:?}",
                attempt, self.retry_attempts, url, error, delay
            );
            std::thread::sleep(delay);
            attempt += 1;
        }
    }
}

impl Embedder for OllamaClient {
    #[inline]
    fn name(&self) -> &str {
        &self.model
    }

    #[inline]
    fn embed(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        self.generate_embeddings(texts)
            .map_err(|e| RecommenderError::Embedding(format!("{e:#}")))
    }
}
