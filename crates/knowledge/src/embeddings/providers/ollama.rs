//! Ollama embedding provider.
//!
//! Provides semantic embeddings via Ollama's local API using models like
//! nomic-embed-text (768 dimensions).
//!
//! Transient failures (unreachable server, timeout, 5xx) are retried
//! `max_retries` times with exponential backoff; rejected requests are not.

use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use docsmith_core::{AppError, AppResult, ProviderFailure};
use docsmith_llm::http::{status_error, transport_error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Ollama embedding provider using local API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// HTTP client for API requests
    client: Client,
    /// Ollama API base URL
    base_url: String,
    /// Model name (e.g., "nomic-embed-text")
    model: String,
    /// Expected embedding dimensions
    dimensions: usize,
    /// Extra attempts after a transient failure
    max_retries: u32,
}

/// Request payload for Ollama embeddings API
#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response from Ollama embeddings API
#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaProvider {
    /// Create a provider. No request is made until the first embedding.
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AppError::Config(format!("Failed to create HTTP client for Ollama: {}", e))
            })?;

        let base_url = config
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
            dimensions: config.dimensions,
            max_retries: config.max_retries,
        })
    }

    /// Embed single text with retry logic
    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed_with_retries(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut attempt = 0;

        loop {
            match self.embed_single(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) if attempt < self.max_retries && is_transient(&e) => {
                    attempt += 1;
                    let delay_ms = backoff_ms(attempt);
                    warn!(
                        "Embedding failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt,
                        self.max_retries + 1,
                        delay_ms,
                        e
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Embed single text (no retries)
    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("Ollama", e))?;

        if !response.status().is_success() {
            return Err(status_error("Ollama", response).await);
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::provider(
                ProviderFailure::Unavailable,
                format!("Failed to parse Ollama embedding response: {}", e),
            )
        })?;

        if body.embedding.len() != self.dimensions {
            return Err(AppError::Knowledge(format!(
                "Ollama model '{}' returned {} dimensions, expected {}",
                self.model,
                body.embedding.len(),
                self.dimensions
            )));
        }

        Ok(body.embedding)
    }
}

fn is_transient(err: &AppError) -> bool {
    matches!(
        err.provider_failure(),
        Some(ProviderFailure::Unavailable) | Some(ProviderFailure::Timeout)
    )
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.trim().is_empty() {
            // Blank text carries no signal; a zero vector scores 0 against everything.
            return Ok(vec![0.0; self.dimensions]);
        }

        self.embed_with_retries(text).await
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        debug!("Embedding batch of {} texts", texts.len());

        // Ollama has no batch endpoint; callers wanting parallelism use `embed_all`.
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }

        Ok(embeddings)
    }
}

/// Delay before retry number `attempt` (1-based).
fn backoff_ms(attempt: u32) -> u64 {
    INITIAL_BACKOFF_MS.saturating_mul(2_u64.saturating_pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config(max_retries: u32) -> EmbeddingConfig {
        EmbeddingConfig {
            endpoint: Some("http://127.0.0.1:9/".to_string()),
            timeout_secs: 2,
            max_retries,
            ..EmbeddingConfig::default()
        }
    }

    #[test]
    fn test_base_url_normalized() {
        let provider = OllamaProvider::new(&unreachable_config(0)).unwrap();
        assert_eq!(provider.base_url, "http://127.0.0.1:9");
        assert_eq!(provider.model_name(), "nomic-embed-text");
    }

    #[tokio::test]
    async fn test_blank_text_is_zero_vector() {
        let provider = OllamaProvider::new(&unreachable_config(0)).unwrap();
        let embedding = provider.embed("   \n").await.unwrap();
        assert_eq!(embedding.len(), 768);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_provider_error() {
        let provider = OllamaProvider::new(&unreachable_config(1)).unwrap();
        let err = provider.embed("fn main() {}").await.unwrap_err();
        assert!(is_transient(&err));
    }

    #[test]
    fn test_backoff_doubles_and_saturates() {
        assert_eq!(backoff_ms(1), 200);
        assert_eq!(backoff_ms(2), 400);
        assert_eq!(backoff_ms(64), u64::MAX);
    }

    #[test]
    fn test_refusal_is_not_transient() {
        let err = AppError::provider(ProviderFailure::Refused, "model not found");
        assert!(!is_transient(&err));
        assert!(!is_transient(&AppError::Knowledge("dims".to_string())));
    }
}
