//! Embedding configuration.

use docsmith_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Providers `create_provider` can build.
pub const SUPPORTED_PROVIDERS: [&str; 2] = ["ollama", "trigram"];

/// Upper bound for `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider name: "ollama" or "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Endpoint override (Ollama only)
    pub endpoint: Option<String>,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Extra attempts after a transient failure
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            endpoint: None,
            dimensions: 768,
            timeout_secs: 30,
            max_retries: 0,
        }
    }
}

impl EmbeddingConfig {
    /// Offline configuration using the trigram provider.
    pub fn trigram(dimensions: usize) -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions,
            ..Self::default()
        }
    }

    /// Validate provider name and numeric ranges.
    pub fn validate(&self) -> AppResult<()> {
        if !SUPPORTED_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: '{}'. Supported providers: {}",
                self.provider,
                SUPPORTED_PROVIDERS.join(", ")
            )));
        }

        if self.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be greater than 0".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(AppError::Config(
                "embedding.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(AppError::Config(format!(
                "embedding.max_retries must be at most {}",
                MAX_RETRIES_LIMIT
            )));
        }

        if self.model.trim().is_empty() {
            return Err(AppError::Config(
                "embedding.model cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
