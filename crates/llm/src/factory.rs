//! Generation provider factory.
//!
//! Resolves a provider name from configuration into a shared client.

use crate::client::LlmClient;
use crate::providers::{ollama::DEFAULT_ENDPOINT, OllamaClient};
use crate::types::ProviderType;
use docsmith_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create a generation client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `timeout` - Per-request HTTP timeout
///
/// # Errors
/// Returns a configuration error if the provider is unknown or the HTTP
/// client cannot be initialized.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown generation provider: {}", provider)))?;

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(DEFAULT_ENDPOINT);
            tracing::debug!("Creating Ollama generation client at {}", base_url);
            Ok(Arc::new(OllamaClient::new(base_url, timeout)?))
        }
    }
}
