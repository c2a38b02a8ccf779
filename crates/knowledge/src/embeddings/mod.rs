//! Embedding providers and bounded parallel embedding.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use crate::progress::ProgressReporter;
use docsmith_core::AppResult;
use futures::{StreamExt, TryStreamExt};

/// Embed every text with at most `concurrency` requests in flight.
///
/// Results come back in input order regardless of completion order. The
/// first failure aborts the whole batch and drops outstanding requests.
pub async fn embed_all(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    concurrency: usize,
    progress: &ProgressReporter,
) -> AppResult<Vec<Vec<f32>>> {
    let total = texts.len() as u64;
    let mut done = 0u64;

    tracing::info!(
        "Embedding {} texts with provider '{}' (model: {}, concurrency: {})",
        texts.len(),
        provider.provider_name(),
        provider.model_name(),
        concurrency.max(1)
    );

    let mut indexed: Vec<(usize, Vec<f32>)> = futures::stream::iter(texts.iter().enumerate())
        .map(|(i, text)| async move { provider.embed(text).await.map(|e| (i, e)) })
        .buffer_unordered(concurrency.max(1))
        .inspect_ok(|_| {
            done += 1;
            progress.embed(done, total, provider.model_name());
        })
        .try_collect()
        .await?;

    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, e)| e).collect())
}
