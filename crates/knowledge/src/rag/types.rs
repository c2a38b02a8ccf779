//! Retrieval settings and grounding context.

use crate::types::ChunkId;
use docsmith_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// When grounding context is retrieved during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    /// Retrieve again before every stage, queried by the current draft
    #[default]
    PerStage,
    /// Retrieve once, queried by the source summary, and reuse
    Once,
}

/// Retrieval settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks retrieved per query
    pub top_k: usize,

    /// Upper bound on grounding context length, in characters
    pub max_context_length: usize,

    /// Embedding requests in flight while building the index
    pub embed_concurrency: usize,

    pub context_mode: ContextMode,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_context_length: 6000,
            embed_concurrency: 4,
            context_mode: ContextMode::PerStage,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.top_k must be greater than 0".to_string(),
            ));
        }
        if self.max_context_length == 0 {
            return Err(AppError::Config(
                "retrieval.max_context_length must be greater than 0".to_string(),
            ));
        }
        if self.embed_concurrency == 0 {
            return Err(AppError::Config(
                "retrieval.embed_concurrency must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Retrieved source excerpts for one stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingContext {
    /// Excerpts in ranked order, each under a location header
    pub text: String,

    /// Chunks that contributed to `text`, in ranked order
    pub sources: Vec<ChunkId>,

    /// Whether `text` was cut at the length limit
    pub truncated: bool,
}

impl GroundingContext {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_mode_serde() {
        let mode: ContextMode = serde_json::from_str("\"once\"").unwrap();
        assert_eq!(mode, ContextMode::Once);
        assert_eq!(
            serde_json::to_string(&ContextMode::PerStage).unwrap(),
            "\"per_stage\""
        );
    }

    #[test]
    fn test_retrieval_config_validation() {
        assert!(RetrievalConfig::default().validate().is_ok());

        let config = RetrievalConfig {
            top_k: 0,
            ..RetrievalConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
