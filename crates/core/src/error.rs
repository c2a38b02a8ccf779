//! Error types for Docsmith.
//!
//! This module defines a unified error enum that covers all error categories
//! in the workspace: configuration, I/O, external providers, source
//! collection, retrieval, prompts and the generation pipeline.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// How an external capability (embedding or generation backend) failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    /// The backend could not be reached or answered with a server error.
    Unavailable,
    /// The call did not complete within its deadline.
    Timeout,
    /// The backend rejected the request.
    Refused,
}

impl ProviderFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Timeout => "timeout",
            Self::Refused => "refused",
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for Docsmith.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// We never panic — errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// External provider errors (embeddings or generation)
    #[error("Provider {kind}: {message}")]
    Provider {
        kind: ProviderFailure,
        message: String,
    },

    /// Source collection found nothing usable
    #[error("No eligible source files found under {}", .0.display())]
    NoEligibleFiles(PathBuf),

    /// Chunking, indexing and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Pipeline run errors surfaced to callers
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Build a provider error.
    pub fn provider(kind: ProviderFailure, message: impl Into<String>) -> Self {
        AppError::Provider {
            kind,
            message: message.into(),
        }
    }

    /// The provider failure kind, if this is a provider error.
    pub fn provider_failure(&self) -> Option<ProviderFailure> {
        match self {
            AppError::Provider { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
