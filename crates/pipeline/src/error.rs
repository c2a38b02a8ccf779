//! Pipeline failure taxonomy.
//!
//! Every fatal condition of a run is a [`PipelineError`]. The orchestrator
//! never returns one directly; it is flattened into the [`PipelineFailure`]
//! carried by a failed `PipelineResult`.

use docsmith_core::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Phase name reported for configuration failures.
pub const CONFIGURATION_PHASE: &str = "configuration";
/// Phase name reported for collection failures.
pub const COLLECTION_PHASE: &str = "collection";
/// Phase name reported for index and retrieval failures.
pub const CONTEXT_PHASE: &str = "context";
/// Phase name reported for output failures.
pub const OUTPUT_PHASE: &str = "output";

/// Category of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    NoEligibleFiles,
    Collection,
    EmbeddingUnavailable,
    Retrieval,
    Generation,
    OutputWrite,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::NoEligibleFiles => "no_eligible_files",
            Self::Collection => "collection",
            Self::EmbeddingUnavailable => "embedding_unavailable",
            Self::Retrieval => "retrieval",
            Self::Generation => "generation",
            Self::OutputWrite => "output_write",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal pipeline error.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("{0}")]
    NoEligibleFiles(String),

    #[error("Source collection failed: {0}")]
    Collection(String),

    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Similarity index error: {0}")]
    Retrieval(String),

    #[error("Stage '{stage}' failed: {message}")]
    Generation { stage: String, message: String },

    #[error("Failed to write output: {0}")]
    OutputWrite(String),

    #[error("Run cancelled before stage '{stage}'")]
    Cancelled { stage: String },
}

impl PipelineError {
    /// Classify an error from source collection.
    pub fn from_collection(err: AppError) -> Self {
        match err {
            AppError::NoEligibleFiles(_) => Self::NoEligibleFiles(err.to_string()),
            other => Self::Collection(other.to_string()),
        }
    }

    /// Classify an error from index building or retrieval.
    ///
    /// Only provider failures mean the embedding backend is unavailable;
    /// anything else is an integrity problem of the index itself.
    pub fn from_retrieval(err: AppError) -> Self {
        match err {
            AppError::Provider { .. } => Self::EmbeddingUnavailable(err.to_string()),
            other => Self::Retrieval(other.to_string()),
        }
    }

    pub fn generation(stage: &str, err: AppError) -> Self {
        Self::Generation {
            stage: stage.to_string(),
            message: err.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::NoEligibleFiles(_) => ErrorKind::NoEligibleFiles,
            Self::Collection(_) => ErrorKind::Collection,
            Self::EmbeddingUnavailable(_) => ErrorKind::EmbeddingUnavailable,
            Self::Retrieval(_) => ErrorKind::Retrieval,
            Self::Generation { .. } => ErrorKind::Generation,
            Self::OutputWrite(_) => ErrorKind::OutputWrite,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Stage or phase the failure is attributed to.
    pub fn stage(&self) -> &str {
        match self {
            Self::Configuration(_) => CONFIGURATION_PHASE,
            Self::NoEligibleFiles(_) | Self::Collection(_) => COLLECTION_PHASE,
            Self::EmbeddingUnavailable(_) | Self::Retrieval(_) => CONTEXT_PHASE,
            Self::Generation { stage, .. } | Self::Cancelled { stage } => stage.as_str(),
            Self::OutputWrite(_) => OUTPUT_PHASE,
        }
    }

    pub fn to_failure(&self) -> PipelineFailure {
        PipelineFailure {
            stage: self.stage().to_string(),
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Serializable description of why a run failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineFailure {
    /// Stage name or phase (`configuration`, `collection`, `context`, `output`)
    pub stage: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.kind, self.message)
    }
}
