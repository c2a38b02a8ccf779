//! Run outcome types.

use crate::error::PipelineFailure;
use chrono::{DateTime, Utc};
use docsmith_knowledge::ChunkId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Record of one executed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOutput {
    pub stage_name: String,
    /// Draft produced by the stage; empty when it failed
    pub draft_text: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
    /// Chunks the stage was grounded on, in ranked order
    pub grounding_chunks: Vec<String>,
    pub duration_ms: u64,
}

impl StageOutput {
    pub fn success(
        stage_name: &str,
        draft_text: String,
        flags: Vec<String>,
        grounding: &[ChunkId],
        duration_ms: u64,
    ) -> Self {
        Self {
            stage_name: stage_name.to_string(),
            draft_text,
            succeeded: true,
            error: None,
            flags,
            grounding_chunks: grounding.iter().map(|id| id.to_string()).collect(),
            duration_ms,
        }
    }

    pub fn failure(stage_name: &str, error: String, grounding: &[ChunkId], duration_ms: u64) -> Self {
        Self {
            stage_name: stage_name.to_string(),
            draft_text: String::new(),
            succeeded: false,
            error: Some(error),
            flags: Vec::new(),
            grounding_chunks: grounding.iter().map(|id| id.to_string()).collect(),
            duration_ms,
        }
    }
}

/// Counters for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub files_collected: usize,
    pub files_skipped: usize,
    pub chunks_indexed: usize,
    pub duration_secs: f64,
}

/// Outcome of `Pipeline::generate`.
///
/// `success` is true exactly when `error` is `None`. `content` holds the
/// final draft whenever all stages completed, even if writing it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub success: bool,
    pub content: Option<String>,
    pub error: Option<PipelineFailure>,
    pub stage_trace: Vec<StageOutput>,
    pub stats: RunStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineResult {
    /// One-line status for logs and the CLI.
    pub fn summary(&self) -> String {
        let duration = self.stats.duration_secs;
        match self.error {
            None => {
                let chars = self
                    .content
                    .as_deref()
                    .map(|c| c.chars().count())
                    .unwrap_or(0);
                let flags: usize = self.stage_trace.iter().map(|s| s.flags.len()).sum();
                let mut line = format!(
                    "Generated {} chars from {} files ({} chunks) in {:.1}s",
                    chars, self.stats.files_collected, self.stats.chunks_indexed, duration
                );
                if flags > 0 {
                    line.push_str(&format!(", {} flags raised", flags));
                }
                line
            }
            Some(ref failure) => format!(
                "Failed at {} after {} stages in {:.1}s: {}",
                failure.stage,
                self.stage_trace.len(),
                duration,
                failure.message
            ),
        }
    }

    /// Draft from the last successful stage.
    pub fn last_draft(&self) -> Option<&str> {
        self.stage_trace
            .iter()
            .rev()
            .find(|s| s.succeeded)
            .map(|s| s.draft_text.as_str())
    }
}
