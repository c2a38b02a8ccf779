//! Multi-stage document generation.
//!
//! A [`Pipeline`] collects a source tree, indexes it for retrieval and runs
//! the fixed stage sequence (generator, grammar editor, technical editor,
//! final polish), each stage grounded by excerpts retrieved from the sources.
//! Every outcome, including failures, is reported as a [`PipelineResult`].

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod result;
pub mod stage;

#[cfg(test)]
mod tests;

pub use config::{ChunkingConfig, GenerationConfig, PipelineConfig, StageOverrides, StagesConfig};
pub use error::{ErrorKind, PipelineError, PipelineFailure};
pub use orchestrator::Pipeline;
pub use output::OutputTarget;
pub use result::{PipelineResult, RunStats, StageOutput};
pub use stage::{PromptStage, Stage, StageDraft, StageInput, StageKind, StageSettings};
