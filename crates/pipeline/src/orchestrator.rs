//! Pipeline orchestration.
//!
//! One call to [`Pipeline::generate`] is one run: collect, split, index, run
//! every stage in order, write the result. Nothing is shared between runs
//! except the provider handles the pipeline was built with.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::output::OutputTarget;
use crate::result::{PipelineResult, RunStats, StageOutput};
use crate::stage::{PromptStage, Stage, StageInput, StageKind, StageSettings};
use chrono::Utc;
use docsmith_knowledge::{
    source_summary, ContextMode, EmbeddingProvider, GroundingContext, ProgressReporter,
    RagContextBuilder, SourceCollector, VectorIndex,
};
use docsmith_llm::LlmClient;
use docsmith_prompt::PromptLibrary;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Retrieval-grounded document generator.
pub struct Pipeline {
    llm: Arc<dyn LlmClient>,
    embedder: Arc<dyn EmbeddingProvider>,
    prompts: PromptLibrary,
    progress: ProgressReporter,
    cancellation: CancellationToken,
}

/// Mutable bookkeeping of a single run.
#[derive(Debug, Default)]
struct RunState {
    trace: Vec<StageOutput>,
    stats: RunStats,
    content: Option<String>,
    output_path: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(llm: Arc<dyn LlmClient>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            llm,
            embedder,
            prompts: PromptLibrary::builtin(),
            progress: ProgressReporter::noop(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Resolve stage prompts through `prompts` (e.g. with workspace overrides).
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = prompts;
        self
    }

    /// Stop before the next stage once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Run the whole pipeline over the sources under `root`.
    ///
    /// Never returns an error: every failure is reported through the
    /// result's `error`, alongside the stages that ran before it.
    pub async fn generate(
        &self,
        root: &Path,
        output: &OutputTarget,
        config: &PipelineConfig,
    ) -> PipelineResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut state = RunState::default();

        let span = tracing::info_span!("pipeline", run_id = %run_id);
        let outcome = self
            .execute(root, output, config, &mut state)
            .instrument(span)
            .await;

        state.stats.duration_secs = clock.elapsed().as_secs_f64();
        let error = outcome.err().map(|e| {
            tracing::error!("Pipeline run {} failed: {}", run_id, e);
            e.to_failure()
        });

        let result = PipelineResult {
            run_id,
            success: error.is_none(),
            content: state.content,
            error,
            stage_trace: state.trace,
            stats: state.stats,
            output_path: state.output_path,
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!("{}", result.summary());
        result
    }

    async fn execute(
        &self,
        root: &Path,
        output: &OutputTarget,
        config: &PipelineConfig,
        state: &mut RunState,
    ) -> Result<(), PipelineError> {
        config
            .validate()
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;
        let stages = self.prepare_stages(config)?;
        let splitter = config
            .chunking
            .splitter()
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        tracing::info!("Collecting sources under {:?}", root);
        let collected = SourceCollector::new(config.collection.clone())
            .collect(root)
            .map_err(PipelineError::from_collection)?;
        state.stats.files_collected = collected.records.len();
        state.stats.files_skipped = collected.skipped.len();
        self.progress
            .collect(collected.records.len() as u64, collected.skipped.len() as u64);

        let chunks = splitter.split_all(&collected.records);
        self.progress
            .chunk(chunks.len() as u64, collected.records.len() as u64);
        tracing::info!(
            "Split {} files into {} chunks",
            collected.records.len(),
            chunks.len()
        );

        let rag = RagContextBuilder::new(self.embedder.clone(), config.retrieval.clone())
            .with_progress(self.progress.clone());
        let index = rag
            .build_index(chunks)
            .await
            .map_err(PipelineError::from_retrieval)?;
        state.stats.chunks_indexed = index.len();

        let summary = source_summary(&collected.records);
        let shared_context = match config.retrieval.context_mode {
            ContextMode::Once => Some(
                rag.build_context(&summary, &index)
                    .await
                    .map_err(PipelineError::from_retrieval)?,
            ),
            ContextMode::PerStage => None,
        };

        let total = stages.len() as u64;
        let mut draft: Option<String> = None;

        for (done, (stage, settings)) in stages.iter().enumerate() {
            let name = stage.name();
            if self.cancellation.is_cancelled() {
                tracing::warn!("Cancellation requested, stopping before stage '{}'", name);
                return Err(PipelineError::Cancelled {
                    stage: name.to_string(),
                });
            }

            let grounding = match shared_context {
                Some(ref context) => context.clone(),
                None => {
                    let query = draft.as_deref().unwrap_or(&summary);
                    rag.build_context(query, &index).await.map_err(|e| {
                        tracing::warn!("Retrieval for stage '{}' failed: {}", name, e);
                        PipelineError::from_retrieval(e)
                    })?
                }
            };
            self.progress.context(name, grounding.sources.len() as u64);

            let text = self
                .run_stage(&**stage, settings, draft.as_deref(), &grounding, &summary, state)
                .await?;
            draft = Some(text);
            self.progress.stage(done as u64 + 1, total, name);
        }

        let content = draft.unwrap_or_default();
        state.content = Some(content.clone());

        self.progress.write(&output.to_string());
        state.output_path = output
            .write(&content)
            .map_err(|e| PipelineError::OutputWrite(format!("{}: {}", output, e)))?;

        Ok(())
    }

    /// Run one stage and record it in the trace.
    async fn run_stage(
        &self,
        stage: &dyn Stage,
        settings: &StageSettings,
        draft: Option<&str>,
        grounding: &GroundingContext,
        summary: &str,
        state: &mut RunState,
    ) -> Result<String, PipelineError> {
        let name = stage.name();
        let clock = Instant::now();
        tracing::info!("Running stage '{}'", name);

        let input = StageInput {
            draft,
            grounding,
            source_summary: summary,
        };
        let outcome = stage.run(input, settings).await;
        let elapsed_ms = clock.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                tracing::debug!(
                    "Stage '{}' produced {} chars in {}ms",
                    name,
                    result.text.chars().count(),
                    elapsed_ms
                );
                state.trace.push(StageOutput::success(
                    name,
                    result.text.clone(),
                    result.flags,
                    &grounding.sources,
                    elapsed_ms,
                ));
                Ok(result.text)
            }
            Err(e) => {
                state.trace.push(StageOutput::failure(
                    name,
                    e.to_string(),
                    &grounding.sources,
                    elapsed_ms,
                ));
                Err(PipelineError::generation(name, e))
            }
        }
    }

    /// Resolve each stage's prompt and settings before any work starts.
    fn prepare_stages(
        &self,
        config: &PipelineConfig,
    ) -> Result<Vec<(Box<dyn Stage>, StageSettings)>, PipelineError> {
        StageKind::ORDERED
            .iter()
            .map(|&kind| {
                let definition = self.prompts.resolve(kind.prompt_id()).map_err(|e| {
                    PipelineError::Configuration(format!("prompt for stage '{}': {}", kind, e))
                })?;
                let settings = config.generation.stage_settings(kind, &definition);
                let stage: Box<dyn Stage> =
                    Box::new(PromptStage::new(kind, definition, self.llm.clone()));
                Ok((stage, settings))
            })
            .collect()
    }
}
