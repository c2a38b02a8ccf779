//! Generate command handler.
//!
//! Runs the full pipeline over a source directory and reports the result.

use clap::Args;
use docsmith_core::{config::AppConfig, AppError, AppResult};
use docsmith_knowledge::{create_provider, ContextMode, ProgressEvent, ProgressReporter};
use docsmith_llm::create_client;
use docsmith_pipeline::{OutputTarget, Pipeline, PipelineConfig};
use docsmith_prompt::PromptLibrary;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Generate an article from a source directory
#[derive(Args, Debug)]
pub struct GenerateCommand {
    /// Directory containing the source files
    pub source: PathBuf,

    /// Output file
    #[arg(short, long, default_value = "generated_article.md")]
    pub output: PathBuf,

    /// Print the article to stdout instead of writing a file
    #[arg(long, conflicts_with = "output")]
    pub stdout: bool,

    /// File extensions to collect, without the dot (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Skip files larger than this many bytes
    #[arg(long)]
    pub max_file_size: Option<u64>,

    /// Chunk length in characters
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Chunks retrieved per stage
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Maximum grounding context length in characters
    #[arg(long)]
    pub max_context: Option<usize>,

    /// Retrieve context once instead of before every stage
    #[arg(long)]
    pub context_once: bool,

    /// Embedding provider (ollama, trigram)
    #[arg(long)]
    pub embedding_provider: Option<String>,

    /// Embedding model identifier
    #[arg(long)]
    pub embedding_model: Option<String>,

    /// Per-stage generation timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Do not print progress to stderr
    #[arg(long)]
    pub no_progress: bool,

    /// Output the run result as JSON
    #[arg(long, conflicts_with = "stdout")]
    pub json: bool,
}

impl GenerateCommand {
    /// Execute the generate command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing generate command for {:?}", self.source);
        tracing::debug!("Generate options: {:?}", self);

        let pipeline_config = self.pipeline_config(config)?;
        let generation = &pipeline_config.generation;

        let llm = create_client(
            &generation.provider,
            generation.endpoint.as_deref(),
            Duration::from_secs(generation.timeout_secs),
        )?;
        let embedder = create_provider(&pipeline_config.embedding)?;

        let cancellation = CancellationToken::new();
        let ctrl_c = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping after the current stage");
                ctrl_c.cancel();
            }
        });

        let mut pipeline = Pipeline::new(llm, embedder)
            .with_prompts(PromptLibrary::with_workspace(&config.workspace))
            .with_cancellation(cancellation);
        if !self.no_progress {
            pipeline = pipeline.with_progress(ProgressReporter::new(Arc::new(
                |event: ProgressEvent| eprintln!("{}", event.format_simple()),
            )));
        }

        let target = if self.stdout {
            OutputTarget::Stdout
        } else {
            OutputTarget::File(self.output.clone())
        };

        let result = pipeline
            .generate(&self.source, &target, &pipeline_config)
            .await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else if self.stdout {
            eprintln!("{}", result.summary());
        } else {
            println!("{}", result.summary());
            if let Some(ref path) = result.output_path {
                println!("Article written to {}", path.display());
            }
            for stage in &result.stage_trace {
                for flag in &stage.flags {
                    println!("  [{}] {}", stage.stage_name, flag);
                }
            }
        }

        match result.error {
            None => Ok(()),
            Some(failure) => Err(AppError::Pipeline(failure.to_string())),
        }
    }

    /// Config file `pipeline:` section, then application settings, then flags.
    fn pipeline_config(&self, config: &AppConfig) -> AppResult<PipelineConfig> {
        let mut pipeline = PipelineConfig::load(&config.config_path())?;

        pipeline.generation.provider = config.provider.clone();
        pipeline.generation.model = config.model.clone();
        if config.endpoint.is_some() {
            pipeline.generation.endpoint = config.endpoint.clone();
        }
        if pipeline.embedding.endpoint.is_none() && pipeline.embedding.provider == "ollama" {
            pipeline.embedding.endpoint = pipeline.generation.endpoint.clone();
        }

        if !self.extensions.is_empty() {
            pipeline.collection.extensions = self
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect();
        }
        if let Some(size) = self.max_file_size {
            pipeline.collection.max_file_size = size;
        }
        if let Some(size) = self.chunk_size {
            pipeline.chunking.target_length = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            pipeline.chunking.overlap_length = overlap;
        }
        if let Some(k) = self.top_k {
            pipeline.retrieval.top_k = k;
        }
        if let Some(max) = self.max_context {
            pipeline.retrieval.max_context_length = max;
        }
        if self.context_once {
            pipeline.retrieval.context_mode = ContextMode::Once;
        }
        if let Some(ref provider) = self.embedding_provider {
            pipeline.embedding.provider = provider.clone();
        }
        if let Some(ref model) = self.embedding_model {
            pipeline.embedding.model = model.clone();
        }
        if let Some(timeout) = self.timeout {
            pipeline.generation.timeout_secs = timeout;
        }

        pipeline.validate()?;
        Ok(pipeline)
    }
}
