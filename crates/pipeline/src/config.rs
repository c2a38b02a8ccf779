//! Pipeline configuration.
//!
//! Every tunable of a run lives in [`PipelineConfig`], passed explicitly to
//! `Pipeline::generate`. It is read from the `pipeline:` section of
//! `.docsmith/config.yaml`; every field has a default so the section (or the
//! whole file) may be absent.

use crate::stage::{StageKind, StageSettings};
use docsmith_core::config::KNOWN_PROVIDERS;
use docsmith_core::{AppError, AppResult};
use docsmith_knowledge::{ChunkSplitter, CollectorConfig, EmbeddingConfig, RetrievalConfig};
use docsmith_prompt::PromptDefinition;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete configuration of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub collection: CollectorConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
}

/// Chunk window settings, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub target_length: usize,
    pub overlap_length: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_length: 1000,
            overlap_length: 200,
        }
    }
}

impl ChunkingConfig {
    pub fn splitter(&self) -> AppResult<ChunkSplitter> {
        ChunkSplitter::new(self.target_length, self.overlap_length)
    }
}

/// Generation backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: String,
    pub endpoint: Option<String>,
    pub model: String,
    /// Per-stage call deadline, in seconds
    pub timeout_secs: u64,
    pub stages: StagesConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            endpoint: None,
            model: "llama3.2".to_string(),
            timeout_secs: 300,
            stages: StagesConfig::default(),
        }
    }
}

/// Optional per-stage overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagesConfig {
    pub generator: StageOverrides,
    pub grammar_editor: StageOverrides,
    pub technical_editor: StageOverrides,
    pub final_polish: StageOverrides,
}

impl StagesConfig {
    pub fn get(&self, kind: StageKind) -> &StageOverrides {
        match kind {
            StageKind::Generator => &self.generator,
            StageKind::GrammarEditor => &self.grammar_editor,
            StageKind::TechnicalEditor => &self.technical_editor,
            StageKind::FinalPolish => &self.final_polish,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageOverrides {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationConfig {
    /// Settings for `kind`.
    ///
    /// Temperature resolves from the stage override, then the prompt's
    /// behavior, then the stage's built-in default.
    pub fn stage_settings(&self, kind: StageKind, prompt: &PromptDefinition) -> StageSettings {
        let overrides = self.stages.get(kind);
        StageSettings {
            model: overrides
                .model
                .clone()
                .unwrap_or_else(|| self.model.clone()),
            temperature: overrides
                .temperature
                .or(prompt.behavior.temperature)
                .or(Some(kind.default_temperature())),
            max_tokens: overrides.max_tokens,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Unknown generation provider: '{}'. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }
        if self.model.trim().is_empty() {
            return Err(AppError::Config(
                "generation.model cannot be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::Config(
                "generation.timeout_secs must be greater than 0".to_string(),
            ));
        }

        for kind in StageKind::ORDERED {
            let overrides = self.stages.get(kind);
            if let Some(t) = overrides.temperature {
                if !(0.0..=2.0).contains(&t) {
                    return Err(AppError::Config(format!(
                        "generation.stages.{}.temperature must be between 0.0 and 2.0, got {}",
                        kind, t
                    )));
                }
            }
            if overrides.max_tokens == Some(0) {
                return Err(AppError::Config(format!(
                    "generation.stages.{}.max_tokens must be greater than 0",
                    kind
                )));
            }
            if overrides.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
                return Err(AppError::Config(format!(
                    "generation.stages.{}.model cannot be empty",
                    kind
                )));
            }
        }

        Ok(())
    }
}

/// Config file layout; sections other than `pipeline` are ignored.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    pipeline: PipelineConfig,
}

impl PipelineConfig {
    /// Load the `pipeline:` section of a config file.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using pipeline defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_yaml(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    /// Parse the `pipeline:` section from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: ConfigFile = serde_yaml::from_str(contents)?;
        Ok(file.pipeline)
    }

    /// Check every section.
    pub fn validate(&self) -> AppResult<()> {
        self.collection.validate()?;
        self.chunking.splitter()?;
        self.retrieval.validate()?;
        self.embedding.validate()?;
        self.generation.validate()
    }
}
