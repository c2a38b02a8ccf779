//! Generation stages.
//!
//! The pipeline runs a fixed sequence of [`StageKind`]s. Each stage turns the
//! previous draft (or nothing, for the first stage) plus grounding context
//! into a new draft. [`PromptStage`] implements every kind by rendering the
//! kind's prompt definition and calling the generation backend.

use async_trait::async_trait;
use docsmith_core::{AppError, AppResult, ProviderFailure};
use docsmith_knowledge::GroundingContext;
use docsmith_llm::{LlmClient, LlmRequest};
use docsmith_prompt::{build_prompt, PromptDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Line prefix the technical editor uses to report unresolved concerns.
pub const FLAG_PREFIX: &str = "[FLAG]";

/// The stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Generator,
    GrammarEditor,
    TechnicalEditor,
    FinalPolish,
}

impl StageKind {
    /// Fixed execution order.
    pub const ORDERED: [StageKind; 4] = [
        StageKind::Generator,
        StageKind::GrammarEditor,
        StageKind::TechnicalEditor,
        StageKind::FinalPolish,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Generator => "generator",
            Self::GrammarEditor => "grammar_editor",
            Self::TechnicalEditor => "technical_editor",
            Self::FinalPolish => "final_polish",
        }
    }

    /// Id of the prompt definition driving this stage.
    pub fn prompt_id(&self) -> &'static str {
        match self {
            Self::Generator => "stage.generator",
            Self::GrammarEditor => "stage.grammar_editor",
            Self::TechnicalEditor => "stage.technical_editor",
            Self::FinalPolish => "stage.final_polish",
        }
    }

    /// Sampling temperature when neither config nor prompt sets one.
    pub fn default_temperature(&self) -> f32 {
        match self {
            Self::Generator => 0.7,
            Self::GrammarEditor => 0.3,
            Self::TechnicalEditor => 0.2,
            Self::FinalPolish => 0.4,
        }
    }

    /// Whether `[FLAG]` lines are extracted from this stage's output.
    pub fn reports_flags(&self) -> bool {
        matches!(self, Self::TechnicalEditor)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input handed to a stage.
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    /// Previous stage's draft; `None` for the first stage
    pub draft: Option<&'a str>,
    pub grounding: &'a GroundingContext,
    pub source_summary: &'a str,
}

/// Resolved generation settings for one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

/// A stage's successful output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageDraft {
    pub text: String,
    /// Concerns reported by the stage, without the `[FLAG]` prefix
    pub flags: Vec<String>,
}

/// A single step of the pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    fn name(&self) -> &str {
        self.kind().name()
    }

    /// Produce the next draft.
    ///
    /// Fails on backend errors, on timeout, and when the output is empty.
    async fn run(&self, input: StageInput<'_>, settings: &StageSettings) -> AppResult<StageDraft>;
}

/// Stage backed by a prompt definition and a generation client.
pub struct PromptStage {
    kind: StageKind,
    definition: PromptDefinition,
    client: Arc<dyn LlmClient>,
}

impl PromptStage {
    pub fn new(kind: StageKind, definition: PromptDefinition, client: Arc<dyn LlmClient>) -> Self {
        Self {
            kind,
            definition,
            client,
        }
    }

    pub fn definition(&self) -> &PromptDefinition {
        &self.definition
    }

    fn variables(&self, input: &StageInput<'_>) -> HashMap<String, String> {
        let mut variables = HashMap::new();
        variables.insert("stageName".to_string(), self.kind.name().to_string());
        variables.insert("sourceSummary".to_string(), input.source_summary.to_string());
        variables.insert("context".to_string(), input.grounding.text.clone());
        if let Some(draft) = input.draft {
            variables.insert("draft".to_string(), draft.to_string());
        }
        variables
    }
}

impl fmt::Debug for PromptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptStage")
            .field("kind", &self.kind)
            .field("prompt", &self.definition.id)
            .field("provider", &self.client.provider_name())
            .finish()
    }
}

#[async_trait]
impl Stage for PromptStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    async fn run(&self, input: StageInput<'_>, settings: &StageSettings) -> AppResult<StageDraft> {
        let built = build_prompt(&self.definition, &self.variables(&input))?;

        let mut request = LlmRequest::new(built.user, settings.model.clone());
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(temperature) = settings.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        tracing::debug!(
            "Stage '{}' calling {} (model: {}, grounding: {})",
            self.kind,
            self.client.provider_name(),
            settings.model,
            built.metadata.grounding_included
        );

        let response = tokio::time::timeout(settings.timeout, self.client.complete(&request))
            .await
            .map_err(|_| {
                AppError::provider(
                    ProviderFailure::Timeout,
                    format!(
                        "no response within {}s",
                        settings.timeout.as_secs_f64()
                    ),
                )
            })??;

        if !response.done {
            tracing::warn!("Stage '{}' received an incomplete response", self.kind);
        }

        let draft = if self.kind.reports_flags() {
            extract_flags(&response.content)
        } else {
            StageDraft {
                text: response.content.trim().to_string(),
                flags: Vec::new(),
            }
        };

        if draft.text.is_empty() {
            return Err(AppError::Pipeline(format!(
                "stage '{}' produced empty output",
                self.kind
            )));
        }

        for flag in &draft.flags {
            tracing::warn!("Stage '{}' flagged: {}", self.kind, flag);
        }

        Ok(draft)
    }
}

/// Move `[FLAG]` lines out of `output`.
pub fn extract_flags(output: &str) -> StageDraft {
    let mut flags = Vec::new();
    let mut kept = Vec::new();

    for line in output.lines() {
        match line.trim_start().strip_prefix(FLAG_PREFIX) {
            Some(flag) => {
                let flag = flag.trim();
                if !flag.is_empty() {
                    flags.push(flag.to_string());
                }
            }
            None => kept.push(line),
        }
    }

    StageDraft {
        text: kept.join("\n").trim().to_string(),
        flags,
    }
}
