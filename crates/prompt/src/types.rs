//! Prompt types for Docsmith.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Behavioral settings
    pub behavior: PromptBehavior,

    /// Optional system message template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Template string with Handlebars syntax
    pub template: String,

    /// Output specification
    pub output: PromptOutputSpec,
}

/// Behavioral settings for prompt execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptBehavior {
    /// Tone (e.g., "professional", "educational")
    pub tone: String,

    /// Style (e.g., "concise", "engaging")
    pub style: String,

    /// Suggested sampling temperature; stage settings take precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Output specification for the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOutputSpec {
    /// Output format (e.g., "text", "markdown")
    pub format: String,
}

/// Where a prompt definition came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSource {
    /// Compiled into the binary
    Builtin,
    /// Workspace override file
    Workspace(PathBuf),
}

impl fmt::Display for PromptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => f.write_str("builtin"),
            Self::Workspace(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A listed prompt and its origin.
#[derive(Debug, Clone)]
pub struct PromptEntry {
    pub id: String,
    pub source: PromptSource,
}

/// A fully built prompt ready for execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Whether non-empty grounding context was supplied
    #[serde(rename = "groundingIncluded")]
    pub grounding_included: bool,

    /// Names of the template variables that were supplied, sorted
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: stage.test
title: Test Prompt
apiVersion: "1.0"
createdBy: test
behavior:
  tone: professional
  style: concise
  temperature: 0.3
template: "{{draft}}"
output:
  format: markdown
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "stage.test");
        assert_eq!(def.behavior.tone, "professional");
        assert_eq!(def.behavior.temperature, Some(0.3));
        assert!(def.system.is_none());
    }

    #[test]
    fn test_prompt_source_display() {
        assert_eq!(PromptSource::Builtin.to_string(), "builtin");
        let source = PromptSource::Workspace(PathBuf::from(".docsmith/prompts/a.yml"));
        assert_eq!(source.to_string(), ".docsmith/prompts/a.yml");
    }
}
