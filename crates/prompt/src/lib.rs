//! Prompt system for Docsmith.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions, built-in and per-workspace
//! - Handlebars template rendering
//!
//! Stage templates receive the variables `draft`, `context`,
//! `sourceSummary` and `stageName`.

pub mod builder;
pub mod library;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use library::PromptLibrary;
pub use loader::{list_prompts, load_prompt};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptEntry,
    PromptOutputSpec, PromptSource,
};
