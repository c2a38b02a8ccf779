//! Prompt resolution for a run.

use crate::loader::{load_builtin, load_prompt};
use crate::types::PromptDefinition;
use docsmith_core::AppResult;
use std::path::PathBuf;

/// Resolves prompt ids to definitions, optionally honoring workspace overrides.
#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    workspace: Option<PathBuf>,
}

impl PromptLibrary {
    /// Library serving only the built-in definitions.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Library that checks `<workspace>/.docsmith/prompts` first.
    pub fn with_workspace(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: Some(workspace.into()),
        }
    }

    /// Resolve a prompt definition by id.
    pub fn resolve(&self, prompt_id: &str) -> AppResult<PromptDefinition> {
        match self.workspace {
            Some(ref workspace) => load_prompt(workspace, prompt_id).map(|(def, _)| def),
            None => load_builtin(prompt_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_library_resolves_stage_prompts() {
        let library = PromptLibrary::builtin();
        assert!(library.resolve("stage.technical_editor").is_ok());
        assert!(library.resolve("stage.unknown").is_err());
    }

    #[test]
    fn test_workspace_library_without_overrides() {
        let temp = TempDir::new().unwrap();
        let library = PromptLibrary::with_workspace(temp.path());
        let def = library.resolve("stage.final_polish").unwrap();
        assert_eq!(def.id, "stage.final_polish");
    }
}
