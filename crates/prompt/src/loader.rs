//! Prompt loader for YAML prompt definitions.
//!
//! Definitions resolve in two layers: a workspace file
//! `.docsmith/prompts/<id>.yml` wins over the built-in definition of the same
//! id compiled into the binary.

use crate::types::{PromptDefinition, PromptEntry, PromptSource};
use docsmith_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Workspace-relative directory holding prompt overrides.
pub const PROMPTS_DIR: &str = ".docsmith/prompts";

const BUILTIN_PROMPTS: [(&str, &str); 4] = [
    (
        "stage.generator",
        include_str!("../prompts/stage.generator.yml"),
    ),
    (
        "stage.grammar_editor",
        include_str!("../prompts/stage.grammar_editor.yml"),
    ),
    (
        "stage.technical_editor",
        include_str!("../prompts/stage.technical_editor.yml"),
    ),
    (
        "stage.final_polish",
        include_str!("../prompts/stage.final_polish.yml"),
    ),
];

/// Ids of the prompts compiled into the binary.
pub fn builtin_ids() -> impl Iterator<Item = &'static str> {
    BUILTIN_PROMPTS.iter().map(|(id, _)| *id)
}

/// Load a built-in prompt definition.
pub fn load_builtin(prompt_id: &str) -> AppResult<PromptDefinition> {
    let (_, contents) = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown built-in prompt: {}", prompt_id)))?;

    parse_prompt(contents, prompt_id, &PromptSource::Builtin)
}

/// Path of the workspace override file for `prompt_id`.
pub fn override_path(workspace_path: &Path, prompt_id: &str) -> PathBuf {
    workspace_path
        .join(PROMPTS_DIR)
        .join(format!("{}.yml", prompt_id))
}

/// Load a prompt definition by ID.
///
/// Looks for `<workspace>/.docsmith/prompts/<id>.yml` first and falls back
/// to the built-in definition.
///
/// # Example
/// ```no_run
/// use docsmith_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (prompt, source) = load_prompt(Path::new("."), "stage.generator")?;
/// println!("Loaded prompt: {} from {}", prompt.title, source);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(
    workspace_path: &Path,
    prompt_id: &str,
) -> AppResult<(PromptDefinition, PromptSource)> {
    let prompt_file = override_path(workspace_path, prompt_id);

    if prompt_file.is_file() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);

        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;

        let source = PromptSource::Workspace(prompt_file);
        let definition = parse_prompt(&contents, prompt_id, &source)?;
        tracing::info!("Using prompt override: {} ({})", definition.id, source);
        return Ok((definition, source));
    }

    Ok((load_builtin(prompt_id)?, PromptSource::Builtin))
}

/// List all available prompts, built-in and workspace, sorted by id.
///
/// A workspace file shadows the built-in entry with the same id.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<PromptEntry>> {
    let mut entries: Vec<PromptEntry> = builtin_ids()
        .map(|id| PromptEntry {
            id: id.to_string(),
            source: PromptSource::Builtin,
        })
        .collect();

    let prompts_dir = workspace_path.join(PROMPTS_DIR);
    if prompts_dir.is_dir() {
        for entry in walkdir::WalkDir::new(&prompts_dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("yml") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let source = PromptSource::Workspace(path.to_path_buf());
            match entries.iter_mut().find(|e| e.id == stem) {
                Some(existing) => existing.source = source,
                None => entries.push(PromptEntry {
                    id: stem.to_string(),
                    source,
                }),
            }
        }
    }

    entries.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(entries)
}

/// Parse and validate a definition, checking its id matches the lookup key.
fn parse_prompt(
    contents: &str,
    expected_id: &str,
    source: &PromptSource,
) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML ({}): {}", source, e))
    })?;

    validate_prompt(&definition)?;

    if definition.id != expected_id {
        return Err(AppError::Prompt(format!(
            "Prompt id mismatch in {}: expected '{}', found '{}'",
            source, expected_id, definition.id
        )));
    }

    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.api_version.is_empty() {
        return Err(AppError::Prompt(
            "Prompt apiVersion cannot be empty".to_string(),
        ));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    // Validate API version format (simple check)
    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if let Some(temperature) = def.behavior.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AppError::Prompt(format!(
                "Prompt temperature out of range [0, 2]: {}",
                temperature
            )));
        }
    }

    Ok(())
}
