//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use docsmith_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Variable holding the retrieved grounding context.
pub const CONTEXT_VAR: &str = "context";

/// Build a prompt from a definition and input variables.
///
/// Renders both the optional system template and the user template with the
/// same variables. Missing variables render as empty strings.
///
/// # Example
/// ```no_run
/// use docsmith_prompt::{build_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("draft".to_string(), "# Intro".to_string());
///
/// let built = build_prompt(&def, &vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: &HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let user = render_template(&definition.template, variables)?;
    let system = definition
        .system
        .as_deref()
        .map(|tpl| render_template(tpl, variables))
        .transpose()?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let grounding_included = variables
        .get(CONTEXT_VAR)
        .is_some_and(|ctx| !ctx.trim().is_empty());

    let mut resolved_variables: Vec<String> = variables.keys().cloned().collect();
    resolved_variables.sort();

    Ok(BuiltPrompt {
        system,
        user,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            grounding_included,
            resolved_variables,
        },
    })
}

/// Render a Handlebars template with variables.
pub(crate) fn render_template(
    template: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Source code must reach the model verbatim
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PromptBehavior, PromptOutputSpec};

    fn create_test_definition(system: Option<&str>) -> PromptDefinition {
        PromptDefinition {
            id: "stage.test".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            behavior: PromptBehavior {
                tone: "professional".to_string(),
                style: "concise".to_string(),
                temperature: None,
            },
            system: system.map(str::to_string),
            template: "Context:\n{{context}}\n\nDraft:\n{{draft}}".to_string(),
            output: PromptOutputSpec {
                format: "markdown".to_string(),
            },
        }
    }

    #[test]
    fn test_render_does_not_escape_code() {
        let mut vars = HashMap::new();
        vars.insert(
            "draft".to_string(),
            "if a < b && c > d { \"x\" }".to_string(),
        );

        let rendered = render_template("{{draft}}", &vars).unwrap();
        assert_eq!(rendered, "if a < b && c > d { \"x\" }");
    }

    #[test]
    fn test_build_prompt_with_grounding() {
        let def = create_test_definition(Some("You are {{stageName}}."));
        let mut vars = HashMap::new();
        vars.insert("draft".to_string(), "Body".to_string());
        vars.insert("context".to_string(), "[a.py chars 0-10]\nprint()".to_string());
        vars.insert("stageName".to_string(), "grammar_editor".to_string());

        let built = build_prompt(&def, &vars).unwrap();
        assert!(built.user.contains("print()"));
        assert!(built.user.ends_with("Body"));
        assert_eq!(built.system.as_deref(), Some("You are grammar_editor."));
        assert!(built.metadata.grounding_included);
        assert_eq!(
            built.metadata.resolved_variables,
            vec!["context", "draft", "stageName"]
        );
    }

    #[test]
    fn test_build_prompt_empty_context() {
        let def = create_test_definition(None);
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "   ".to_string());

        let built = build_prompt(&def, &vars).unwrap();
        assert!(!built.metadata.grounding_included);
        assert!(built.system.is_none());
    }

    #[test]
    fn test_render_template_missing_variable() {
        let vars = HashMap::new();
        let result = render_template("Question: {{missing}}", &vars);
        // Handlebars renders missing variables as empty string
        assert_eq!(result.unwrap(), "Question: ");
    }

    #[test]
    fn test_render_template_syntax_error() {
        let vars = HashMap::new();
        assert!(render_template("{{#if draft}}unterminated", &vars).is_err());
    }
}
