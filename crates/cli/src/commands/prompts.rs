//! Prompts command handler.
//!
//! Lists and shows the stage prompt definitions in effect for the workspace.

use clap::{Args, Subcommand};
use docsmith_core::{config::AppConfig, AppError, AppResult};
use docsmith_prompt::{list_prompts, load_prompt};

/// Inspect stage prompt definitions
#[derive(Args, Debug)]
pub struct PromptsCommand {
    #[command(subcommand)]
    pub action: PromptsAction,
}

#[derive(Subcommand, Debug)]
pub enum PromptsAction {
    /// List available prompts and where each comes from
    List(PromptsListCommand),
    /// Print a prompt definition
    Show(PromptsShowCommand),
}

/// List available prompts
#[derive(Args, Debug)]
pub struct PromptsListCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsListCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing prompts list command");

        let entries = list_prompts(&config.workspace)?;

        if self.json {
            let output: Vec<serde_json::Value> = entries
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "id": e.id,
                        "source": e.source.to_string(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            for entry in &entries {
                println!("{:<28} {}", entry.id, entry.source);
            }
        }

        Ok(())
    }
}

/// Print a prompt definition
#[derive(Args, Debug)]
pub struct PromptsShowCommand {
    /// Prompt id (e.g. stage.generator)
    pub id: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsShowCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing prompts show command for '{}'", self.id);

        let (definition, source) = load_prompt(&config.workspace, &self.id)?;
        tracing::debug!("Prompt '{}' resolved from {}", definition.id, source);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&definition)?);
        } else {
            let yaml = serde_yaml::to_string(&definition)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("# source: {}", source);
            print!("{}", yaml);
        }

        Ok(())
    }
}

impl PromptsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            PromptsAction::List(cmd) => cmd.execute(config),
            PromptsAction::Show(cmd) => cmd.execute(config),
        }
    }
}
