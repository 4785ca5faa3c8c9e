//! Settings check and model discovery.

use clap::Args;
use std::path::Path;

use super::{build_integration, load_settings};

/// Vault partition selection shared by provider-facing commands.
#[derive(Args, Debug, Default)]
pub struct ScopeArgs {
    /// Vault scope used to resolve `{{secret.NAME}}` references
    #[arg(long)]
    pub scope: Option<String>,
}

/// `vertexai check`
pub async fn check(config_path: Option<&Path>, args: ScopeArgs) -> anyhow::Result<()> {
    let (config, settings) = load_settings(config_path)?;
    let integration = build_integration(&config).await?;

    integration
        .check_settings(settings.into_inner(), args.scope.as_deref())
        .await?;
    println!(
        "Settings OK: connected to project '{}' in {}",
        config.integration.project, config.integration.location
    );
    Ok(())
}

/// `vertexai models`
pub async fn list(config_path: Option<&Path>, args: ScopeArgs) -> anyhow::Result<()> {
    let (config, settings) = load_settings(config_path)?;
    let integration = build_integration(&config).await?;

    let models = integration.get_models(&settings, args.scope.as_deref()).await?;
    if models.is_empty() {
        println!("No models found.");
        return Ok(());
    }

    println!(
        "{:<40} {:<8} {:<8} {:<8} {:>8} {:>8}",
        "ID", "TEXT", "CHAT", "EMBED", "INPUT", "OUTPUT"
    );
    println!("{}", "-".repeat(86));
    for model in &models {
        println!(
            "{:<40} {:<8} {:<8} {:<8} {:>8} {:>8}",
            model.id,
            yes_no(model.capabilities.completion),
            yes_no(model.capabilities.chat_completion),
            yes_no(model.capabilities.embeddings),
            model.token_limit.input,
            model.token_limit.output,
        );
    }
    println!("\n{} model(s) total.", models.len());
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
