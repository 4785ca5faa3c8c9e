//! Configuration management commands.

use clap::Args;
use serde_json::Value;
use std::path::{Path, PathBuf};
use vertexai_core::{paths, Config};

use super::load_config;

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show configuration (inline credentials are redacted)
    Show,

    /// Validate the integration settings
    Validate,

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file path
    Path,
}

fn config_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(paths::config_file()?),
    }
}

/// Config as JSON with inline `service_account_info` values masked.
pub fn redacted(config: &Config) -> anyhow::Result<Value> {
    let mut json = serde_json::to_value(config)?;
    if let Some(info) = json
        .get_mut("integration")
        .and_then(|i| i.get_mut("service_account_info"))
    {
        if info.is_string() {
            *info = Value::String("[REDACTED]".to_string());
        }
    }
    Ok(json)
}

/// Run the config command.
pub fn run(explicit: Option<&Path>, args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = load_config(explicit)?;
            println!("{}", serde_json::to_string_pretty(&redacted(&config)?)?);
        }

        ConfigCommand::Validate => {
            let config = load_config(explicit)?;
            match config.validate() {
                Ok(settings) => {
                    println!("Configuration is valid.");
                    println!("  model: {}", settings.model_name);
                    println!("  project: {} ({})", settings.project, settings.location);
                }
                Err(e) => anyhow::bail!("{}", e),
            }
        }

        ConfigCommand::Init { force } => {
            let path = config_path(explicit)?;

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {:?}. Use --force to overwrite.",
                    path
                );
            }

            if explicit.is_none() {
                paths::ensure_dirs()?;
            }
            Config::default().save(&path)?;

            println!("Created config file: {:?}", path);
            println!("  Tip: set integration.project, location, model_name and service_account_info.");
        }

        ConfigCommand::Path => {
            println!("{}", config_path(explicit)?.display());
        }
    }

    Ok(())
}
