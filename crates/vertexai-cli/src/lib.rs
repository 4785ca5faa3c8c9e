//! vertexai command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// vertexai - Vertex AI text, chat, and embedding models from the command line
#[derive(Parser)]
#[command(name = "vertexai")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "VERTEXAI_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Validate settings and test the connection
    Check(commands::models::ScopeArgs),

    /// Discover models visible to the project
    Models(commands::models::ScopeArgs),

    /// Count tokens in text or a JSON document
    Tokens(commands::invoke::TokensArgs),

    /// Run one generation and print the response envelope
    Invoke(commands::invoke::InvokeArgs),

    /// Run one generation and print text as it arrives
    Stream(commands::invoke::InvokeArgs),

    /// Embed texts with the configured model
    Embed(commands::invoke::EmbedArgs),

    /// Manage encrypted secrets
    Secrets(commands::secrets::SecretsArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_filter(verbose: u8, configured: Option<&str>) -> String {
    match (verbose, configured) {
        (0, Some(filter)) => filter.to_string(),
        (0, None) => "vertexai=info".to_string(),
        (1, _) => "vertexai=debug".to_string(),
        _ => "vertexai=trace".to_string(),
    }
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Check(args) => commands::models::check(config_path, args).await,
        Commands::Models(args) => commands::models::list(config_path, args).await,
        Commands::Tokens(args) => commands::invoke::tokens(args),
        Commands::Invoke(args) => commands::invoke::invoke(config_path, args).await,
        Commands::Stream(args) => commands::invoke::stream(config_path, args).await,
        Commands::Embed(args) => commands::invoke::embed(config_path, args).await,
        Commands::Secrets(args) => commands::secrets::run(config_path, args).await,
        Commands::Config(args) => commands::config::run(config_path, args),
        Commands::Version => {
            println!("vertexai {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
