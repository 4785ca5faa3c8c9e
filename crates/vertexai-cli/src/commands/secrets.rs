//! Secret management commands.
//!
//! Provides `vertexai secrets set|get|list|delete|seed-limits` on top of the
//! encrypted vault in `vertexai-secrets`.

use clap::Args;
use std::path::Path;
use vertexai_providers::seed_token_limits;
use vertexai_secrets::{SecretStore, DEFAULT_SCOPE};

use super::open_store_or_default;

/// Secrets command arguments.
#[derive(Args)]
pub struct SecretsArgs {
    #[command(subcommand)]
    pub command: SecretsCommand,
}

#[derive(clap::Subcommand)]
pub enum SecretsCommand {
    /// Store a secret (prompts for value)
    Set {
        /// Secret name (alphanumeric, underscore, hyphen)
        name: String,

        /// Secret value (if omitted, prompts for hidden input)
        #[arg(long)]
        value: Option<String>,

        /// Vault partition
        #[arg(long, default_value = DEFAULT_SCOPE)]
        scope: String,
    },

    /// Retrieve and print a decrypted secret
    Get {
        /// Secret name
        name: String,

        /// Vault partition
        #[arg(long, default_value = DEFAULT_SCOPE)]
        scope: String,
    },

    /// List stored secrets (names only)
    List {
        /// Vault partition
        #[arg(long, default_value = DEFAULT_SCOPE)]
        scope: String,
    },

    /// Delete a secret
    Delete {
        /// Secret name
        name: String,

        /// Vault partition
        #[arg(long, default_value = DEFAULT_SCOPE)]
        scope: String,
    },

    /// Store the default model token-limit table unless one exists
    SeedLimits,
}

/// Run the secrets command.
pub async fn run(config_path: Option<&Path>, args: SecretsArgs) -> anyhow::Result<()> {
    let store = open_store_or_default(config_path)?;

    match args.command {
        SecretsCommand::Set { name, value, scope } => {
            let secret_value = match value {
                Some(v) => v,
                None => {
                    let prompt = format!("Enter value for '{name}': ");
                    rpassword::prompt_password(prompt)
                        .map_err(|e| anyhow::anyhow!("Failed to read secret: {}", e))?
                }
            };

            if secret_value.is_empty() {
                anyhow::bail!("Secret value must not be empty");
            }

            store.set(&scope, &name, &secret_value).await?;
            println!("Secret '{}/{}' stored successfully.", scope, name);
        }

        SecretsCommand::Get { name, scope } => {
            let secret = store.get(&scope, &name).await?;
            println!("{}", secret.expose_secret());
        }

        SecretsCommand::List { scope } => {
            let entries = store.list(&scope).await?;

            if entries.is_empty() {
                println!("No secrets stored in '{}'.", scope);
            } else {
                println!("{:<32} {}", "NAME", "UPDATED");
                println!("{}", "-".repeat(56));
                for entry in &entries {
                    println!(
                        "{:<32} {}",
                        entry.name,
                        entry.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
                println!("\n{} secret(s) total.", entries.len());
            }
        }

        SecretsCommand::Delete { name, scope } => {
            store.delete(&scope, &name).await?;
            println!("Secret '{}/{}' deleted.", scope, name);
        }

        SecretsCommand::SeedLimits => {
            if seed_token_limits(&store).await? {
                println!("Seeded the default token-limit table.");
            } else {
                println!("Token-limit table already present; left unchanged.");
            }
        }
    }

    Ok(())
}
