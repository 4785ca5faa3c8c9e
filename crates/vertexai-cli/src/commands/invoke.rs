//! Token counting, generation, and embedding commands.

use anyhow::Context;
use clap::Args;
use futures::StreamExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use vertexai_core::{default_tokenizer, ChatMessage, PromptStructure, SettingsOverrides};
use vertexai_integration::{CountInput, InvocationInput};

use super::models::ScopeArgs;
use super::{build_integration, load_settings};

/// Arguments for `vertexai tokens`.
#[derive(Args, Debug)]
pub struct TokensArgs {
    /// Text to count
    #[arg(conflicts_with = "file", required_unless_present = "file")]
    pub text: Option<String>,

    /// JSON file holding a string, a record or list of records, or a prompt structure
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// Arguments for `vertexai invoke` and `vertexai stream`.
#[derive(Args, Debug)]
pub struct InvokeArgs {
    /// Prompt text
    #[arg(conflicts_with = "file", required_unless_present = "file")]
    pub text: Option<String>,

    /// System context sent with the prompt text
    #[arg(long, requires = "text")]
    pub context: Option<String>,

    /// JSON file holding a prompt structure or a message list
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Override the configured model
    #[arg(long)]
    pub model: Option<String>,

    /// Override the sampling temperature
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Override the output-token cap
    #[arg(long)]
    pub max_output_tokens: Option<u32>,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

impl InvokeArgs {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            model_name: self.model.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            ..SettingsOverrides::default()
        }
    }

    fn input(&self) -> anyhow::Result<InvocationInput> {
        if let Some(path) = &self.file {
            return read_invocation(path);
        }
        let text = self.text.clone().unwrap_or_default();
        Ok(match &self.context {
            Some(context) => InvocationInput::Prompt(PromptStructure::from_prompt(text).with_context(context)),
            None => InvocationInput::Text(text),
        })
    }
}

/// Arguments for `vertexai embed`.
#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Texts to embed
    #[arg(required = true)]
    pub texts: Vec<String>,

    /// Embed a single query instead of a document batch
    #[arg(long)]
    pub query: bool,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

/// Parse a prompt file: a message list, else a prompt structure.
pub fn parse_invocation(content: &str) -> anyhow::Result<InvocationInput> {
    if let Ok(messages) = serde_json::from_str::<Vec<ChatMessage>>(content) {
        return Ok(InvocationInput::Messages(messages));
    }
    let prompt: PromptStructure =
        serde_json::from_str(content).context("Expected a message list or a prompt structure")?;
    Ok(InvocationInput::Prompt(prompt))
}

fn read_invocation(path: &Path) -> anyhow::Result<InvocationInput> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_invocation(&content)
}

/// Parse a token-count file. Content that is not JSON is counted as text.
pub fn parse_count_input(content: &str) -> CountInput {
    serde_json::from_str(content).unwrap_or_else(|_| CountInput::Text(content.to_string()))
}

/// `vertexai tokens`
pub fn tokens(args: TokensArgs) -> anyhow::Result<()> {
    let input = match (&args.text, &args.file) {
        (_, Some(path)) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parse_count_input(&content)
        }
        (Some(text), None) => CountInput::Text(text.clone()),
        (None, None) => anyhow::bail!("Provide text or --file"),
    };

    let tokenizer = default_tokenizer();
    println!("{}", input.count(tokenizer.as_ref()));
    Ok(())
}

/// `vertexai invoke`
pub async fn invoke(config_path: Option<&Path>, args: InvokeArgs) -> anyhow::Result<()> {
    let (config, _) = load_settings(config_path)?;
    let settings = config
        .integration
        .clone()
        .with_overrides(&args.overrides())
        .validate()
        .context("Invalid settings after overrides")?;
    let integration = build_integration(&config).await?;

    let envelope = integration
        .invoke(&settings, args.scope.scope.as_deref(), args.input()?)
        .await?;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// `vertexai stream`
pub async fn stream(config_path: Option<&Path>, args: InvokeArgs) -> anyhow::Result<()> {
    let (config, _) = load_settings(config_path)?;
    let settings = config
        .integration
        .clone()
        .with_overrides(&args.overrides())
        .validate()
        .context("Invalid settings after overrides")?;
    let integration = build_integration(&config).await?;

    let mut chunks = integration
        .stream(&settings, args.scope.scope.as_deref(), args.input()?)
        .await?;

    let mut stdout = std::io::stdout();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        write!(stdout, "{}", chunk.content())?;
        stdout.flush()?;
    }
    writeln!(stdout)?;
    Ok(())
}

/// `vertexai embed`
pub async fn embed(config_path: Option<&Path>, args: EmbedArgs) -> anyhow::Result<()> {
    let (config, settings) = load_settings(config_path)?;
    let integration = build_integration(&config).await?;
    let scope = args.scope.scope.as_deref();

    if args.query {
        let text = args.texts.join(" ");
        let vector = integration.embed_query(&settings, scope, text).await?;
        println!("{}", serde_json::to_string(&vector)?);
    } else {
        let vectors = integration.embed(&settings, scope, args.texts).await?;
        for vector in &vectors {
            println!("{}", serde_json::to_string(vector)?);
        }
    }
    Ok(())
}
