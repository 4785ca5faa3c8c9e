//! vertexai CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vertexai_cli::{commands, default_filter, run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging comes up before the config is known to be valid, so a broken
    // file only loses its filter here and is reported by the command itself.
    let configured = commands::load_config(cli.config.as_deref())
        .ok()
        .and_then(|config| config.logging.filter);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(cli.verbose, configured.as_deref()).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(cli).await
}
