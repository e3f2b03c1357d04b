mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, OutputFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use teams_graph::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "teams_graph=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load()?;
    let format = OutputFormat::resolve(cli.format, &config)?;
    if !config.output.color {
        colored::control::set_override(false);
    }

    // Execute command
    match cli.command {
        Commands::Auth(cmd) => cli::auth::execute(cmd, &config),
        Commands::Ops(cmd) => cli::ops::execute(cmd, &config, format),
        Commands::Call(cmd) => cli::call::execute(cmd, &config, format).await,
        Commands::Teams(cmd) => cli::teams::execute(cmd, &config, format).await,
        Commands::Completions(cmd) => cli::completions::execute(cmd),
    }
}
