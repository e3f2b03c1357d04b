pub mod auth;
pub mod call;
pub mod completions;
pub mod ops;
pub mod output;
pub mod teams;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};

use teams_graph::Config;

/// Microsoft Graph Teams client driven by endpoint descriptors
#[derive(Parser, Debug)]
#[command(name = "teams-graph")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format [default: `output.default_format` from config, else table]
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authentication commands
    Auth(auth::AuthCommand),

    /// Browse the endpoint catalog
    Ops(ops::OpsCommand),

    /// Invoke any catalog operation
    Call(call::CallCommand),

    /// Teams operations
    Teams(teams::TeamsCommand),

    /// Generate shell completions
    Completions(completions::CompletionsCommand),
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// JSON output (best for scripts and agents)
    Json,
    /// Table output (best for humans)
    #[default]
    Table,
    /// Plain output (minimal, for scripting)
    Plain,
}

impl OutputFormat {
    /// The `--format` flag, falling back to the configured default
    pub fn resolve(flag: Option<OutputFormat>, config: &Config) -> Result<Self> {
        match flag {
            Some(format) => Ok(format),
            None => OutputFormat::from_str(&config.output.default_format, true).map_err(|_| {
                anyhow!(
                    "Invalid output.default_format in config: {} (expected json, table or plain)",
                    config.output.default_format
                )
            }),
        }
    }
}
