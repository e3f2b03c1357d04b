use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use teams_graph::api::{load_catalog, EndpointDescriptor};
use teams_graph::Config;

use super::output::{print_output, print_single};
use super::OutputFormat;

#[derive(Args, Debug)]
pub struct OpsCommand {
    #[command(subcommand)]
    pub command: OpsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum OpsSubcommand {
    /// List catalog operations
    List {
        /// Only show operations whose name or path contains this text
        #[arg(short = 's', long)]
        search: Option<String>,
    },

    /// Show one operation descriptor
    Show {
        /// Operation name, e.g. groups.team.get
        name: String,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct OperationRow {
    #[tabled(rename = "Operation")]
    name: String,
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Path")]
    path: String,
}

pub fn execute(cmd: OpsCommand, config: &Config, format: OutputFormat) -> Result<()> {
    let catalog = load_catalog(config)?;

    match cmd.command {
        OpsSubcommand::List { search } => {
            let rows: Vec<OperationRow> = match &search {
                Some(needle) => catalog.search(needle).map(row).collect(),
                None => catalog.iter().map(row).collect(),
            };
            print_output(&rows, format);
        }
        OpsSubcommand::Show { name } => match catalog.get(&name) {
            Some(descriptor) => print_single(descriptor, format),
            None => anyhow::bail!("Unknown operation: {}", name),
        },
    }

    Ok(())
}

fn row(descriptor: &EndpointDescriptor) -> OperationRow {
    OperationRow {
        name: descriptor.name.clone(),
        method: descriptor.method.to_string(),
        path: descriptor.path.to_string(),
    }
}
