use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};

use super::output::print_success;
use super::Cli;

#[derive(Args, Debug)]
pub struct CompletionsCommand {
    /// Target shell
    pub shell: Shell,

    /// Write the script to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn execute(cmd: CompletionsCommand) -> Result<()> {
    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();

    match &cmd.out {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create completion file: {:?}", path))?;
            generate(cmd.shell, &mut command, bin_name, &mut file);
            file.flush()?;
            print_success(&format!(
                "Wrote {} completions to {}",
                cmd.shell,
                path.display()
            ));
        }
        None => generate(cmd.shell, &mut command, bin_name, &mut io::stdout()),
    }

    Ok(())
}
