use std::env;
use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Args, Subcommand};

use teams_graph::api::auth::access_token_from_raw;
use teams_graph::api::TOKEN_ENV;
use teams_graph::cache::{Cache, TOKENS_FILE};
use teams_graph::types::TokenStore;
use teams_graph::Config;

use super::output::{print_error, print_info, print_success};

#[derive(Args, Debug)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthSubcommand {
    /// Save a Graph bearer token ("-" reads it from stdin)
    SetToken {
        /// The access token
        token: String,
    },

    /// Check authentication status
    Status,

    /// Logout and clear the stored token
    Logout,
}

pub fn execute(cmd: AuthCommand, config: &Config) -> Result<()> {
    match cmd.command {
        AuthSubcommand::SetToken { token } => set_token(&token),
        AuthSubcommand::Status => status(config),
        AuthSubcommand::Logout => logout(),
    }
}

fn set_token(token: &str) -> Result<()> {
    let token = if token == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read token from stdin")?;
        buf.trim().to_string()
    } else {
        token.trim().to_string()
    };

    if token.is_empty() {
        bail!("Token is empty");
    }

    let cache = Cache::new()?;
    let mut store: TokenStore = cache.load(TOKENS_FILE)?.unwrap_or_default();
    let access_token = access_token_from_raw(&token);
    let expires = access_token.expires;
    store.set_graph_token(access_token);
    cache.save(TOKENS_FILE, &store)?;

    print_success("Token saved");
    print_info(&format!("Expires: {}", format_epoch(expires)));
    Ok(())
}

fn status(config: &Config) -> Result<()> {
    if let Some(client_id) = &config.auth.client_id {
        if env::var(&config.auth.client_secret_env).is_ok() {
            print_success(&format!(
                "Using client credentials (app {}, tenant {})",
                client_id, config.auth.tenant
            ));
            return Ok(());
        }
        print_info(&format!(
            "client_id is configured but {} is not set",
            config.auth.client_secret_env
        ));
    }

    if env::var(TOKEN_ENV).is_ok_and(|t| !t.trim().is_empty()) {
        print_success(&format!("Using token from {}", TOKEN_ENV));
        return Ok(());
    }

    let cache = Cache::new()?;
    let store: TokenStore = cache.load(TOKENS_FILE)?.unwrap_or_default();
    match store.graph_token() {
        Some(token) if token.expires > Utc::now().timestamp().max(0) as u64 => {
            print_success("Authenticated with stored token");
            println!("  Expires: {}", format_epoch(token.expires));
        }
        Some(token) => {
            print_error(&format!(
                "Stored token expired at {}",
                format_epoch(token.expires)
            ));
            print_info("Run 'teams-graph auth set-token' with a fresh token.");
        }
        None => {
            print_error("Not authenticated");
            print_info("Run 'teams-graph auth set-token' or configure client credentials.");
        }
    }

    Ok(())
}

fn logout() -> Result<()> {
    let cache = Cache::new()?;
    cache.delete(TOKENS_FILE)?;
    print_success("Logged out successfully");
    Ok(())
}

fn format_epoch(epoch: u64) -> String {
    match Utc.timestamp_opt(epoch as i64, 0).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => epoch.to_string(),
    }
}
