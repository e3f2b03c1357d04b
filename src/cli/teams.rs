use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use teams_graph::api::ODataQuery;
use teams_graph::{Config, TeamsClient};

use super::output::{print_output, print_single};
use super::OutputFormat;

#[derive(Args, Debug)]
pub struct TeamsCommand {
    #[command(subcommand)]
    pub command: TeamsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum TeamsSubcommand {
    /// Show team details
    Show {
        /// Team ID
        team_id: String,
    },

    /// Show the team backing a Microsoft 365 group
    FromGroup {
        /// Group ID
        group_id: String,

        /// Properties to select (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        select: Vec<String>,
    },

    /// List channels in a team
    Channels {
        /// Team ID
        team_id: String,
    },

    /// List members of a channel
    Members {
        /// Team ID
        team_id: String,

        /// Channel ID
        channel_id: String,
    },

    /// Get messages from a team channel
    Messages {
        /// Team ID
        team_id: String,

        /// Channel ID
        channel_id: String,

        /// Maximum number of messages to retrieve
        #[arg(short, long, default_value = "50")]
        limit: u32,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct ChannelRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    membership: String,
}

#[derive(Debug, Serialize, Tabled)]
struct MemberRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Roles")]
    roles: String,
}

#[derive(Debug, Serialize, Tabled)]
struct MessageRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Content")]
    content: String,
}

pub async fn execute(cmd: TeamsCommand, config: &Config, format: OutputFormat) -> Result<()> {
    let client = TeamsClient::new(config)?;

    match cmd.command {
        TeamsSubcommand::Show { team_id } => {
            let team = client.get_team(&team_id, &ODataQuery::default()).await?;
            print_single(&team, format);
        }
        TeamsSubcommand::FromGroup { group_id, select } => {
            let mut query = ODataQuery::default();
            if !select.is_empty() {
                query = query.select(select);
            }
            let team = client.get_team_from_group(&group_id, &query).await?;
            print_single(&team, format);
        }
        TeamsSubcommand::Channels { team_id } => {
            let page = client
                .list_channels(&team_id, &ODataQuery::default())
                .await?;
            let rows: Vec<ChannelRow> = page
                .value
                .into_iter()
                .map(|channel| ChannelRow {
                    id: channel.id,
                    name: channel.display_name.unwrap_or_default(),
                    membership: channel.membership_type.unwrap_or_default(),
                })
                .collect();
            print_output(&rows, format);
        }
        TeamsSubcommand::Members {
            team_id,
            channel_id,
        } => {
            let page = client
                .list_channel_members(&team_id, &channel_id, &ODataQuery::default())
                .await?;
            let rows: Vec<MemberRow> = page
                .value
                .into_iter()
                .map(|member| MemberRow {
                    id: member.id,
                    name: member.display_name.unwrap_or_default(),
                    roles: member.roles.join(","),
                })
                .collect();
            print_output(&rows, format);
        }
        TeamsSubcommand::Messages {
            team_id,
            channel_id,
            limit,
        } => {
            let page = client
                .list_channel_messages(&team_id, &channel_id, &ODataQuery::new().top(limit))
                .await?;
            let rows: Vec<MessageRow> = page
                .value
                .iter()
                .map(|msg| MessageRow {
                    id: msg.id.clone(),
                    from: msg.sender_name().unwrap_or("Unknown").to_string(),
                    time: msg.created_date_time.clone().unwrap_or_default(),
                    content: truncate(
                        &strip_html(
                            msg.body
                                .as_ref()
                                .and_then(|b| b.content.as_deref())
                                .unwrap_or_default(),
                        ),
                        40,
                    ),
                })
                .collect();
            print_output(&rows, format);
        }
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > max_len {
        let truncated: String = chars[..max_len.saturating_sub(3)].iter().collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

fn strip_html(s: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;

    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    result
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
