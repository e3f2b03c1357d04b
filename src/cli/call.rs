use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::Value;

use teams_graph::api::{ApiResponse, EndpointDescriptor, QueryValue, RequestBody, RequestParameters};
use teams_graph::{Config, TeamsClient};

use super::output::{print_single, print_success};
use super::OutputFormat;

#[derive(Args, Debug)]
pub struct CallCommand {
    /// Operation name, e.g. groups.team.get (see `ops list`)
    pub operation: String,

    /// Path parameter as name=value (repeatable)
    #[arg(short = 'p', long = "path", value_parser = parse_key_value)]
    pub path_params: Vec<(String, String)>,

    /// Query parameter as name=value; list parameters take comma-separated values
    #[arg(short = 'q', long = "query", value_parser = parse_key_value)]
    pub query_params: Vec<(String, String)>,

    /// JSON request body
    #[arg(long, conflicts_with_all = ["body_file", "binary_file"])]
    pub body: Option<String>,

    /// Read the JSON request body from a file
    #[arg(long, conflicts_with = "binary_file")]
    pub body_file: Option<PathBuf>,

    /// Send a file verbatim as a binary body
    #[arg(long)]
    pub binary_file: Option<PathBuf>,

    /// Write a binary response to this file
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Follow @odata.nextLink and print every item of a collection
    #[arg(long)]
    pub all: bool,

    /// Stop after this many items when following pages
    #[arg(long, requires = "all")]
    pub limit: Option<usize>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got `{}`", s)),
    }
}

pub async fn execute(cmd: CallCommand, config: &Config, format: OutputFormat) -> Result<()> {
    let client = TeamsClient::new(config)?;
    let descriptor = client.descriptor(&cmd.operation)?;
    let params = build_params(descriptor, &cmd.path_params, &cmd.query_params);
    let body = read_body(&cmd)?;

    if cmd.all {
        let items = client.collect_all(&cmd.operation, params, cmd.limit).await?;
        print_single(&items, format);
        return Ok(());
    }

    match client.call(&cmd.operation, &params, body).await? {
        ApiResponse::Bytes(bytes) => match &cmd.out {
            Some(path) => {
                fs::write(path, &bytes)
                    .with_context(|| format!("Failed to write response to {:?}", path))?;
                print_success(&format!("Wrote {} bytes to {}", bytes.len(), path.display()));
            }
            None => bail!(
                "{} returned {} bytes of binary content; use --out to save it",
                cmd.operation,
                bytes.len()
            ),
        },
        ApiResponse::Empty => print_success(&format!("{} succeeded", cmd.operation)),
        other => print_single(&other.into_value(), format),
    }

    Ok(())
}

/// Turns CLI pairs into request parameters, splitting list-valued query
/// parameters on commas
fn build_params(
    descriptor: &EndpointDescriptor,
    path: &[(String, String)],
    query: &[(String, String)],
) -> RequestParameters {
    let mut params = RequestParameters::new();
    for (name, value) in path {
        params.insert_path(name.as_str(), value.as_str());
    }
    for (name, value) in query {
        let is_list = descriptor
            .query_spec(name)
            .is_some_and(|spec| spec.is_list());
        let value = if is_list {
            QueryValue::List(value.split(',').map(|v| v.trim().to_string()).collect())
        } else {
            QueryValue::Single(value.clone())
        };
        params.insert_query(name.as_str(), value);
    }
    params
}

fn read_body(cmd: &CallCommand) -> Result<Option<RequestBody>> {
    if let Some(body) = &cmd.body {
        let value: Value = serde_json::from_str(body).context("--body is not valid JSON")?;
        return Ok(Some(RequestBody::json(&value)?));
    }
    if let Some(path) = &cmd.body_file {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read body file: {:?}", path))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Body file is not valid JSON: {:?}", path))?;
        return Ok(Some(RequestBody::json(&value)?));
    }
    if let Some(path) = &cmd.binary_file {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read binary file: {:?}", path))?;
        return Ok(Some(RequestBody::binary(bytes)));
    }
    Ok(None)
}
