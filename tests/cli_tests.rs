#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command isolated from the user's config, cache and credentials
fn teams_graph(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("teams-graph").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_CACHE_HOME", home.path().join("cache"))
        .env("TEAMS_GRAPH_TOKEN", "test-token")
        .env_remove("TEAMS_GRAPH_CLIENT_SECRET")
        .env_remove("RUST_LOG");
    cmd
}

/// Test that the CLI shows help
#[test]
fn test_help() {
    let mut cmd = Command::cargo_bin("teams-graph").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Microsoft Graph Teams"));
}

/// Test that version flag works
#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("teams-graph").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("teams-graph"));
}

/// Test that unknown commands fail gracefully
#[test]
fn test_unknown_command() {
    let mut cmd = Command::cargo_bin("teams-graph").unwrap();
    cmd.arg("unknown-command").assert().failure();
}

#[test]
fn test_subcommand_help() {
    for (subcommand, about) in [
        ("auth", "Authentication commands"),
        ("ops", "Browse the endpoint catalog"),
        ("call", "Invoke any catalog operation"),
        ("teams", "Teams operations"),
    ] {
        let mut cmd = Command::cargo_bin("teams-graph").unwrap();
        cmd.args([subcommand, "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains(about));
    }
}

/// Test invalid output format
#[test]
fn test_invalid_format() {
    let mut cmd = Command::cargo_bin("teams-graph").unwrap();
    cmd.args(["-f", "invalid", "ops", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_ops_list_shows_builtin_catalog() {
    let home = TempDir::new().unwrap();
    teams_graph(&home)
        .args(["-f", "plain", "ops", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("groups.team.get"))
        .stdout(predicate::str::contains("teams.channels.members.delete"));
}

#[test]
fn test_ops_list_search() {
    let home = TempDir::new().unwrap();
    teams_graph(&home)
        .args(["-f", "json", "ops", "list", "--search", "photo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("teams.photo.content.put"))
        .stdout(predicate::str::contains("teams.channels.list").not());
}

#[test]
fn test_ops_show_json() {
    let home = TempDir::new().unwrap();
    teams_graph(&home)
        .args(["-f", "json", "ops", "show", "groups.team.get"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/groups/{group_id}/team"))
        .stdout(predicate::str::contains("$select"));
}

#[test]
fn test_ops_show_unknown() {
    let home = TempDir::new().unwrap();
    teams_graph(&home)
        .args(["ops", "show", "teams.explode"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown operation"));
}

/// Missing path parameters are caught before any network access
#[test]
fn test_call_missing_path_param() {
    let home = TempDir::new().unwrap();
    teams_graph(&home)
        .args([
            "call",
            "teams.channels.members.delete",
            "-p",
            "team_id=t1",
            "-p",
            "channel_id=c1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("conversationMember_id"));
}

#[test]
fn test_call_unknown_query_param() {
    let home = TempDir::new().unwrap();
    teams_graph(&home)
        .args(["call", "teams.get", "-p", "team_id=t1", "-q", "top=5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown query parameter"));
}

#[test]
fn test_call_rejects_malformed_pair() {
    let home = TempDir::new().unwrap();
    teams_graph(&home)
        .args(["call", "teams.get", "-p", "team_id"])
        .assert()
        .failure();
}

#[test]
fn test_completions() {
    let mut cmd = Command::cargo_bin("teams-graph").unwrap();
    cmd.args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("teams-graph"));
}

#[test]
fn test_call_all_rejects_object_operation() {
    let home = TempDir::new().unwrap();
    teams_graph(&home)
        .args(["call", "teams.get", "-p", "team_id=t1", "--all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not return a collection"));
}

#[test]
fn test_configured_default_format() {
    let home = TempDir::new().unwrap();
    let config_dir = home.path().join("config").join("teams-graph");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        "[output]\ndefault_format = \"json\"\ncolor = false\n",
    )
    .unwrap();

    teams_graph(&home)
        .args(["ops", "list", "--search", "groups.team.get"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""name": "groups.team.get""#));

    teams_graph(&home)
        .args(["-f", "plain", "ops", "list", "--search", "groups.team.get"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GET|groups.team.get|/groups/{group_id}/team"));
}

#[test]
fn test_completions_to_file() {
    let home = TempDir::new().unwrap();
    let out = home.path().join("teams-graph.zsh");

    teams_graph(&home)
        .args(["completions", "zsh", "--out"])
        .arg(&out)
        .assert()
        .success();

    let script = std::fs::read_to_string(&out).unwrap();
    assert!(script.contains("teams-graph"));
}
