//! Integration tests for the `opensesame` CLI binary.
//!
//! These tests cover argument parsing, help output, shell completions,
//! config inspection and the `points` listing against a mocked store.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `opensesame` binary with env isolation.
///
/// Clears `OPENSESAME_*` overrides and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn opensesame_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("opensesame");
    cmd.env("HOME", "/tmp/opensesame-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/opensesame-cli-test-nonexistent")
        .env_remove("OPENSESAME_CONFIG")
        .env_remove("OPENSESAME_STORE__URL")
        .env_remove("OPENSESAME_SERVER__PORT")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("opensesame.toml");
    std::fs::write(&path, body).unwrap();
    path
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = opensesame_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_flag() {
    opensesame_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("serve")
            .and(predicate::str::contains("points"))
            .and(predicate::str::contains("completions")),
    );
}

#[test]
fn test_version_flag() {
    opensesame_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("opensesame"));
}

#[test]
fn test_completions_bash() {
    opensesame_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_flag() {
    opensesame_cmd()
        .args(["config", "path", "--config", "/srv/opensesame/site.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/srv/opensesame/site.toml"));
}

#[test]
fn test_config_show_masks_password() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
            [store]
            url = "http://iobroker.lan:8087"
            username = "admin"
            password = "hunter2"

            [[points]]
            id = "hm-rpc.1.ABC123.1.STATE"
            name = "Garage"
        "#,
    );

    opensesame_cmd()
        .args(["config", "show", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("iobroker.lan")
                .and(predicate::str::contains("hm-rpc.1.ABC123.1.STATE"))
                .and(predicate::str::contains("hunter2").not()),
        );
}

#[test]
fn test_missing_config_file_exits_with_config_code() {
    let output = opensesame_cmd()
        .args(["config", "show", "--config", "/nonexistent/opensesame.toml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("not found"));
}

#[test]
fn test_invalid_store_url_exits_with_config_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[store]\nurl = \"not a url\"\n");

    let output = opensesame_cmd()
        .args(["points", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("store.url"));
}

// ── Points ──────────────────────────────────────────────────────────

#[test]
fn test_no_points_and_unreachable_store_exits_with_config_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "[store]\nurl = \"http://127.0.0.1:1\"\ntimeout_secs = 1\n",
    );

    let output = opensesame_cmd()
        .args(["points", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("No usable points"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_points_lists_scanned_catalog_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/objects"))
        .and(query_param("type", "state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hm-rpc.1.ABC123.1.STATE": {
                "common": { "name": "Garage door", "type": "boolean", "role": "switch" }
            },
            "system.adapter.admin.0.alive": {
                "common": { "name": "alive", "type": "boolean", "role": "indicator.state" }
            }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), &format!("[store]\nurl = \"{}\"\n", server.uri()));

    let output = tokio::task::spawn_blocking(move || {
        opensesame_cmd()
            .args(["points", "--all", "--output", "json", "--config"])
            .arg(&path)
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let listed: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        listed,
        json!([{
            "webId": "hm-rpc_1_ABC123_1_STATE",
            "externalId": "hm-rpc.1.ABC123.1.STATE",
            "name": "Garage door",
            "type": "boolean",
            "role": "switch",
            "watched": true
        }])
    );
}
