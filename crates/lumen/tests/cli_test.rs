//! Integration tests for the `lumen` CLI binary.
//!
//! Argument parsing, help output, completions and config handling run
//! offline; light commands run against a `wiremock` authority.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `lumen` binary with env isolation.
///
/// Clears all `LUMEN_*` env vars and points the config file at `config`
/// so tests never touch the user's real configuration.
fn lumen_cmd(config: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("lumen");
    cmd.env("LUMEN_CONFIG", config)
        .env("HOME", "/tmp/lumen-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/lumen-cli-test-nonexistent")
        .env_remove("LUMEN_PROFILE")
        .env_remove("LUMEN_AUTHORITY")
        .env_remove("LUMEN_OUTPUT")
        .env_remove("LUMEN_INSECURE")
        .env_remove("LUMEN_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn isolated() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    (dir, config)
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn lamp(id: i64, name: &str, on: bool, brightness: i32) -> Value {
    json!({ "group_id": 1, "light_id": id, "name": name, "on": on, "brightness": brightness })
}

async fn authority() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "groups": [1],
            "lights": [lamp(2, "Hall", true, 5), lamp(1, "Desk", false, 200)]
        })))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let (_dir, config) = isolated();
    let output = lumen_cmd(&config).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let (_dir, config) = isolated();
    lumen_cmd(&config).arg("--help").assert().success().stdout(
        predicate::str::contains("lights")
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    let (_dir, config) = isolated();
    lumen_cmd(&config)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lumen"));
}

#[test]
fn test_completions_bash() {
    let (_dir, config) = isolated();
    lumen_cmd(&config)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_unknown_output_format_is_usage_error() {
    let (_dir, config) = isolated();
    lumen_cmd(&config)
        .args(["lights", "list", "-o", "xml"])
        .assert()
        .code(2);
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_lights_without_config_is_no_config() {
    let (_dir, config) = isolated();
    let output = lumen_cmd(&config).args(["lights", "list"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("No authority configured"), "{text}");
}

#[test]
fn test_config_path_honours_env() {
    let (_dir, config) = isolated();
    lumen_cmd(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(config.display().to_string()));
}

#[test]
fn test_config_init_show_and_profiles() {
    let (_dir, config) = isolated();

    lumen_cmd(&config)
        .args(["config", "init", "-p", "home", "--authority", "http://lights.home:8080"])
        .assert()
        .success();
    assert!(config.exists());

    let output = lumen_cmd(&config)
        .args(["config", "show", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let shown: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["default_profile"], "home");
    assert_eq!(shown["profiles"]["home"]["authority"], "http://lights.home:8080");

    lumen_cmd(&config)
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("home *"));
}

#[test]
fn test_config_init_requires_authority_when_not_interactive() {
    let (_dir, config) = isolated();
    lumen_cmd(&config).args(["config", "init"]).assert().code(2);
    assert!(!config.exists());
}

#[test]
fn test_config_init_rejects_non_http_authority() {
    let (_dir, config) = isolated();
    lumen_cmd(&config)
        .args(["config", "init", "--authority", "ws://lights.home"])
        .assert()
        .code(2);
}

#[test]
fn test_config_use_unknown_profile() {
    let (_dir, config) = isolated();
    let output = lumen_cmd(&config)
        .args(["config", "use", "office"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("office"));
}

#[test]
fn test_config_set_then_use() {
    let (_dir, config) = isolated();
    lumen_cmd(&config)
        .args(["config", "set", "authority", "http://lab:8080", "-p", "lab"])
        .assert()
        .success();
    lumen_cmd(&config).args(["config", "use", "lab"]).assert().success();

    let text = std::fs::read_to_string(&config).unwrap();
    assert!(text.contains("default_profile = \"lab\""), "{text}");
    assert!(text.contains("authority = \"http://lab:8080\""), "{text}");
}

// ── Lights against a mocked authority ───────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_lights_list_json_keeps_authority_order() {
    let server = authority().await;
    let (_dir, config) = isolated();

    let output = lumen_cmd(&config)
        .args(["lights", "list", "-o", "json", "--authority", &server.uri()])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let lights: Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = lights
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Hall", "Desk"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lights_list_plain_prints_keys() {
    let server = authority().await;
    let (_dir, config) = isolated();

    lumen_cmd(&config)
        .args(["lights", "list", "-o", "plain", "-a", &server.uri()])
        .assert()
        .success()
        .stdout("1/2\n1/1\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lights_off_posts_power_state() {
    let server = authority().await;
    Mock::given(method("POST"))
        .and(path("/api/lights/1/2"))
        .and(body_json(json!({ "on": false })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (_dir, config) = isolated();

    lumen_cmd(&config)
        .args(["lights", "off", "1", "2", "-a", &server.uri()])
        .assert()
        .success()
        .stderr(predicate::str::contains("Light 1/2 switched off"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lights_brightness_posts_bri() {
    let server = authority().await;
    Mock::given(method("POST"))
        .and(path("/api/lights/1/1"))
        .and(body_json(json!({ "bri": 128 })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (_dir, config) = isolated();

    lumen_cmd(&config)
        .args(["lights", "brightness", "1", "1", "128", "-q", "-a", &server.uri()])
        .assert()
        .success();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_command_exit_code() {
    let server = authority().await;
    Mock::given(method("POST"))
        .and(path("/api/lights/1/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("bulb fault"))
        .mount(&server)
        .await;
    let (_dir, config) = isolated();

    let output = lumen_cmd(&config)
        .args(["lights", "on", "1", "1", "-a", &server.uri()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));
    assert!(combined_output(&output).contains("bulb fault"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_unknown_light_is_not_found() {
    let server = authority().await;
    let (_dir, config) = isolated();

    lumen_cmd(&config)
        .args(["lights", "get", "1", "9", "-a", &server.uri()])
        .assert()
        .code(4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remove_requires_yes_when_not_interactive() {
    let server = authority().await;
    Mock::given(method("DELETE"))
        .and(path("/api/lights/1/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (_dir, config) = isolated();

    lumen_cmd(&config)
        .args(["lights", "remove", "1", "1", "-a", &server.uri()])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("requires confirmation"));

    lumen_cmd(&config)
        .args(["lights", "remove", "1", "1", "--yes", "-a", &server.uri()])
        .assert()
        .success();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_add_without_name_is_rejected_when_not_interactive() {
    let server = authority().await;
    let (_dir, config) = isolated();

    lumen_cmd(&config)
        .args(["lights", "add", "-a", &server.uri()])
        .assert()
        .code(2);
}

#[test]
fn test_unreachable_authority_exit_code() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let (_dir, config) = isolated();

    lumen_cmd(&config)
        .args(["lights", "list", "-a", &format!("http://{addr}")])
        .assert()
        .code(7);
}
