//! Integration tests for the `geowatch` CLI binary.
//!
//! Argument parsing, help output, completions and error exit codes run
//! without a backend; REST-backed commands run against a wiremock server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `geowatch` binary with env isolation.
///
/// Clears all `GEOWATCH_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn geowatch_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("geowatch");
    cmd.env("HOME", "/tmp/geowatch-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/geowatch-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("GEOWATCH_PROFILE")
        .env_remove("GEOWATCH_API_URL")
        .env_remove("GEOWATCH_WS_URL")
        .env_remove("GEOWATCH_OUTPUT")
        .env_remove("GEOWATCH_INSECURE")
        .env_remove("GEOWATCH_TIMEOUT")
        .env_remove("GEOWATCH_LOG_FILE")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run_against(server: &MockServer, args: &[&str]) -> std::process::Output {
    let mut argv = vec!["--api-url".to_owned(), server.uri()];
    argv.extend(args.iter().map(|a| (*a).to_owned()));
    tokio::task::spawn_blocking(move || geowatch_cmd().args(argv).output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = geowatch_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    geowatch_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("geofence")
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("vehicles"))
            .and(predicate::str::contains("violations")),
    );
}

#[test]
fn test_version_flag() {
    geowatch_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("geowatch"));
}

#[test]
fn test_unknown_subcommand() {
    let output = geowatch_cmd().arg("teleport").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    geowatch_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("geowatch"));
}

#[test]
fn test_completions_invalid_shell() {
    geowatch_cmd()
        .args(["completions", "tcsh"])
        .assert()
        .failure();
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path() {
    geowatch_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_defaults_as_json() {
    let output = geowatch_cmd()
        .args(["config", "show", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["default_profile"], "default");
    assert_eq!(shown["defaults"]["output"], "table");
}

#[test]
fn test_unknown_profile_is_usage_error() {
    let output = geowatch_cmd()
        .args(["--profile", "nope", "vehicles", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("nope"));
}

// ── Local validation (no request sent) ──────────────────────────────

#[test]
fn test_invalid_category_rejected() {
    let output = geowatch_cmd()
        .args([
            "geofences",
            "create",
            "--name",
            "Depot",
            "--category",
            "parking",
            "--coords",
            "1,1;1,2;2,2;1,1",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("delivery_zone"));
}

#[test]
fn test_open_polygon_rejected() {
    let output = geowatch_cmd()
        .args([
            "geofences",
            "create",
            "--name",
            "Depot",
            "--category",
            "toll_zone",
            "--coords",
            "1,1;1,2;2,2;2,1",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
}

#[test]
fn test_bad_date_rejected() {
    let output = geowatch_cmd()
        .args(["violations", "--from", "last tuesday"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("from"));
}

#[test]
fn test_watch_rejects_http_channel_url() {
    let output = geowatch_cmd()
        .args(["--ws-url", "http://localhost:8080/ws/alerts", "watch", "--no-history"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("ws_url"));
}

#[test]
fn test_unreachable_backend_is_connection_error() {
    let output = geowatch_cmd()
        .args(["--api-url", "http://127.0.0.1:1", "vehicles", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
}

// ── REST-backed commands ────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_vehicles_list_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vehicles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vehicles": [{
                "id": "veh_1",
                "vehicle_number": "KA-01-1234",
                "driver_name": "Asha",
                "vehicle_type": "truck",
                "phone": "+91-9000000000",
                "status": "active",
                "created_at": "2026-10-19T08:00:00Z"
            }],
            "time_ns": "1200"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_against(&server, &["vehicles", "list", "--output", "json"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listed[0]["vehicle_number"], "KA-01-1234");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_geofences_list_plain_with_category() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geofences"))
        .and(query_param("category", "toll_zone"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "geofences": [{
                "id": "geo_7",
                "name": "Toll Plaza",
                "description": "",
                "coordinates": [[1.0, 1.0], [1.0, 2.0], [2.0, 2.0], [1.0, 1.0]],
                "category": "toll_zone",
                "created_at": "2026-10-19T08:00:00Z"
            }],
            "time_ns": "900"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_against(
        &server,
        &["geofences", "list", "--category", "toll_zone", "-o", "plain"],
    )
    .await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "geo_7");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_vehicle_location_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vehicles/location/veh_404"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Vehicle not found"))
        .mount(&server)
        .await;

    let output = run_against(&server, &["vehicles", "location", "veh_404"]).await;
    assert_eq!(output.status.code(), Some(4));
    let text = combined_output(&output);
    assert!(text.contains("veh_404"), "{text}");
    assert!(text.contains("vehicles list"), "{text}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_violations_table_reports_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/violations/history"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "violations": [{
                "id": "vio_1",
                "vehicle_id": "veh_1",
                "vehicle_number": "KA-01-1234",
                "geofence_id": "geo_1",
                "geofence_name": "Warehouse",
                "event_type": "exit",
                "latitude": 12.97,
                "longitude": 77.59,
                "timestamp": "2026-10-19T08:15:00Z"
            }],
            "total_count": 9,
            "time_ns": "700"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_against(&server, &["violations", "--limit", "2"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("EXIT"));
    assert!(stdout.contains("Warehouse"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("1 of 9 violation(s)"));
}
