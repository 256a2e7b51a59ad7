//! CLI integration tests

use std::process::{Command, Output};

fn vigil(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vigil"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("VIGIL_SERVER_URL")
        .output()
        .expect("Failed to execute command")
}

fn vigil_against(server: &mockito::Server, args: &[&str]) -> Output {
    let url = server.url();
    let mut full = vec!["--server-url", url.as_str()];
    full.extend_from_slice(args);
    vigil(&full)
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = vigil(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Vigil"), "Should show app name");
    for command in [
        "status", "system", "api", "agents", "security", "analytics", "messages", "send",
        "export", "health",
    ] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
    assert!(stdout.contains("--server-url"), "Should show server-url option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = vigil(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("vigil"), "Should show binary name");
}

/// Test send command help
#[test]
fn test_send_help() {
    let output = vigil(&["send", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Send help should succeed");
    assert!(stdout.contains("--author"), "Should show author option");
}

/// Test export command help
#[test]
fn test_export_help() {
    let output = vigil(&["export", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Export help should succeed");
    assert!(stdout.contains("--output"), "Should show output option");
}

#[test]
fn test_status_renders_summary() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/api/monitoring/dashboard")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"success":true,"timestamp":"2024-01-01T00:00:00Z","data":{"summary":{
                "overall_health":82.5,"total_connected_agents":3,"system_uptime":7260,
                "system_health":"optimal","api_health":"good","gateway_stability":"stable",
                "security_status":"protected","agent_health":"excellent"}}}"#,
        )
        .create();

    let output = vigil_against(&server, &["status"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("82.5"));
    assert!(stdout.contains("2h 1m"));
    assert!(stdout.contains("protected"));
}

#[test]
fn test_messages_json_output() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/api/messages")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[{"id":"m-1","text":"deploy done","author":"ops","timestamp_ms":1700000000000}]"#,
        )
        .create();

    let output = vigil_against(&server, &["--format", "json", "messages"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed[0]["author"], "ops");
}

#[test]
fn test_send_reports_validation_error() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/api/messages")
        .with_status(413)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"message exceeds 1000 characters","code":"PAYLOAD_TOO_LARGE"}"#)
        .create();

    let output = vigil_against(&server, &["send", "way too long"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("PAYLOAD_TOO_LARGE"));
}

#[test]
fn test_export_writes_file() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/api/monitoring/export")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"system":{},"api":{},"agents":{},"security":{},"analytics":{},"messages":[]}"#)
        .create();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.json");
    let path_str = path.to_str().unwrap();

    let output = vigil_against(&server, &["export", "--output", path_str]);

    assert!(output.status.success());
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(written["messages"].is_array());
}

#[test]
fn test_health_fails_when_unhealthy() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/api/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"status":"healthy","version":"0.1.0","uptime_seconds":5,"timestamp":"2024-01-01T00:00:00Z"}"#,
        )
        .create();
    server
        .mock("GET", "/healthz")
        .with_status(503)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"unhealthy","components":{"broadcaster":{"status":"unhealthy","message":"channel closed"}}}"#)
        .create();

    let output = vigil_against(&server, &["health"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(!output.status.success());
    assert!(stdout.contains("broadcaster"));
    assert!(stdout.contains("channel closed"));
}

#[test]
fn test_unreachable_server_fails() {
    let output = vigil(&["--server-url", "http://127.0.0.1:9", "status"]);
    assert!(!output.status.success());
}
