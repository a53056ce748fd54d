//! CLI integration tests

use std::process::{Command, Output};

fn sfc(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sfc"))
        .args(args)
        .env_remove("SFC_API_URL")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = sfc(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Suspension Forecaster"),
        "Should show app name"
    );
    for command in ["health", "forecast", "models", "retrain", "test"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = sfc(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("sfc"), "Should show binary name");
}

/// Test forecast subcommand help
#[test]
fn test_forecast_help() {
    let output = sfc(&["forecast", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Forecast help should succeed");
    assert!(stdout.contains("--city"), "Should show city option");
    assert!(stdout.contains("--days"), "Should show days option");
    assert!(
        stdout.contains("--force-retrain"),
        "Should show force-retrain option"
    );
}

/// Test retrain subcommand help
#[test]
fn test_retrain_help() {
    let output = sfc(&["retrain", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Retrain help should succeed");
    assert!(stdout.contains("--city"), "Should show city option");
}

/// Test format and api-url options
#[test]
fn test_global_options() {
    let output = sfc(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("SFC_API_URL"), "Should show env var");
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = sfc(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("invalid"),
        "Should show error message"
    );
}

/// Test non-numeric days are rejected before any request
#[test]
fn test_invalid_days() {
    let output = sfc(&["forecast", "--days", "soon"]);
    assert!(!output.status.success(), "Non-numeric days should fail");
}

/// Test health against a mock service, JSON output
#[test]
fn test_health_json_against_mock() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"status": "healthy", "service": "suspension-forecaster",
                "timestamp": "2025-01-17T10:30:00Z",
                "components": {"pipeline": {"status": "healthy", "updated_at": "2025-01-17T10:30:00Z"}}}"#,
        )
        .create();

    let url = server.url();
    let output = sfc(&["--api-url", &url, "--format", "json", "health"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Health should succeed");
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["components"]["pipeline"]["status"], "healthy");
}

/// Test a server error is reported with its kind and a failing exit code
#[test]
fn test_server_error_exit_code() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/api/predictions/suspension-forecast")
        .match_query(mockito::Matcher::Any)
        .with_status(422)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "insufficient_data", "message": "Insufficient data: 10 samples, need 20"}"#)
        .create();

    let url = server.url();
    let output = sfc(&["--api-url", &url, "forecast", "--city", "Lipa"]);

    assert!(!output.status.success(), "Server error should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("insufficient_data"), "Should show error kind");
}
