use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cli() -> Command {
    Command::cargo_bin("mesh").unwrap()
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("submit"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_cli_version() {
    cli()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_no_args_shows_help() {
    cli().assert().failure().stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_submit_help() {
    cli()
        .arg("submit")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("jobspec"));
}

#[test]
fn test_submit_missing_jobspec_file() {
    cli()
        .arg("submit")
        .arg("nonexistent-jobspec.json")
        .assert()
        .failure();
}

#[test]
fn test_submit_invalid_json() {
    let temp_dir = TempDir::new().unwrap();
    let jobspec_path = temp_dir.path().join("jobspec.json");
    fs::write(&jobspec_path, "not json").unwrap();

    cli().arg("submit").arg(&jobspec_path).assert().failure();
}

#[test]
fn test_config_help() {
    cli()
        .arg("config")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_completions_bash() {
    cli()
        .arg("completions")
        .arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("mesh"));
}

#[test]
fn test_admin_help() {
    cli()
        .arg("admin")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("republish-stuck-jobs"))
        .stdout(predicate::str::contains("cancel"));
}

#[tokio::test]
async fn test_submit_status_retry_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/jobs"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "job_id": "job-123",
            "status": "queued",
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/jobs/job-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "job-123",
            "status": "in_progress",
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/executions/exec-1/retry-question"))
        .and(body_json(json!({"region": "us-east", "question_index": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "execution_id": "exec-1",
            "status": "retrying",
        })))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let jobspec_path = temp_dir.path().join("jobspec.json");
    fs::write(&jobspec_path, json!({"job_id": "job-123"}).to_string()).unwrap();

    cli()
        .arg("submit")
        .arg(&jobspec_path)
        .arg("--api-url")
        .arg(server.uri())
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("job-123"));

    cli()
        .arg("status")
        .arg("job-123")
        .arg("--api-url")
        .arg(server.uri())
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("in_progress"));

    cli()
        .arg("retry")
        .arg("exec-1")
        .arg("--region")
        .arg("us-east")
        .arg("--question-index")
        .arg("2")
        .arg("--api-url")
        .arg(server.uri())
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("retrying"));
}

#[tokio::test]
async fn test_admin_republish_stuck_jobs() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/admin/republish-stuck-jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"republished": 3})))
        .mount(&server)
        .await;

    cli()
        .arg("admin")
        .arg("republish-stuck-jobs")
        .arg("--api-url")
        .arg(server.uri())
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("3"));
}

#[tokio::test]
async fn test_api_error_surfaces_nonzero_exit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/jobs/missing-job"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
        .mount(&server)
        .await;

    cli()
        .arg("status")
        .arg("missing-job")
        .arg("--api-url")
        .arg(server.uri())
        .assert()
        .failure();
}
