//! End-to-end tests for the `ecp process` and `ecp download` commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESULT_BODY: &str = "datetime;host\n2024-01-01;a\n";

fn ecp() -> Command {
    let mut cmd = Command::cargo_bin("ecp").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("ECP_HOST")
        .env_remove("ECP_CONNECT_TIMEOUT_SECS");
    cmd
}

fn host_of(server: &MockServer) -> String {
    server.uri().trim_start_matches("http://").to_string()
}

#[tokio::test]
async fn process_streams_stdin_to_stdout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("accept", "text/csv"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("job-id", "job-1")
                .set_body_string(RESULT_BODY),
        )
        .mount(&server)
        .await;

    ecp()
        .arg("process")
        .arg("--host")
        .arg(host_of(&server))
        .write_stdin("raw log line\n")
        .assert()
        .success()
        .stdout(RESULT_BODY);
}

#[tokio::test]
async fn process_writes_output_file_and_downloads_artifacts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("job-id", "job-2")
                .set_body_string(RESULT_BODY),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job-2/job-report.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"general\":{}}"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("access.log"), "l1\nl2\n").unwrap();
    let output = dir.path().join("result.csv");

    ecp()
        .arg("process")
        .arg(dir.path().join("access.log"))
        .arg("--output")
        .arg(&output)
        .arg("--download")
        .arg("job-report.json")
        .arg("--host")
        .arg(host_of(&server))
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&output).unwrap(), RESULT_BODY);
    // With no explicit destination the artifact name is appended to the
    // output file stem.
    assert_eq!(
        fs::read_to_string(dir.path().join("result.job-report.json")).unwrap(),
        "{\"general\":{}}"
    );
}

#[tokio::test]
async fn process_rejected_job_exits_with_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("job-id", "job-3")
                .insert_header("ezpaarse-status-message", "unknown log format"),
        )
        .mount(&server)
        .await;

    ecp()
        .arg("process")
        .arg("--host")
        .arg(host_of(&server))
        .write_stdin("raw log line\n")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown log format"));
}

#[tokio::test]
async fn download_fetches_artifacts_from_an_existing_job() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/job-4/job-report.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job-4/lines-unknown.log"))
        .respond_with(ResponseTemplate::new(200).set_body_string("rejected\n"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let report = dir.path().join("report.html");

    ecp()
        .arg("download")
        .arg("job-4")
        .arg(format!("job-report.html:{}", report.display()))
        .arg(format!(
            "lines-unknown.log:{}",
            dir.path().join("rejected.log").display()
        ))
        .arg("--host")
        .arg(host_of(&server))
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&report).unwrap(), "<html></html>");
    assert_eq!(
        fs::read_to_string(dir.path().join("rejected.log")).unwrap(),
        "rejected\n"
    );
}

#[tokio::test]
async fn download_reports_how_many_artifacts_failed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/job-5/job-report.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job-5/missing.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();

    ecp()
        .arg("download")
        .arg("job-5")
        .arg(format!(
            "job-report.html:{}",
            dir.path().join("report.html").display()
        ))
        .arg(format!(
            "missing.txt:{}",
            dir.path().join("missing.txt").display()
        ))
        .arg("--host")
        .arg(host_of(&server))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("1 of 2 file(s) failed"));

    assert!(dir.path().join("report.html").exists());
    assert!(!dir.path().join("missing.txt").exists());
}
