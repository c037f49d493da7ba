//! Smoke tests for the `lv` binary: argument parsing, config failures, and a
//! one-shot list against a mock server.

use std::io::Write;
use std::net::TcpListener;
use std::process::Command;

use assert_cmd::prelude::*;
use httpmock::prelude::*;
use predicates::prelude::*;

fn lv() -> Command {
    let mut cmd = Command::cargo_bin("lv").unwrap();
    for var in ["LV_API_BASE_URL", "LV_CHANNEL_URL", "LV_REQUEST_TIMEOUT_MS"] {
        cmd.env_remove(var);
    }
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn yaml_file(body: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(body.as_bytes()).unwrap();
    f
}

#[test]
fn help_lists_subcommands() {
    lv().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("create-tx"))
        .stdout(predicate::str::contains("watch"));
}

#[test]
fn config_hash_prints_fingerprint() {
    let cfg = yaml_file("api:\n  base_url: \"http://10.1.1.1:8000\"\n");
    lv().args(["--config", cfg.path().to_str().unwrap(), "config-hash"])
        .assert()
        .success()
        .stdout(predicate::str::is_match("config_hash=[0-9a-f]{64}").unwrap())
        .stdout(predicate::str::contains("http://10.1.1.1:8000"));
}

#[test]
fn env_override_reaches_effective_config() {
    lv().env("LV_API_BASE_URL", "http://from-env:7000")
        .arg("config-hash")
        .assert()
        .success()
        .stdout(predicate::str::contains("http://from-env:7000"));
}

#[test]
fn missing_config_file_fails() {
    lv().args(["--config", "/no/such/lv.yaml", "config-hash"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read yaml path"));
}

#[test]
fn unknown_config_key_fails() {
    let cfg = yaml_file("api:\n  retries: 3\n");
    lv().args(["--config", cfg.path().to_str().unwrap(), "config-hash"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_INVALID"));
}

#[test]
fn list_json_prints_server_view() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/transactions");
        then.status(200).json_body(serde_json::json!([{
            "id": "t1",
            "user_id": "u1",
            "monto": 12.5,
            "tipo": "pago",
            "status": "procesado",
            "idempotency_key": "async-tx-1",
            "created_at": "2024-05-01T10:00:00"
        }]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/summaries");
        then.status(200).json_body(serde_json::json!([]));
    });

    lv().env("LV_API_BASE_URL", server.base_url())
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""revision":1"#))
        .stdout(predicate::str::contains(r#""id":"t1""#))
        .stdout(predicate::str::contains(r#""status":"procesado""#));
}

#[test]
fn list_fails_when_server_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    lv().env("LV_API_BASE_URL", format!("http://{addr}"))
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("initial fetch failed"));
}

#[test]
fn rejected_create_reports_server_detail() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/transactions/async-process");
        then.status(422).body(r#"{"detail":"monto must be positive"}"#);
    });

    lv().env("LV_API_BASE_URL", server.base_url())
        .args([
            "create-tx",
            "--user-id",
            "u1",
            "--amount=-5",
            "--type",
            "pago",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("monto must be positive"));
}
