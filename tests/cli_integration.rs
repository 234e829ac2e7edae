//! Integration tests for the flowstate binary.
//!
//! These tests run the real binary. Each invocation gets an isolated home
//! and config directory, and either the in-memory backend (via a config
//! file) or a wiremock server standing in for etcd.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Get a command for running flowstate with no ambient configuration.
fn flowstate(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("flowstate").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("FLOWSTATE_CONFIG")
        .env_remove("FLOWSTATE_ENDPOINT")
        .env_remove("FLOWSTATE_RETRY_BUDGET")
        .env_remove("RUST_LOG");
    cmd
}

/// A flowstate command for run `order-flow/req-42` on the in-memory backend.
fn in_memory(home: &TempDir) -> Command {
    let config = home.path().join("memory.toml");
    std::fs::write(&config, "backend = \"memory\"\n").unwrap();

    let mut cmd = flowstate(home);
    cmd.arg("--config")
        .arg(config)
        .args(["--flow", "order-flow", "--request", "req-42"]);
    cmd
}

mod surface {
    use super::*;

    #[test]
    fn version_flag_works() {
        let home = TempDir::new().unwrap();
        flowstate(&home)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("flowstate"));
    }

    #[test]
    fn help_flag_works() {
        let home = TempDir::new().unwrap();
        flowstate(&home)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("per-run workflow state"));
    }

    #[test]
    fn run_must_be_selected() {
        let home = TempDir::new().unwrap();
        flowstate(&home)
            .args(["get", "charge"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--flow"));
    }

    #[test]
    fn invalid_endpoint_flag_rejected() {
        let home = TempDir::new().unwrap();
        flowstate(&home)
            .args(["--flow", "f", "--request", "r", "--endpoint", "ftp://etcd", "cleanup"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid command-line option"));
    }

    #[test]
    fn unreadable_config_reported() {
        let home = TempDir::new().unwrap();
        flowstate(&home)
            .args(["--config", "/nonexistent/flowstate.toml"])
            .args(["--flow", "f", "--request", "r", "cleanup"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to load config"));
    }
}

mod in_memory_backend {
    use super::*;

    #[test]
    fn set_confirms() {
        let home = TempDir::new().unwrap();
        in_memory(&home)
            .args(["set", "status", "waiting"])
            .assert()
            .success()
            .stdout("Set status = waiting\n");
    }

    #[test]
    fn quiet_set_prints_nothing() {
        let home = TempDir::new().unwrap();
        in_memory(&home)
            .args(["--quiet", "set", "status", "waiting"])
            .assert()
            .success()
            .stdout("");
    }

    #[test]
    fn create_reports_count() {
        let home = TempDir::new().unwrap();
        in_memory(&home)
            .args(["create", "validate", "charge", "ship"])
            .assert()
            .success()
            .stdout("Initialised 3 counter(s)\n");
    }

    #[test]
    fn get_of_fresh_run_is_not_found() {
        let home = TempDir::new().unwrap();
        in_memory(&home)
            .args(["get", "charge"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read 'charge'"))
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn state_of_fresh_run_is_not_found() {
        let home = TempDir::new().unwrap();
        in_memory(&home)
            .arg("state")
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found: state"));
    }

    #[test]
    fn invalid_key_rejected() {
        let home = TempDir::new().unwrap();
        in_memory(&home)
            .args(["set", "../req-43/state", "true"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid key"));
    }

    #[test]
    fn memory_backend_warns_it_is_process_local() {
        let home = TempDir::new().unwrap();
        in_memory(&home)
            .args(["set", "status", "waiting"])
            .assert()
            .success()
            .stderr(predicate::str::contains("process-local"));
    }

    #[test]
    fn state_does_not_survive_between_commands() {
        let home = TempDir::new().unwrap();
        in_memory(&home)
            .args(["create", "charge"])
            .assert()
            .success();
        in_memory(&home)
            .args(["incr", "charge"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("process-local"))
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn cleanup_names_namespace() {
        let home = TempDir::new().unwrap();
        in_memory(&home)
            .arg("cleanup")
            .assert()
            .success()
            .stdout("Removed faasflow/order-flow/req-42\n");
    }
}

mod etcd_backend {
    use super::*;

    const KEY_PATH: &str = "/v2/keys/faasflow/order-flow/req-42/charge";

    fn node(value: &str, index: u64) -> serde_json::Value {
        json!({
            "action": "get",
            "node": {
                "key": "/faasflow/order-flow/req-42/charge",
                "value": value,
                "modifiedIndex": index
            }
        })
    }

    /// Run the binary against `server` off the async runtime and check that
    /// it succeeds printing `expected`.
    async fn run_ok(server: &MockServer, args: &'static [&'static str], expected: &'static str) {
        let endpoint = server.uri();
        tokio::task::spawn_blocking(move || {
            let home = TempDir::new().unwrap();
            flowstate(&home)
                .args(["--endpoint", endpoint.as_str()])
                .args(["--flow", "order-flow", "--request", "req-42"])
                .args(args)
                .assert()
                .success()
                .stdout(expected);
        })
        .await
        .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn get_prints_value() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KEY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(node("4", 17)))
            .mount(&server)
            .await;

        run_ok(&server, &["get", "charge"], "4\n").await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn incr_prints_new_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KEY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(node("4", 17)))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(KEY_PATH))
            .and(query_param("prevIndex", "17"))
            .respond_with(ResponseTemplate::new(200).set_body_json(node("5", 18)))
            .expect(1)
            .mount(&server)
            .await;

        run_ok(&server, &["incr", "charge"], "5\n").await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn state_reads_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/keys/faasflow/order-flow/req-42/state"))
            .respond_with(ResponseTemplate::new(200).set_body_json(node("true", 3)))
            .mount(&server)
            .await;

        run_ok(&server, &["state"], "true\n").await;
    }
}
