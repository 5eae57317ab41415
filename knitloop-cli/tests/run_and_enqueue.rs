use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn knitloop_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("knitloop"));
    cmd.env_remove("KNIT_BACKEND_CONFIG")
        .env_remove("KNIT_HOOK_CONFIG")
        .env("RUST_LOG", "info")
        .env("NO_COLOR", "1");
    cmd
}

/// Backend config with a spool under `dir`; returns the config path.
fn write_backend_config(dir: &Path) -> PathBuf {
    let path = dir.join("backend.yaml");
    fs::write(&path, "cluster:\n  namespace: knit-test\nspool:\n  root: spool\n")
        .expect("write config");
    path
}

fn spool_files(dir: &Path, loop_type: &str, state: &str) -> Vec<String> {
    let path = dir.join("spool").join(loop_type).join(state);
    let Ok(entries) = fs::read_dir(path) else {
        return vec![];
    };
    let mut names: Vec<String> = entries
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn enqueue(config: &Path, loop_type: &str, id: &str) {
    knitloop_cmd()
        .arg("enqueue")
        .args(["--type", loop_type, "--id", id, "--payload", r#"{"run":"r1"}"#])
        .arg("--config")
        .arg(config)
        .assert()
        .success()
        .stdout(contains(format!("Enqueued '{id}'")));
}

// ---------------------------------------------------------------------------
// 1. Happy path
// ---------------------------------------------------------------------------

#[test]
fn backlog_run_drains_enqueued_items() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_backend_config(dir.path());
    enqueue(&config, "finishing", "a");
    enqueue(&config, "finishing", "b");
    enqueue(&config, "housekeeping", "other");

    knitloop_cmd()
        .args(["run", "--type", "finishing", "--policy", "backlog"])
        .env("KNIT_BACKEND_CONFIG", &config)
        .assert()
        .success()
        .stderr(contains("start loop"))
        .stderr(contains("until-error(backlog)"))
        .stderr(contains("backlog-drained"));

    assert!(spool_files(dir.path(), "finishing", "pending").is_empty());
    assert_eq!(spool_files(dir.path(), "finishing", "done").len(), 2);
    assert_eq!(spool_files(dir.path(), "housekeeping", "pending").len(), 1);
}

#[test]
fn empty_hook_config_behaves_like_no_hooks() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_backend_config(dir.path());
    let hooks = dir.path().join("hooks.yaml");
    fs::write(&hooks, "lifecycle: {}\n").expect("write hooks");
    enqueue(&config, "projection", "p1");

    knitloop_cmd()
        .args(["run", "--type", "projection", "--policy", "backlog"])
        .arg("--config")
        .arg(&config)
        .arg("--hooks")
        .arg(&hooks)
        .assert()
        .success();

    assert_eq!(spool_files(dir.path(), "projection", "done").len(), 1);
}

#[test]
fn json_logs_are_one_object_per_line() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_backend_config(dir.path());

    let output = knitloop_cmd()
        .args(["--log-json", "run", "--type", "initialize", "--policy", "backlog"])
        .arg("--config")
        .arg(&config)
        .output()
        .expect("run");
    assert!(output.status.success());

    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(!stderr.trim().is_empty());
    for line in stderr.lines() {
        let value: serde_json::Value = serde_json::from_str(line).expect("json log line");
        assert!(value.get("level").is_some(), "no level in {line}");
    }
}

// ---------------------------------------------------------------------------
// 2. Failures
// ---------------------------------------------------------------------------

#[test]
fn failing_before_hook_stops_the_loop_with_non_zero_exit() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_backend_config(dir.path());
    let hooks = dir.path().join("hooks.yaml");
    fs::write(&hooks, "lifecycle:\n  before:\n    - http://127.0.0.1:1/before\n")
        .expect("write hooks");
    enqueue(&config, "run_management", "stuck");

    knitloop_cmd()
        .args(["run", "--type", "run_management", "--policy", "forever:10ms"])
        .arg("--config")
        .arg(&config)
        .env("KNIT_HOOK_CONFIG", &hooks)
        .assert()
        .failure()
        .stderr(contains("before webhook http://127.0.0.1:1/before failed"));

    assert_eq!(spool_files(dir.path(), "run_management", "pending").len(), 1);
    assert!(spool_files(dir.path(), "run_management", "done").is_empty());
}

#[test]
fn missing_backend_config_is_reported() {
    knitloop_cmd()
        .args(["run", "--type", "finishing", "--policy", "backlog"])
        .assert()
        .failure()
        .stderr(contains("KNIT_BACKEND_CONFIG"));
}

#[test]
fn broken_hook_config_fails_at_startup() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_backend_config(dir.path());
    let hooks = dir.path().join("hooks.yaml");
    fs::write(&hooks, "lifecycle:\n  before: [ftp://nope]\n").expect("write hooks");

    knitloop_cmd()
        .args(["run", "--type", "finishing", "--policy", "backlog"])
        .arg("--config")
        .arg(&config)
        .arg("--hooks")
        .arg(&hooks)
        .assert()
        .failure()
        .stderr(contains("cannot load hook config"));
}

#[test]
fn unknown_policy_is_rejected_by_argument_parsing() {
    knitloop_cmd()
        .args(["run", "--type", "finishing", "--policy", "sometimes"])
        .assert()
        .failure()
        .stderr(contains("unknown policy 'sometimes'"));
}

#[test]
fn unknown_loop_type_is_rejected_by_argument_parsing() {
    knitloop_cmd()
        .args(["enqueue", "--type", "gc"])
        .assert()
        .failure()
        .stderr(contains("unknown loop type 'gc'"));
}

#[test]
fn invalid_payload_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_backend_config(dir.path());

    knitloop_cmd()
        .args(["enqueue", "--type", "finishing", "--payload", "{not json"])
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(contains("--payload is not valid JSON"));
}

// ---------------------------------------------------------------------------
// 3. Signals
// ---------------------------------------------------------------------------

/// Start a forever loop, send it `signal` via kill(1) and expect exit 0.
#[cfg(unix)]
fn assert_signal_stops_forever_loop(signal: &str) {
    use std::process::Stdio;
    use std::thread::sleep;
    use std::time::{Duration, Instant};

    let dir = TempDir::new().expect("tempdir");
    let config = write_backend_config(dir.path());

    let mut child = knitloop_cmd()
        .args(["run", "--type", "housekeeping", "--policy", "forever:50ms"])
        .arg("--config")
        .arg(&config)
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn");

    sleep(Duration::from_millis(500));
    let killed = Command::new("kill")
        .args([format!("-{signal}"), child.id().to_string()])
        .status()
        .expect("kill");
    assert!(killed.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().expect("try_wait") {
            break status;
        }
        assert!(Instant::now() < deadline, "loop did not stop after SIG{signal}");
        sleep(Duration::from_millis(10));
    };
    assert!(status.success(), "exit status after SIG{signal}: {status}");
}

#[cfg(unix)]
#[test]
fn sigterm_stops_a_forever_loop_with_success() {
    assert_signal_stops_forever_loop("TERM");
}

#[cfg(unix)]
#[test]
fn sigint_stops_a_forever_loop_with_success() {
    assert_signal_stops_forever_loop("INT");
}
