//! Exit contract of the `cyclefit` binary
//!
//! Every invocation prints exactly one line on stdout and exits with status 0,
//! whether it produced a score or the `Inf` sentinel.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

// ============================================================================
// Helpers
// ============================================================================

/// Binary with the environment cleared of every setting it reads.
fn cyclefit() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_cyclefit"));
    command
        .env_remove("CYCLEFIT_INPUTS_PATH")
        .env_remove("CYCLEFIT_DATASET_PATH")
        .env_remove("CYCLEFIT_WORKER")
        .env_remove("RUST_LOG");
    command
}

fn identified(command: &mut Command) -> &mut Command {
    command.args([
        "--configuration-id",
        "cfg1",
        "--dataset-id",
        "EV",
        "--battery-id",
        "B01",
    ])
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_single_line(output: &Output, expected: &str) {
    assert!(output.status.success(), "exit status {:?}", output.status);
    assert_eq!(stdout(output), format!("{expected}\n"));
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

// ============================================================================
// Sentinel Paths
// ============================================================================

#[test]
fn test_missing_worker_prints_sentinel_before_any_spawn() {
    let inputs = TempDir::new().unwrap();
    let dataset = TempDir::new().unwrap();

    let output = identified(&mut cyclefit())
        .env("CYCLEFIT_INPUTS_PATH", inputs.path())
        .env("CYCLEFIT_DATASET_PATH", dataset.path())
        .args(["--cycle", "0"])
        .output()
        .unwrap();

    assert_single_line(&output, "Inf");
    // Validation failed before the run folder was created
    assert_eq!(entries(inputs.path()), 0);
    assert!(String::from_utf8_lossy(&output.stderr).contains("worker"));
}

#[test]
fn test_no_cycle_prints_sentinel() {
    let inputs = TempDir::new().unwrap();
    let output = identified(&mut cyclefit())
        .env("CYCLEFIT_INPUTS_PATH", inputs.path())
        .output()
        .unwrap();

    assert_single_line(&output, "Inf");
    assert_eq!(entries(inputs.path()), 0);
}

#[test]
fn test_unparseable_arguments_print_sentinel() {
    let output = cyclefit().args(["--cycle", "three"]).output().unwrap();
    assert_single_line(&output, "Inf");
}

#[test]
fn test_version_prints_single_line() {
    let output = cyclefit().arg("--version").output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        format!("cyclefit {}\n", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn test_malformed_override_prints_sentinel() {
    let inputs = TempDir::new().unwrap();
    let dataset = TempDir::new().unwrap();
    let output = identified(&mut cyclefit())
        .env("CYCLEFIT_INPUTS_PATH", inputs.path())
        .env("CYCLEFIT_DATASET_PATH", dataset.path())
        .env("CYCLEFIT_WORKER", "/bin/false")
        .args(["--cycle", "0", "--param", "no equals sign"])
        .output()
        .unwrap();

    assert_single_line(&output, "Inf");
}

// ============================================================================
// Scored Run
// ============================================================================

/// Worker answering initialization and every cycle with a short trajectory.
#[cfg(unix)]
const WORKER: &str = r#"#!/bin/sh
request=$(cat)
case "$request" in
  *'"task":"initialize"'*)
    echo '{"status":"ok","reply":{"kind":"initialized","checkpoint":{"soc":1.0}}}'
    ;;
  *)
    echo '{"status":"ok","reply":{"kind":"simulated","output":{"trajectory":{"relative_time":[0.0,10.0,20.0],"current":[1.0,1.0,1.0],"voltage":[4.0,3.9,3.8],"discharge_capacity":[0.0,0.003,0.006],"step":[4,4,4]},"capacity_test":null,"checkpoint":{"soc":0.9}}}}'
    ;;
esac
"#;

#[cfg(unix)]
#[test]
fn test_scored_run_prints_single_score_line() {
    let inputs = TempDir::new().unwrap();
    let dataset = TempDir::new().unwrap();
    let worker = inputs.path().join("worker.sh");
    std::fs::write(&worker, WORKER).unwrap();

    let output = identified(&mut cyclefit())
        .env("CYCLEFIT_INPUTS_PATH", inputs.path())
        .env("CYCLEFIT_DATASET_PATH", dataset.path())
        .env("CYCLEFIT_WORKER", "/bin/sh")
        .args(["--worker-arg"])
        .arg(&worker)
        .args(["--cycle", "1"])
        .output()
        .unwrap();

    // No reference data, so every metric scores the maximum penalty
    assert_single_line(&output, "10");
    assert!(inputs.path().join("EV/B01/cfg1_state.json").exists());
}
