//! Process executor tests with shell-script workers
//!
//! Every worker is a `/bin/sh` script written into a temporary directory, so
//! the tests exercise real spawning, piping, deadlines and termination.

#![cfg(unix)]

use std::path::PathBuf;
use std::time::{Duration, Instant};

use cyclefit::executor::{Executor, Outcome, ProcessExecutor, WorkerReply, WorkerRequest};
use cyclefit::params::ModelParameters;
use tempfile::TempDir;

// ============================================================================
// Helpers
// ============================================================================

const INITIALIZED: &str = r#"{"status":"ok","reply":{"kind":"initialized","checkpoint":{"soc":1.0}}}"#;

fn script(dir: &TempDir, body: &str) -> ProcessExecutor {
    let path = dir.path().join("worker.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    ProcessExecutor::new("/bin/sh").with_args([path.to_string_lossy().into_owned()])
}

fn initialize() -> WorkerRequest {
    WorkerRequest::Initialize {
        parameters: ModelParameters::defaults(),
    }
}

fn file_in(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

// ============================================================================
// Completion
// ============================================================================

#[tokio::test]
async fn test_worker_reply_is_completed() {
    let dir = TempDir::new().unwrap();
    let request_file = file_in(&dir, "request.json");
    let executor = script(
        &dir,
        &format!("cat > '{}'\necho '{INITIALIZED}'", request_file.display()),
    );

    let outcome = executor.run_bounded(initialize(), Duration::from_secs(10)).await;

    match outcome {
        Outcome::Completed(WorkerReply::Initialized { checkpoint }) => {
            assert_eq!(checkpoint.0["soc"], 1.0);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    // The worker saw the full request on stdin
    let request = std::fs::read_to_string(request_file).unwrap();
    assert!(request.contains(r#""task":"initialize""#));
}

#[tokio::test]
async fn test_stderr_noise_does_not_break_reply() {
    let dir = TempDir::new().unwrap();
    let executor = script(
        &dir,
        &format!("cat > /dev/null\necho 'solver warming up' >&2\necho '{INITIALIZED}'"),
    );
    let outcome = executor.run_bounded(initialize(), Duration::from_secs(10)).await;
    assert!(outcome.is_completed());
}

// ============================================================================
// Deadlines
// ============================================================================

#[tokio::test]
async fn test_hung_worker_times_out_promptly() {
    let dir = TempDir::new().unwrap();
    let executor = script(&dir, "exec sleep 30");

    let started = Instant::now();
    let outcome = executor.run_bounded(initialize(), Duration::from_millis(300)).await;

    assert_eq!(outcome, Outcome::Timeout);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_late_answer_is_still_timeout() {
    let dir = TempDir::new().unwrap();
    let executor = script(&dir, &format!("sleep 2\necho '{INITIALIZED}'"));
    let outcome = executor.run_bounded(initialize(), Duration::from_millis(200)).await;
    assert_eq!(outcome, Outcome::Timeout);
}

/// Whether `pid` is still a live (non-zombie) process. Polls briefly, since
/// an orphan is reaped asynchronously by its new parent.
#[cfg(target_os = "linux")]
async fn still_running(pid: &str) -> bool {
    let stat = PathBuf::from(format!("/proc/{}/stat", pid.trim()));
    for _ in 0..40 {
        match std::fs::read_to_string(&stat) {
            Err(_) => return false,
            // Field 3 is the state; the command name in field 2 has no spaces here
            Ok(line) if line.split_whitespace().nth(2) == Some("Z") => return false,
            Ok(_) => tokio::time::sleep(Duration::from_millis(50)).await,
        }
    }
    true
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_timed_out_worker_is_terminated() {
    let dir = TempDir::new().unwrap();
    let pid_file = file_in(&dir, "worker.pid");
    let executor = script(
        &dir,
        &format!("echo $$ > '{}'\nexec sleep 30", pid_file.display()),
    );

    let outcome = executor.run_bounded(initialize(), Duration::from_millis(500)).await;
    assert_eq!(outcome, Outcome::Timeout);

    let pid = std::fs::read_to_string(pid_file).unwrap();
    assert!(!still_running(&pid).await, "worker {} still alive", pid.trim());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_timeout_kills_processes_spawned_by_worker() {
    let dir = TempDir::new().unwrap();
    let pid_file = file_in(&dir, "solver.pid");
    let executor = script(
        &dir,
        &format!("sleep 30 &\necho $! > '{}'\nwait", pid_file.display()),
    );

    let outcome = executor.run_bounded(initialize(), Duration::from_millis(500)).await;
    assert_eq!(outcome, Outcome::Timeout);

    let pid = std::fs::read_to_string(pid_file).unwrap();
    assert!(!still_running(&pid).await, "solver {} outlived its worker", pid.trim());
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_nonzero_exit_is_failure_with_stderr() {
    let dir = TempDir::new().unwrap();
    let executor = script(&dir, "cat > /dev/null\necho 'solver diverged' >&2\nexit 3");
    let outcome = executor.run_bounded(initialize(), Duration::from_secs(10)).await;
    match outcome {
        Outcome::Failure(message) => assert!(message.contains("solver diverged")),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_reported_failure_carries_message() {
    let dir = TempDir::new().unwrap();
    let executor = script(
        &dir,
        r#"cat > /dev/null
echo '{"status":"failed","message":"negative concentration"}'
exit 1"#,
    );
    let outcome = executor.run_bounded(initialize(), Duration::from_secs(10)).await;
    assert_eq!(outcome, Outcome::Failure("negative concentration".to_string()));
}

#[tokio::test]
async fn test_garbage_output_is_failure() {
    let dir = TempDir::new().unwrap();
    let executor = script(&dir, "cat > /dev/null\necho 'not json'");
    let outcome = executor.run_bounded(initialize(), Duration::from_secs(10)).await;
    match outcome {
        Outcome::Failure(message) => assert!(message.contains("not json")),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_output_is_failure() {
    let dir = TempDir::new().unwrap();
    let executor = script(&dir, "cat > /dev/null");
    let outcome = executor.run_bounded(initialize(), Duration::from_secs(10)).await;
    assert!(matches!(outcome, Outcome::Failure(_)));
}
