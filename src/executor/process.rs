//! Process-isolated executor
//!
//! Each task runs in a freshly spawned worker process. The supervisor writes
//! the request to the worker's stdin, drains stdout/stderr concurrently and
//! waits for exit against an absolute deadline. On unix the worker leads its
//! own process group; on timeout the whole group is killed, the worker is
//! reaped and the pipe readers are aborted.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinError;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use super::{Executor, Outcome, WorkerReply, WorkerRequest, WorkerResponse};

/// Bytes of worker stderr quoted in a failure message.
const STDERR_TAIL_BYTES: usize = 2048;

/// Executor that runs every task in its own worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessExecutor {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessExecutor {
    /// Executor for the given worker program.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Fixed arguments passed to every worker.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Worker program
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Worker arguments
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        command
    }

    async fn supervise(
        &self,
        request: &WorkerRequest,
        deadline: Duration,
    ) -> Outcome<WorkerReply> {
        let payload = match serde_json::to_vec(request) {
            Ok(payload) => payload,
            Err(e) => return Outcome::Failure(format!("failed to encode worker request: {e}")),
        };
        let deadline_at = Instant::now() + deadline;

        let mut child = match self.command().spawn() {
            Ok(child) => child,
            Err(e) => {
                return Outcome::Failure(format!(
                    "failed to spawn worker '{}': {e}",
                    self.program.display()
                ))
            }
        };
        let pid = child.id();
        debug!(pid, task = %request.label(), "Worker spawned");

        let (Some(mut stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            if let Err(e) = child.kill().await {
                warn!(pid, error = %e, "Failed to kill worker");
            }
            return Outcome::Failure("worker pipes unavailable".to_string());
        };

        // Dropping stdin at the end of the task signals EOF to the worker.
        let writer = tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&payload).await {
                debug!(error = %e, "Worker closed stdin before reading the request");
            }
        });
        let stdout_task = tokio::spawn(read_all(stdout));
        let stderr_task = tokio::spawn(read_all(stderr));
        let pending = [
            writer.abort_handle(),
            stdout_task.abort_handle(),
            stderr_task.abort_handle(),
        ];

        let finished = timeout_at(deadline_at, async {
            let status = child.wait().await;
            (status, stdout_task.await, stderr_task.await)
        })
        .await;

        let Ok((status, stdout, stderr)) = finished else {
            for handle in &pending {
                handle.abort();
            }
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            if let Err(e) = child.kill().await {
                warn!(pid, error = %e, "Failed to kill timed-out worker");
            }
            return Outcome::Timeout;
        };

        let status = match status {
            Ok(status) => status,
            Err(e) => return Outcome::Failure(format!("failed to wait for worker: {e}")),
        };
        let stdout = match joined(stdout, "stdout") {
            Ok(bytes) => bytes,
            Err(message) => return Outcome::Failure(message),
        };
        let stderr = joined(stderr, "stderr").unwrap_or_default();
        for line in String::from_utf8_lossy(&stderr).lines() {
            debug!(target: "cyclefit::worker", pid, "{line}");
        }

        interpret(status, &stdout, &stderr)
    }
}

impl Executor for ProcessExecutor {
    async fn run_bounded(
        &self,
        request: WorkerRequest,
        deadline: Duration,
    ) -> Outcome<WorkerReply> {
        let label = request.label();
        info!(task = %label, deadline_secs = deadline.as_secs_f64(), "Running worker task");
        let started = Instant::now();

        let outcome = self.supervise(&request, deadline).await;

        let elapsed_secs = started.elapsed().as_secs_f64();
        match &outcome {
            Outcome::Completed(_) => info!(task = %label, elapsed_secs, "Worker task completed"),
            Outcome::Timeout => {
                warn!(task = %label, elapsed_secs, "Worker task timed out, worker terminated");
            }
            Outcome::Failure(message) => {
                warn!(task = %label, elapsed_secs, %message, "Worker task failed");
            }
        }
        outcome
    }
}

/// SIGKILL every process in the group led by `pid`, so children the worker
/// spawned die with it.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        warn!(pid, error = %e, "Failed to kill worker process group");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

async fn read_all<R: AsyncRead + Unpin>(mut stream: R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    Ok(buf)
}

fn joined(
    result: Result<io::Result<Vec<u8>>, JoinError>,
    stream: &str,
) -> Result<Vec<u8>, String> {
    match result {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(format!("failed to read worker {stream}: {e}")),
        Err(e) => Err(format!("worker {stream} reader stopped: {e}")),
    }
}

fn interpret(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Outcome<WorkerReply> {
    match (status.success(), WorkerResponse::parse(stdout)) {
        (_, Ok(WorkerResponse::Failed { message })) => Outcome::Failure(message),
        (true, Ok(WorkerResponse::Ok { reply })) => Outcome::Completed(reply),
        (true, Err(e)) => Outcome::Failure(e.to_string()),
        (false, _) => Outcome::Failure(format!("worker exited with {status}{}", tail(stderr))),
    }
}

fn tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }
    let start = text
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| text.len() - i <= STDERR_TAIL_BYTES)
        .unwrap_or(0);
    format!(": {}", &text[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_keeps_end_of_stderr() {
        assert_eq!(tail(b""), "");
        assert_eq!(tail(b"  boom\n"), ": boom");
        let long = "x".repeat(STDERR_TAIL_BYTES + 10) + "END";
        let tail = tail(long.as_bytes());
        assert!(tail.ends_with("END"));
        assert!(tail.len() <= STDERR_TAIL_BYTES + 2);
    }

    #[tokio::test]
    async fn test_missing_program_is_failure() {
        let executor = ProcessExecutor::new("/nonexistent/cyclefit-worker");
        let request = WorkerRequest::Initialize {
            parameters: crate::params::ModelParameters::defaults(),
        };
        let outcome = executor
            .run_bounded(request, Duration::from_secs(5))
            .await;
        assert!(matches!(outcome, Outcome::Failure(msg) if msg.contains("failed to spawn")));
    }
}
