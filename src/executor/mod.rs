//! Timeout-Bounded Executor
//!
//! Runs one simulation task in an isolated worker and never lets the caller
//! wait past its deadline.
//!
//! ```text
//! run_bounded(request, deadline)
//!   ├── worker answers in time      → Outcome::Completed(reply)
//!   ├── deadline elapses first      → kill worker, drop pipes → Outcome::Timeout
//!   └── worker errors / crashes     → Outcome::Failure(text)
//! ```
//!
//! Toyota Way Principles:
//! - Poka-Yoke: a late answer is discarded with the killed worker, so a
//!   `Timeout` can never be followed by a result
//! - Jidoka: one worker per task; a crashed solver takes down only its own process

mod process;
mod protocol;

pub use process::ProcessExecutor;
pub use protocol::{Checkpoint, CycleOutput, WorkerReply, WorkerRequest, WorkerResponse};

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default deadline for a standard-mode task (1 hour).
pub const STANDARD_DEADLINE: Duration = Duration::from_secs(3600);

/// Default deadline for a degradation-mode task (5 hours).
pub const DEGRADATION_DEADLINE: Duration = Duration::from_secs(18_000);

/// Result of one bounded run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The task answered before the deadline
    Completed(T),
    /// The deadline elapsed; the worker was terminated
    Timeout,
    /// The task failed; carries the diagnostic text
    Failure(String),
}

impl<T> Outcome<T> {
    /// True for [`Outcome::Completed`]
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Map the completed value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Completed(value) => Outcome::Completed(f(value)),
            Self::Timeout => Outcome::Timeout,
            Self::Failure(message) => Outcome::Failure(message),
        }
    }
}

/// The two deadline classes of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadlines {
    /// Deadline when no degradation overlay is present
    pub standard: Duration,
    /// Deadline for degradation-mode tasks
    pub degradation: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            standard: STANDARD_DEADLINE,
            degradation: DEGRADATION_DEADLINE,
        }
    }
}

impl Deadlines {
    /// Deadline for a run in the given mode.
    #[must_use]
    pub const fn select(&self, degradation_mode: bool) -> Duration {
        if degradation_mode {
            self.degradation
        } else {
            self.standard
        }
    }
}

/// Runs a worker task under a hard deadline.
///
/// Implementations must never block past `deadline`, must terminate the
/// worker on timeout, and must convert every worker-side failure into
/// [`Outcome::Failure`].
pub trait Executor: Send + Sync {
    /// Run `request` in a fresh worker.
    fn run_bounded(
        &self,
        request: WorkerRequest,
        deadline: Duration,
    ) -> impl Future<Output = Outcome<WorkerReply>> + Send;
}

impl<E: Executor> Executor for &E {
    fn run_bounded(
        &self,
        request: WorkerRequest,
        deadline: Duration,
    ) -> impl Future<Output = Outcome<WorkerReply>> + Send {
        (**self).run_bounded(request, deadline)
    }
}
