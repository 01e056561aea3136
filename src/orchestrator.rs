//! Cycle Orchestrator
//!
//! Drives a run to the requested cycle:
//!
//! ```text
//! load ledger ──(none)──> initialize worker ──> fresh ledger (persisted)
//!      │
//!      └─> for cycle in len()..=requested:
//!             run_bounded(cycle, last checkpoint) ─┬─ Completed → score → commit → persist
//!                                                  └─ Timeout / Failure → stop, Unavailable
//!      └─> report the stored score of the requested cycle
//! ```
//!
//! Cycles run strictly in sequence and each is persisted before the next
//! starts, so a crash loses at most the cycle in flight. A timed-out cycle is
//! not retried within the run; the next invocation resumes from the ledger.

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::executor::{CycleOutput, Deadlines, Executor, Outcome, WorkerReply, WorkerRequest};
use crate::ledger::{CycleRecord, StateLedger};
use crate::metrics::score_cycle;
use crate::params::ModelParameters;
use crate::reference::ReferenceSource;
use crate::Result;

/// Token printed when a run has no usable result.
pub const SENTINEL: &str = "Inf";

/// Final result of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunResult {
    /// Score of the requested cycle
    Score(f64),
    /// No usable result; carries the reason for the log
    Unavailable(String),
}

impl RunResult {
    /// The score, if there is one.
    #[must_use]
    pub const fn score(&self) -> Option<f64> {
        match self {
            Self::Score(value) => Some(*value),
            Self::Unavailable(_) => None,
        }
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Score(value) => write!(f, "{value}"),
            Self::Unavailable(_) => f.write_str(SENTINEL),
        }
    }
}

/// Cycles still to simulate when `completed` are in the ledger and
/// `requested` is wanted. Empty when the requested cycle is already stored.
#[must_use]
pub fn plan_cycles(completed: usize, requested: u32) -> Range<u32> {
    let start = u32::try_from(completed).unwrap_or(u32::MAX);
    if requested < start {
        start..start
    } else {
        start..requested.saturating_add(1)
    }
}

/// Runs cycles through an [`Executor`], scores them against a
/// [`ReferenceSource`] and keeps the ledger at `ledger_path` current.
#[derive(Debug)]
pub struct CycleOrchestrator<E, R> {
    executor: E,
    reference: R,
    parameters: ModelParameters,
    ledger_path: PathBuf,
    deadlines: Deadlines,
}

impl<E: Executor, R: ReferenceSource> CycleOrchestrator<E, R> {
    /// Create an orchestrator with the default deadlines.
    #[must_use]
    pub fn new(
        executor: E,
        reference: R,
        parameters: ModelParameters,
        ledger_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executor,
            reference,
            parameters,
            ledger_path: ledger_path.into(),
            deadlines: Deadlines::default(),
        }
    }

    /// Override the deadlines.
    #[must_use]
    pub fn with_deadlines(mut self, deadlines: Deadlines) -> Self {
        self.deadlines = deadlines;
        self
    }

    /// Run parameters
    #[must_use]
    pub const fn parameters(&self) -> &ModelParameters {
        &self.parameters
    }

    /// Ledger file
    #[must_use]
    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    /// Deadline every task of this run is bounded by.
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadlines.select(self.parameters.is_degradation_mode())
    }

    /// Bring the ledger up to `requested` and report that cycle's score.
    ///
    /// Worker timeouts and failures end the run with
    /// [`RunResult::Unavailable`]; cycles committed before that stay persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read or persisted, or if a
    /// ledger order invariant is violated.
    pub async fn run(&self, requested: u32) -> Result<RunResult> {
        let degradation_mode = self.parameters.is_degradation_mode();
        let deadline = self.deadline();
        info!(
            requested,
            degradation_mode,
            deadline_secs = deadline.as_secs(),
            ledger = %self.ledger_path.display(),
            "Starting run"
        );

        let mut ledger = match StateLedger::load(&self.ledger_path)? {
            Some(ledger) => ledger,
            None => match self.initialize(deadline).await {
                Ok(ledger) => ledger,
                Err(reason) => return Ok(RunResult::Unavailable(reason)),
            },
        };

        let plan = plan_cycles(ledger.len(), requested);
        if plan.is_empty() {
            info!(requested, completed = ledger.len(), "Requested cycle already in ledger");
        }
        for cycle in plan {
            let output = match self.simulate(cycle, &ledger, deadline).await {
                Ok(output) => output,
                Err(reason) => {
                    warn!(cycle, %reason, "Run aborted");
                    return Ok(RunResult::Unavailable(reason));
                }
            };
            let record = self.score(cycle, &output);
            ledger.commit_cycle(cycle as usize, record, output.checkpoint, output.trajectory)?;
            ledger.persist(&self.ledger_path)?;
        }

        let record = ledger.get(requested as usize)?;
        Ok(record.score_for(degradation_mode).map_or_else(
            || RunResult::Unavailable(format!("cycle {requested} has no recorded score")),
            RunResult::Score,
        ))
    }

    async fn initialize(&self, deadline: Duration) -> std::result::Result<StateLedger, String> {
        info!("No ledger found, running initialization");
        let request = WorkerRequest::Initialize {
            parameters: self.parameters.clone(),
        };
        match self.executor.run_bounded(request, deadline).await {
            Outcome::Completed(WorkerReply::Initialized { checkpoint }) => {
                let ledger = StateLedger::new(checkpoint);
                ledger
                    .persist(&self.ledger_path)
                    .map_err(|e| format!("failed to persist initial ledger: {e}"))?;
                Ok(ledger)
            }
            Outcome::Completed(WorkerReply::Simulated { .. }) => {
                Err("initialization answered with a cycle reply".to_string())
            }
            Outcome::Timeout => Err(format!(
                "initialization timed out after {}s",
                deadline.as_secs()
            )),
            Outcome::Failure(message) => Err(format!("initialization failed: {message}")),
        }
    }

    async fn simulate(
        &self,
        cycle: u32,
        ledger: &StateLedger,
        deadline: Duration,
    ) -> std::result::Result<CycleOutput, String> {
        let request = WorkerRequest::Cycle {
            cycle,
            checkpoint: ledger.last_checkpoint().clone(),
            parameters: self.parameters.clone(),
        };
        match self.executor.run_bounded(request, deadline).await {
            Outcome::Completed(WorkerReply::Simulated { output }) => Ok(output),
            Outcome::Completed(WorkerReply::Initialized { .. }) => {
                Err(format!("cycle {cycle} answered with an initialization reply"))
            }
            Outcome::Timeout => Err(format!(
                "cycle {cycle} timed out after {}s",
                deadline.as_secs()
            )),
            Outcome::Failure(message) => Err(format!("cycle {cycle} failed: {message}")),
        }
    }

    fn score(&self, cycle: u32, output: &CycleOutput) -> CycleRecord {
        let reference = self
            .reference
            .load_reference(cycle)
            .unwrap_or_else(|e| {
                warn!(cycle, error = %e, "Reference unreadable, scoring as missing");
                None
            });
        let capacity_reference = self
            .reference
            .load_capacity_test(cycle)
            .unwrap_or_else(|e| {
                warn!(cycle, error = %e, "Capacity-test reference unreadable, scoring as missing");
                None
            });
        if reference.is_none() {
            info!(cycle, "No reference data for cycle");
        }

        let scores = score_cycle(
            &output.trajectory,
            reference.as_ref(),
            output.capacity_test.as_ref(),
            capacity_reference.as_ref(),
        );
        let record = CycleRecord::from_scores(cycle, &scores);
        info!(
            cycle,
            non_degradation = ?record.non_degradation_score(),
            degradation = ?record.degradation_score(),
            capacity = ?record.capacity_score(),
            "Cycle scored"
        );
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_cycles() {
        assert_eq!(plan_cycles(0, 3), 0..4);
        assert_eq!(plan_cycles(2, 3), 2..4);
        assert_eq!(plan_cycles(4, 3), 4..4);
        assert!(plan_cycles(6, 3).is_empty());
        assert_eq!(plan_cycles(0, 0), 0..1);
    }

    #[test]
    fn test_run_result_display() {
        assert_eq!(RunResult::Score(0.25).to_string(), "0.25");
        assert_eq!(RunResult::Unavailable("timeout".into()).to_string(), "Inf");
        assert_eq!(RunResult::Unavailable("x".into()).score(), None);
    }
}
