//! # cyclefit: Resumable Battery Degradation Cycle Runner
//!
//! **Version**: 0.1.0
//!
//! cyclefit drives a long-running electrochemical simulation cycle by cycle,
//! bounds each cycle with a hard wall-clock deadline in an isolated worker
//! process, persists every completed cycle so a run resumes where it stopped,
//! and scores each simulated cycle against measured reference data.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: A hung or crashed solver is killed and the run stops with a
//!   sentinel result; the supervisor itself never hangs
//! - **Poka-Yoke safety**: The ledger only accepts the next cycle index and is
//!   committed by atomic replace
//! - **Muda elimination**: Completed cycles are never simulated twice
//! - **Genchi Genbutsu**: Scores come from resampled measured trajectories
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cyclefit::executor::ProcessExecutor;
//! use cyclefit::orchestrator::CycleOrchestrator;
//! use cyclefit::params::ModelParameters;
//! use cyclefit::reference::ParquetReferenceStore;
//!
//! # async fn example() -> cyclefit::Result<()> {
//! let orchestrator = CycleOrchestrator::new(
//!     ProcessExecutor::new("/opt/sim/worker"),
//!     ParquetReferenceStore::new("/data/ev", "B01"),
//!     ModelParameters::defaults(),
//!     "/runs/EV/B01/cfg1_state.json",
//! );
//!
//! // Simulates every missing cycle up to 3, then prints its score (or "Inf")
//! println!("{}", orchestrator.run(3).await?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod params;
pub mod reference;
pub mod trajectory;
pub mod worker;

pub use error::{Error, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_converts_from_io() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().starts_with("IO error"));
    }
}
