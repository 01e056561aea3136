//! Worker protocol
//!
//! One JSON request document on the worker's stdin, one JSON response document
//! on its stdout, then the worker exits. Diagnostics go to stderr.
//!
//! ```text
//! request:  {"task": "initialize", "parameters": {...}}
//!           {"task": "cycle", "cycle": 3, "checkpoint": ..., "parameters": {...}}
//! response: {"status": "ok", "reply": {"kind": "initialized", "checkpoint": ...}}
//!           {"status": "ok", "reply": {"kind": "simulated", "output": {...}}}
//!           {"status": "failed", "message": "..."}
//! ```

use serde::{Deserialize, Serialize};

use crate::params::ModelParameters;
use crate::trajectory::Trajectory;
use crate::{Error, Result};

/// Opaque solver state carried from one cycle to the next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checkpoint(pub serde_json::Value);

/// Work sent to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum WorkerRequest {
    /// Produce the starting checkpoint
    Initialize {
        /// Run parameters
        parameters: ModelParameters,
    },
    /// Simulate one cycle from the previous checkpoint
    Cycle {
        /// Cycle index
        cycle: u32,
        /// Checkpoint left by the previous cycle (or initialization)
        checkpoint: Checkpoint,
        /// Run parameters
        parameters: ModelParameters,
    },
}

impl WorkerRequest {
    /// Short label for log lines.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Initialize { .. } => "initialize".to_string(),
            Self::Cycle { cycle, .. } => format!("cycle {cycle}"),
        }
    }
}

/// Everything a simulated cycle produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleOutput {
    /// Main-protocol trajectory
    pub trajectory: Trajectory,
    /// Capacity-test trajectory run before the cycle, if any
    #[serde(default)]
    pub capacity_test: Option<Trajectory>,
    /// Checkpoint at the end of the cycle
    pub checkpoint: Checkpoint,
}

/// Successful worker result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerReply {
    /// Answer to [`WorkerRequest::Initialize`]
    Initialized {
        /// Starting checkpoint
        checkpoint: Checkpoint,
    },
    /// Answer to [`WorkerRequest::Cycle`]
    Simulated {
        /// Cycle output
        output: CycleOutput,
    },
}

/// Response document written by a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerResponse {
    /// Task completed
    Ok {
        /// Result
        reply: WorkerReply,
    },
    /// Task raised inside the worker
    Failed {
        /// Error text
        message: String,
    },
}

impl WorkerResponse {
    /// Parse a response from the worker's stdout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the bytes are not a response document.
    pub fn parse(stdout: &[u8]) -> Result<Self> {
        serde_json::from_slice(stdout).map_err(|e| {
            let preview: String = String::from_utf8_lossy(stdout).chars().take(200).collect();
            Error::Protocol(format!("invalid response ({e}); output began with: {preview:?}"))
        })
    }
}
