//! Worker side of the process boundary
//!
//! A worker binary wraps a simulation engine in a [`Simulator`] and calls
//! [`serve`] with its stdin and stdout. `serve` reads one request, runs it and
//! always writes exactly one response document, converting errors and panics
//! into `failed` responses.
//!
//! ```rust,no_run
//! use cyclefit::executor::{Checkpoint, CycleOutput};
//! use cyclefit::params::ModelParameters;
//! use cyclefit::worker::{serve, Simulator};
//!
//! struct Engine;
//!
//! impl Simulator for Engine {
//!     fn initialize(&mut self, _: &ModelParameters) -> Result<Checkpoint, String> {
//!         Ok(Checkpoint::default())
//!     }
//!
//!     fn simulate(
//!         &mut self,
//!         _cycle: u32,
//!         _checkpoint: &Checkpoint,
//!         _parameters: &ModelParameters,
//!     ) -> Result<CycleOutput, String> {
//!         Err("not implemented".to_string())
//!     }
//! }
//!
//! fn main() -> cyclefit::Result<()> {
//!     serve(&mut Engine, std::io::stdin().lock(), std::io::stdout().lock())
//! }
//! ```

use std::io::{Read, Write};
use std::panic::{self, AssertUnwindSafe};

use crate::executor::{Checkpoint, CycleOutput, WorkerReply, WorkerRequest, WorkerResponse};
use crate::params::ModelParameters;
use crate::Result;

/// Simulation engine driven by a worker process.
pub trait Simulator {
    /// Run the initialization experiment and return the starting checkpoint.
    ///
    /// # Errors
    ///
    /// Returns the engine's error text on failure.
    fn initialize(
        &mut self,
        parameters: &ModelParameters,
    ) -> std::result::Result<Checkpoint, String>;

    /// Simulate `cycle` starting from `checkpoint`.
    ///
    /// # Errors
    ///
    /// Returns the engine's error text on failure (e.g. solver non-convergence).
    fn simulate(
        &mut self,
        cycle: u32,
        checkpoint: &Checkpoint,
        parameters: &ModelParameters,
    ) -> std::result::Result<CycleOutput, String>;
}

/// Answer one request.
///
/// Never panics on engine failures: a panic inside the simulator is caught
/// and reported as a `failed` response.
pub fn handle<S: Simulator>(simulator: &mut S, request: WorkerRequest) -> WorkerResponse {
    let result = panic::catch_unwind(AssertUnwindSafe(|| match request {
        WorkerRequest::Initialize { parameters } => simulator
            .initialize(&parameters)
            .map(|checkpoint| WorkerReply::Initialized { checkpoint }),
        WorkerRequest::Cycle {
            cycle,
            checkpoint,
            parameters,
        } => simulator
            .simulate(cycle, &checkpoint, &parameters)
            .map(|output| WorkerReply::Simulated { output }),
    }));

    match result {
        Ok(Ok(reply)) => WorkerResponse::Ok { reply },
        Ok(Err(message)) => WorkerResponse::Failed { message },
        Err(payload) => WorkerResponse::Failed {
            message: panic_message(payload.as_ref()),
        },
    }
}

/// Read one request from `input`, run it and write the response to `output`.
///
/// A request that cannot be decoded is answered with a `failed` response.
///
/// # Errors
///
/// Returns an error only if reading the input or writing the response fails.
pub fn serve<S, R, W>(simulator: &mut S, mut input: R, mut output: W) -> Result<()>
where
    S: Simulator,
    R: Read,
    W: Write,
{
    let mut buf = Vec::new();
    input.read_to_end(&mut buf)?;

    let response = match serde_json::from_slice::<WorkerRequest>(&buf) {
        Ok(request) => handle(simulator, request),
        Err(e) => WorkerResponse::Failed {
            message: format!("invalid worker request: {e}"),
        },
    };

    serde_json::to_writer(&mut output, &response)?;
    output.write_all(b"\n")?;
    output.flush()?;
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .map_or_else(
            || "simulator panicked".to_string(),
            |message| format!("simulator panicked: {message}"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::Trajectory;
    use serde_json::json;

    struct Scripted {
        panic_on: Option<u32>,
    }

    impl Simulator for Scripted {
        fn initialize(&mut self, _: &ModelParameters) -> std::result::Result<Checkpoint, String> {
            Ok(Checkpoint(json!({"cycle": -1})))
        }

        fn simulate(
            &mut self,
            cycle: u32,
            _: &Checkpoint,
            _: &ModelParameters,
        ) -> std::result::Result<CycleOutput, String> {
            if self.panic_on == Some(cycle) {
                panic!("index out of bounds");
            }
            if cycle == 99 {
                return Err("solver did not converge".to_string());
            }
            Ok(CycleOutput {
                trajectory: Trajectory::default(),
                capacity_test: None,
                checkpoint: Checkpoint(json!({ "cycle": cycle })),
            })
        }
    }

    fn cycle_request(cycle: u32) -> WorkerRequest {
        WorkerRequest::Cycle {
            cycle,
            checkpoint: Checkpoint::default(),
            parameters: ModelParameters::defaults(),
        }
    }

    #[test]
    fn test_handle_success_and_error() {
        let mut sim = Scripted { panic_on: None };
        assert!(matches!(
            handle(&mut sim, cycle_request(1)),
            WorkerResponse::Ok { reply: WorkerReply::Simulated { .. } }
        ));
        assert_eq!(
            handle(&mut sim, cycle_request(99)),
            WorkerResponse::Failed {
                message: "solver did not converge".to_string()
            }
        );
    }

    #[test]
    fn test_handle_catches_panic() {
        let mut sim = Scripted { panic_on: Some(4) };
        let response = handle(&mut sim, cycle_request(4));
        assert!(matches!(
            response,
            WorkerResponse::Failed { message } if message.contains("index out of bounds")
        ));
    }

    #[test]
    fn test_serve_round_trip() {
        let mut sim = Scripted { panic_on: None };
        let request = serde_json::to_vec(&WorkerRequest::Initialize {
            parameters: ModelParameters::defaults(),
        })
        .unwrap();
        let mut out = Vec::new();
        serve(&mut sim, request.as_slice(), &mut out).unwrap();

        let response = WorkerResponse::parse(&out).unwrap();
        assert_eq!(
            response,
            WorkerResponse::Ok {
                reply: WorkerReply::Initialized {
                    checkpoint: Checkpoint(json!({"cycle": -1}))
                }
            }
        );
    }

    #[test]
    fn test_serve_rejects_bad_request() {
        let mut sim = Scripted { panic_on: None };
        let mut out = Vec::new();
        serve(&mut sim, &b"{\"task\":\"explode\"}"[..], &mut out).unwrap();
        assert!(matches!(
            WorkerResponse::parse(&out).unwrap(),
            WorkerResponse::Failed { .. }
        ));
    }
}
