//! cyclefit command line
//!
//! Prints exactly one line on stdout: the score of the requested cycle, or
//! `Inf` when no usable result exists. Always exits with status 0; every
//! diagnostic goes to the log sink.
//!
//! # Usage
//!
//! ```bash
//! CYCLEFIT_INPUTS_PATH=/runs CYCLEFIT_DATASET_PATH=/data/ev CYCLEFIT_WORKER=/opt/sim/worker \
//!   cyclefit --configuration-id cfg1 --dataset-id EV --battery-id B01 --cycle 3 \
//!   --param "Electrode height [m]=0.07" --save-params --log-to-file
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use cyclefit::config::{RunConfig, WorkerCommand};
use cyclefit::executor::Deadlines;
use cyclefit::logging::init_logging;
use cyclefit::orchestrator::{CycleOrchestrator, RunResult, SENTINEL};
use cyclefit::params::ModelParameters;
use cyclefit::reference::ParquetReferenceStore;

/// Resumable battery degradation cycle runner
#[derive(Parser, Debug)]
#[command(name = "cyclefit", version)]
#[command(about = "Simulate battery cycles up to N and print the fitness score of cycle N")]
struct Cli {
    /// Cycle whose score is reported (missing cycles up to it are simulated)
    #[arg(short = 'n', long)]
    cycle: Option<u32>,

    /// Configuration identifier; prefixes every per-run file
    #[arg(long)]
    configuration_id: String,

    /// Identifier of the calling optimizer instance
    #[arg(long)]
    instance_id: Option<String>,

    /// Dataset identifier
    #[arg(long)]
    dataset_id: String,

    /// Battery identifier
    #[arg(long)]
    battery_id: String,

    /// Root folder for per-run files
    #[arg(long, env = "CYCLEFIT_INPUTS_PATH")]
    inputs_path: Option<PathBuf>,

    /// Folder holding reference Parquet files
    #[arg(long, env = "CYCLEFIT_DATASET_PATH")]
    dataset_path: Option<PathBuf>,

    /// Worker program spawned for every simulation task
    #[arg(long, env = "CYCLEFIT_WORKER")]
    worker: Option<PathBuf>,

    /// Extra argument passed to the worker (repeatable)
    #[arg(long = "worker-arg", allow_hyphen_values = true)]
    worker_args: Vec<String>,

    /// Parameter file to compose over (default: the run's own parameter file)
    #[arg(long)]
    base_params: Option<PathBuf>,

    /// Parameter override, by field name or unit-annotated key (repeatable)
    #[arg(long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// Deadline per task without degradation parameters, in seconds
    #[arg(long, default_value_t = 3600)]
    standard_timeout_secs: u64,

    /// Deadline per task with degradation parameters, in seconds
    #[arg(long, default_value_t = 18_000)]
    degradation_timeout_secs: u64,

    /// Save the composed parameters if no parameter file exists yet
    #[arg(long)]
    save_params: bool,

    /// Log to {configuration_id}_info.log in the run folder instead of stderr
    #[arg(long)]
    log_to_file: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn to_config(&self) -> RunConfig {
        let mut config = RunConfig::new(&self.configuration_id, &self.dataset_id, &self.battery_id);
        config.instance_id = self.instance_id.clone();
        config.inputs_root = self.inputs_path.clone();
        config.dataset_root = self.dataset_path.clone();
        config.worker = self.worker.clone().map(|program| WorkerCommand {
            program,
            args: self.worker_args.clone(),
        });
        config.deadlines = Deadlines {
            standard: Duration::from_secs(self.standard_timeout_secs),
            degradation: Duration::from_secs(self.degradation_timeout_secs),
        };
        config.base_parameters = self.base_params.clone();
        config.save_parameters = self.save_params;
        config.log_to_file = self.log_to_file;
        config.verbose = self.verbose;
        config
    }
}

async fn run(cli: &Cli) -> anyhow::Result<RunResult> {
    let config = cli.to_config();

    let log_file = match (config.log_to_file, config.paths()) {
        (true, Ok(paths)) => {
            paths.ensure_run_dir()?;
            Some(paths.log_file())
        }
        _ => None,
    };
    init_logging(log_file.as_deref(), config.verbose)?;

    info!(
        configuration_id = %config.configuration_id,
        instance_id = config.instance_id.as_deref().unwrap_or("-"),
        dataset_id = %config.dataset_id,
        battery_id = %config.battery_id,
        cycle = ?cli.cycle,
        "START run"
    );

    let Some(cycle) = cli.cycle else {
        info!("No cycle requested");
        return Ok(RunResult::Unavailable("no cycle requested".to_string()));
    };

    config.validate()?;
    let paths = config.paths()?;
    paths.ensure_run_dir()?;

    let assignments = cli
        .params
        .iter()
        .map(|text| ModelParameters::parse_assignment(text))
        .collect::<cyclefit::Result<Vec<_>>>()?;
    let overrides = ModelParameters::from_assignments(assignments)?;

    let saved_path = config
        .base_parameters
        .clone()
        .unwrap_or_else(|| paths.parameter_file());
    let saved = ModelParameters::load(&saved_path)
        .with_context(|| format!("Failed to read parameter file {}", saved_path.display()))?;
    let parameters = ModelParameters::compose(saved.as_ref(), Some(&overrides))?;
    if config.save_parameters {
        parameters.save_once_if_absent(paths.parameter_file())?;
    }

    let worker = config.worker.as_ref().context("worker not configured")?;
    let dataset_root = config
        .dataset_root
        .clone()
        .context("dataset path not configured")?;

    let orchestrator = CycleOrchestrator::new(
        worker.executor(),
        ParquetReferenceStore::new(dataset_root, &config.battery_id),
        parameters,
        paths.ledger_file(),
    )
    .with_deadlines(config.deadlines);

    Ok(orchestrator.run(cycle).await?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // --help / --version; logging is not set up yet
            if let Err(err) = e.print() {
                eprintln!("Failed to print usage: {err}");
            }
            return;
        }
        Err(e) => {
            eprintln!("{e}");
            println!("{SENTINEL}");
            return;
        }
    };

    let result = match run(&cli).await {
        Ok(result) => result,
        Err(e) => {
            error!("Run failed: {e:#}");
            RunResult::Unavailable(e.to_string())
        }
    };
    if let RunResult::Unavailable(reason) = &result {
        info!(%reason, "No usable result");
    }
    info!(%result, "Run finished");
    println!("{result}");
}
