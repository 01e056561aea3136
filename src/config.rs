//! Run configuration and per-run file layout
//!
//! ```text
//! {inputs}/{dataset_id}/{battery_id}/
//!   ├── {configuration_id}_param.json            write-once parameter file
//!   ├── {configuration_id}_state.json            ledger snapshot
//!   ├── {configuration_id}_state.records.parquet ledger export
//!   └── {configuration_id}_info.log              log sink (when logging to file)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::executor::{Deadlines, ProcessExecutor};
use crate::ledger::StateLedger;
use crate::{Error, Result};

/// Worker program and its fixed arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerCommand {
    /// Program to spawn per task
    pub program: PathBuf,
    /// Arguments passed on every spawn
    #[serde(default)]
    pub args: Vec<String>,
}

impl WorkerCommand {
    /// Executor that spawns this command.
    #[must_use]
    pub fn executor(&self) -> ProcessExecutor {
        ProcessExecutor::new(&self.program).with_args(self.args.iter().cloned())
    }
}

/// Everything a run needs before it can start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Configuration identifier; prefixes every per-run file
    pub configuration_id: String,
    /// Identifier of the calling optimizer instance (logged only)
    pub instance_id: Option<String>,
    /// Dataset identifier
    pub dataset_id: String,
    /// Battery identifier; selects reference files
    pub battery_id: String,
    /// Root of the per-run folders
    pub inputs_root: Option<PathBuf>,
    /// Root of the reference Parquet files
    pub dataset_root: Option<PathBuf>,
    /// Worker to spawn per task
    pub worker: Option<WorkerCommand>,
    /// Deadline classes
    pub deadlines: Deadlines,
    /// Parameter file to compose over (defaults to the run's own parameter file)
    pub base_parameters: Option<PathBuf>,
    /// Write the composed parameters once, if no parameter file exists yet
    pub save_parameters: bool,
    /// Log to `{configuration_id}_info.log` instead of stderr
    pub log_to_file: bool,
    /// Debug-level logging
    pub verbose: bool,
}

impl RunConfig {
    /// Configuration with required identifiers and everything else unset.
    #[must_use]
    pub fn new(
        configuration_id: impl Into<String>,
        dataset_id: impl Into<String>,
        battery_id: impl Into<String>,
    ) -> Self {
        Self {
            configuration_id: configuration_id.into(),
            instance_id: None,
            dataset_id: dataset_id.into(),
            battery_id: battery_id.into(),
            inputs_root: None,
            dataset_root: None,
            worker: None,
            deadlines: Deadlines::default(),
            base_parameters: None,
            save_parameters: false,
            log_to_file: false,
            verbose: false,
        }
    }

    /// Check that every required setting is present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming every missing setting at once.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("configuration_id", &self.configuration_id),
            ("dataset_id", &self.dataset_id),
            ("battery_id", &self.battery_id),
        ] {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        if self.inputs_root.is_none() {
            missing.push("inputs_path");
        }
        if self.dataset_root.is_none() {
            missing.push("dataset_path");
        }
        if self.worker.is_none() {
            missing.push("worker");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "Required setting(s) not set: {}",
                missing.join(", ")
            )))
        }
    }

    /// Per-run file layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the inputs root is not set.
    pub fn paths(&self) -> Result<RunPaths> {
        let inputs = self
            .inputs_root
            .as_deref()
            .ok_or_else(|| Error::Config("Required setting(s) not set: inputs_path".to_string()))?;
        Ok(RunPaths::new(
            inputs,
            &self.dataset_id,
            &self.battery_id,
            &self.configuration_id,
        ))
    }
}

/// Paths of the files belonging to one run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    run_dir: PathBuf,
    configuration_id: String,
}

impl RunPaths {
    /// Layout under `{inputs}/{dataset_id}/{battery_id}/`.
    #[must_use]
    pub fn new(inputs: &Path, dataset_id: &str, battery_id: &str, configuration_id: &str) -> Self {
        Self {
            run_dir: inputs.join(dataset_id).join(battery_id),
            configuration_id: configuration_id.to_string(),
        }
    }

    /// Folder shared by all files of the run
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Create the run folder if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the folder cannot be created.
    pub fn ensure_run_dir(&self) -> Result<&Path> {
        fs::create_dir_all(&self.run_dir)?;
        Ok(&self.run_dir)
    }

    fn file(&self, suffix: &str) -> PathBuf {
        self.run_dir
            .join(format!("{}_{suffix}", self.configuration_id))
    }

    /// Write-once parameter file
    #[must_use]
    pub fn parameter_file(&self) -> PathBuf {
        self.file("param.json")
    }

    /// Ledger snapshot
    #[must_use]
    pub fn ledger_file(&self) -> PathBuf {
        self.file("state.json")
    }

    /// Tabular ledger export
    #[must_use]
    pub fn ledger_export_file(&self) -> PathBuf {
        StateLedger::export_path(&self.ledger_file())
    }

    /// Log file
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.file("info.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_lists_all_missing() {
        let config = RunConfig::new("cfg1", "", "B01");
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("dataset_id"));
        assert!(err.contains("inputs_path"));
        assert!(err.contains("dataset_path"));
        assert!(err.contains("worker"));
        assert!(!err.contains("battery_id"));
    }

    #[test]
    fn test_validate_complete() {
        let mut config = RunConfig::new("cfg1", "EV", "B01");
        config.inputs_root = Some("/in".into());
        config.dataset_root = Some("/data".into());
        config.worker = Some(WorkerCommand {
            program: "/usr/bin/worker".into(),
            args: vec![],
        });
        config.validate().unwrap();
    }

    #[test]
    fn test_run_paths_layout() {
        let paths = RunPaths::new(Path::new("/in"), "EV", "B01", "cfg1");
        assert_eq!(paths.run_dir(), Path::new("/in/EV/B01"));
        assert_eq!(paths.parameter_file(), PathBuf::from("/in/EV/B01/cfg1_param.json"));
        assert_eq!(paths.ledger_file(), PathBuf::from("/in/EV/B01/cfg1_state.json"));
        assert_eq!(
            paths.ledger_export_file(),
            PathBuf::from("/in/EV/B01/cfg1_state.records.parquet")
        );
        assert_eq!(paths.log_file(), PathBuf::from("/in/EV/B01/cfg1_info.log"));
    }

    #[test]
    fn test_ensure_run_dir_creates_folders() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RunPaths::new(dir.path(), "EV", "B01", "cfg1");
        assert!(paths.ensure_run_dir().unwrap().is_dir());
    }
}
