//! Parquet reference store
//!
//! One file per measurement under the dataset root:
//! `{root}/{battery}_Cycle{NNNN}.parquet` and
//! `{root}/CapTest_{battery}_Cycle{NNNN}.parquet`.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use arrow::compute::concat_batches;
use ::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::debug;

use super::{capacity_test_key, cycle_key, ReferenceSource};
use crate::trajectory::Trajectory;
use crate::{Error, Result};

/// Reference measurements stored as Parquet files.
#[derive(Debug, Clone)]
pub struct ParquetReferenceStore {
    root: PathBuf,
    battery_id: String,
}

impl ParquetReferenceStore {
    /// Store for `battery_id` rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, battery_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            battery_id: battery_id.into(),
        }
    }

    /// Dataset root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the measurement with the given key.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.parquet"))
    }

    /// Load a trajectory file; `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Option<Trajectory>> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Reference file not found");
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::StorageError(format!(
                    "Failed to open Parquet file {}: {e}",
                    path.display()
                )))
            }
        };

        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
            Error::StorageError(format!("Failed to parse Parquet file {}: {e}", path.display()))
        })?;
        let schema = builder.schema().clone();
        let reader = builder.build().map_err(|e| {
            Error::StorageError(format!("Failed to create Parquet reader: {e}"))
        })?;

        let mut batches = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| {
                Error::StorageError(format!("Failed to read record batch: {e}"))
            })?;
            batches.push(batch);
        }

        let batch = concat_batches(&schema, &batches)?;
        let trajectory = Trajectory::from_record_batch(&batch)?;
        debug!(path = %path.display(), rows = trajectory.len(), "Reference loaded");
        Ok(Some(trajectory))
    }
}

impl ReferenceSource for ParquetReferenceStore {
    fn load_reference(&self, cycle: u32) -> Result<Option<Trajectory>> {
        Self::load_file(self.path_for(&cycle_key(&self.battery_id, cycle)))
    }

    fn load_capacity_test(&self, cycle: u32) -> Result<Option<Trajectory>> {
        Self::load_file(self.path_for(&capacity_test_key(&self.battery_id, cycle)))
    }
}
