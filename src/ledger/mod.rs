//! Resumable State Ledger
//!
//! **Append-Only Design**:
//! - Records are index-addressed and must be appended at exactly `len()`
//! - Records are never mutated or removed once appended
//! - The current checkpoint is replaced together with each append
//!
//! Persistence writes a JSON snapshot (records + checkpoint + first
//! trajectory) and a Parquet export of the records next to it. Both files are
//! committed by write-to-temp, fsync, rename, so a crash never leaves a
//! half-written ledger in place of a valid one.
//!
//! Toyota Way Principles:
//! - Poka-Yoke: out-of-order appends are rejected, never corrected

mod export;
mod record;

pub use export::{records_schema, records_to_batch, records_to_parquet};
pub use record::{CycleRecord, CycleRecordBuilder};

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::executor::Checkpoint;
use crate::trajectory::Trajectory;
use crate::{Error, Result};

/// Ordered per-cycle results plus the solver checkpoint to resume from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateLedger {
    records: Vec<CycleRecord>,
    last_checkpoint: Checkpoint,
    #[serde(default)]
    first_trajectory: Option<Trajectory>,
}

impl StateLedger {
    /// Fresh ledger holding the initialization checkpoint.
    #[must_use]
    pub const fn new(checkpoint: Checkpoint) -> Self {
        Self {
            records: Vec::new(),
            last_checkpoint: checkpoint,
            first_trajectory: None,
        }
    }

    /// Number of completed cycles
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no cycle has completed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, in cycle order
    #[must_use]
    pub fn records(&self) -> &[CycleRecord] {
        &self.records
    }

    /// Checkpoint the next cycle starts from
    #[must_use]
    pub const fn last_checkpoint(&self) -> &Checkpoint {
        &self.last_checkpoint
    }

    /// Trajectory of cycle 0, once it has completed
    #[must_use]
    pub const fn first_trajectory(&self) -> Option<&Trajectory> {
        self.first_trajectory.as_ref()
    }

    /// Record at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LedgerRange`] if `index >= len()`.
    pub fn get(&self, index: usize) -> Result<&CycleRecord> {
        self.records.get(index).ok_or(Error::LedgerRange {
            index,
            len: self.records.len(),
        })
    }

    /// Append `record` at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LedgerOrder`] unless `index == len()` and the record's
    /// own cycle index matches.
    pub fn append_record(&mut self, index: usize, record: CycleRecord) -> Result<()> {
        let expected = self.records.len();
        if index != expected || record.cycle_index() as usize != index {
            return Err(Error::LedgerOrder {
                expected,
                got: if index == expected {
                    record.cycle_index() as usize
                } else {
                    index
                },
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// Append a completed cycle and move the checkpoint forward.
    ///
    /// The trajectory is kept only for cycle 0.
    ///
    /// # Errors
    ///
    /// Same as [`Self::append_record`]; on error nothing changes.
    pub fn commit_cycle(
        &mut self,
        index: usize,
        record: CycleRecord,
        checkpoint: Checkpoint,
        trajectory: Trajectory,
    ) -> Result<()> {
        self.append_record(index, record)?;
        self.last_checkpoint = checkpoint;
        if index == 0 {
            self.first_trajectory = Some(trajectory);
        }
        Ok(())
    }

    /// Path of the tabular export that accompanies a ledger file.
    #[must_use]
    pub fn export_path(path: &Path) -> PathBuf {
        path.with_extension("records.parquet")
    }

    /// Write the snapshot to `path` and the record export beside it.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or any file operation fails. A previously
    /// persisted ledger stays intact in that case.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let snapshot = serde_json::to_vec(self)?;
        atomic_write(path, &snapshot)?;

        let export = records_to_parquet(&self.records)?;
        atomic_write(&Self::export_path(path), &export)?;

        info!(path = %path.display(), cycles = self.records.len(), "Ledger persisted");
        Ok(())
    }

    /// Read a persisted ledger. `Ok(None)` when no file exists (first run).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded, or if its
    /// records are not numbered `0..len`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No ledger found, starting fresh");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let ledger: Self = serde_json::from_slice(&bytes).map_err(|e| {
            Error::StorageError(format!("Corrupt ledger {}: {e}", path.display()))
        })?;

        if let Some((position, record)) = ledger
            .records
            .iter()
            .enumerate()
            .find(|(i, r)| r.cycle_index() as usize != *i)
        {
            return Err(Error::StorageError(format!(
                "Corrupt ledger {}: record at position {position} has cycle index {}",
                path.display(),
                record.cycle_index()
            )));
        }

        info!(path = %path.display(), cycles = ledger.len(), "Ledger loaded");
        Ok(Some(ledger))
    }
}

/// Replace `path` with `data` via a temp file in the same directory.
fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::StorageError(format!("Not a file path: {}", path.display())))?;
    let temp_path = parent.join(format!(
        ".tmp_{}_{}",
        std::process::id(),
        file_name.to_string_lossy()
    ));

    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&temp_path, path).map_err(|e| {
        Error::StorageError(format!(
            "Failed to rename {} to {}: {e}",
            temp_path.display(),
            path.display()
        ))
    })?;
    debug!(path = %path.display(), bytes = data.len(), "Atomic write committed");
    Ok(())
}
