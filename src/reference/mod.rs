//! Reference-data collaborator
//!
//! Measured trajectories keyed by cycle index for one battery. Missing data is
//! `Ok(None)`, not an error: scoring degrades to the penalty value instead.

mod memory;
mod parquet;

pub use memory::MemoryReferenceStore;
pub use parquet::ParquetReferenceStore;

use crate::trajectory::Trajectory;
use crate::Result;

/// Source of measured trajectories.
pub trait ReferenceSource: Send + Sync {
    /// Main-protocol measurement for `cycle`.
    ///
    /// # Errors
    ///
    /// Returns an error only if data exists but cannot be read.
    fn load_reference(&self, cycle: u32) -> Result<Option<Trajectory>>;

    /// Capacity-test measurement for `cycle`.
    ///
    /// # Errors
    ///
    /// Returns an error only if data exists but cannot be read.
    fn load_capacity_test(&self, cycle: u32) -> Result<Option<Trajectory>>;
}

/// Key of a main-protocol measurement, e.g. `B01_Cycle0003`.
#[must_use]
pub fn cycle_key(battery_id: &str, cycle: u32) -> String {
    format!("{battery_id}_Cycle{cycle:04}")
}

/// Key of a capacity-test measurement, e.g. `CapTest_B01_Cycle0003`.
#[must_use]
pub fn capacity_test_key(battery_id: &str, cycle: u32) -> String {
    format!("CapTest_{}", cycle_key(battery_id, cycle))
}
