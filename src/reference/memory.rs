//! In-memory reference store

use std::collections::HashMap;

use super::ReferenceSource;
use crate::trajectory::Trajectory;
use crate::Result;

/// Reference trajectories held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryReferenceStore {
    cycles: HashMap<u32, Trajectory>,
    capacity_tests: HashMap<u32, Trajectory>,
}

impl MemoryReferenceStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the measurement for `cycle`.
    #[must_use]
    pub fn with_cycle(mut self, cycle: u32, trajectory: Trajectory) -> Self {
        self.cycles.insert(cycle, trajectory);
        self
    }

    /// Add (or replace) the capacity-test measurement for `cycle`.
    #[must_use]
    pub fn with_capacity_test(mut self, cycle: u32, trajectory: Trajectory) -> Self {
        self.capacity_tests.insert(cycle, trajectory);
        self
    }
}

impl ReferenceSource for MemoryReferenceStore {
    fn load_reference(&self, cycle: u32) -> Result<Option<Trajectory>> {
        Ok(self.cycles.get(&cycle).cloned())
    }

    fn load_capacity_test(&self, cycle: u32) -> Result<Option<Trajectory>> {
        Ok(self.capacity_tests.get(&cycle).cloned())
    }
}
