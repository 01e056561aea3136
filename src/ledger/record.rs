//! Cycle Record - immutable per-cycle result

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::CycleScores;

/// Scores and capacities of one completed cycle.
///
/// Created once when the cycle commits; there are no setters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleRecord {
    cycle_index: u32,
    non_degradation_score: Option<f64>,
    degradation_score: Option<f64>,
    capacity_score: Option<f64>,
    experimental_capacity: Option<f64>,
    real_capacity: Option<f64>,
    completed_at: DateTime<Utc>,
}

impl CycleRecord {
    /// Create a record with no scores, completed now.
    #[must_use]
    pub fn new(cycle_index: u32) -> Self {
        Self::builder(cycle_index).build()
    }

    /// Create a builder for constructing a record with scores.
    #[must_use]
    pub fn builder(cycle_index: u32) -> CycleRecordBuilder {
        CycleRecordBuilder::new(cycle_index)
    }

    /// Build a record from scored outcomes. Penalised composites are stored
    /// as the penalty value, absent ones as `None`.
    #[must_use]
    pub fn from_scores(cycle_index: u32, scores: &CycleScores) -> Self {
        let mut builder = Self::builder(cycle_index);
        builder.non_degradation_score = scores.non_degradation.penalized_value();
        builder.degradation_score = scores.degradation.penalized_value();
        builder.capacity_score = scores.capacity.penalized_value();
        builder.experimental_capacity = scores.experimental_capacity;
        builder.real_capacity = scores.real_capacity;
        builder.build()
    }

    /// Cycle index (position in the ledger)
    #[must_use]
    pub const fn cycle_index(&self) -> u32 {
        self.cycle_index
    }

    /// Non-degradation composite score
    #[must_use]
    pub const fn non_degradation_score(&self) -> Option<f64> {
        self.non_degradation_score
    }

    /// Degradation composite score
    #[must_use]
    pub const fn degradation_score(&self) -> Option<f64> {
        self.degradation_score
    }

    /// Capacity-test score
    #[must_use]
    pub const fn capacity_score(&self) -> Option<f64> {
        self.capacity_score
    }

    /// Reference capacity-test span
    #[must_use]
    pub const fn experimental_capacity(&self) -> Option<f64> {
        self.experimental_capacity
    }

    /// Simulated capacity-test span
    #[must_use]
    pub const fn real_capacity(&self) -> Option<f64> {
        self.real_capacity
    }

    /// Commit timestamp
    #[must_use]
    pub const fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Score published for the run's mode.
    #[must_use]
    pub const fn score_for(&self, degradation_mode: bool) -> Option<f64> {
        if degradation_mode {
            self.degradation_score
        } else {
            self.non_degradation_score
        }
    }
}

/// Builder for `CycleRecord`.
#[derive(Debug)]
pub struct CycleRecordBuilder {
    cycle_index: u32,
    non_degradation_score: Option<f64>,
    degradation_score: Option<f64>,
    capacity_score: Option<f64>,
    experimental_capacity: Option<f64>,
    real_capacity: Option<f64>,
    completed_at: Option<DateTime<Utc>>,
}

impl CycleRecordBuilder {
    /// Create a new builder for the given cycle.
    #[must_use]
    pub const fn new(cycle_index: u32) -> Self {
        Self {
            cycle_index,
            non_degradation_score: None,
            degradation_score: None,
            capacity_score: None,
            experimental_capacity: None,
            real_capacity: None,
            completed_at: None,
        }
    }

    /// Set the non-degradation composite score.
    #[must_use]
    pub fn non_degradation_score(mut self, score: f64) -> Self {
        self.non_degradation_score = Some(score);
        self
    }

    /// Set the degradation composite score.
    #[must_use]
    pub fn degradation_score(mut self, score: f64) -> Self {
        self.degradation_score = Some(score);
        self
    }

    /// Set the capacity-test score.
    #[must_use]
    pub fn capacity_score(mut self, score: f64) -> Self {
        self.capacity_score = Some(score);
        self
    }

    /// Set the reference capacity-test span.
    #[must_use]
    pub fn experimental_capacity(mut self, capacity: f64) -> Self {
        self.experimental_capacity = Some(capacity);
        self
    }

    /// Set the simulated capacity-test span.
    #[must_use]
    pub fn real_capacity(mut self, capacity: f64) -> Self {
        self.real_capacity = Some(capacity);
        self
    }

    /// Set the commit timestamp (defaults to now).
    #[must_use]
    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    /// Build the `CycleRecord`.
    #[must_use]
    pub fn build(self) -> CycleRecord {
        CycleRecord {
            cycle_index: self.cycle_index,
            non_degradation_score: self.non_degradation_score,
            degradation_score: self.degradation_score,
            capacity_score: self.capacity_score,
            experimental_capacity: self.experimental_capacity,
            real_capacity: self.real_capacity,
            completed_at: self.completed_at.unwrap_or_else(Utc::now),
        }
    }
}
