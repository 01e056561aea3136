//! Metric-Fitting Pipeline
//!
//! Resamples a simulated cycle and its reference measurement onto common grids
//! and reduces them to scalar fitness scores (lower is better).
//!
//! ```text
//! non-degradation composite = mean(discharge capacity, RMSE,     linear trend)
//! degradation composite     = mean(discharge capacity, integral, linear trend)
//! ```
//!
//! Numeric routines never raise: each returns a [`MetricOutcome`] and
//! callers branch on it.
//!
//! Toyota Way Principles:
//! - Jidoka: a missing sub-metric stops the composite at the penalty value
//!   instead of averaging over whatever happens to be left

mod compare;
mod fit;
mod interp;

pub use compare::{
    auc_deviation, capacity_deviation, discharge_capacity_deviation, discharge_span,
    integral_metric, linear_trend_metric, normalized_rmse, rmse_metric, Signal,
    CAPACITY_GRID_POINTS, INTEGRAL_STEPS, RMSE_STEPS, R_SQUARED_THRESHOLD, SLOPE_SCALE,
    TIME_GRID_POINTS,
};
pub use fit::{fit_linear_trend, FitError, FitResult};
pub use interp::{linspace, trapezoid, Interpolator};

use crate::trajectory::Trajectory;

/// Value reported for a penalised metric or composite.
pub const MAX_PENALTY: f64 = 10.0;

/// Result of one metric computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricOutcome {
    /// Computed value
    Value(f64),
    /// Comparison was possible but unreliable; scores as [`MAX_PENALTY`]
    MaxPenalty,
    /// Nothing to compare against (no reference, empty overlap, degenerate range)
    Absent,
}

impl MetricOutcome {
    /// Wrap a computed number; non-finite results are `Absent`.
    #[must_use]
    pub fn from_value(value: f64) -> Self {
        if value.is_finite() {
            Self::Value(value)
        } else {
            Self::Absent
        }
    }

    /// The computed value, `None` unless this is [`MetricOutcome::Value`].
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::MaxPenalty | Self::Absent => None,
        }
    }

    /// Published number: the value, or [`MAX_PENALTY`]; `None` when absent.
    #[must_use]
    pub const fn penalized_value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::MaxPenalty => Some(MAX_PENALTY),
            Self::Absent => None,
        }
    }

    /// True for [`MetricOutcome::Absent`]
    #[must_use]
    pub const fn is_absent(self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Unweighted mean of sub-metrics. Any absent part penalises the whole
/// composite; penalised parts count as [`MAX_PENALTY`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn composite(parts: &[MetricOutcome]) -> MetricOutcome {
    if parts.is_empty() || parts.iter().any(|p| p.is_absent()) {
        return MetricOutcome::MaxPenalty;
    }
    let sum: f64 = parts.iter().filter_map(|p| p.penalized_value()).sum();
    MetricOutcome::from_value(sum / parts.len() as f64)
}

/// Which comparison [`score`] runs on a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMetric {
    /// Normalized RMSE of one signal
    Rmse(Signal),
    /// Area-under-curve deviation of `|current|`
    AreaUnderCurve,
}

/// Score one step of `simulated` against `reference`.
///
/// `Absent` when there is no reference for this cycle.
#[must_use]
pub fn score(
    simulated: &Trajectory,
    reference: Option<&Trajectory>,
    step: i64,
    metric: StepMetric,
) -> MetricOutcome {
    let Some(reference) = reference else {
        return MetricOutcome::Absent;
    };
    match metric {
        StepMetric::Rmse(signal) => normalized_rmse(simulated, reference, step, signal),
        StepMetric::AreaUnderCurve => auc_deviation(simulated, reference, step),
    }
}

/// Every score recorded for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleScores {
    /// Non-degradation composite
    pub non_degradation: MetricOutcome,
    /// Degradation composite
    pub degradation: MetricOutcome,
    /// Capacity-test voltage RMSE
    pub capacity: MetricOutcome,
    /// Reference capacity-test discharge span
    pub experimental_capacity: Option<f64>,
    /// Simulated capacity-test discharge span
    pub real_capacity: Option<f64>,
}

/// Score a simulated cycle (and its optional capacity test) against the
/// reference data available for that cycle.
#[must_use]
pub fn score_cycle(
    simulated: &Trajectory,
    reference: Option<&Trajectory>,
    capacity_test: Option<&Trajectory>,
    capacity_reference: Option<&Trajectory>,
) -> CycleScores {
    let (non_degradation, degradation) = reference.map_or(
        (MetricOutcome::MaxPenalty, MetricOutcome::MaxPenalty),
        |reference| {
            let discharge = discharge_capacity_deviation(simulated, reference);
            let linear = linear_trend_metric(simulated, reference);
            let rmse = rmse_metric(simulated, reference);
            let integral = integral_metric(simulated, reference);
            tracing::info!(
                discharge = ?discharge,
                rmse = ?rmse,
                integral = ?integral,
                linear = ?linear,
                "Cycle sub-metrics"
            );
            (
                composite(&[discharge, rmse, linear]),
                composite(&[discharge, integral, linear]),
            )
        },
    );

    let (capacity, experimental_capacity) = match (capacity_test, capacity_reference) {
        (Some(sim), Some(exp)) => capacity_deviation(sim, exp),
        _ => (MetricOutcome::Absent, None),
    };

    CycleScores {
        non_degradation,
        degradation,
        capacity,
        experimental_capacity,
        real_capacity: capacity_test.and_then(discharge_span),
    }
}
