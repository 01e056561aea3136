//! Simulated-versus-reference comparisons.
//!
//! Every comparison returns a [`MetricOutcome`]: degenerate input (no overlap,
//! empty step, zero reference magnitude) is `Absent`, an unreliable fit is
//! `MaxPenalty`.

use super::fit::fit_linear_trend;
use super::interp::{bounds, linspace, overlap, trapezoid, Interpolator};
use super::MetricOutcome;
use crate::trajectory::{Trajectory, DISCHARGE_STEP, DRIVE_CYCLE_STEP};

/// Grid size for time-domain resampling.
pub const TIME_GRID_POINTS: usize = 100;

/// Grid size for capacity-domain resampling.
pub const CAPACITY_GRID_POINTS: usize = 1000;

/// Minimum R² for a linear-trend fit to be trusted.
pub const R_SQUARED_THRESHOLD: f64 = 0.6;

/// Slope difference that maps to a metric value of 1.
pub const SLOPE_SCALE: f64 = 0.1;

/// `(step, signal)` pairs averaged by the RMSE metric.
pub const RMSE_STEPS: [(i64, Signal); 4] = [
    (1, Signal::Current),
    (2, Signal::Voltage),
    (3, Signal::Current),
    (4, Signal::Voltage),
];

/// `(step, weight)` pairs of the integral metric.
pub const INTEGRAL_STEPS: [(i64, f64); 4] = [(1, 2.0), (2, 0.5), (3, 2.0), (4, 0.5)];

/// Divisor of the weighted integral sum.
const INTEGRAL_NORMALIZER: f64 = 5.0;

/// Column compared by a resampled RMSE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Current [A]
    Current,
    /// Terminal voltage [V]
    Voltage,
}

impl Signal {
    fn column(self, t: &Trajectory) -> &[f64] {
        match self {
            Self::Current => t.current(),
            Self::Voltage => t.voltage(),
        }
    }
}

/// Normalized RMSE of one signal on one step.
///
/// Both curves are rebased to start at zero, resampled on a uniform grid over
/// their overlapping time interval, and compared by absolute value. The RMSE
/// is divided by the absolute mean of the resampled reference.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn normalized_rmse(
    simulated: &Trajectory,
    reference: &Trajectory,
    step: i64,
    signal: Signal,
) -> MetricOutcome {
    let sim = simulated.filter_step(step).rebased();
    let exp = reference.filter_step(step).rebased();

    let Some((lo, hi)) = overlap(sim.relative_time(), exp.relative_time()) else {
        return MetricOutcome::Absent;
    };
    let (Some(f_sim), Some(f_exp)) = (
        Interpolator::new(sim.relative_time(), signal.column(&sim)),
        Interpolator::new(exp.relative_time(), signal.column(&exp)),
    ) else {
        return MetricOutcome::Absent;
    };

    let grid = linspace(lo, hi, TIME_GRID_POINTS);
    let y_sim = f_sim.sample(&grid);
    let y_exp = f_exp.sample(&grid);

    let scale = (y_exp.iter().sum::<f64>() / y_exp.len() as f64).abs();
    MetricOutcome::from_value(abs_rmse(&y_sim, &y_exp) / scale)
}

/// Mean normalized RMSE over [`RMSE_STEPS`]; `Absent` if any step is.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rmse_metric(simulated: &Trajectory, reference: &Trajectory) -> MetricOutcome {
    mean_of(
        RMSE_STEPS
            .iter()
            .map(|&(step, signal)| (normalized_rmse(simulated, reference, step, signal), 1.0)),
        RMSE_STEPS.len() as f64,
    )
}

/// Area-under-curve deviation of `|current|` on one step:
/// `2·|AUC_sim − AUC_ref| / AUC_ref`.
#[must_use]
pub fn auc_deviation(simulated: &Trajectory, reference: &Trajectory, step: i64) -> MetricOutcome {
    let area = |t: &Trajectory| {
        let t = t.filter_step(step).rebased();
        let magnitude: Vec<f64> = t.current().iter().map(|c| c.abs()).collect();
        trapezoid(t.relative_time(), &magnitude).abs()
    };
    let auc_ref = area(reference);
    let auc_sim = area(simulated);
    if auc_ref <= 0.0 {
        return MetricOutcome::Absent;
    }
    MetricOutcome::from_value(2.0 * (auc_sim - auc_ref).abs() / auc_ref)
}

/// Weighted AUC deviation over [`INTEGRAL_STEPS`]; `Absent` if any step is.
#[must_use]
pub fn integral_metric(simulated: &Trajectory, reference: &Trajectory) -> MetricOutcome {
    mean_of(
        INTEGRAL_STEPS
            .iter()
            .map(|&(step, weight)| (auc_deviation(simulated, reference, step), weight)),
        INTEGRAL_NORMALIZER,
    )
}

/// Linear-trend comparison on the drive-cycle step.
///
/// `MaxPenalty` when either fit fails or its R² is below
/// [`R_SQUARED_THRESHOLD`]; otherwise `|slope_sim − slope_ref| / 0.1`.
#[must_use]
pub fn linear_trend_metric(simulated: &Trajectory, reference: &Trajectory) -> MetricOutcome {
    let fit = |t: &Trajectory| {
        let t = t.filter_step(DRIVE_CYCLE_STEP).rebased();
        fit_linear_trend(t.relative_time(), t.current(), t.voltage())
    };
    match (fit(simulated), fit(reference)) {
        (Ok(sim), Ok(exp))
            if sim.r_squared >= R_SQUARED_THRESHOLD && exp.r_squared >= R_SQUARED_THRESHOLD =>
        {
            MetricOutcome::from_value((sim.slope() - exp.slope()).abs() / SLOPE_SCALE)
        }
        (Ok(sim), Ok(exp)) => {
            tracing::debug!(
                r_squared_sim = sim.r_squared,
                r_squared_ref = exp.r_squared,
                "Linear trend fit below acceptance threshold"
            );
            MetricOutcome::MaxPenalty
        }
        (sim, exp) => {
            if let Err(e) = sim.as_ref().and(exp.as_ref()) {
                tracing::debug!(error = %e, "Linear trend fit failed");
            }
            MetricOutcome::MaxPenalty
        }
    }
}

/// Charge throughput from the start of the discharge step to the end of the
/// drive cycle: `max(dc | step 5) − min(dc | step 4)`.
fn throughput(t: &Trajectory) -> Option<f64> {
    let (start, _) = bounds(t.filter_step(DISCHARGE_STEP).discharge_capacity())?;
    let (_, end) = bounds(t.filter_step(DRIVE_CYCLE_STEP).discharge_capacity())?;
    Some(end - start)
}

/// `|Δcap_sim − Δcap_ref|` of the discharge-to-drive-cycle throughput.
#[must_use]
pub fn discharge_capacity_deviation(
    simulated: &Trajectory,
    reference: &Trajectory,
) -> MetricOutcome {
    match (throughput(simulated), throughput(reference)) {
        (Some(sim), Some(exp)) => {
            tracing::debug!(capacity_sim = sim, capacity_ref = exp, "Discharge throughput");
            MetricOutcome::from_value((sim - exp).abs())
        }
        _ => MetricOutcome::Absent,
    }
}

/// Span of discharge capacity on the discharge step.
#[must_use]
pub fn discharge_span(t: &Trajectory) -> Option<f64> {
    bounds(t.filter_step(DISCHARGE_STEP).discharge_capacity()).map(|(lo, hi)| hi - lo)
}

/// Capacity-test comparison.
///
/// Both curves are restricted to the discharge step with capacity measured
/// from the step start; voltage is resampled over the overlapping capacity
/// range. Returns the absolute-voltage RMSE together with the reference
/// capacity span (reported, not scored).
#[must_use]
pub fn capacity_deviation(
    simulated: &Trajectory,
    reference: &Trajectory,
) -> (MetricOutcome, Option<f64>) {
    let reference_span = discharge_span(reference);

    let capacity_axis = |t: &Trajectory| {
        let t = t.filter_step(DISCHARGE_STEP);
        let start = bounds(t.discharge_capacity()).map_or(0.0, |(lo, _)| lo);
        let axis: Vec<f64> = t.discharge_capacity().iter().map(|c| c - start).collect();
        (axis, t.voltage().to_vec())
    };
    let (cap_sim, v_sim) = capacity_axis(simulated);
    let (cap_exp, v_exp) = capacity_axis(reference);

    let Some((lo, hi)) = overlap(&cap_sim, &cap_exp) else {
        return (MetricOutcome::Absent, reference_span);
    };
    let (Some(f_sim), Some(f_exp)) = (
        Interpolator::new(&cap_sim, &v_sim),
        Interpolator::new(&cap_exp, &v_exp),
    ) else {
        return (MetricOutcome::Absent, reference_span);
    };

    let grid = linspace(lo, hi, CAPACITY_GRID_POINTS);
    let rmse = abs_rmse(&f_sim.sample(&grid), &f_exp.sample(&grid));
    (MetricOutcome::from_value(rmse), reference_span)
}

#[allow(clippy::cast_precision_loss)]
fn abs_rmse(a: &[f64], b: &[f64]) -> f64 {
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x.abs() - y.abs()).powi(2))
        .sum();
    (sum / a.len() as f64).sqrt()
}

/// Weighted sum over `divisor`. `Absent` if any part is absent; penalised
/// parts contribute the penalty value.
fn mean_of<I: Iterator<Item = (MetricOutcome, f64)>>(parts: I, divisor: f64) -> MetricOutcome {
    let mut total = 0.0;
    for (outcome, weight) in parts {
        match outcome.penalized_value() {
            Some(v) => total += v * weight,
            None => return MetricOutcome::Absent,
        }
    }
    MetricOutcome::from_value(total / divisor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::Sample;

    /// Synthetic five-step cycle: charge, hold, charge, discharge, drive cycle.
    fn cycle(time_scale: f64, current_scale: f64) -> Trajectory {
        let mut samples = Vec::new();
        let mut t = 0.0;
        let mut dc = 0.0;
        for step in 1..=5_i64 {
            for i in 0..60 {
                let x = f64::from(i);
                let current = match step {
                    1 | 3 => -2.0 * current_scale,
                    2 => -2.0 * current_scale * (-x / 20.0).exp(),
                    4 => 1.0 * current_scale,
                    _ => current_scale * (1.0 + (x * 0.7).sin()),
                };
                let voltage = match step {
                    1 | 3 => 3.6 + x * 0.005,
                    2 => 4.0,
                    4 => 4.0 - x * 0.01,
                    _ => 3.8 - 0.001 * x - 0.05 * current,
                };
                if current > 0.0 {
                    dc += current * time_scale / 3600.0;
                }
                samples.push(Sample {
                    relative_time: t,
                    current,
                    voltage: voltage + if step == 2 { x * 1e-4 } else { 0.0 },
                    discharge_capacity: dc,
                    step,
                });
                t += time_scale;
            }
        }
        Trajectory::from_samples(samples)
    }

    #[test]
    fn test_identical_trajectories_score_zero() {
        let t = cycle(1.0, 1.0);
        for (step, signal) in RMSE_STEPS {
            let outcome = normalized_rmse(&t, &t, step, signal);
            assert!(outcome.value().unwrap().abs() < 1e-12, "step {step}");
        }
        assert!(rmse_metric(&t, &t).value().unwrap().abs() < 1e-12);
        assert!(integral_metric(&t, &t).value().unwrap().abs() < 1e-12);
        assert!(discharge_capacity_deviation(&t, &t).value().unwrap().abs() < 1e-12);
        assert!(linear_trend_metric(&t, &t).value().unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_rmse_absent_without_overlap() {
        let t = cycle(1.0, 1.0);
        assert_eq!(normalized_rmse(&t, &t, 9, Signal::Voltage), MetricOutcome::Absent);
        assert_eq!(rmse_metric(&t, &Trajectory::default()), MetricOutcome::Absent);
    }

    #[test]
    fn test_auc_deviation_scaled_current() {
        let sim = cycle(1.0, 1.5);
        let exp = cycle(1.0, 1.0);
        let outcome = auc_deviation(&sim, &exp, 1);
        assert!((outcome.value().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_auc_deviation_zero_reference_is_absent() {
        let sim = cycle(1.0, 1.0);
        let exp = cycle(1.0, 0.0);
        assert_eq!(auc_deviation(&sim, &exp, 1), MetricOutcome::Absent);
    }

    #[test]
    fn test_linear_trend_penalised_on_noise() {
        let exp = cycle(1.0, 1.0);
        let mut noisy = Vec::new();
        for i in 0..60 {
            noisy.push(Sample {
                relative_time: f64::from(i),
                current: f64::from(i % 3),
                voltage: if i % 2 == 0 { 4.0 } else { 3.0 },
                discharge_capacity: 0.0,
                step: DRIVE_CYCLE_STEP,
            });
        }
        let sim = Trajectory::from_samples(noisy);
        assert_eq!(linear_trend_metric(&sim, &exp), MetricOutcome::MaxPenalty);
        assert_eq!(
            linear_trend_metric(&Trajectory::default(), &exp),
            MetricOutcome::MaxPenalty
        );
    }

    #[test]
    fn test_linear_trend_constant_current_scores_slope() {
        let drive = |slope: f64| {
            Trajectory::from_samples((0..60).map(|i| Sample {
                relative_time: f64::from(i),
                current: 1.0,
                voltage: 3.9 + slope * f64::from(i),
                discharge_capacity: 0.0,
                step: DRIVE_CYCLE_STEP,
            }))
        };
        let exp = drive(-0.002);
        assert_eq!(linear_trend_metric(&exp, &exp), MetricOutcome::Value(0.0));

        let value = linear_trend_metric(&drive(-0.012), &exp).value().unwrap();
        assert!((value - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_discharge_capacity_deviation_absent_without_steps() {
        let t = cycle(1.0, 1.0);
        let partial = t.filter_step(DISCHARGE_STEP);
        assert_eq!(discharge_capacity_deviation(&t, &partial), MetricOutcome::Absent);
    }

    #[test]
    fn test_capacity_deviation_reports_reference_span() {
        let t = cycle(1.0, 1.0);
        let (rmse, span) = capacity_deviation(&t, &t);
        assert!(rmse.value().unwrap().abs() < 1e-12);
        let expected = discharge_span(&t).unwrap();
        assert!((span.unwrap() - expected).abs() < 1e-12);
        assert!(expected > 0.0);
    }
}
