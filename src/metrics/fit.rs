//! Linear-trend fit of the drive-cycle voltage response.
//!
//! Model: `V = a·t + b + k·I`, solved by ordinary least squares through the
//! 3×3 normal equations. A constant current makes `I` collinear with the
//! intercept; the fit then drops the current term (`k = 0`) and solves
//! `V = a·t + b`. Failures are typed, never panics.

use std::collections::BTreeMap;

/// Minimum samples for a three-coefficient fit.
const MIN_SAMPLES: usize = 3;

/// Pivot magnitude below which the normal matrix is treated as singular.
const PIVOT_EPSILON: f64 = 1e-12;

/// Outcome of a successful fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Coefficient of determination
    pub r_squared: f64,
    /// Named coefficients: `a` (slope), `b` (intercept), `k` (current gain)
    pub coefficients: BTreeMap<String, f64>,
}

impl FitResult {
    /// Voltage slope over time (`a`).
    #[must_use]
    pub fn slope(&self) -> f64 {
        self.coefficients.get("a").copied().unwrap_or(f64::NAN)
    }
}

/// Why a fit could not be produced.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitError {
    /// Fewer usable samples than coefficients
    #[error("too few samples for a linear-trend fit")]
    TooFewSamples,
    /// Normal equations have no unique solution (constant time, non-finite input)
    #[error("normal equations are singular")]
    Singular,
    /// Voltage is constant, so R² is undefined
    #[error("voltage has zero variance")]
    ZeroVariance,
}

/// Fit `voltage = a·time + b + k·current`.
///
/// # Errors
///
/// Returns a [`FitError`] for short, degenerate or non-finite input.
#[allow(clippy::many_single_char_names, clippy::cast_precision_loss)]
pub fn fit_linear_trend(
    time: &[f64],
    current: &[f64],
    voltage: &[f64],
) -> Result<FitResult, FitError> {
    let n = time.len();
    if n < MIN_SAMPLES || current.len() != n || voltage.len() != n {
        return Err(FitError::TooFewSamples);
    }
    if time.iter().chain(current).chain(voltage).any(|v| !v.is_finite()) {
        return Err(FitError::Singular);
    }

    let [a, b, k] = if is_constant(current) {
        let [a, b] = fit_time_only(time, voltage).ok_or(FitError::Singular)?;
        [a, b, 0.0]
    } else {
        // Accumulate XᵀX and Xᵀy with rows x = [t, 1, I].
        let mut xtx = [[0.0_f64; 3]; 3];
        let mut xty = [0.0_f64; 3];
        for ((&t, &i), &v) in time.iter().zip(current).zip(voltage) {
            let row = [t, 1.0, i];
            for r in 0..3 {
                for c in 0..3 {
                    xtx[r][c] += row[r] * row[c];
                }
                xty[r] += row[r] * v;
            }
        }
        solve3(xtx, xty).ok_or(FitError::Singular)?
    };

    let mean = voltage.iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = voltage.iter().map(|v| (v - mean).powi(2)).sum();
    if ss_tot <= 0.0 {
        return Err(FitError::ZeroVariance);
    }
    let ss_res: f64 = time
        .iter()
        .zip(current)
        .zip(voltage)
        .map(|((&t, &i), &v)| (v - (a * t + b + k * i)).powi(2))
        .sum();

    let coefficients = [("a", a), ("b", b), ("k", k)]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    Ok(FitResult {
        r_squared: 1.0 - ss_res / ss_tot,
        coefficients,
    })
}

#[allow(clippy::float_cmp)]
fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Ordinary least squares for `V = a·t + b`; `None` when time is constant.
#[allow(clippy::cast_precision_loss)]
fn fit_time_only(time: &[f64], voltage: &[f64]) -> Option<[f64; 2]> {
    let n = time.len() as f64;
    let mean_t = time.iter().sum::<f64>() / n;
    let mean_v = voltage.iter().sum::<f64>() / n;
    let (sxx, sxy) = time
        .iter()
        .zip(voltage)
        .fold((0.0, 0.0), |(sxx, sxy), (&t, &v)| {
            let dt = t - mean_t;
            (sxx + dt * dt, sxy + dt * (v - mean_v))
        });
    if sxx <= 0.0 {
        return None;
    }
    let a = sxy / sxx;
    Some([a, mean_v - a * mean_t])
}

/// Gaussian elimination with partial pivoting on a 3×3 system.
#[allow(clippy::needless_range_loop)]
fn solve3(mut m: [[f64; 3]; 3], mut rhs: [f64; 3]) -> Option<[f64; 3]> {
    // Scale-aware singularity check: compare pivots to the largest entry.
    let scale = m
        .iter()
        .flatten()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
        .max(1.0);

    for col in 0..3 {
        let pivot = (col..3).max_by(|&x, &y| m[x][col].abs().total_cmp(&m[y][col].abs()))?;
        if m[pivot][col].abs() <= PIVOT_EPSILON * scale {
            return None;
        }
        m.swap(col, pivot);
        rhs.swap(col, pivot);
        for row in col + 1..3 {
            let factor = m[row][col] / m[col][col];
            for c in col..3 {
                m[row][c] -= factor * m[col][c];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = [0.0_f64; 3];
    for row in (0..3).rev() {
        let tail: f64 = (row + 1..3).map(|c| m[row][c] * x[c]).sum();
        x[row] = (rhs[row] - tail) / m[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}
