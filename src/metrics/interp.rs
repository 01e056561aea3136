//! Resampling primitives: uniform grids, linear interpolation, trapezoid rule.

/// `n` evenly spaced points over `[start, end]` inclusive.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Piecewise-linear interpolator over sorted abscissae.
///
/// Queries outside the sample range extrapolate along the first or last
/// segment. Duplicate abscissae keep the first sample.
#[derive(Debug, Clone)]
pub struct Interpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Interpolator {
    /// Build from unsorted samples. Returns `None` with fewer than two distinct
    /// abscissae or any non-finite input.
    #[must_use]
    pub fn new(xs: &[f64], ys: &[f64]) -> Option<Self> {
        if xs.len() != ys.len() || xs.iter().chain(ys).any(|v| !v.is_finite()) {
            return None;
        }
        let mut pairs: Vec<(f64, f64)> = xs.iter().copied().zip(ys.iter().copied()).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        pairs.dedup_by(|later, earlier| later.0 == earlier.0);
        if pairs.len() < 2 {
            return None;
        }
        let (xs, ys) = pairs.into_iter().unzip();
        Some(Self { xs, ys })
    }

    /// Interpolated value at `x`.
    #[must_use]
    pub fn at(&self, x: f64) -> f64 {
        let last = self.xs.len() - 1;
        // Index of the right end of the segment containing x, clamped to a valid segment.
        let upper = self.xs.partition_point(|&v| v < x).clamp(1, last);
        let (x0, x1) = (self.xs[upper - 1], self.xs[upper]);
        let (y0, y1) = (self.ys[upper - 1], self.ys[upper]);
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }

    /// Interpolate every point of `grid`.
    #[must_use]
    pub fn sample(&self, grid: &[f64]) -> Vec<f64> {
        grid.iter().map(|&x| self.at(x)).collect()
    }
}

/// Trapezoidal integral of `ys` over `xs` (samples taken in the given order).
#[must_use]
pub fn trapezoid(xs: &[f64], ys: &[f64]) -> f64 {
    xs.windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
        .sum()
}

/// Overlap `[max(min_a, min_b), min(max_a, max_b)]` of two sample ranges;
/// `None` when either is empty or the overlap is degenerate (`lo >= hi`).
#[must_use]
pub fn overlap(a: &[f64], b: &[f64]) -> Option<(f64, f64)> {
    let (a_lo, a_hi) = bounds(a)?;
    let (b_lo, b_hi) = bounds(b)?;
    let lo = a_lo.max(b_lo);
    let hi = a_hi.min(b_hi);
    (lo < hi).then_some((lo, hi))
}

/// `(min, max)` of a non-empty slice.
#[must_use]
pub fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    }))
}
