//! Ordinary least squares and the two-segment piecewise fit.

/// A fitted line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    /// Growth per second
    pub slope: f64,
    /// Value at `x = 0`
    pub intercept: f64,
}

impl LinearFit {
    /// Predicted value at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Absolute residual of a point.
    pub fn residual(&self, (x, y): (f64, f64)) -> f64 {
        (y - self.predict(x)).abs()
    }

    /// Sum of squared residuals over `points`.
    pub fn sse(&self, points: &[(f64, f64)]) -> f64 {
        points.iter().map(|p| self.residual(*p).powi(2)).sum()
    }
}

/// Least-squares line through `points`.
///
/// `None` when fewer than two points are given, all `x` coincide, or the
/// result is not finite.
pub fn fit_ols(points: &[(f64, f64)]) -> Option<LinearFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let x_mean = points.iter().map(|p| p.0).sum::<f64>() / n;
    let y_mean = points.iter().map(|p| p.1).sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (x, y) in points {
        let dx = x - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }
    if sxx <= f64::EPSILON {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    if !slope.is_finite() || !intercept.is_finite() {
        return None;
    }
    Some(LinearFit { slope, intercept })
}

/// Best two-segment fit found by scanning split points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentedFit {
    /// Index of the first point of the right segment
    pub split: usize,
    /// Line through `[0, split)`
    pub left: LinearFit,
    /// Line through `[split, n)`; the recent local trend
    pub right: LinearFit,
    /// Combined squared error of both segments
    pub sse: f64,
}

/// Scan split points between the 20th and 80th percentile index and keep
/// the one with the lowest combined squared error.
///
/// Every segment keeps at least two points. `None` if no split yields two
/// valid fits.
pub fn fit_segmented(points: &[(f64, f64)]) -> Option<SegmentedFit> {
    let n = points.len();
    if n < 4 {
        return None;
    }
    let lo = ((n as f64 * 0.2).floor() as usize).max(2);
    let hi = ((n as f64 * 0.8).ceil() as usize).min(n - 2);

    let mut best: Option<SegmentedFit> = None;
    for split in lo..=hi {
        let (left_pts, right_pts) = points.split_at(split);
        let (Some(left), Some(right)) = (fit_ols(left_pts), fit_ols(right_pts)) else {
            continue;
        };
        let sse = left.sse(left_pts) + right.sse(right_pts);
        if best.map_or(true, |b| sse < b.sse) {
            best = Some(SegmentedFit { split, left, right, sse });
        }
    }
    best
}
