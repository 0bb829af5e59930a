//! RANSAC line fitting.
//!
//! Minimal two-point subsets are fitted and scored by how many points fall
//! within a residual threshold proportional to the spread of `y`. The best
//! subset's inliers are then refitted with ordinary least squares.

use crate::error::{ForecastError, Result};
use crate::regression::{fit_ols, LinearFit};
use crate::stats::std_dev;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// RANSAC tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct RansacConfig {
    /// Number of minimal subsets tried
    pub max_trials: usize,
    /// Residual threshold as a multiple of `std(y)`
    pub threshold_factor: f64,
    /// RNG seed, fixed so repeated estimates over the same history agree
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_trials: 100,
            threshold_factor: 0.8,
            seed: 42,
        }
    }
}

/// Result of a robust fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RansacFit {
    /// Refitted line
    pub line: LinearFit,
    /// Points within the residual threshold of the best candidate
    pub inliers: usize,
    /// Points considered
    pub total: usize,
}

impl RansacFit {
    /// Share of points classified as inliers.
    pub fn inlier_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.inliers as f64 / self.total as f64
        }
    }
}

struct Candidate {
    line: LinearFit,
    mask: Vec<bool>,
    inliers: usize,
    inlier_sse: f64,
}

/// Fit a line robust to a minority of outliers.
pub fn fit_ransac(points: &[(f64, f64)], config: &RansacConfig) -> Result<RansacFit> {
    let n = points.len();
    if n < 2 {
        return Err(ForecastError::NumericFailure(format!("RANSAC needs 2 points, got {}", n)));
    }

    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    let threshold = (config.threshold_factor * std_dev(&ys).unwrap_or(0.0)).max(1e-9);

    let mut best: Option<Candidate> = None;
    for (a, b) in subsets(n, config) {
        let Some(line) = fit_ols(&[points[a], points[b]]) else {
            continue;
        };
        let mask: Vec<bool> = points.iter().map(|p| line.residual(*p) <= threshold).collect();
        let inliers = mask.iter().filter(|m| **m).count();
        let inlier_sse: f64 = points
            .iter()
            .zip(&mask)
            .filter(|(_, m)| **m)
            .map(|(p, _)| line.residual(*p).powi(2))
            .sum();

        let better = match &best {
            None => true,
            Some(c) => inliers > c.inliers || (inliers == c.inliers && inlier_sse < c.inlier_sse),
        };
        if better {
            best = Some(Candidate { line, mask, inliers, inlier_sse });
        }
    }

    let Some(best) = best else {
        return Err(ForecastError::NumericFailure("no valid RANSAC subset".into()));
    };

    let inlier_points: Vec<(f64, f64)> = points
        .iter()
        .zip(&best.mask)
        .filter(|(_, m)| **m)
        .map(|(p, _)| *p)
        .collect();
    let line = fit_ols(&inlier_points).unwrap_or(best.line);

    Ok(RansacFit { line, inliers: best.inliers, total: n })
}

/// Index pairs to try: every pair when that is within budget, otherwise
/// seeded random pairs.
fn subsets(n: usize, config: &RansacConfig) -> Vec<(usize, usize)> {
    let all_pairs = n * (n - 1) / 2;
    if all_pairs <= config.max_trials {
        return (0..n)
            .flat_map(|a| (a + 1..n).map(move |b| (a, b)))
            .collect();
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    (0..config.max_trials)
        .map(|_| {
            let picked = rand::seq::index::sample(&mut rng, n, 2);
            (picked.index(0), picked.index(1))
        })
        .collect()
}
