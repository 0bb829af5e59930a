//! MAD-based outlier filter over `(elapsed_seconds, cumulative_count)` points.
//!
//! A point is dropped when the slope of the interval ending at it deviates
//! from the median interval slope by more than [`MAD_MULTIPLIER`] times the
//! median absolute deviation. Regime shifts move the median with them, a
//! minority of bursts does not.

use crate::error::{ForecastError, Result};
use crate::stats::{mad, median};
use crate::MIN_POINTS;
use tracing::debug;

/// Threshold multiplier applied to the MAD.
pub const MAD_MULTIPLIER: f64 = 6.0;

/// Lower bound on the MAD so a perfectly regular series keeps a usable threshold.
pub const MAD_FLOOR: f64 = 1.0;

/// Slopes needed before robust statistics are computed.
const MIN_SLOPES: usize = 5;

/// Drop points whose incoming slope is an outlier.
///
/// The first point is always kept. Fails with
/// [`ForecastError::InsufficientData`] if fewer than [`MIN_POINTS`] points are
/// given or survive.
pub fn filter_outliers(points: &[(f64, f64)]) -> Result<Vec<(f64, f64)>> {
    if points.len() < MIN_POINTS {
        return Err(ForecastError::insufficient(points.len()));
    }

    let slopes: Vec<Option<f64>> = points
        .windows(2)
        .map(|w| {
            let dx = w[1].0 - w[0].0;
            if dx > 0.0 {
                Some((w[1].1 - w[0].1) / dx)
            } else {
                None
            }
        })
        .collect();
    let finite: Vec<f64> = slopes.iter().flatten().copied().collect();

    if finite.len() < MIN_SLOPES {
        // Not enough spacing information to judge anything.
        return Ok(points.to_vec());
    }

    let center = median(&finite).unwrap_or(0.0);
    let spread = mad(&finite, center).unwrap_or(0.0).max(MAD_FLOOR);
    let threshold = MAD_MULTIPLIER * spread;

    let mut kept = Vec::with_capacity(points.len());
    kept.push(points[0]);
    for (i, slope) in slopes.iter().enumerate() {
        let keep = match slope {
            Some(s) => (s - center).abs() <= threshold,
            // Zero-width intervals carry no slope; treat as duplicates.
            None => false,
        };
        if keep {
            kept.push(points[i + 1]);
        }
    }

    debug!(
        input = points.len(),
        kept = kept.len(),
        median_slope = center,
        threshold,
        "outlier filter applied"
    );

    if kept.len() < MIN_POINTS {
        return Err(ForecastError::insufficient(kept.len()));
    }
    Ok(kept)
}
