//! Exponential-decay extrapolation.
//!
//! Recent per-interval increments are assumed to shrink geometrically. The
//! number of future intervals needed is the length of the geometric series
//! whose sum covers the remaining gap.

use crate::stats::median;

/// Increments looked at when estimating the decay factor.
pub const DECAY_WINDOW: usize = 5;

/// Lowest decay factor accepted.
pub const MIN_DECAY: f64 = 0.80;

/// Highest decay factor accepted (no decay).
pub const MAX_DECAY: f64 = 1.00;

/// Factors at or above this are treated as linear growth.
const LINEAR_CUTOFF: f64 = 0.999;

/// Median ratio of consecutive increments over the last [`DECAY_WINDOW`],
/// clamped to `[MIN_DECAY, MAX_DECAY]`.
///
/// Ratios with a non-positive denominator are skipped; with no usable ratio
/// the series is treated as non-decaying.
pub fn decay_factor(increments: &[f64]) -> f64 {
    let start = increments.len().saturating_sub(DECAY_WINDOW);
    let recent = &increments[start..];
    let ratios: Vec<f64> = recent
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0])
        .filter(|r| r.is_finite())
        .collect();

    median(&ratios).unwrap_or(MAX_DECAY).clamp(MIN_DECAY, MAX_DECAY)
}

/// Number of intervals for a geometric series starting at `current_inc`
/// with ratio `decay` to sum to `remaining`.
///
/// Falls back to linear division when the closed form leaves the log
/// domain (the series converges below the remaining gap). Negative results
/// clamp to zero. `None` if `current_inc` is not positive.
pub fn intervals_to_target(remaining: f64, current_inc: f64, decay: f64) -> Option<f64> {
    if current_inc <= 0.0 || !current_inc.is_finite() {
        return None;
    }
    let linear = remaining / current_inc;

    let t = if decay < LINEAR_CUTOFF {
        let arg = 1.0 - remaining * (1.0 - decay) / current_inc;
        if arg > 0.0 {
            let t = arg.ln() / decay.ln();
            if t.is_finite() { t } else { linear }
        } else {
            linear
        }
    } else {
        linear
    };
    Some(t.max(0.0))
}
