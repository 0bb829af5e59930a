//! Completion time estimation.
//!
//! Three predictors are fitted over the outlier-filtered series and fused:
//!
//! ```text
//! robust line (RANSAC)      -> remaining / a_r
//! two-segment fit (recent)  -> remaining / a_seg
//! geometric decay           -> intervals * mean interval
//! ```
//!
//! Weights depend on the robust inlier share and on how steady the last
//! increments are; they are normalised so the result is a convex combination.

use chrono::{Duration, NaiveDateTime};
use milestone_core::{format_time, now_local, Sample};
use tracing::debug;

use crate::decay::{decay_factor, intervals_to_target, DECAY_WINDOW};
use crate::error::{ForecastError, Result};
use crate::filter::filter_outliers;
use crate::ransac::{fit_ransac, RansacConfig};
use crate::regression::fit_segmented;
use crate::stats::{mean, std_dev};
use crate::MIN_POINTS;

/// Label used once the target has been reached.
pub const REACHED_LABEL: &str = "target reached";

/// Completion times further out than this are clamped (about 3000 years).
const MAX_HORIZON_SECS: f64 = 1e11;

/// Fusion weights actually applied (already normalised).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    /// Robust line
    pub robust: f64,
    /// Recent segment
    pub segmented: f64,
    /// Decay model
    pub decay: f64,
}

impl Weights {
    /// Raw weights from fit quality, normalised to sum to one.
    pub fn compute(inlier_fraction: f64, recent_increment_std: f64) -> Self {
        let robust = (0.4 + inlier_fraction).min(0.85);
        let segmented = (0.25 / (recent_increment_std + 1e-6)).min(0.4);
        let decay = (1.0 - robust - segmented).max(0.05);
        let total = robust + segmented + decay;
        Self {
            robust: robust / total,
            segmented: segmented / total,
            decay: decay / total,
        }
    }
}

/// Per-model view of one estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelBreakdown {
    /// Robust slope (views per second)
    pub robust_slope: f64,
    /// Share of robust inliers
    pub inlier_fraction: f64,
    /// Slope of the recent segment, or the robust slope as fallback
    pub segmented_slope: f64,
    /// Decay factor in `[0.8, 1.0]`
    pub decay_factor: f64,
    /// Robust estimate (seconds)
    pub robust_seconds: f64,
    /// Segment estimate (seconds)
    pub segmented_seconds: f64,
    /// Decay estimate (seconds)
    pub decay_seconds: f64,
    /// Weights used for fusion
    pub weights: Weights,
}

/// A time-to-target estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    /// Fused estimate in seconds
    pub estimated_seconds: f64,
    /// Human readable duration
    pub label: String,
    /// `now + estimated_seconds`
    pub completion: NaiveDateTime,
    /// Points left after outlier filtering
    pub valid_sample_count: usize,
    /// Mean non-negative increment per sampling interval
    pub average_increment: f64,
    /// Sub-model details
    pub breakdown: ModelBreakdown,
}

/// Outcome of a successful estimate call.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastOutcome {
    /// Current count already at or past the target
    Reached {
        /// Points considered
        valid_sample_count: usize,
        /// Mean non-negative increment per sampling interval
        average_increment: f64,
    },
    /// Target still ahead
    Estimated(Forecast),
}

impl ForecastOutcome {
    /// Duration label and absolute completion label.
    pub fn labels(&self) -> (String, String) {
        match self {
            ForecastOutcome::Reached { .. } => (REACHED_LABEL.to_string(), REACHED_LABEL.to_string()),
            ForecastOutcome::Estimated(f) => (f.label.clone(), format_time(f.completion)),
        }
    }

    /// Points the outcome is based on.
    pub fn valid_sample_count(&self) -> usize {
        match self {
            ForecastOutcome::Reached { valid_sample_count, .. } => *valid_sample_count,
            ForecastOutcome::Estimated(f) => f.valid_sample_count,
        }
    }

    /// Mean non-negative increment per sampling interval.
    pub fn average_increment(&self) -> f64 {
        match self {
            ForecastOutcome::Reached { average_increment, .. } => *average_increment,
            ForecastOutcome::Estimated(f) => f.average_increment,
        }
    }
}

/// Format a duration into the coarsest readable unit.
pub fn format_duration(seconds: f64) -> String {
    let s = seconds.max(0.0);
    if s < 60.0 {
        format!("about {} seconds", s as u64)
    } else if s < 3600.0 {
        format!("about {:.1} minutes", s / 60.0)
    } else if s < 86_400.0 {
        format!("about {:.1} hours", s / 3600.0)
    } else {
        format!("about {:.1} days", s / 86_400.0)
    }
}

/// Turn a history into `(elapsed_seconds, views)` points.
///
/// Samples with malformed timestamps are skipped; elapsed time is measured
/// from the first parseable sample.
pub fn to_points(history: &[Sample]) -> Vec<(f64, f64)> {
    let mut origin: Option<NaiveDateTime> = None;
    history
        .iter()
        .filter_map(|s| {
            let t = s.timestamp()?;
            let t0 = *origin.get_or_insert(t);
            Some(((t - t0).num_seconds() as f64, s.view as f64))
        })
        .collect()
}

fn increments(points: &[(f64, f64)]) -> Vec<f64> {
    points.windows(2).map(|w| w[1].1 - w[0].1).collect()
}

fn average_increment(incs: &[f64]) -> f64 {
    let non_negative: Vec<f64> = incs.iter().copied().filter(|v| *v >= 0.0).collect();
    mean(&non_negative).unwrap_or(0.0)
}

/// Multi-model completion estimator. Pure; holds only tuning.
#[derive(Debug, Clone, Default)]
pub struct CompletionEstimator {
    ransac: RansacConfig,
}

impl CompletionEstimator {
    /// Create an estimator with default tuning.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the RANSAC tuning.
    pub fn with_ransac(mut self, config: RansacConfig) -> Self {
        self.ransac = config;
        self
    }

    /// Estimate time to `target` from `history` relative to the local clock.
    pub fn estimate(&self, history: &[Sample], current: u64, target: u64) -> Result<ForecastOutcome> {
        self.estimate_at(history, current, target, now_local())
    }

    /// Estimate time to `target` from `history`, with completion relative to `now`.
    pub fn estimate_at(
        &self,
        history: &[Sample],
        current: u64,
        target: u64,
        now: NaiveDateTime,
    ) -> Result<ForecastOutcome> {
        let points = to_points(history);
        self.estimate_points(&points, current, target, now)
    }

    /// Estimate from pre-built `(elapsed_seconds, views)` points.
    pub fn estimate_points(
        &self,
        points: &[(f64, f64)],
        current: u64,
        target: u64,
        now: NaiveDateTime,
    ) -> Result<ForecastOutcome> {
        let remaining = target as f64 - current as f64;
        if remaining <= 0.0 {
            return Ok(ForecastOutcome::Reached {
                valid_sample_count: points.len(),
                average_increment: average_increment(&increments(points)),
            });
        }
        if points.len() < MIN_POINTS {
            return Err(ForecastError::insufficient(points.len()));
        }

        let filtered = filter_outliers(points)?;
        let valid = filtered.len();

        // 1. Robust line
        let robust = fit_ransac(&filtered, &self.ransac)
            .map_err(|_| ForecastError::insufficient(valid))?;
        let a_r = robust.line.slope;
        if a_r <= 0.0 {
            return Err(ForecastError::DegenerateFit { slope: a_r });
        }

        // 2. Recent segment
        let a_seg = match fit_segmented(&filtered) {
            Some(seg) if seg.right.slope > 0.0 => seg.right.slope,
            _ => a_r,
        };

        // 3. Decay, in sampling intervals
        let incs = increments(&filtered);
        let spacing: Vec<f64> = filtered.windows(2).map(|w| w[1].0 - w[0].0).collect();
        let mean_interval = mean(&spacing).unwrap_or(1.0).max(f64::EPSILON);
        let decay = decay_factor(&incs);
        let current_inc = match incs.last() {
            Some(inc) if *inc > 0.0 => *inc,
            _ => a_r * mean_interval,
        };
        let intervals = intervals_to_target(remaining, current_inc, decay)
            .unwrap_or(remaining / (a_r * mean_interval));

        // 4. Fusion
        let est_r = remaining / a_r;
        let est_seg = remaining / a_seg;
        let est_exp = intervals * mean_interval;

        let recent = &incs[incs.len().saturating_sub(DECAY_WINDOW)..];
        let weights = Weights::compute(robust.inlier_fraction(), std_dev(recent).unwrap_or(0.0));
        let fused = weights.robust * est_r + weights.segmented * est_seg + weights.decay * est_exp;

        let avg_inc = average_increment(&incs);
        if fused < 0.0 {
            return Ok(ForecastOutcome::Reached { valid_sample_count: valid, average_increment: avg_inc });
        }
        if !fused.is_finite() {
            return Err(ForecastError::DegenerateFit { slope: a_r });
        }

        let breakdown = ModelBreakdown {
            robust_slope: a_r,
            inlier_fraction: robust.inlier_fraction(),
            segmented_slope: a_seg,
            decay_factor: decay,
            robust_seconds: est_r,
            segmented_seconds: est_seg,
            decay_seconds: est_exp,
            weights,
        };
        debug!(?breakdown, fused, "forecast fused");

        let completion = now
            .checked_add_signed(Duration::seconds(fused.round().min(MAX_HORIZON_SECS) as i64))
            .unwrap_or(NaiveDateTime::MAX);

        Ok(ForecastOutcome::Estimated(Forecast {
            estimated_seconds: fused,
            label: format_duration(fused),
            completion,
            valid_sample_count: valid,
            average_increment: avg_inc,
            breakdown,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use milestone_core::{parse_time, StatSnapshot};

    fn start() -> NaiveDateTime {
        parse_time("2024-05-01 12:00:00").unwrap()
    }

    fn history(views: &[u64], step_secs: i64) -> Vec<Sample> {
        views
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let stats = StatSnapshot { view: *v, ..Default::default() };
                Sample::from_stats(start() + Duration::seconds(step_secs * i as i64), &stats, 0)
            })
            .collect()
    }

    #[test]
    fn test_format_duration_buckets() {
        assert_eq!(format_duration(42.7), "about 42 seconds");
        assert_eq!(format_duration(90.0), "about 1.5 minutes");
        assert_eq!(format_duration(5400.0), "about 1.5 hours");
        assert_eq!(format_duration(86_400.0 * 2.5), "about 2.5 days");
    }

    #[test]
    fn test_weights_sum_to_one() {
        for (frac, sd) in [(1.0, 0.0), (0.5, 10.0), (0.0, 1000.0), (0.9, 0.2)] {
            let w = Weights::compute(frac, sd);
            assert!((w.robust + w.segmented + w.decay - 1.0).abs() < 1e-12);
            assert!(w.decay > 0.0);
        }
    }

    #[test]
    fn test_linear_series_converges() {
        let views: Vec<u64> = (0..=10).map(|t| 100 * t).collect();
        let h = history(&views, 1);
        let outcome = CompletionEstimator::new().estimate_at(&h, 1000, 1500, start()).unwrap();
        let ForecastOutcome::Estimated(f) = outcome else {
            panic!("expected an estimate");
        };
        assert!((f.breakdown.robust_slope - 100.0).abs() < 1e-6);
        assert!((f.breakdown.robust_seconds - 5.0).abs() < 1e-6);
        assert!((f.breakdown.segmented_seconds - 5.0).abs() < 1e-6);
        assert!((f.breakdown.decay_seconds - 5.0).abs() < 1e-6);
        assert!((f.estimated_seconds - 5.0).abs() < 1e-6);
        assert_eq!(f.valid_sample_count, 11);
        assert!((f.average_increment - 100.0).abs() < 1e-9);
        assert_eq!(f.completion, start() + Duration::seconds(5));
    }

    #[test]
    fn test_reached_short_circuits_without_data() {
        let outcome = CompletionEstimator::new().estimate_at(&[], 1_000_000, 1_000_000, start()).unwrap();
        assert!(matches!(outcome, ForecastOutcome::Reached { valid_sample_count: 0, .. }));
        assert_eq!(outcome.labels().0, REACHED_LABEL);

        let h = history(&[1, 2, 3], 60);
        let outcome = CompletionEstimator::new().estimate_at(&h, 2_000_000, 1_000_000, start()).unwrap();
        assert!(matches!(outcome, ForecastOutcome::Reached { .. }));
    }

    #[test]
    fn test_insufficient_data() {
        let h = history(&[100, 200, 300, 400, 500], 60);
        let err = CompletionEstimator::new().estimate_at(&h, 500, 1000, start()).unwrap_err();
        assert_eq!(err, ForecastError::InsufficientData { available: 5, required: 6 });
    }

    #[test]
    fn test_malformed_timestamps_count_as_missing() {
        let mut h = history(&[100, 200, 300, 400, 500, 600], 60);
        h[2].time = "yesterday".to_string();
        let err = CompletionEstimator::new().estimate_at(&h, 600, 1000, start()).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { available: 5, .. }));
    }

    #[test]
    fn test_flat_series_is_degenerate() {
        let h = history(&[500; 8], 60);
        let err = CompletionEstimator::new().estimate_at(&h, 500, 1000, start()).unwrap_err();
        assert!(matches!(err, ForecastError::DegenerateFit { .. }));
    }

    #[test]
    fn test_decelerating_series_is_not_over_optimistic() {
        // Increments shrink by 10% per interval.
        let mut views = vec![0u64];
        let mut inc = 10_000.0;
        for _ in 0..12 {
            let last = *views.last().unwrap();
            views.push(last + inc as u64);
            inc *= 0.9;
        }
        let h = history(&views, 60);
        let current = *views.last().unwrap();
        let outcome = CompletionEstimator::new()
            .estimate_at(&h, current, current + 20_000, start())
            .unwrap();
        let ForecastOutcome::Estimated(f) = outcome else {
            panic!("expected an estimate");
        };
        // A pure robust line would be faster than the decay-aware fusion.
        assert!(f.breakdown.decay_seconds > f.breakdown.robust_seconds);
        assert!(f.estimated_seconds >= f.breakdown.robust_seconds.min(f.breakdown.segmented_seconds));
    }
}
