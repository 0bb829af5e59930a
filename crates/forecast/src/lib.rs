//! Forecasting (view-count milestones)
//!
//! Outlier filtering, robust / segmented / decay sub-models and their fusion
//! into a single time-to-target estimate. Everything here is pure.

#![warn(missing_docs)]

pub mod error;
pub mod stats;
pub mod filter;
pub mod regression;
pub mod ransac;
pub mod decay;
pub mod estimator;

/// Minimum number of points, before and after filtering, needed to forecast.
pub const MIN_POINTS: usize = 6;

pub use error::{ForecastError, Result};
pub use filter::filter_outliers;
pub use regression::{fit_ols, fit_segmented, LinearFit, SegmentedFit};
pub use ransac::{fit_ransac, RansacConfig, RansacFit};
pub use estimator::{
    CompletionEstimator, Forecast, ForecastOutcome, ModelBreakdown, Weights,
    format_duration, to_points, REACHED_LABEL,
};
