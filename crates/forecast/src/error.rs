//! Forecasting errors.

/// Result type for forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Why a forecast could not be produced.
///
/// All variants are advisory: callers record them as "cannot estimate yet"
/// and keep sampling.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForecastError {
    /// Too few usable points, before or after outlier filtering
    #[error("insufficient data: {available} usable points, need {required}")]
    InsufficientData {
        /// Points available
        available: usize,
        /// Points required
        required: usize,
    },

    /// The robust fit does not describe a growing series
    #[error("degenerate fit: growth slope {slope} is not positive")]
    DegenerateFit {
        /// Fitted slope (views per second)
        slope: f64,
    },

    /// A sub-model could not be fitted
    #[error("numeric failure: {0}")]
    NumericFailure(String),
}

impl ForecastError {
    pub(crate) fn insufficient(available: usize) -> Self {
        ForecastError::InsufficientData { available, required: crate::MIN_POINTS }
    }
}
