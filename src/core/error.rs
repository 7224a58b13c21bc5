use thiserror::Error;

/// Error raised when a raw model score cannot become a [`Prediction`].
///
/// [`Prediction`]: crate::core::Prediction
#[derive(Debug, Error)]
pub enum PredictionError {
    /// NaN or infinite scores would silently corrupt any ranking built on top.
    #[error("prediction score {0} is not a finite number")]
    NotFinite(f32),

    /// Scores are positive-class confidences and must stay in `[0, 1]`.
    #[error("prediction score {0} is outside the [0, 1] confidence range")]
    OutOfRange(f32),
}

/// Errors produced by example-selection strategies.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// Candidates and predictions must correspond one-to-one by index;
    /// partial correlation is never attempted.
    #[error("candidate and prediction counts differ: {candidates} candidates, {predictions} predictions")]
    LengthMismatch {
        candidates: usize,
        predictions: usize,
    },

    /// A non-finite score reached the scorer, e.g. through a deserialized
    /// prediction that bypassed construction-time validation.
    #[error("prediction at index {index} has non-finite score {score}")]
    InvalidScore { index: usize, score: f32 },
}
