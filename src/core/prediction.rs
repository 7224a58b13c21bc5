use serde::{Deserialize, Serialize};

use crate::core::error::PredictionError;

/// A classifier's confidence estimate for a single candidate item.
///
/// `score` is the model's confidence that the positive class applies, in
/// `[0.0, 1.0]`; `label` is the binary decision derived from it. One
/// prediction corresponds to exactly one candidate item, in the same order
/// as the candidate list it was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Positive-class confidence, `0.5` meaning maximal uncertainty.
    pub score: f32,
    /// Positive-class decision, `score > 0.5`.
    pub label: bool,
}

impl Prediction {
    /// Builds a prediction from a raw positive-class score, deriving the
    /// label. Rejects NaN, infinite, and out-of-`[0, 1]` scores.
    pub fn new(score: f32) -> Result<Self, PredictionError> {
        if !score.is_finite() {
            return Err(PredictionError::NotFinite(score));
        }
        if !(0.0..=1.0).contains(&score) {
            return Err(PredictionError::OutOfRange(score));
        }
        Ok(Self {
            score,
            label: score > 0.5,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_follows_decision_threshold() {
        assert!(!Prediction::new(0.5).unwrap().label);
        assert!(Prediction::new(0.51).unwrap().label);
        assert!(!Prediction::new(0.0).unwrap().label);
        assert!(Prediction::new(1.0).unwrap().label);
    }

    #[test]
    fn rejects_non_finite_scores() {
        assert!(matches!(
            Prediction::new(f32::NAN),
            Err(PredictionError::NotFinite(_))
        ));
        assert!(matches!(
            Prediction::new(f32::INFINITY),
            Err(PredictionError::NotFinite(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_scores() {
        assert!(matches!(
            Prediction::new(-0.01),
            Err(PredictionError::OutOfRange(_))
        ));
        assert!(matches!(
            Prediction::new(1.01),
            Err(PredictionError::OutOfRange(_))
        ));
    }
}
