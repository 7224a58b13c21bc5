use crate::core::error::SelectionError;
use crate::core::prediction::Prediction;

use super::{ActiveLearningStrategy, SelectionContext};

/// Suggests "hard" examples, the ones the model is most uncertain about.
///
/// The highest selection scores go to predictions closest to the decision
/// threshold of 0.5: uncertainty is `2 * (0.5 - |score - 0.5|)`, so a
/// prediction sitting exactly on the boundary scores 1.0 and a fully
/// confident prediction at 0.0 or 1.0 scores 0.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardMiningStrategy;

impl ActiveLearningStrategy for HardMiningStrategy {
    fn name(&self) -> &'static str {
        "hard_mining"
    }

    fn score(
        &self,
        _context: &SelectionContext<'_>,
        predictions: &[Prediction],
    ) -> Result<Vec<f32>, SelectionError> {
        predictions
            .iter()
            .enumerate()
            .map(|(index, prediction)| {
                let score = prediction.score;
                if !score.is_finite() {
                    return Err(SelectionError::InvalidScore { index, score });
                }
                Ok(2.0 * (0.5 - (score - 0.5).abs()))
            })
            .collect()
    }
}
