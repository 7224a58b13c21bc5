use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::error::SelectionError;
use crate::core::prediction::Prediction;

use super::{ActiveLearningStrategy, SelectionContext};

/// Assigns every candidate a uniform random selection score.
///
/// Useful as a no-model baseline and for seeding the first labeling rounds
/// before a trained classifier exists. With a fixed seed the scores, and
/// therefore the selection, are reproducible across calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSamplingStrategy {
    seed: Option<u64>,
}

impl RandomSamplingStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fixed seed makes repeated selection runs return the same items.
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl ActiveLearningStrategy for RandomSamplingStrategy {
    fn name(&self) -> &'static str {
        "random_sampling"
    }

    fn score(
        &self,
        _context: &SelectionContext<'_>,
        predictions: &[Prediction],
    ) -> Result<Vec<f32>, SelectionError> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(predictions.iter().map(|_| rng.random::<f32>()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::select_for_labeling;

    fn context() -> SelectionContext<'static> {
        SelectionContext {
            workspace_id: "ws",
            dataset_name: "ds",
            category_name: "cat",
        }
    }

    fn predictions(n: usize) -> Vec<Prediction> {
        (0..n).map(|_| Prediction::new(0.5).unwrap()).collect()
    }

    #[test]
    fn scores_match_input_length_and_range() {
        let scores = RandomSamplingStrategy::seeded(7)
            .score(&context(), &predictions(100))
            .unwrap();
        assert_eq!(scores.len(), 100);
        assert!(scores.iter().all(|s| (0.0..1.0).contains(s)));
    }

    #[test]
    fn seeded_selection_is_reproducible() {
        let candidates: Vec<usize> = (0..50).collect();
        let preds = predictions(50);
        let strategy = RandomSamplingStrategy::seeded(42);

        let first =
            select_for_labeling(&strategy, &context(), &candidates, &preds, 10).unwrap();
        let second =
            select_for_labeling(&strategy, &context(), &candidates, &preds, 10).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn different_seeds_usually_disagree() {
        let candidates: Vec<usize> = (0..50).collect();
        let preds = predictions(50);

        let a = select_for_labeling(
            &RandomSamplingStrategy::seeded(1),
            &context(),
            &candidates,
            &preds,
            10,
        )
        .unwrap();
        let b = select_for_labeling(
            &RandomSamplingStrategy::seeded(2),
            &context(),
            &candidates,
            &preds,
            10,
        )
        .unwrap();
        assert_ne!(a, b);
    }
}
