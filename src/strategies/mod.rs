//! Example-selection strategies for driving a human-labeling queue.
//!
//! An active-learning orchestrator runs inference over its pool of unlabeled
//! items each round and asks a strategy which of them are worth a human
//! label next. Strategies share one interface so the orchestrator can swap
//! them by configuration.
//!
//! ## Main Types
//!
//! - [`ActiveLearningStrategy`] - Scoring interface implemented by every strategy
//! - [`select_for_labeling`] - Ranks candidates by strategy score and takes the top K
//! - [`HardMiningStrategy`] - Prefers items the model is least certain about
//! - [`RandomSamplingStrategy`] - Uniform random baseline
//! - [`StrategyKind`] - Configuration-level strategy choice
//!
//! ## Usage Example
//!
//! ```rust
//! use labelkit::core::Prediction;
//! use labelkit::strategies::{select_for_labeling, HardMiningStrategy, SelectionContext};
//!
//! let context = SelectionContext {
//!     workspace_id: "ws-1",
//!     dataset_name: "reviews",
//!     category_name: "spam",
//! };
//! let candidates = ["a", "b", "c"];
//! let predictions = [
//!     Prediction::new(0.48)?,
//!     Prediction::new(0.97)?,
//!     Prediction::new(0.61)?,
//! ];
//!
//! let picked = select_for_labeling(&HardMiningStrategy, &context, &candidates, &predictions, 2)?;
//! assert_eq!(picked, [&"a", &"c"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod hard_mining;
mod random_sampling;

pub use hard_mining::HardMiningStrategy;
pub use random_sampling::RandomSamplingStrategy;

use serde::Deserialize;

use crate::core::error::SelectionError;
use crate::core::prediction::Prediction;

/// Identifies where in the labeling workflow a selection request originates.
///
/// The hard-mining and random strategies ignore it; it is part of the shared
/// interface so strategy variants that keep per-workspace or per-category
/// state receive it too.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub workspace_id: &'a str,
    pub dataset_name: &'a str,
    pub category_name: &'a str,
}

/// Scoring interface shared by all example-selection strategies.
pub trait ActiveLearningStrategy: Send + Sync {
    /// Short machine-readable name, used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Per-item selection scores, one per prediction, in input order.
    /// Higher means more worth labeling.
    fn score(
        &self,
        context: &SelectionContext<'_>,
        predictions: &[Prediction],
    ) -> Result<Vec<f32>, SelectionError>;
}

/// Picks up to `sample_size` candidates for labeling, best-scoring first.
///
/// `candidates` and `predictions` are parallel slices: `candidates[i]` was
/// scored by `predictions[i]`. Differing lengths fail with
/// [`SelectionError::LengthMismatch`] rather than correlating a prefix.
///
/// The ranking sort is stable, so candidates with equal scores come back in
/// their original input order and repeated calls with identical inputs
/// return identical output. `sample_size` larger than the candidate count
/// returns every candidate, ranked; zero returns an empty list. A negative
/// sample size is unrepresentable.
pub fn select_for_labeling<'a, T>(
    strategy: &dyn ActiveLearningStrategy,
    context: &SelectionContext<'_>,
    candidates: &'a [T],
    predictions: &[Prediction],
    sample_size: usize,
) -> Result<Vec<&'a T>, SelectionError> {
    if candidates.len() != predictions.len() {
        return Err(SelectionError::LengthMismatch {
            candidates: candidates.len(),
            predictions: predictions.len(),
        });
    }
    if sample_size == 0 || candidates.is_empty() {
        return Ok(Vec::new());
    }

    let scores = strategy.score(context, predictions)?;
    debug_assert_eq!(scores.len(), predictions.len());

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order.truncate(sample_size.min(candidates.len()));

    tracing::debug!(
        strategy = strategy.name(),
        workspace = context.workspace_id,
        requested = sample_size,
        returned = order.len(),
        "ranked candidates for labeling"
    );

    Ok(order.into_iter().map(|i| &candidates[i]).collect())
}

/// Strategy choice as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    HardMining,
    RandomSampling,
}

impl StrategyKind {
    /// Instantiate the configured strategy.
    pub fn build(self) -> Box<dyn ActiveLearningStrategy> {
        match self {
            StrategyKind::HardMining => Box::new(HardMiningStrategy),
            StrategyKind::RandomSampling => Box::new(RandomSamplingStrategy::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SelectionContext<'static> {
        SelectionContext {
            workspace_id: "ws",
            dataset_name: "ds",
            category_name: "cat",
        }
    }

    fn predictions(scores: &[f32]) -> Vec<Prediction> {
        scores.iter().map(|&s| Prediction::new(s).unwrap()).collect()
    }

    #[test]
    fn length_mismatch_fails_fast() {
        let candidates = ["a", "b", "c"];
        let preds = predictions(&[0.5, 0.5]);
        let err =
            select_for_labeling(&HardMiningStrategy, &context(), &candidates, &preds, 2)
                .unwrap_err();
        assert!(matches!(
            err,
            SelectionError::LengthMismatch {
                candidates: 3,
                predictions: 2
            }
        ));
    }

    #[test]
    fn zero_sample_size_returns_empty() {
        let candidates = ["a", "b"];
        let preds = predictions(&[0.5, 0.9]);
        let picked =
            select_for_labeling(&HardMiningStrategy, &context(), &candidates, &preds, 0)
                .unwrap();
        assert!(picked.is_empty());
    }

    #[test]
    fn oversized_sample_size_returns_all_ranked() {
        let candidates = ["a", "b", "c"];
        let preds = predictions(&[0.9, 0.5, 0.7]);
        let picked =
            select_for_labeling(&HardMiningStrategy, &context(), &candidates, &preds, 10)
                .unwrap();
        assert_eq!(picked, [&"b", &"c", &"a"]);
    }

    #[test]
    fn empty_pool_is_fine() {
        let candidates: [&str; 0] = [];
        let picked =
            select_for_labeling(&HardMiningStrategy, &context(), &candidates, &[], 5).unwrap();
        assert!(picked.is_empty());
    }

    #[test]
    fn selection_is_idempotent() {
        let candidates = ["a", "b", "c", "d", "e"];
        let preds = predictions(&[0.2, 0.8, 0.45, 0.45, 0.99]);
        let first =
            select_for_labeling(&HardMiningStrategy, &context(), &candidates, &preds, 3)
                .unwrap();
        let second =
            select_for_labeling(&HardMiningStrategy, &context(), &candidates, &preds, 3)
                .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn ties_resolve_by_input_order() {
        // Scores 0.3 and 0.7 are equally far from the boundary; the stable
        // sort keeps the earlier candidate first.
        let candidates = ["x", "y"];
        let preds = predictions(&[0.3, 0.7]);
        let picked =
            select_for_labeling(&HardMiningStrategy, &context(), &candidates, &preds, 1)
                .unwrap();
        assert_eq!(picked, [&"x"]);
    }

    #[test]
    fn strategy_kind_deserializes_from_snake_case() {
        let kind: StrategyKind = serde_json::from_str("\"hard_mining\"").unwrap();
        assert_eq!(kind, StrategyKind::HardMining);
        let kind: StrategyKind = serde_json::from_str("\"random_sampling\"").unwrap();
        assert_eq!(kind, StrategyKind::RandomSampling);
    }

    #[test]
    fn configured_strategy_is_usable_through_the_trait_object() {
        let strategy = StrategyKind::HardMining.build();
        let candidates = ["a", "b"];
        let preds = predictions(&[0.9, 0.5]);
        let picked =
            select_for_labeling(strategy.as_ref(), &context(), &candidates, &preds, 1).unwrap();
        assert_eq!(picked, [&"b"]);
    }
}
