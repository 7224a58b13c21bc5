//! Labelkit implements the selection side of an active-learning
//! text-classification loop: uncertainty-based example ranking plus
//! train/infer wrappers around pretrained transformer classifiers, powered
//! by the Candle crate.
//!
//! A typical round: run a [`TextClassificationPipeline`] over the pool of
//! unlabeled items to obtain a [`Prediction`] per item, hand candidates and
//! predictions to [`select_for_labeling`] with a configured strategy, and
//! queue the returned items for human labeling. Labeled items can then be
//! fed back through [`HeadTrainer`] to fine-tune the classifier.

pub mod core;
pub mod models;
pub mod pipelines;
pub mod store;
pub mod strategies;
pub mod train;

// Re-export the shared data types
pub use crate::core::{Prediction, PredictionError, SelectionError, TrainingConfig};

// Re-export the selection surface
pub use crate::strategies::{
    select_for_labeling, ActiveLearningStrategy, HardMiningStrategy, RandomSamplingStrategy,
    SelectionContext, StrategyKind,
};

// Re-export the classification and training surface
pub use crate::models::{ClassifierSource, FineTunedClassifierOptions};
pub use crate::pipelines::{TextClassificationPipeline, TextClassificationPipelineBuilder};
pub use crate::store::{ModelId, ModelStore};
pub use crate::train::{HeadTrainer, LabeledExample, TrainedHead};
