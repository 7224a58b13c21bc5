//! Text-classification pipeline producing per-item positive-class scores.
//!
//! This is the prediction-producing half of the active-learning loop: it
//! wraps a pretrained transformer classifier and turns raw text into
//! [`Prediction`]s that the selection strategies consume. Tokenization,
//! batched inference, and device placement are delegated to the underlying
//! model implementation.
//!
//! ## Main Types
//!
//! - [`TextClassificationPipeline`] - High-level predict interface
//! - [`TextClassificationPipelineBuilder`] - Builder pattern for pipeline configuration
//! - [`TextClassificationModel`] - Trait for classifier model implementations
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use labelkit::pipelines::text_classification::*;
//! use labelkit::models::ClassifierSource;
//!
//! let source = ClassifierSource::Hub(
//!     "clapAI/modernBERT-base-multilingual-sentiment".to_string(),
//! );
//! let pipeline = TextClassificationPipelineBuilder::modernbert(source).build()?;
//!
//! let prediction = pipeline.predict("the checkout flow keeps crashing")?;
//! println!("positive: {} (score {:.2})", prediction.label, prediction.score);
//! # anyhow::Ok(())
//! ```
//!
//! [`Prediction`]: crate::core::Prediction

pub mod builder;
pub mod model;
pub mod pipeline;

pub use builder::TextClassificationPipelineBuilder;
pub use model::TextClassificationModel;
pub use pipeline::TextClassificationPipeline;

pub use anyhow::Result;
