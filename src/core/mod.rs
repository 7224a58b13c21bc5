pub mod cache;
pub mod config;
pub mod error;
pub mod prediction;

pub use cache::{global_cache, ModelCache, ModelOptions};
pub use config::TrainingConfig;
pub use error::{PredictionError, SelectionError};
pub use prediction::Prediction;
