pub mod device;
pub mod text_classification;

pub use text_classification::{
    TextClassificationModel, TextClassificationPipeline, TextClassificationPipelineBuilder,
};
