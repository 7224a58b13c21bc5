use tokenizers::Tokenizer;

use super::model::TextClassificationModel;
use crate::core::prediction::Prediction;

pub struct TextClassificationPipeline<M: TextClassificationModel> {
    pub(crate) model: M,
    pub(crate) tokenizer: Tokenizer,
    pub(crate) batch_size: usize,
}

impl<M: TextClassificationModel> TextClassificationPipeline<M> {
    /// Classify one text.
    pub fn predict(&self, text: &str) -> anyhow::Result<Prediction> {
        self.model.predict(&self.tokenizer, text)
    }

    /// Classify a slice of texts, in input order, batching internally.
    pub fn predict_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Prediction>> {
        self.model
            .predict_batch(&self.tokenizer, texts, self.batch_size)
    }

    pub fn device(&self) -> &candle_core::Device {
        self.model.device()
    }
}
