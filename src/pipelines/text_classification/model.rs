use tokenizers::Tokenizer;

use crate::core::prediction::Prediction;

/// Interface implemented by classifier models usable in a
/// [`TextClassificationPipeline`](super::TextClassificationPipeline).
pub trait TextClassificationModel {
    type Options: std::fmt::Debug + Clone;

    fn new(options: Self::Options, device: candle_core::Device) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Classify one text, returning the positive-class confidence and label.
    fn predict(&self, tokenizer: &Tokenizer, text: &str) -> anyhow::Result<Prediction>;

    /// Classify many texts, preserving input order.
    ///
    /// Default implementation loops over [`predict`](Self::predict); models
    /// with real batched inference override it.
    fn predict_batch(
        &self,
        tokenizer: &Tokenizer,
        texts: &[&str],
        _batch_size: usize,
    ) -> anyhow::Result<Vec<Prediction>> {
        texts
            .iter()
            .map(|text| self.predict(tokenizer, text))
            .collect()
    }

    fn get_tokenizer(options: Self::Options) -> anyhow::Result<Tokenizer>;

    fn device(&self) -> &candle_core::Device;
}
