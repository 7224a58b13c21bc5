use super::model::TextClassificationModel;
use super::pipeline::TextClassificationPipeline;
use crate::core::cache::{global_cache, ModelOptions};
use crate::pipelines::device::{build_cache_key, DeviceRequest};

const DEFAULT_BATCH_SIZE: usize = 32;

pub struct TextClassificationPipelineBuilder<M: TextClassificationModel> {
    options: M::Options,
    device_request: DeviceRequest,
    batch_size: usize,
}

impl<M: TextClassificationModel> TextClassificationPipelineBuilder<M> {
    pub fn new(options: M::Options) -> Self {
        Self {
            options,
            device_request: DeviceRequest::Default,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Force the pipeline to run on CPU.
    pub fn cpu(mut self) -> Self {
        self.device_request = DeviceRequest::Cpu;
        self
    }

    /// Select a specific CUDA device by index.
    pub fn cuda_device(mut self, index: usize) -> Self {
        self.device_request = DeviceRequest::Cuda(index);
        self
    }

    /// Provide an explicit [`candle_core::Device`].
    pub fn device(mut self, device: candle_core::Device) -> Self {
        self.device_request = DeviceRequest::Explicit(device);
        self
    }

    /// Number of texts per inference batch.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn build(self) -> anyhow::Result<TextClassificationPipeline<M>>
    where
        M: Clone + Send + Sync + 'static,
        M::Options: ModelOptions + Clone,
    {
        let device = self.device_request.resolve()?;
        let key = build_cache_key(&self.options, &device);
        let model = global_cache()
            .get_or_create(&key, || M::new(self.options.clone(), device.clone()))?;
        let tokenizer = M::get_tokenizer(self.options)?;
        Ok(TextClassificationPipeline {
            model,
            tokenizer,
            batch_size: self.batch_size,
        })
    }
}

impl TextClassificationPipelineBuilder<crate::models::modernbert::ClassifierModernBertModel> {
    /// Pipeline over a pretrained ModernBERT sequence-classification
    /// checkpoint.
    pub fn modernbert(source: crate::models::modernbert::ClassifierSource) -> Self {
        Self::new(source)
    }
}

impl TextClassificationPipelineBuilder<crate::models::modernbert::FineTunedModernBertModel> {
    /// Pipeline over a base encoder plus a locally fine-tuned head.
    pub fn fine_tuned(options: crate::models::modernbert::FineTunedClassifierOptions) -> Self {
        Self::new(options)
    }
}
