//! Fine-tuning of a classification head on labeled examples.
//!
//! Training freezes the pretrained encoder: the labeled texts are embedded
//! once (mean-pooled hidden states) and a linear head is fitted on top with
//! AdamW and cross-entropy. The trained head is a small safetensors artifact
//! that [`FineTunedModernBertModel`](crate::models::FineTunedModernBertModel)
//! loads back for inference.

use std::path::Path;

use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::ops::softmax;
use candle_nn::{linear, loss, AdamW, Linear, Module, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use rand::seq::SliceRandom;
use tokenizers::Tokenizer;

use crate::core::config::TrainingConfig;
use crate::models::modernbert::{batch_to_tensors, ModernBertModel};

/// One labeled training datum.
#[derive(Debug, Clone)]
pub struct LabeledExample {
    pub text: String,
    /// Whether the positive class applies.
    pub label: bool,
}

impl LabeledExample {
    pub fn new(text: impl Into<String>, label: bool) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// Fits a classification head over a frozen encoder.
pub struct HeadTrainer<'a> {
    encoder: &'a ModernBertModel,
    tokenizer: &'a Tokenizer,
    config: TrainingConfig,
}

impl<'a> HeadTrainer<'a> {
    pub fn new(encoder: &'a ModernBertModel, tokenizer: &'a Tokenizer, config: TrainingConfig) -> Self {
        Self {
            encoder,
            tokenizer,
            config,
        }
    }

    /// Embed the examples and fit a head on the resulting features.
    pub fn train(&self, examples: &[LabeledExample]) -> anyhow::Result<TrainedHead> {
        anyhow::ensure!(!examples.is_empty(), "training set is empty");
        let device = self.encoder.device().clone();

        // The encoder stays frozen, so the corpus is embedded exactly once
        // and gradients only flow through the head.
        let mut pooled_batches = Vec::new();
        for batch in examples.chunks(self.config.batch_size.max(1)) {
            let texts: Vec<&str> = batch.iter().map(|e| e.text.as_str()).collect();
            let (input_ids, attention_mask) = batch_to_tensors(
                self.tokenizer,
                &texts,
                self.config.max_seq_length,
                &device,
            )?;
            let pooled = self
                .encoder
                .forward_mean_pooled(&input_ids, &attention_mask)?;
            pooled_batches.push(pooled.detach());
        }
        let features = Tensor::cat(&pooled_batches, 0)?;

        let labels: Vec<u32> = examples.iter().map(|e| e.label as u32).collect();
        let targets = Tensor::from_vec(labels, examples.len(), &device)?;

        fit_head(&features, &targets, &self.config)
    }
}

/// Fit a two-class linear head on precomputed features.
///
/// `features` has shape `(n, hidden)`, `targets` is a `u32` vector of 0/1
/// class ids of length `n`. Class 1 is the positive class.
pub fn fit_head(
    features: &Tensor,
    targets: &Tensor,
    config: &TrainingConfig,
) -> anyhow::Result<TrainedHead> {
    let n = features.dim(0)?;
    anyhow::ensure!(n > 0, "training set is empty");
    anyhow::ensure!(
        targets.dim(0)? == n,
        "feature and target counts differ: {} features, {} targets",
        n,
        targets.dim(0)?
    );
    let hidden_size = features.dim(1)?;
    let device = features.device().clone();

    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let head = linear(hidden_size, 2, vb.pp("classifier"))?;

    let mut optimizer = AdamW::new(
        varmap.all_vars(),
        ParamsAdamW {
            lr: config.learning_rate,
            ..Default::default()
        },
    )?;

    let batch_size = config.batch_size.max(1);
    let mut order: Vec<u32> = (0..n as u32).collect();
    let mut rng = rand::rng();

    for epoch in 1..=config.epochs {
        order.shuffle(&mut rng);
        let mut epoch_loss = 0f32;
        let mut batches = 0usize;

        for chunk in order.chunks(batch_size) {
            let index = Tensor::from_vec(chunk.to_vec(), chunk.len(), &device)?;
            let batch_features = features.index_select(&index, 0)?;
            let batch_targets = targets.index_select(&index, 0)?;

            let logits = head.forward(&batch_features)?;
            let batch_loss = loss::cross_entropy(&logits, &batch_targets)?;
            optimizer.backward_step(&batch_loss)?;

            epoch_loss += batch_loss.to_scalar::<f32>()?;
            batches += 1;
        }

        tracing::info!(
            epoch,
            loss = epoch_loss / batches as f32,
            "head training epoch"
        );
    }

    Ok(TrainedHead {
        varmap,
        head,
        hidden_size,
    })
}

/// A trained two-class linear head. Class 1 is the positive class.
#[derive(Clone)]
pub struct TrainedHead {
    varmap: VarMap,
    head: Linear,
    hidden_size: usize,
}

impl TrainedHead {
    /// Positive-class probabilities for a `(n, hidden)` feature batch.
    pub fn positive_scores(&self, features: &Tensor) -> anyhow::Result<Vec<f32>> {
        let logits = self.head.forward(features)?;
        let probabilities = softmax(&logits, D::Minus1)?;
        Ok(probabilities.i((.., 1))?.to_vec1::<f32>()?)
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Write the head weights as a safetensors artifact.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        self.varmap.save(path.as_ref())?;
        Ok(())
    }

    /// Load a head previously written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>, hidden_size: usize, device: &Device) -> anyhow::Result<Self> {
        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let head = linear(hidden_size, 2, vb.pp("classifier"))?;
        varmap.load(path.as_ref())?;
        Ok(Self {
            varmap,
            head,
            hidden_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Linearly separable toy features: class is the sign of the first
    // coordinate.
    fn toy_data(device: &Device) -> (Tensor, Tensor) {
        let features: Vec<f32> = vec![
            1.0, 0.3, //
            0.8, -0.2, //
            1.2, 0.1, //
            0.9, 0.5, //
            -1.0, 0.4, //
            -0.7, -0.3, //
            -1.1, 0.2, //
            -0.9, -0.5, //
        ];
        let labels: Vec<u32> = vec![1, 1, 1, 1, 0, 0, 0, 0];
        let features = Tensor::from_vec(features, (8, 2), device).unwrap();
        let targets = Tensor::from_vec(labels, 8, device).unwrap();
        (features, targets)
    }

    fn fast_config() -> TrainingConfig {
        TrainingConfig {
            epochs: 200,
            batch_size: 8,
            learning_rate: 5e-2,
            max_seq_length: 128,
        }
    }

    #[test]
    fn fit_head_separates_toy_classes() {
        let device = Device::Cpu;
        let (features, targets) = toy_data(&device);
        let head = fit_head(&features, &targets, &fast_config()).unwrap();

        let scores = head.positive_scores(&features).unwrap();
        for (i, score) in scores.iter().enumerate() {
            if i < 4 {
                assert!(*score > 0.5, "positive example {i} scored {score}");
            } else {
                assert!(*score < 0.5, "negative example {i} scored {score}");
            }
        }
    }

    #[test]
    fn fit_head_rejects_empty_training_set() {
        let device = Device::Cpu;
        let features = Tensor::zeros((0, 4), DType::F32, &device).unwrap();
        let targets = Tensor::zeros(0, DType::U32, &device).unwrap();
        assert!(fit_head(&features, &targets, &fast_config()).is_err());
    }

    #[test]
    fn fit_head_rejects_mismatched_targets() {
        let device = Device::Cpu;
        let features = Tensor::zeros((4, 2), DType::F32, &device).unwrap();
        let targets = Tensor::zeros(3, DType::U32, &device).unwrap();
        assert!(fit_head(&features, &targets, &fast_config()).is_err());
    }

    #[test]
    fn saved_head_round_trips() {
        let device = Device::Cpu;
        let (features, targets) = toy_data(&device);
        let head = fit_head(&features, &targets, &fast_config()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("head.safetensors");
        head.save(&path).unwrap();

        let reloaded = TrainedHead::load(&path, head.hidden_size(), &device).unwrap();
        let original = head.positive_scores(&features).unwrap();
        let restored = reloaded.positive_scores(&features).unwrap();
        for (a, b) in original.iter().zip(&restored) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
