//! ModernBERT encoder and sequence-classification checkpoints.
//!
//! ModernBERT is a modernized bidirectional encoder-only Transformer with
//! sliding window attention, periodic global attention layers, and a
//! sequence classification head. This module implements the encoder in
//! Candle and exposes two classifier model types on top of it:
//!
//! - [`ClassifierModernBertModel`] - a pretrained sequence-classification
//!   checkpoint, loaded from the Hugging Face hub or a local directory
//! - [`FineTunedModernBertModel`] - a base encoder plus a locally trained
//!   classification head produced by [`HeadTrainer`](crate::train::HeadTrainer)

use candle_core::{DType, Device, IndexOp, Result, Tensor, D};
use candle_nn::{
    embedding, layer_norm_no_bias, linear, linear_no_bias, ops::softmax, Embedding, LayerNorm,
    Linear, Module, VarBuilder,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

const NEG_INF: f32 = f32::NEG_INFINITY;
const MIN_VALUE_F64: f64 = f32::MIN as f64;

/// Inputs longer than this many subword tokens are truncated before the
/// forward pass.
pub const DEFAULT_MAX_SEQ_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    pub max_position_embeddings: usize,
    pub layer_norm_eps: f64,
    pub pad_token_id: u32,
    pub global_attn_every_n_layers: usize,
    pub global_rope_theta: f64,
    pub local_attention: usize,
    pub local_rope_theta: f64,
    #[serde(flatten)]
    pub classifier_config: Option<ClassifierConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierPooling {
    #[default]
    CLS,
    MEAN,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassifierConfig {
    pub id2label: HashMap<String, String>,
    pub label2id: HashMap<String, String>,
    pub classifier_pooling: ClassifierPooling,
}

/// Rotary Position Embedding (RoPE) implementation.
#[derive(Debug, Clone)]
struct RoPE {
    sin: Tensor,
    cos: Tensor,
}

impl RoPE {
    fn new(dtype: DType, config: &Config, rope_theta: f64, device: &Device) -> Result<Self> {
        let dim = config.hidden_size / config.num_attention_heads;
        let inv_freq: Vec<f32> = (0..dim)
            .step_by(2)
            .map(|i| (1.0 / rope_theta.powf(i as f64 / dim as f64)) as f32)
            .collect();

        // Capture length before the vector is moved into `from_vec`.
        let inv_freq_len = inv_freq.len();
        let inv_freq = Tensor::from_vec(inv_freq, (1, inv_freq_len), device)?.to_dtype(dtype)?;
        let max_seq_len = config.max_position_embeddings;
        let positions = Tensor::arange(0u32, max_seq_len as u32, device)?
            .to_dtype(dtype)?
            .reshape((max_seq_len, 1))?;
        let angles = positions.matmul(&inv_freq)?;

        Ok(Self {
            sin: angles.sin()?,
            cos: angles.cos()?,
        })
    }

    fn apply(&self, q: &Tensor, k: &Tensor) -> Result<(Tensor, Tensor)> {
        let q_embed = candle_nn::rotary_emb::rope(&q.contiguous()?, &self.cos, &self.sin)?;
        let k_embed = candle_nn::rotary_emb::rope(&k.contiguous()?, &self.cos, &self.sin)?;
        Ok((q_embed, k_embed))
    }
}

/// Multi-head attention with sliding window support.
#[derive(Debug, Clone)]
struct Attention {
    qkv: Linear,
    proj: Linear,
    num_attention_heads: usize,
    attention_head_size: usize,
    rope: Arc<RoPE>,
}

impl Attention {
    fn load(vb: VarBuilder, config: &Config, rope: Arc<RoPE>) -> Result<Self> {
        let num_attention_heads = config.num_attention_heads;
        let attention_head_size = config.hidden_size / config.num_attention_heads;

        let qkv = linear_no_bias(config.hidden_size, config.hidden_size * 3, vb.pp("Wqkv"))?;
        let proj = linear_no_bias(config.hidden_size, config.hidden_size, vb.pp("Wo"))?;

        Ok(Self {
            qkv,
            proj,
            num_attention_heads,
            attention_head_size,
            rope,
        })
    }

    fn forward(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, hidden_size) = hidden_states.dims3()?;

        let qkv = hidden_states
            .apply(&self.qkv)?
            .reshape((
                batch,
                seq_len,
                3,
                self.num_attention_heads,
                self.attention_head_size,
            ))?
            .permute((2, 0, 3, 1, 4))?;

        let q = qkv.get(0)?;
        let k = qkv.get(1)?;
        let v = qkv.get(2)?;

        let (q, k) = self.rope.apply(&q, &k)?;

        let scale = (self.attention_head_size as f64).powf(-0.5);
        let q = (q * scale)?;

        let attention_scores = q.matmul(&k.transpose(D::Minus2, D::Minus1)?)?;
        let attention_scores = attention_scores.broadcast_add(attention_mask)?;
        let attention_probs = softmax(&attention_scores, D::Minus1)?;

        let context = attention_probs.matmul(&v)?;
        let output = context
            .transpose(1, 2)?
            .reshape((batch, seq_len, hidden_size))?
            .apply(&self.proj)?;

        Ok(output)
    }
}

/// Feed-forward network with GeGLU activation.
#[derive(Debug, Clone)]
struct FeedForward {
    wi: Linear,
    wo: Linear,
}

impl FeedForward {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let wi = linear_no_bias(
            config.hidden_size,
            config.intermediate_size * 2,
            vb.pp("Wi"),
        )?;
        let wo = linear_no_bias(config.intermediate_size, config.hidden_size, vb.pp("Wo"))?;
        Ok(Self { wi, wo })
    }
}

impl Module for FeedForward {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = xs.apply(&self.wi)?;
        let chunks = xs.chunk(2, D::Minus1)?;
        let output = (&chunks[0].gelu_erf()? * &chunks[1])?.apply(&self.wo)?;
        Ok(output)
    }
}

/// Single transformer layer.
#[derive(Debug, Clone)]
struct TransformerLayer {
    attention: Attention,
    feed_forward: FeedForward,
    attention_norm: Option<LayerNorm>,
    ffn_norm: LayerNorm,
    uses_local_attention: bool,
}

impl TransformerLayer {
    fn load(
        vb: VarBuilder,
        config: &Config,
        rope: Arc<RoPE>,
        uses_local_attention: bool,
    ) -> Result<Self> {
        let attention = Attention::load(vb.pp("attn"), config, rope)?;
        let feed_forward = FeedForward::load(vb.pp("mlp"), config)?;

        let attention_norm = layer_norm_no_bias(
            config.hidden_size,
            config.layer_norm_eps,
            vb.pp("attn_norm"),
        )
        .ok();

        let ffn_norm =
            layer_norm_no_bias(config.hidden_size, config.layer_norm_eps, vb.pp("mlp_norm"))?;

        Ok(Self {
            attention,
            feed_forward,
            attention_norm,
            ffn_norm,
            uses_local_attention,
        })
    }

    fn forward(
        &self,
        hidden_states: &Tensor,
        global_attention_mask: &Tensor,
        local_attention_mask: &Tensor,
    ) -> Result<Tensor> {
        let residual = hidden_states.clone();
        let mut normed = hidden_states.clone();

        if let Some(norm) = &self.attention_norm {
            normed = normed.apply(norm)?;
        }

        let attention_mask = if self.uses_local_attention {
            &global_attention_mask.broadcast_add(local_attention_mask)?
        } else {
            global_attention_mask
        };

        let attention_output = self.attention.forward(&normed, attention_mask)?;
        let hidden_states = (residual + attention_output)?;

        let ffn_output = hidden_states
            .apply(&self.ffn_norm)?
            .apply(&self.feed_forward)?;
        hidden_states + ffn_output
    }
}

/// Task-specific head for sequence classification.
#[derive(Debug, Clone)]
struct ClassificationHead {
    dense: Linear,
    norm: LayerNorm,
    classifier: Linear,
    pooling: ClassifierPooling,
}

impl ClassificationHead {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let dense = linear_no_bias(config.hidden_size, config.hidden_size, vb.pp("head.dense"))?;
        let norm = layer_norm_no_bias(
            config.hidden_size,
            config.layer_norm_eps,
            vb.pp("head.norm"),
        )?;

        let num_labels = config
            .classifier_config
            .as_ref()
            .map_or(0, |c| c.id2label.len());
        let classifier = linear(config.hidden_size, num_labels, vb.pp("classifier"))?;

        let pooling = config
            .classifier_config
            .as_ref()
            .map_or(ClassifierPooling::CLS, |c| c.classifier_pooling);

        Ok(Self {
            dense,
            norm,
            classifier,
            pooling,
        })
    }

    fn forward(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let pooled = match self.pooling {
            ClassifierPooling::CLS => hidden_states.i((.., 0, ..))?,
            ClassifierPooling::MEAN => mean_pool(hidden_states, attention_mask)?,
        };

        pooled
            .apply(&self.dense)?
            .gelu_erf()?
            .apply(&self.norm)?
            .apply(&self.classifier)
    }
}

/// Average hidden states over unpadded positions.
///
/// `hidden_states` has shape `(batch, seq_len, hidden)`, `attention_mask`
/// `(batch, seq_len)` with 1 for real tokens; the result is `(batch, hidden)`.
pub(crate) fn mean_pool(hidden_states: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let mask = attention_mask.unsqueeze(D::Minus1)?.to_dtype(DType::F32)?;
    let sum_hidden = hidden_states.broadcast_mul(&mask)?.sum(1)?;
    let sum_mask = attention_mask.sum_keepdim(1)?.to_dtype(DType::F32)?;
    sum_hidden.broadcast_div(&sum_mask)
}

/// Shared encoder weights, reused across classifier instances.
#[derive(Debug, Clone)]
pub struct ModelWeights {
    embeddings: Embedding,
    embedding_norm: LayerNorm,
    layers: Vec<TransformerLayer>,
    final_norm: LayerNorm,
    local_attention_size: usize,
    device: Device,
    dtype: DType,
}

impl ModelWeights {
    /// Load encoder weights from a checkpoint.
    pub fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let embeddings = embedding(
            config.vocab_size,
            config.hidden_size,
            vb.pp("model.embeddings.tok_embeddings"),
        )?;

        let embedding_norm = layer_norm_no_bias(
            config.hidden_size,
            config.layer_norm_eps,
            vb.pp("model.embeddings.norm"),
        )?;

        let global_rope = Arc::new(RoPE::new(
            vb.dtype(),
            config,
            config.global_rope_theta,
            vb.device(),
        )?);

        let local_rope = Arc::new(RoPE::new(
            vb.dtype(),
            config,
            config.local_rope_theta,
            vb.device(),
        )?);

        let mut layers = Vec::with_capacity(config.num_hidden_layers);
        for layer_idx in 0..config.num_hidden_layers {
            let uses_local_attention = layer_idx % config.global_attn_every_n_layers != 0;
            let rope = if uses_local_attention {
                local_rope.clone()
            } else {
                global_rope.clone()
            };

            layers.push(TransformerLayer::load(
                vb.pp(format!("model.layers.{layer_idx}")),
                config,
                rope,
                uses_local_attention,
            )?);
        }

        let final_norm = layer_norm_no_bias(
            config.hidden_size,
            config.layer_norm_eps,
            vb.pp("model.final_norm"),
        )?;

        Ok(Self {
            embeddings,
            embedding_norm,
            layers,
            final_norm,
            local_attention_size: config.local_attention,
            device: vb.device().clone(),
            dtype: vb.dtype(),
        })
    }

    /// Create global attention mask from padding mask.
    fn create_global_attention_mask(&self, mask: &Tensor) -> Result<Tensor> {
        let (batch_size, seq_len) = mask.dims2()?;

        let expanded_mask = mask
            .unsqueeze(1)?
            .unsqueeze(2)?
            .expand((batch_size, 1, seq_len, seq_len))?
            .to_dtype(self.dtype)?;

        let inverted_mask = (1.0 - expanded_mask)?;
        (inverted_mask * MIN_VALUE_F64)?.to_dtype(self.dtype)
    }

    /// Create local sliding window attention mask.
    fn create_local_attention_mask(&self, seq_len: usize) -> Result<Tensor> {
        let max_distance = self.local_attention_size / 2;
        let mask: Vec<f32> = (0..seq_len)
            .flat_map(|i| {
                (0..seq_len).map(move |j| {
                    if (j as i32 - i as i32).abs() > max_distance as i32 {
                        NEG_INF
                    } else {
                        0.0
                    }
                })
            })
            .collect();

        Tensor::from_slice(&mask, (seq_len, seq_len), &self.device)
    }

    /// Forward pass through the encoder.
    fn forward_base(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let seq_len = input_ids.dim(1)?;

        let global_attention_mask = self.create_global_attention_mask(attention_mask)?;
        let local_attention_mask = self.create_local_attention_mask(seq_len)?;

        let mut hidden_states = input_ids
            .apply(&self.embeddings)?
            .apply(&self.embedding_norm)?;

        for layer in &self.layers {
            hidden_states = layer.forward(
                &hidden_states,
                &global_attention_mask,
                &local_attention_mask,
            )?;
        }

        hidden_states.apply(&self.final_norm)
    }
}

/// ModernBERT base encoder, without any task head.
#[derive(Debug, Clone)]
pub struct ModernBertModel {
    weights: Arc<ModelWeights>,
}

impl ModernBertModel {
    pub fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let weights = Arc::new(ModelWeights::load(vb, config)?);
        Ok(Self { weights })
    }

    /// Hidden states with shape `(batch_size, sequence_length, hidden_size)`.
    pub fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        self.weights.forward_base(input_ids, attention_mask)
    }

    /// Mean-pooled sentence representations, shape `(batch_size, hidden_size)`.
    pub fn forward_mean_pooled(
        &self,
        input_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor> {
        let hidden_states = self.weights.forward_base(input_ids, attention_mask)?;
        mean_pool(&hidden_states, attention_mask)
    }

    pub fn device(&self) -> &Device {
        &self.weights.device
    }
}

/// ModernBERT model with a sequence-classification head.
#[derive(Debug, Clone)]
pub struct ModernBertForSequenceClassification {
    weights: Arc<ModelWeights>,
    head: ClassificationHead,
}

impl ModernBertForSequenceClassification {
    pub fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let weights = Arc::new(ModelWeights::load(vb.clone(), config)?);
        let head = ClassificationHead::load(vb, config)?;
        Ok(Self { weights, head })
    }

    /// Classification logits with shape `(batch_size, num_labels)`.
    pub fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let hidden_states = self.weights.forward_base(input_ids, attention_mask)?;
        self.head.forward(&hidden_states, attention_mask)
    }
}

/*
Checkpoint loading and classifier models
*/

use anyhow::{Context as _, Error as E, Result as AnyhowResult};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::Tokenizer;

use crate::core::cache::ModelOptions;
use crate::core::prediction::Prediction;

/// Where a classifier checkpoint comes from.
///
/// Either a model repo on the Hugging Face hub (e.g.
/// `"clapAI/modernBERT-base-multilingual-sentiment"`) or a local directory
/// containing `config.json`, `tokenizer.json` and the model weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierSource {
    Hub(String),
    Local(PathBuf),
}

impl std::fmt::Display for ClassifierSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierSource::Hub(repo_id) => write!(f, "hub:{repo_id}"),
            ClassifierSource::Local(dir) => write!(f, "local:{}", dir.display()),
        }
    }
}

impl ModelOptions for ClassifierSource {
    fn cache_key(&self) -> String {
        self.to_string()
    }
}

/// Resolved on-disk paths of a checkpoint's parts.
struct CheckpointFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

impl ClassifierSource {
    fn resolve(&self) -> AnyhowResult<CheckpointFiles> {
        match self {
            ClassifierSource::Hub(repo_id) => {
                let api = Api::new()?;
                let repo = api.repo(Repo::new(repo_id.clone(), RepoType::Model));

                let config = repo.get("config.json")?;
                let tokenizer = repo.get("tokenizer.json")?;
                let weights = match repo.get("model.safetensors") {
                    Ok(safetensors) => safetensors,
                    Err(_) => match repo.get("pytorch_model.bin") {
                        Ok(pytorch_model) => pytorch_model,
                        Err(e) => {
                            anyhow::bail!("Model weights not found in repo {repo_id}. Expected `model.safetensors` or `pytorch_model.bin`. Error: {e}")
                        }
                    },
                };

                Ok(CheckpointFiles {
                    config,
                    tokenizer,
                    weights,
                })
            }
            ClassifierSource::Local(dir) => {
                let config = dir.join("config.json");
                let tokenizer = dir.join("tokenizer.json");
                let weights = [dir.join("model.safetensors"), dir.join("pytorch_model.bin")]
                    .into_iter()
                    .find(|p| p.exists())
                    .ok_or_else(|| {
                        E::msg(format!(
                            "Model weights not found in {}. Expected `model.safetensors` or `pytorch_model.bin`.",
                            dir.display()
                        ))
                    })?;

                Ok(CheckpointFiles {
                    config,
                    tokenizer,
                    weights,
                })
            }
        }
    }

    fn load_tokenizer(&self) -> AnyhowResult<Tokenizer> {
        let files = self.resolve()?;
        Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))
    }
}

fn read_config(files: &CheckpointFiles) -> AnyhowResult<(Config, String)> {
    let config_content = std::fs::read_to_string(&files.config).with_context(|| {
        format!("Failed to read config file {}", files.config.display())
    })?;
    let config: Config = serde_json::from_str(&config_content)
        .map_err(|e| E::msg(format!("Failed to parse model config: {e}")))?;
    Ok((config, config_content))
}

fn load_varbuilder(files: &CheckpointFiles, device: &Device) -> AnyhowResult<VarBuilder<'static>> {
    let dtype = DType::F32;
    if files
        .weights
        .extension()
        .is_some_and(|ext| ext == "safetensors")
    {
        Ok(unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], dtype, device)?
        })
    } else if files.weights.extension().is_some_and(|ext| ext == "bin") {
        Ok(VarBuilder::from_pth(&files.weights, dtype, device)?)
    } else {
        anyhow::bail!("Unsupported weight file format: {:?}", files.weights)
    }
}

/// Tokenize a batch: truncate to `max_seq_length`, pad to the longest
/// sequence, and return `(input_ids, attention_mask)` tensors.
pub(crate) fn batch_to_tensors(
    tokenizer: &Tokenizer,
    texts: &[&str],
    max_seq_length: usize,
    device: &Device,
) -> AnyhowResult<(Tensor, Tensor)> {
    let mut encodings = Vec::with_capacity(texts.len());
    for &text in texts {
        let encoding = tokenizer
            .encode(text, true)
            .map_err(|e| E::msg(format!("Tokenization error: {e}")))?;
        encodings.push(encoding);
    }

    let max_len = encodings
        .iter()
        .map(|e| e.len().min(max_seq_length))
        .max()
        .unwrap_or(0);
    let pad_token_id = tokenizer
        .get_padding()
        .map(|p| p.pad_id)
        .or_else(|| tokenizer.token_to_id("<pad>"))
        .or_else(|| tokenizer.token_to_id("[PAD]"))
        .unwrap_or(0);

    let mut all_token_ids: Vec<u32> = Vec::new();
    let mut all_attention_masks: Vec<u32> = Vec::new();

    for encoding in encodings {
        let mut token_ids = encoding.get_ids().to_vec();
        let mut attention_mask = encoding.get_attention_mask().to_vec();

        token_ids.truncate(max_len);
        attention_mask.truncate(max_len);
        token_ids.resize(max_len, pad_token_id);
        attention_mask.resize(max_len, 0);

        all_token_ids.extend(token_ids);
        all_attention_masks.extend(attention_mask);
    }

    let input_ids = Tensor::from_vec(all_token_ids, (texts.len(), max_len), device)?;
    let attention_mask = Tensor::from_vec(all_attention_masks, (texts.len(), max_len), device)?;
    Ok((input_ids, attention_mask))
}

/// Binary text classifier backed by a pretrained sequence-classification
/// checkpoint.
///
/// The positive class is resolved from the checkpoint's `id2label` map: the
/// label named "positive" (case-insensitive) if present, class index 1
/// otherwise. Predictions carry the softmaxed confidence of that class.
#[derive(Clone)]
pub struct ClassifierModernBertModel {
    model: ModernBertForSequenceClassification,
    device: Device,
    positive_index: usize,
    max_seq_length: usize,
}

impl ClassifierModernBertModel {
    pub fn new(source: ClassifierSource, device: Device) -> AnyhowResult<Self> {
        let files = source.resolve()?;
        let (mut config, config_content) = read_config(&files)?;

        // Sentiment and toxicity checkpoints frequently omit label2id or the
        // pooling mode from config.json, so fill the classifier config from
        // whatever is present.
        #[derive(Deserialize)]
        struct ClassifierConfigRaw {
            id2label: HashMap<String, String>,
            classifier_pooling: Option<ClassifierPooling>,
        }
        let class_cfg: ClassifierConfigRaw = serde_json::from_str(&config_content)
            .map_err(|e| E::msg(format!("Failed to parse classifier config: {e}")))?;
        let id2label = class_cfg.id2label;
        let label2id = id2label
            .iter()
            .map(|(id, label)| (label.clone(), id.clone()))
            .collect();
        let classifier_pooling = class_cfg
            .classifier_pooling
            .or_else(|| {
                config
                    .classifier_config
                    .as_ref()
                    .map(|c| c.classifier_pooling)
            })
            .unwrap_or(ClassifierPooling::MEAN);

        let positive_index = resolve_positive_index(&id2label);

        config.classifier_config = Some(ClassifierConfig {
            id2label,
            label2id,
            classifier_pooling,
        });

        let vb = load_varbuilder(&files, &device)?;
        let model = ModernBertForSequenceClassification::load(vb, &config)?;

        tracing::info!(
            source = %source,
            positive_index,
            "loaded sequence-classification checkpoint"
        );

        Ok(Self {
            model,
            device,
            positive_index,
            max_seq_length: DEFAULT_MAX_SEQ_LEN,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn predict(&self, tokenizer: &Tokenizer, text: &str) -> AnyhowResult<Prediction> {
        let mut predictions = self.predict_batch(tokenizer, &[text], 1)?;
        predictions
            .pop()
            .ok_or_else(|| E::msg("empty prediction batch"))
    }

    /// Classify `texts` in chunks of `batch_size`, preserving input order.
    pub fn predict_batch(
        &self,
        tokenizer: &Tokenizer,
        texts: &[&str],
        batch_size: usize,
    ) -> AnyhowResult<Vec<Prediction>> {
        let mut predictions = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size.max(1)) {
            let (input_ids, attention_mask) =
                batch_to_tensors(tokenizer, batch, self.max_seq_length, &self.device)?;
            let logits = self.model.forward(&input_ids, &attention_mask)?;
            let probabilities = softmax(&logits, D::Minus1)?;
            let positive_scores = probabilities
                .i((.., self.positive_index))?
                .to_vec1::<f32>()?;
            for score in positive_scores {
                predictions.push(Prediction::new(score.clamp(0.0, 1.0))?);
            }
        }
        Ok(predictions)
    }

    pub fn get_tokenizer(source: ClassifierSource) -> AnyhowResult<Tokenizer> {
        source.load_tokenizer()
    }
}

/// Label named "positive" wins; otherwise the conventional class index 1.
fn resolve_positive_index(id2label: &HashMap<String, String>) -> usize {
    id2label
        .iter()
        .find(|(_, label)| label.eq_ignore_ascii_case("positive"))
        .and_then(|(id, _)| id.parse::<usize>().ok())
        .unwrap_or(1)
}

impl crate::pipelines::text_classification::model::TextClassificationModel
    for ClassifierModernBertModel
{
    type Options = ClassifierSource;

    fn new(options: Self::Options, device: Device) -> AnyhowResult<Self> {
        ClassifierModernBertModel::new(options, device)
    }

    fn predict(&self, tokenizer: &Tokenizer, text: &str) -> AnyhowResult<Prediction> {
        self.predict(tokenizer, text)
    }

    fn predict_batch(
        &self,
        tokenizer: &Tokenizer,
        texts: &[&str],
        batch_size: usize,
    ) -> AnyhowResult<Vec<Prediction>> {
        self.predict_batch(tokenizer, texts, batch_size)
    }

    fn get_tokenizer(options: Self::Options) -> AnyhowResult<Tokenizer> {
        Self::get_tokenizer(options)
    }

    fn device(&self) -> &Device {
        self.device()
    }
}

/// Options for a fine-tuned classifier: the base encoder checkpoint plus the
/// head artifact produced by [`HeadTrainer`](crate::train::HeadTrainer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FineTunedClassifierOptions {
    pub base: ClassifierSource,
    pub head: PathBuf,
}

impl ModelOptions for FineTunedClassifierOptions {
    fn cache_key(&self) -> String {
        format!("{}+head:{}", self.base, self.head.display())
    }
}

/// Binary text classifier combining a frozen base encoder with a locally
/// trained classification head.
#[derive(Clone)]
pub struct FineTunedModernBertModel {
    encoder: ModernBertModel,
    head: crate::train::TrainedHead,
    device: Device,
    max_seq_length: usize,
}

impl FineTunedModernBertModel {
    pub fn new(options: FineTunedClassifierOptions, device: Device) -> AnyhowResult<Self> {
        let files = options.base.resolve()?;
        let (config, _) = read_config(&files)?;
        let vb = load_varbuilder(&files, &device)?;
        let encoder = ModernBertModel::load(vb, &config)?;
        let head = crate::train::TrainedHead::load(&options.head, config.hidden_size, &device)?;

        tracing::info!(
            base = %options.base,
            head = %options.head.display(),
            "loaded fine-tuned classifier"
        );

        Ok(Self {
            encoder,
            head,
            device,
            max_seq_length: DEFAULT_MAX_SEQ_LEN,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn predict_batch(
        &self,
        tokenizer: &Tokenizer,
        texts: &[&str],
        batch_size: usize,
    ) -> AnyhowResult<Vec<Prediction>> {
        let mut predictions = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size.max(1)) {
            let (input_ids, attention_mask) =
                batch_to_tensors(tokenizer, batch, self.max_seq_length, &self.device)?;
            let pooled = self
                .encoder
                .forward_mean_pooled(&input_ids, &attention_mask)?;
            for score in self.head.positive_scores(&pooled)? {
                predictions.push(Prediction::new(score.clamp(0.0, 1.0))?);
            }
        }
        Ok(predictions)
    }
}

impl crate::pipelines::text_classification::model::TextClassificationModel
    for FineTunedModernBertModel
{
    type Options = FineTunedClassifierOptions;

    fn new(options: Self::Options, device: Device) -> AnyhowResult<Self> {
        FineTunedModernBertModel::new(options, device)
    }

    fn predict(&self, tokenizer: &Tokenizer, text: &str) -> AnyhowResult<Prediction> {
        let mut predictions = self.predict_batch(tokenizer, &[text], 1)?;
        predictions
            .pop()
            .ok_or_else(|| E::msg("empty prediction batch"))
    }

    fn predict_batch(
        &self,
        tokenizer: &Tokenizer,
        texts: &[&str],
        batch_size: usize,
    ) -> AnyhowResult<Vec<Prediction>> {
        self.predict_batch(tokenizer, texts, batch_size)
    }

    fn get_tokenizer(options: Self::Options) -> AnyhowResult<Tokenizer> {
        options.base.load_tokenizer()
    }

    fn device(&self) -> &Device {
        self.device()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_index_prefers_named_label() {
        let id2label: HashMap<String, String> = [
            ("0".to_string(), "positive".to_string()),
            ("1".to_string(), "negative".to_string()),
        ]
        .into();
        assert_eq!(resolve_positive_index(&id2label), 0);
    }

    #[test]
    fn positive_index_defaults_to_one() {
        let id2label: HashMap<String, String> = [
            ("0".to_string(), "LABEL_0".to_string()),
            ("1".to_string(), "LABEL_1".to_string()),
        ]
        .into();
        assert_eq!(resolve_positive_index(&id2label), 1);
    }

    // A tiny whitespace word-level tokenizer, enough to exercise padding
    // and truncation without a real vocabulary.
    fn toy_tokenizer() -> Tokenizer {
        use std::str::FromStr;

        let spec = r#"{
            "version": "1.0",
            "pre_tokenizer": { "type": "Whitespace" },
            "model": {
                "type": "WordLevel",
                "vocab": { "[UNK]": 0, "hello": 1, "world": 2, "again": 3, "a": 4 },
                "unk_token": "[UNK]"
            }
        }"#;
        Tokenizer::from_str(spec).unwrap()
    }

    #[test]
    fn batch_tensors_pad_to_longest() {
        let tokenizer = toy_tokenizer();

        let (input_ids, attention_mask) = batch_to_tensors(
            &tokenizer,
            &["hello world again", "hello"],
            128,
            &Device::Cpu,
        )
        .unwrap();

        assert_eq!(input_ids.dims(), &[2, 3]);
        let mask = attention_mask.to_vec2::<u32>().unwrap();
        assert_eq!(mask[0], vec![1, 1, 1]);
        assert_eq!(mask[1], vec![1, 0, 0]);
    }

    #[test]
    fn batch_tensors_respect_max_seq_length() {
        let tokenizer = toy_tokenizer();

        let long_text = ["a"; 40].join(" ");
        let (input_ids, _) =
            batch_to_tensors(&tokenizer, &[long_text.as_str()], 8, &Device::Cpu).unwrap();
        assert_eq!(input_ids.dims(), &[1, 8]);
    }
}
