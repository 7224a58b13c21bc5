use serde::Deserialize;

/// Hyper-parameters for fine-tuning a classification head.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Inputs longer than this many subword tokens are truncated.
    pub max_seq_length: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 5,
            batch_size: 32,
            learning_rate: 5e-5,
            max_seq_length: 128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: TrainingConfig = serde_json::from_str(r#"{"epochs": 2}"#).unwrap();
        assert_eq!(config.epochs, 2);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.max_seq_length, 128);
    }
}
