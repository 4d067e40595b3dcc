// Pipeline configuration.
//
// Every tunable of the pipeline lives in `PipelineConfig`, loadable from a
// JSON file and overridable from the command line — the pipeline itself
// never reads magic numbers. Defaults match the reference setup: 100-token
// context windows, 50 epochs, batch size 128, 20% validation split, 100
// generated tokens.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root directory scanned recursively for .mid/.midi files.
    pub dataset_path: PathBuf,
    /// Optional plain-text artifact listing the flattened corpus tokens.
    pub output_file: Option<PathBuf>,
    /// Path of the generated MIDI file.
    pub midi_output: PathBuf,
    /// Context window length fed to the model.
    pub seq_length: usize,
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of training windows held out for validation loss.
    pub validation_fraction: f32,
    pub learning_rate: f32,
    /// New tokens to generate after the seed window.
    pub num_steps: usize,
    /// Seed for reproducible training; entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            dataset_path: PathBuf::from("dataset"),
            output_file: None,
            midi_output: PathBuf::from("generated_music.mid"),
            seq_length: 100,
            epochs: 50,
            batch_size: 128,
            validation_fraction: 0.2,
            learning_rate: 0.1,
            num_steps: 100,
            seed: None,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// The training-time subset, in the model crate's terms.
    pub fn train_options(&self) -> cantus_model::TrainOptions {
        cantus_model::TrainOptions {
            epochs: self.epochs,
            batch_size: self.batch_size,
            validation_fraction: self.validation_fraction,
            learning_rate: self.learning_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.seq_length, 100);
        assert_eq!(config.epochs, 50);
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.validation_fraction, 0.2);
        assert_eq!(config.num_steps, 100);
        assert_eq!(config.midi_output, PathBuf::from("generated_music.mid"));
        assert!(config.output_file.is_none());
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"dataset_path": "corpus", "epochs": 5}"#).unwrap();
        assert_eq!(config.dataset_path, PathBuf::from("corpus"));
        assert_eq!(config.epochs, 5);
        assert_eq!(config.seq_length, 100);
    }

    #[test]
    fn test_train_options_mapping() {
        let config = PipelineConfig {
            epochs: 3,
            batch_size: 16,
            validation_fraction: 0.5,
            learning_rate: 0.01,
            ..PipelineConfig::default()
        };
        let options = config.train_options();
        assert_eq!(options.epochs, 3);
        assert_eq!(options.batch_size, 16);
        assert_eq!(options.validation_fraction, 0.5);
        assert_eq!(options.learning_rate, 0.01);
    }
}
