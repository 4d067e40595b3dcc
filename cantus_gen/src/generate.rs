// Greedy autoregressive generation from a seed context window.
//
// The generator keeps an append-only buffer of one-hot vectors, initialized
// from the seed. Each step feeds the last `seq_length` entries to the model,
// takes the stable argmax of the returned distribution (lowest index wins
// ties — no sampling, no temperature), decodes it through the vocabulary,
// and appends both the token and its re-encoded one-hot. A prediction the
// vocabulary cannot decode aborts the whole run; no default token is ever
// substituted.

use crate::vocab::{Vocabulary, VocabError, argmax};
use cantus_model::{ModelError, SequenceModel};
use ndarray::{Array1, Array2};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("seed context has no rows")]
    EmptySeed,
    #[error("seed one-hot width {got} does not match vocabulary size {vocab_size}")]
    SeedWidthMismatch { got: usize, vocab_size: usize },
    #[error("model predicts over {model_classes} classes but the vocabulary has {vocab_size}")]
    VocabularyMismatch {
        model_classes: usize,
        vocab_size: usize,
    },
    #[error("model returned a distribution of {got} components, expected {vocab_size}")]
    DistributionMismatch { got: usize, vocab_size: usize },
    #[error("predicted index {index} has no token in a vocabulary of {vocab_size}")]
    PredictedIndexOutOfRange { index: usize, vocab_size: usize },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Vocab(#[from] VocabError),
}

/// Extend a seed context by `num_steps` greedily chosen tokens.
///
/// `seed` is a `(seq_length, vocab_size)` one-hot window, typically a
/// training window's context. The result always has exactly
/// `seed.nrows() + num_steps` tokens: the decoded seed followed by the new
/// tokens in generation order. `num_steps == 0` returns just the decoded
/// seed.
pub fn generate(
    model: &dyn SequenceModel,
    vocab: &Vocabulary,
    seed: &Array2<f32>,
    num_steps: usize,
) -> Result<Vec<String>, GenerateError> {
    let seq_length = seed.nrows();
    if seq_length == 0 {
        return Err(GenerateError::EmptySeed);
    }
    if seed.ncols() != vocab.len() {
        return Err(GenerateError::SeedWidthMismatch {
            got: seed.ncols(),
            vocab_size: vocab.len(),
        });
    }
    if model.num_classes() != vocab.len() {
        return Err(GenerateError::VocabularyMismatch {
            model_classes: model.num_classes(),
            vocab_size: vocab.len(),
        });
    }

    // Decode the seed itself: argmax of each one-hot row, mapped back
    // through the vocabulary.
    let mut generated = Vec::with_capacity(seq_length + num_steps);
    let mut buffer: Vec<Array1<f32>> = Vec::with_capacity(seq_length + num_steps);
    for row in seed.rows() {
        let index = argmax(row).ok_or(GenerateError::EmptySeed)?;
        let token = vocab
            .token_at(index)
            .ok_or(GenerateError::PredictedIndexOutOfRange {
                index,
                vocab_size: vocab.len(),
            })?;
        generated.push(token.to_string());
        buffer.push(row.to_owned());
    }

    for _ in 0..num_steps {
        // Only the tail of the buffer is model input: the window is always
        // exactly seq_length entries even as the buffer grows.
        let mut window = Array2::zeros((seq_length, vocab.len()));
        for (t, one_hot) in buffer[buffer.len() - seq_length..].iter().enumerate() {
            window.row_mut(t).assign(one_hot);
        }

        let distribution = model.predict(&window)?;
        if distribution.len() != vocab.len() {
            return Err(GenerateError::DistributionMismatch {
                got: distribution.len(),
                vocab_size: vocab.len(),
            });
        }
        let index = argmax(distribution.view()).ok_or(GenerateError::DistributionMismatch {
            got: 0,
            vocab_size: vocab.len(),
        })?;
        let token = vocab
            .token_at(index)
            .ok_or(GenerateError::PredictedIndexOutOfRange {
                index,
                vocab_size: vocab.len(),
            })?;

        generated.push(token.to_string());
        buffer.push(vocab.one_hot(index)?);
    }

    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::slide;
    use cantus_model::{FitReport, SoftmaxRegression, TrainOptions};

    /// Stub model that always predicts `(argmax of last context row + 1)
    /// modulo the class count`, i.e. walks the vocabulary cyclically.
    struct CycleModel {
        classes: usize,
        /// Lets tests lie about the distribution width.
        distribution_len: usize,
    }

    impl CycleModel {
        fn new(classes: usize) -> Self {
            CycleModel {
                classes,
                distribution_len: classes,
            }
        }
    }

    impl SequenceModel for CycleModel {
        fn num_classes(&self) -> usize {
            self.classes
        }

        fn fit(
            &mut self,
            _contexts: &[Array2<f32>],
            _targets: &[usize],
            options: &TrainOptions,
        ) -> Result<FitReport, ModelError> {
            Ok(FitReport {
                epochs: options.epochs,
                training_samples: 0,
                validation_samples: 0,
                final_loss: 0.0,
                validation_loss: None,
            })
        }

        fn predict(&self, context: &Array2<f32>) -> Result<Array1<f32>, ModelError> {
            let last = context.row(context.nrows() - 1);
            let current = argmax(last).unwrap_or(0);
            let mut distribution = Array1::zeros(self.distribution_len);
            distribution[(current + 1) % self.distribution_len] = 1.0;
            Ok(distribution)
        }
    }

    fn seed_from(indices: &[usize], vocab: &Vocabulary) -> Array2<f32> {
        let mut seed = Array2::zeros((indices.len(), vocab.len()));
        for (t, &idx) in indices.iter().enumerate() {
            seed[[t, idx]] = 1.0;
        }
        seed
    }

    fn triad_vocab() -> Vocabulary {
        Vocabulary::build(["C4", "E4", "G4"])
    }

    #[test]
    fn test_zero_steps_returns_decoded_seed() {
        let vocab = triad_vocab();
        let model = CycleModel::new(3);
        let seed = seed_from(&[0, 1, 2], &vocab);
        let out = generate(&model, &vocab, &seed, 0).unwrap();
        assert_eq!(out, ["C4", "E4", "G4"]);
    }

    #[test]
    fn test_output_length_is_seed_plus_steps() {
        let vocab = triad_vocab();
        let model = CycleModel::new(3);
        let seed = seed_from(&[0, 1, 2], &vocab);
        for steps in [1, 5, 17] {
            let out = generate(&model, &vocab, &seed, steps).unwrap();
            assert_eq!(out.len(), 3 + steps);
        }
    }

    #[test]
    fn test_rolling_window_follows_the_cycle() {
        let vocab = triad_vocab();
        let model = CycleModel::new(3);
        let seed = seed_from(&[0, 1, 2], &vocab);
        let out = generate(&model, &vocab, &seed, 6).unwrap();
        assert_eq!(
            out,
            ["C4", "E4", "G4", "C4", "E4", "G4", "C4", "E4", "G4"]
        );
    }

    #[test]
    fn test_empty_seed_is_rejected() {
        let vocab = triad_vocab();
        let model = CycleModel::new(3);
        let seed = Array2::zeros((0, 3));
        assert!(matches!(
            generate(&model, &vocab, &seed, 1),
            Err(GenerateError::EmptySeed)
        ));
    }

    #[test]
    fn test_seed_width_must_match_vocabulary() {
        let vocab = triad_vocab();
        let model = CycleModel::new(3);
        let seed = Array2::zeros((2, 4));
        assert!(matches!(
            generate(&model, &vocab, &seed, 1),
            Err(GenerateError::SeedWidthMismatch { got: 4, vocab_size: 3 })
        ));
    }

    #[test]
    fn test_model_vocabulary_mismatch_is_fatal() {
        let vocab = triad_vocab();
        let model = CycleModel::new(5);
        let seed = seed_from(&[0, 1, 2], &vocab);
        assert!(matches!(
            generate(&model, &vocab, &seed, 1),
            Err(GenerateError::VocabularyMismatch {
                model_classes: 5,
                vocab_size: 3
            })
        ));
    }

    #[test]
    fn test_oversized_distribution_is_fatal() {
        let vocab = triad_vocab();
        let mut model = CycleModel::new(3);
        model.distribution_len = 4;
        let seed = seed_from(&[0, 1, 2], &vocab);
        assert!(matches!(
            generate(&model, &vocab, &seed, 1),
            Err(GenerateError::DistributionMismatch { got: 4, vocab_size: 3 })
        ));
    }

    #[test]
    fn test_end_to_end_memorized_cycle() {
        // Train on C4 E4 G4 C4 E4 G4 C4 with seq_length 3; greedy generation
        // from the first window must reproduce the memorized cycle.
        let tokens: Vec<String> = ["C4", "E4", "G4", "C4", "E4", "G4", "C4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let vocab = Vocabulary::build(&tokens);
        assert_eq!(vocab.len(), 3);

        let encoded = vocab.encode(&tokens).unwrap();
        let set = slide(&encoded, 3, vocab.len()).unwrap();
        assert_eq!(set.len(), 4);

        let mut model = SoftmaxRegression::new(3, 3, Some(7));
        let options = TrainOptions {
            epochs: 300,
            batch_size: 4,
            validation_fraction: 0.0,
            learning_rate: 0.5,
        };
        model.fit(&set.contexts, &set.targets, &options).unwrap();

        let out = generate(&model, &vocab, &set.contexts[0], 6).unwrap();
        assert_eq!(
            out,
            ["C4", "E4", "G4", "C4", "E4", "G4", "C4", "E4", "G4"]
        );
    }
}
