// Trainable next-token classifier for the Cantus music pipeline.
//
// The pipeline talks to the model through the `SequenceModel` trait: `fit`
// on (context, target) training windows, `predict` for a probability
// distribution over the vocabulary. The provided implementation,
// `SoftmaxRegression`, flattens the one-hot context window into a single
// feature vector and trains a linear layer + softmax with minibatch SGD and
// cross-entropy loss. It is deliberately small: the pipeline only requires
// that `predict` is deterministic for a fixed trained state and returns a
// distribution over exactly `num_classes` classes.
//
// All randomness (weight init, minibatch shuffling) comes from a `StdRng`
// owned by the model, so a seeded model trains reproducibly.

use ndarray::{Array1, Array2};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Floor added to probabilities before taking the log, so a confidently
/// wrong prediction cannot produce an infinite loss.
const LOSS_EPSILON: f32 = 1e-9;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no training windows (need at least one (context, target) pair)")]
    EmptyTrainingSet,
    #[error("context has shape ({rows}, {cols}), model expects ({expected_rows}, {expected_cols})")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
    #[error("target class {class} is out of range for {num_classes} classes")]
    ClassOutOfRange { class: usize, num_classes: usize },
    #[error("{contexts} contexts but {targets} targets")]
    LengthMismatch { contexts: usize, targets: usize },
}

/// Training hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    /// Number of full passes over the training windows.
    pub epochs: usize,
    /// Minibatch size. Values larger than the training set collapse to
    /// full-batch gradient descent.
    pub batch_size: usize,
    /// Fraction of windows held out (from the tail, before shuffling) for
    /// validation loss reporting. 0.0 disables the split.
    pub validation_fraction: f32,
    /// SGD learning rate.
    pub learning_rate: f32,
}

impl Default for TrainOptions {
    fn default() -> Self {
        TrainOptions {
            epochs: 50,
            batch_size: 128,
            validation_fraction: 0.2,
            learning_rate: 0.1,
        }
    }
}

/// What a call to `fit` did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {
    pub epochs: usize,
    pub training_samples: usize,
    pub validation_samples: usize,
    /// Mean cross-entropy over the training windows in the final epoch.
    pub final_loss: f32,
    /// Mean cross-entropy over the held-out windows, if any were held out.
    pub validation_loss: Option<f32>,
}

/// The boundary the pipeline trains and queries through.
///
/// Contexts are one-hot windows of shape `(seq_length, num_classes)`;
/// targets are raw class indices. One-hot expansion of the targets happens
/// inside `fit`, not in the caller.
pub trait SequenceModel {
    /// Number of output classes (the vocabulary size the model was built for).
    fn num_classes(&self) -> usize;

    /// Train on the given windows. Errors on an empty training set or any
    /// shape/class mismatch, before touching the parameters.
    fn fit(
        &mut self,
        contexts: &[Array2<f32>],
        targets: &[usize],
        options: &TrainOptions,
    ) -> Result<FitReport, ModelError>;

    /// Probability distribution over `num_classes()` classes for one context.
    /// Deterministic for a fixed trained state; components sum to 1.
    fn predict(&self, context: &Array2<f32>) -> Result<Array1<f32>, ModelError>;
}

/// Linear layer + softmax over the flattened context window.
#[derive(Debug, Clone)]
pub struct SoftmaxRegression {
    seq_length: usize,
    num_classes: usize,
    /// Shape `(num_classes, seq_length * num_classes)`.
    weights: Array2<f32>,
    bias: Array1<f32>,
    rng: StdRng,
}

impl SoftmaxRegression {
    /// Build an untrained model for `seq_length`-step contexts over
    /// `num_classes` classes. A seed makes init and training reproducible.
    pub fn new(seq_length: usize, num_classes: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        let features = seq_length * num_classes;
        let weights =
            Array2::from_shape_fn((num_classes, features), |_| rng.random_range(-0.05..0.05f32));
        SoftmaxRegression {
            seq_length,
            num_classes,
            weights,
            bias: Array1::zeros(num_classes),
            rng,
        }
    }

    pub fn seq_length(&self) -> usize {
        self.seq_length
    }

    fn check_context(&self, context: &Array2<f32>) -> Result<(), ModelError> {
        if context.nrows() != self.seq_length || context.ncols() != self.num_classes {
            return Err(ModelError::ShapeMismatch {
                rows: context.nrows(),
                cols: context.ncols(),
                expected_rows: self.seq_length,
                expected_cols: self.num_classes,
            });
        }
        Ok(())
    }

    fn forward(&self, x: &Array1<f32>) -> Array1<f32> {
        softmax(self.weights.dot(x) + &self.bias)
    }
}

impl SequenceModel for SoftmaxRegression {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn fit(
        &mut self,
        contexts: &[Array2<f32>],
        targets: &[usize],
        options: &TrainOptions,
    ) -> Result<FitReport, ModelError> {
        if contexts.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if contexts.len() != targets.len() {
            return Err(ModelError::LengthMismatch {
                contexts: contexts.len(),
                targets: targets.len(),
            });
        }
        for context in contexts {
            self.check_context(context)?;
        }
        for &target in targets {
            if target >= self.num_classes {
                return Err(ModelError::ClassOutOfRange {
                    class: target,
                    num_classes: self.num_classes,
                });
            }
        }

        let xs: Vec<Array1<f32>> = contexts.iter().map(flatten).collect();
        let n = xs.len();
        // Hold out the tail, matching the convention of splitting before
        // any shuffling so the validation set is stable across runs.
        let n_val = (((n as f32) * options.validation_fraction).floor() as usize).min(n - 1);
        let n_train = n - n_val;
        let batch = options.batch_size.max(1);

        let mut order: Vec<usize> = (0..n_train).collect();
        let mut final_loss = 0.0f32;
        for _ in 0..options.epochs {
            order.shuffle(&mut self.rng);
            let mut epoch_loss = 0.0f32;
            for chunk in order.chunks(batch) {
                let mut grad_w = Array2::<f32>::zeros(self.weights.dim());
                let mut grad_b = Array1::<f32>::zeros(self.num_classes);
                for &i in chunk {
                    let probs = self.forward(&xs[i]);
                    epoch_loss -= (probs[targets[i]] + LOSS_EPSILON).ln();
                    // Cross-entropy gradient: predicted minus one-hot target.
                    let mut delta = probs;
                    delta[targets[i]] -= 1.0;
                    for (j, &xj) in xs[i].iter().enumerate() {
                        if xj == 0.0 {
                            continue;
                        }
                        for c in 0..self.num_classes {
                            grad_w[[c, j]] += delta[c] * xj;
                        }
                    }
                    grad_b += &delta;
                }
                let scale = options.learning_rate / chunk.len() as f32;
                self.weights.scaled_add(-scale, &grad_w);
                self.bias.scaled_add(-scale, &grad_b);
            }
            final_loss = epoch_loss / n_train as f32;
        }

        let validation_loss = if n_val > 0 {
            let mut loss = 0.0f32;
            for i in n_train..n {
                let probs = self.forward(&xs[i]);
                loss -= (probs[targets[i]] + LOSS_EPSILON).ln();
            }
            Some(loss / n_val as f32)
        } else {
            None
        };

        Ok(FitReport {
            epochs: options.epochs,
            training_samples: n_train,
            validation_samples: n_val,
            final_loss,
            validation_loss,
        })
    }

    fn predict(&self, context: &Array2<f32>) -> Result<Array1<f32>, ModelError> {
        self.check_context(context)?;
        Ok(self.forward(&flatten(context)))
    }
}

/// Flatten a `(seq_length, num_classes)` window into one feature vector,
/// row-major (time-major) order.
fn flatten(context: &Array2<f32>) -> Array1<f32> {
    Array1::from_iter(context.iter().copied())
}

fn softmax(mut logits: Array1<f32>) -> Array1<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    logits.mapv_inplace(|v| (v - max).exp());
    let sum = logits.sum();
    if sum > 0.0 {
        logits /= sum;
    }
    logits
}
