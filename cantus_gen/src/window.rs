// Sliding training windows over the encoded corpus.
//
// The encoded token stream is cut into (context, target) pairs by sliding a
// window of `seq_length` positions forward one step at a time: the context
// is the one-hot encoding of `stream[i..i + seq_length]`, the target is the
// raw index at `stream[i + seq_length]`. A stream of length `n` therefore
// yields exactly `n - seq_length` windows, in corpus order. Targets stay raw
// here; one-hot expansion over the vocabulary happens inside model training.

use ndarray::Array2;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("sequence length must be at least 1")]
    ZeroSeqLength,
    #[error("stream index {index} at position {position} is out of range for vocabulary size {vocab_size}")]
    IndexOutOfRange {
        index: usize,
        position: usize,
        vocab_size: usize,
    },
}

/// All (context, target) pairs for one corpus, in corpus order.
/// `contexts[i]` has shape `(seq_length, vocab_size)` and predicts
/// `targets[i]`.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub contexts: Vec<Array2<f32>>,
    pub targets: Vec<usize>,
    pub seq_length: usize,
    pub vocab_size: usize,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// True when the stream was too short to produce a single window.
    /// Training on an empty set must be rejected by the caller, not papered
    /// over.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Slide a `seq_length` window across the encoded stream.
///
/// A stream no longer than `seq_length` produces an empty set — a valid
/// outcome, distinct from the error cases (zero window length, or an index
/// outside the vocabulary, which can only mean the stream and vocabulary
/// disagree).
pub fn slide(
    encoded: &[usize],
    seq_length: usize,
    vocab_size: usize,
) -> Result<TrainingSet, WindowError> {
    if seq_length == 0 {
        return Err(WindowError::ZeroSeqLength);
    }
    for (position, &index) in encoded.iter().enumerate() {
        if index >= vocab_size {
            return Err(WindowError::IndexOutOfRange {
                index,
                position,
                vocab_size,
            });
        }
    }

    let num_windows = encoded.len().saturating_sub(seq_length);
    let mut contexts = Vec::with_capacity(num_windows);
    let mut targets = Vec::with_capacity(num_windows);
    for i in 0..num_windows {
        let mut context = Array2::zeros((seq_length, vocab_size));
        for (t, &index) in encoded[i..i + seq_length].iter().enumerate() {
            context[[t, index]] = 1.0;
        }
        contexts.push(context);
        targets.push(encoded[i + seq_length]);
    }

    Ok(TrainingSet {
        contexts,
        targets,
        seq_length,
        vocab_size,
    })
}
