// Token vocabulary: the bijection between corpus tokens and dense indices.
//
// Built once per training run from the sorted set of distinct tokens, so the
// mapping is deterministic across runs regardless of first-occurrence order,
// then held immutable: the same vocabulary encodes the corpus for windowing
// and decodes predicted indices during generation.

use ndarray::{Array1, ArrayView1};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabError {
    #[error("token '{0}' is not in the vocabulary")]
    UnknownToken(String),
    #[error("index {index} is out of range for a vocabulary of {vocab_size}")]
    IndexOutOfRange { index: usize, vocab_size: usize },
}

/// Immutable token ↔ index mapping over `[0, len)`.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build from an ordered token stream. Indices are assigned by iterating
    /// the sorted distinct-token set. An empty stream yields an empty
    /// vocabulary; downstream stages must check for that, not this one.
    pub fn build<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .collect();
        let tokens: Vec<String> = distinct.into_iter().collect();
        let index = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        Vocabulary { tokens, index }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    pub fn token_at(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// Encode a token stream to indices. The vocabulary is closed: a token
    /// it was not built from is an error, not a new entry.
    pub fn encode(&self, tokens: &[String]) -> Result<Vec<usize>, VocabError> {
        tokens
            .iter()
            .map(|t| {
                self.index_of(t)
                    .ok_or_else(|| VocabError::UnknownToken(t.clone()))
            })
            .collect()
    }

    /// One-hot vector of length `len()` for a vocabulary index.
    pub fn one_hot(&self, index: usize) -> Result<Array1<f32>, VocabError> {
        if index >= self.len() {
            return Err(VocabError::IndexOutOfRange {
                index,
                vocab_size: self.len(),
            });
        }
        let mut v = Array1::zeros(self.len());
        v[index] = 1.0;
        Ok(v)
    }
}

/// Index of the maximum component, ties broken by lowest index.
/// `None` only for an empty vector.
pub fn argmax(v: ArrayView1<f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &x) in v.iter().enumerate() {
        match best {
            Some((_, b)) if x <= b => {}
            _ => best = Some((i, x)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        ["C4", "E4", "G4", "C4", "E4", "G4", "C4"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_size_is_distinct_count_and_sorted() {
        let vocab = Vocabulary::build(&corpus());
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.index_of("C4"), Some(0));
        assert_eq!(vocab.index_of("E4"), Some(1));
        assert_eq!(vocab.index_of("G4"), Some(2));
    }

    #[test]
    fn test_order_independent() {
        let forward = Vocabulary::build(["A3", "0.4.7", "C4"]);
        let backward = Vocabulary::build(["C4", "A3", "0.4.7", "A3"]);
        assert_eq!(forward.len(), backward.len());
        for token in ["A3", "0.4.7", "C4"] {
            assert_eq!(forward.index_of(token), backward.index_of(token));
        }
    }

    #[test]
    fn test_round_trip_law() {
        let vocab = Vocabulary::build(&corpus());
        for token in corpus() {
            let idx = vocab.index_of(&token).unwrap();
            assert_eq!(vocab.token_at(idx), Some(token.as_str()));
        }
    }

    #[test]
    fn test_empty_corpus_yields_empty_vocabulary() {
        let vocab = Vocabulary::build(Vec::<String>::new());
        assert!(vocab.is_empty());
        assert_eq!(vocab.len(), 0);
        assert_eq!(vocab.token_at(0), None);
    }

    #[test]
    fn test_encode_rejects_unseen_token() {
        let vocab = Vocabulary::build(&corpus());
        let err = vocab.encode(&["B4".to_string()]).unwrap_err();
        assert_eq!(err, VocabError::UnknownToken("B4".to_string()));
    }

    #[test]
    fn test_one_hot_has_exactly_one_component() {
        let vocab = Vocabulary::build(&corpus());
        for idx in 0..vocab.len() {
            let v = vocab.one_hot(idx).unwrap();
            assert_eq!(v.len(), vocab.len());
            assert_eq!(v.iter().filter(|&&x| x == 1.0).count(), 1);
            assert_eq!(v.iter().filter(|&&x| x == 0.0).count(), vocab.len() - 1);
            assert_eq!(argmax(v.view()), Some(idx));
        }
    }

    #[test]
    fn test_one_hot_rejects_out_of_range_index() {
        let vocab = Vocabulary::build(&corpus());
        let err = vocab.one_hot(3).unwrap_err();
        assert_eq!(
            err,
            VocabError::IndexOutOfRange {
                index: 3,
                vocab_size: 3
            }
        );
    }

    #[test]
    fn test_argmax_is_stable() {
        let v = Array1::from_vec(vec![0.25f32, 0.25, 0.25, 0.25]);
        assert_eq!(argmax(v.view()), Some(0));
        let v = Array1::from_vec(vec![0.1f32, 0.4, 0.4, 0.1]);
        assert_eq!(argmax(v.view()), Some(1));
        assert_eq!(argmax(Array1::<f32>::from_vec(vec![]).view()), None);
    }
}
