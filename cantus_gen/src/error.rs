// Pipeline-level error taxonomy and the render report.
//
// Structural failures (corpus, windowing, training, generation) are fatal
// and carry their stage so a failed run can say where it died. Per-token
// decode failures during rendering are not errors at all: they are collected
// into a `RenderReport` the caller can inspect or serialize, and the rest of
// the sequence still renders.

use crate::corpus::CorpusError;
use crate::generate::GenerateError;
use crate::midi::MidiError;
use crate::vocab::VocabError;
use crate::window::WindowError;
use cantus_model::ModelError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("loading corpus: {0}")]
    Corpus(#[from] CorpusError),
    #[error("encoding corpus: {0}")]
    Vocab(#[from] VocabError),
    #[error("windowing: {0}")]
    Window(#[from] WindowError),
    #[error("insufficient training data: {0}")]
    InsufficientData(String),
    #[error("training: {0}")]
    Train(#[from] ModelError),
    #[error("generating: {0}")]
    Generate(#[from] GenerateError),
    #[error("rendering: {0}")]
    Render(#[from] MidiError),
    #[error("writing token list: {0}")]
    TokenList(#[source] std::io::Error),
}

impl PipelineError {
    /// Which pipeline stage failed, for user-facing reporting.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "configuration",
            PipelineError::Corpus(_) | PipelineError::TokenList(_) => "loading",
            PipelineError::Vocab(_)
            | PipelineError::Window(_)
            | PipelineError::InsufficientData(_) => "windowing",
            PipelineError::Train(_) => "training",
            PipelineError::Generate(_) => "generating",
            PipelineError::Render(_) => "rendering",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// One token that failed to decode during rendering, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedToken {
    /// Position in the generated sequence.
    pub position: usize,
    pub token: String,
    pub reason: String,
}

/// Outcome of rendering a generated sequence: how many tokens made it into
/// the MIDI output, and which were skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderReport {
    pub rendered: usize,
    pub skipped: Vec<SkippedToken>,
}
