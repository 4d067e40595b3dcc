// Corpus loading: recursive dataset scan and token flattening.
//
// Any file under the dataset root with a .mid or .midi extension (case
// insensitive) is parsed; everything else is silently ignored. Files that
// fail to parse are logged and skipped — one corrupt download must not kill
// a corpus load — but a corpus that yields zero tokens is fatal: there is
// nothing to train on and the pipeline should stop before wasting time.
//
// Scan order is sorted by path so the flattened token stream (and therefore
// the vocabulary and the windows) is deterministic across runs.

use crate::events::MusicEvent;
use crate::midi;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("cannot walk dataset directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("no note or chord tokens found under {}", root.display())]
    Empty { root: PathBuf },
}

/// All MIDI files under `root`, recursively, in sorted path order.
pub fn scan_dataset(root: &Path) -> Result<Vec<PathBuf>, CorpusError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_file() && has_midi_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn has_midi_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mid") || e.eq_ignore_ascii_case("midi"))
}

/// Scan the dataset and flatten every parseable file's events into one
/// token stream, in file order. Rests produce no tokens.
pub fn load_corpus(root: &Path) -> Result<Vec<String>, CorpusError> {
    let files = scan_dataset(root)?;
    let mut tokens = Vec::new();
    for path in &files {
        match midi::load_events(path) {
            Ok(events) => {
                let before = tokens.len();
                tokens.extend(events.iter().filter_map(MusicEvent::to_token));
                debug!(
                    path = %path.display(),
                    tokens = tokens.len() - before,
                    "loaded MIDI file"
                );
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable MIDI file");
            }
        }
    }
    if tokens.is_empty() {
        return Err(CorpusError::Empty {
            root: root.to_path_buf(),
        });
    }
    Ok(tokens)
}

/// Persist the flattened token list as a plain-text artifact, one token per
/// line.
pub fn save_token_list(tokens: &[String], path: &Path) -> std::io::Result<()> {
    let mut text = tokens.join("\n");
    text.push('\n');
    std::fs::write(path, text)
}
