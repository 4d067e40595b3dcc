// Cantus Music Generator
//
// An offline batch pipeline that learns a next-token model over symbolic
// music extracted from MIDI files and generates a new piece from it. MIDI
// files are flattened into a stream of note/chord tokens, a vocabulary maps
// tokens to dense indices, sliding one-hot windows train a classifier, and
// greedy autoregressive decoding produces a new token sequence that is
// rendered back to MIDI.
//
// Architecture:
// - events.rs: Note/Chord/Rest events, token encoding and decoding
// - vocab.rs: token ↔ index bijection built from the sorted corpus token set
// - window.rs: sliding (context, target) training windows, one-hot encoded
// - generate.rs: greedy autoregressive extension of a seed window
// - midi.rs: MIDI parsing and rendering (the `midly` boundary)
// - corpus.rs: recursive dataset scan and token flattening
// - config.rs: pipeline configuration (JSON-loadable, CLI-overridable)
// - error.rs: stage-tagged pipeline errors and the render report
//
// The trainable model itself lives in the `cantus_model` crate behind the
// `SequenceModel` trait; this crate never inspects its internals.
//
// The pipeline is single-threaded and synchronous: each generation step
// depends on the previous one, and each stage owns its data outright. Given
// a seed, a run is deterministic end to end.

pub mod config;
pub mod corpus;
pub mod error;
pub mod events;
pub mod generate;
pub mod midi;
pub mod vocab;
pub mod window;
