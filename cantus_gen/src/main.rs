// Cantus generator — CLI entry point.
//
// Trains a next-token model on a directory of MIDI files and writes a
// generated piece. The pipeline: corpus loading → vocabulary + windows →
// training → greedy generation → MIDI rendering.
//
// Usage:
//   generate <dataset-dir> [--output FILE] [--tokens FILE] [--config FILE]
//     [--seq-length N] [--epochs N] [--batch-size N] [--validation F]
//     [--steps N] [--seed N]

use cantus_gen::config::PipelineConfig;
use cantus_gen::corpus::{load_corpus, save_token_list};
use cantus_gen::error::{PipelineError, RenderReport};
use cantus_gen::generate::generate;
use cantus_gen::midi::render_tokens;
use cantus_gen::vocab::Vocabulary;
use cantus_gen::window::slide;
use cantus_model::{SequenceModel, SoftmaxRegression};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: generate <dataset-dir> [--output FILE] [--tokens FILE] \
[--config FILE] [--seq-length N] [--epochs N] [--batch-size N] [--validation F] \
[--steps N] [--seed N]";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = match build_config(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    println!("=== Cantus Music Generator ===");
    println!("Dataset: {}", config.dataset_path.display());
    println!("Output: {}", config.midi_output.display());
    println!("Sequence length: {}", config.seq_length);
    println!("Steps: {}", config.num_steps);
    if let Some(seed) = config.seed {
        println!("Seed: {seed}");
    }
    println!();

    match run(&config) {
        Ok(report) => {
            if report.skipped.is_empty() {
                println!("Done. {} events written.", report.rendered);
            } else {
                println!(
                    "Done. {} events written, {} tokens skipped:",
                    report.rendered,
                    report.skipped.len()
                );
                for skip in &report.skipped {
                    println!("  [{}] '{}': {}", skip.position, skip.token, skip.reason);
                }
            }
            println!();
            println!(
                "Play with: timidity {} (or any MIDI player)",
                config.midi_output.display()
            );
        }
        Err(err) => {
            eprintln!("Failed while {}: {}", err.stage(), err);
            std::process::exit(1);
        }
    }
}

fn run(config: &PipelineConfig) -> Result<RenderReport, PipelineError> {
    println!(
        "[1/5] Loading corpus from {}...",
        config.dataset_path.display()
    );
    let tokens = load_corpus(&config.dataset_path)?;
    println!("  {} tokens.", tokens.len());
    if let Some(path) = &config.output_file {
        save_token_list(&tokens, path).map_err(PipelineError::TokenList)?;
        println!("  Token list saved to {}.", path.display());
    }

    println!("[2/5] Building vocabulary and windows...");
    let vocab = Vocabulary::build(&tokens);
    println!("  Vocabulary size: {}.", vocab.len());
    let encoded = vocab.encode(&tokens)?;
    let training = slide(&encoded, config.seq_length, vocab.len())?;
    if training.is_empty() {
        return Err(PipelineError::InsufficientData(format!(
            "{} tokens yield no windows of length {} (need at least {})",
            tokens.len(),
            config.seq_length,
            config.seq_length + 1
        )));
    }
    println!("  {} training windows.", training.len());

    println!(
        "[3/5] Training ({} epochs, batch size {})...",
        config.epochs, config.batch_size
    );
    let mut model = SoftmaxRegression::new(config.seq_length, vocab.len(), config.seed);
    let report = model.fit(&training.contexts, &training.targets, &config.train_options())?;
    match report.validation_loss {
        Some(loss) => println!(
            "  Final loss: {:.4} (validation {:.4}, {} windows held out).",
            report.final_loss, loss, report.validation_samples
        ),
        None => println!("  Final loss: {:.4}.", report.final_loss),
    }

    println!("[4/5] Generating {} tokens...", config.num_steps);
    // Seed with the first training window, so the generated piece starts
    // from material the model actually saw.
    let generated = generate(&model, &vocab, &training.contexts[0], config.num_steps)?;
    println!("  Sequence length: {}.", generated.len());

    println!("[5/5] Writing MIDI to {}...", config.midi_output.display());
    Ok(render_tokens(&generated, &config.midi_output)?)
}

fn build_config(args: &[String]) -> Result<PipelineConfig, String> {
    if args.iter().any(|a| a == "--help" || a == "-h") {
        return Err(USAGE.to_string());
    }
    let mut config = match parse_flag::<PathBuf>(args, "--config") {
        Some(path) => PipelineConfig::load(&path).map_err(|e| format!("--config: {e}"))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = args.get(1).filter(|s| !s.starts_with("--")) {
        config.dataset_path = PathBuf::from(dir);
    }
    if let Some(v) = parse_flag(args, "--output") {
        config.midi_output = v;
    }
    if let Some(v) = parse_flag(args, "--tokens") {
        config.output_file = Some(v);
    }
    if let Some(v) = parse_flag(args, "--seq-length") {
        config.seq_length = v;
    }
    if let Some(v) = parse_flag(args, "--epochs") {
        config.epochs = v;
    }
    if let Some(v) = parse_flag(args, "--batch-size") {
        config.batch_size = v;
    }
    if let Some(v) = parse_flag(args, "--validation") {
        config.validation_fraction = v;
    }
    if let Some(v) = parse_flag(args, "--steps") {
        config.num_steps = v;
    }
    if let Some(v) = parse_flag(args, "--seed") {
        config.seed = Some(v);
    }
    Ok(config)
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
