// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the four subcommands: `inspect`, `train`, `generate`
// and `functional`, and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, enums, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{
    functional_use_case::{Demo, FunctionalConfig},
    generate_use_case::GenerateConfig,
    inspect_use_case::InspectConfig,
    train_use_case::TrainConfig,
};
use crate::data::loader::SHAKESPEARE_URL;
use crate::ml::{backend::BackendKind, sampling::SamplingMode};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the data pipeline and an untrained model's predictions
    Inspect(InspectArgs),

    /// Train the character model on a text corpus
    Train(TrainArgs),

    /// Generate text from the latest checkpoint
    Generate(GenerateArgs),

    /// Run the functional model API demos
    Functional(FunctionalArgs),
}

/// Where the training text comes from.
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// Local UTF-8 text file; overrides --corpus-url
    #[arg(long)]
    pub corpus_path: Option<String>,

    /// Text to download when no local file is given
    #[arg(long, default_value = SHAKESPEARE_URL)]
    pub corpus_url: String,

    /// Directory the downloaded corpus is cached in
    #[arg(long, default_value = "data")]
    pub cache_dir: String,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[arg(long, default_value_t = 100)]
    pub seq_length: usize,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 256)]
    pub embedding_dim: usize,

    #[arg(long, default_value_t = 1024)]
    pub rnn_units: usize,

    /// Seed for the sampled predictions
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, value_enum, default_value_t = BackendKind::Ndarray)]
    pub backend: BackendKind,
}

impl From<InspectArgs> for InspectConfig {
    fn from(a: InspectArgs) -> Self {
        InspectConfig {
            corpus_path:   a.corpus.corpus_path,
            corpus_url:    a.corpus.corpus_url,
            cache_dir:     a.corpus.cache_dir,
            seq_length:    a.seq_length,
            batch_size:    a.batch_size,
            embedding_dim: a.embedding_dim,
            rnn_units:     a.rnn_units,
            seed:          a.seed,
            backend:       a.backend,
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Directory for checkpoints, vocabulary, config and metrics
    #[arg(long, default_value = "training_checkpoints")]
    pub checkpoint_dir: String,

    /// Characters per training example
    #[arg(long, default_value_t = 100)]
    pub seq_length: usize,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Number of full passes through the text
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 256)]
    pub embedding_dim: usize,

    /// Hidden size of the LSTM
    #[arg(long, default_value_t = 1024)]
    pub rnn_units: usize,

    /// Save weights every N epochs (and always after the last)
    #[arg(long, default_value_t = 5)]
    pub checkpoint_every: usize,

    /// Print the batch loss every N batches
    #[arg(long, default_value_t = 100)]
    pub log_every: usize,

    /// Fraction of sequences held out for validation
    #[arg(long, default_value_t = 0.0)]
    pub validation_fraction: f64,

    /// Carry the LSTM state from one batch to the next within an epoch
    #[arg(long)]
    pub stateful: bool,

    /// Keep a final batch smaller than --batch-size
    #[arg(long)]
    pub keep_remainder: bool,

    /// Seed for shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, value_enum, default_value_t = BackendKind::Ndarray)]
    pub backend: BackendKind,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            corpus_path:         a.corpus.corpus_path,
            corpus_url:          a.corpus.corpus_url,
            cache_dir:           a.corpus.cache_dir,
            checkpoint_dir:      a.checkpoint_dir,
            seq_length:          a.seq_length,
            batch_size:          a.batch_size,
            epochs:              a.epochs,
            learning_rate:       a.learning_rate,
            embedding_dim:       a.embedding_dim,
            rnn_units:           a.rnn_units,
            checkpoint_every:    a.checkpoint_every,
            log_every:           a.log_every,
            validation_fraction: a.validation_fraction,
            stateful:            a.stateful,
            drop_remainder:      !a.keep_remainder,
            seed:                a.seed,
            backend:             a.backend,
        }
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Directory written by `train`
    #[arg(long, default_value = "training_checkpoints")]
    pub checkpoint_dir: String,

    /// Prompt the generated text continues
    #[arg(long, default_value = "ROMEO: ")]
    pub start_string: String,

    /// Number of characters to generate
    #[arg(long, default_value_t = 1000)]
    pub num_generate: usize,

    /// Lower is more predictable, higher more surprising
    #[arg(long, default_value_t = 1.0)]
    pub temperature: f32,

    #[arg(long, value_enum, default_value_t = SamplingMode::Sample)]
    pub mode: SamplingMode,

    /// Fix the sampling seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = BackendKind::Ndarray)]
    pub backend: BackendKind,
}

impl From<GenerateArgs> for GenerateConfig {
    fn from(a: GenerateArgs) -> Self {
        GenerateConfig {
            checkpoint_dir: a.checkpoint_dir,
            start_string:   a.start_string,
            num_generate:   a.num_generate,
            temperature:    a.temperature,
            mode:           a.mode,
            seed:           a.seed,
            backend:        a.backend,
        }
    }
}

#[derive(Args, Debug)]
pub struct FunctionalArgs {
    #[arg(long, value_enum, default_value_t = Demo::All)]
    pub demo: Demo,

    /// Write a Graphviz .dot file per model into this directory
    #[arg(long)]
    pub dot: Option<String>,

    /// Where the mlp demo saves its model
    #[arg(long, default_value = "saved_models")]
    pub save_dir: String,

    /// Rows of synthetic training data
    #[arg(long, default_value_t = 1280)]
    pub rows: usize,

    #[arg(long, default_value_t = 2)]
    pub epochs: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, value_enum, default_value_t = BackendKind::Ndarray)]
    pub backend: BackendKind,
}

impl From<FunctionalArgs> for FunctionalConfig {
    fn from(a: FunctionalArgs) -> Self {
        FunctionalConfig {
            demo:     a.demo,
            dot_dir:  a.dot,
            save_dir: a.save_dir,
            rows:     a.rows,
            epochs:   a.epochs,
            seed:     a.seed,
            backend:  a.backend,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "text-rnn-guide", "train", "--corpus-path", "input.txt", "--epochs", "3", "--stateful",
        ])
        .unwrap();
        let super::Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: super::TrainConfig = args.into();
        assert_eq!(cfg.corpus_path.as_deref(), Some("input.txt"));
        assert_eq!(cfg.epochs, 3);
        assert!(cfg.stateful);
        assert!(cfg.drop_remainder);
        assert_eq!(cfg.seq_length, 100);
    }

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from(["text-rnn-guide", "generate", "--mode", "greedy"]).unwrap();
        let super::Commands::Generate(args) = cli.command else { panic!("expected generate") };
        let cfg: super::GenerateConfig = args.into();
        assert_eq!(cfg.start_string, "ROMEO: ");
        assert_eq!(cfg.num_generate, 1000);
        assert_eq!(cfg.mode, super::SamplingMode::Greedy);
    }

    #[test]
    fn test_functional_demo_names() {
        let cli = Cli::try_parse_from(["text-rnn-guide", "functional", "--demo", "multi-io"]).unwrap();
        let super::Commands::Functional(args) = cli.command else { panic!("expected functional") };
        assert_eq!(args.demo, super::Demo::MultiIo);
        assert!(Cli::try_parse_from(["text-rnn-guide", "functional", "--demo", "vgg"]).is_err());
    }
}
