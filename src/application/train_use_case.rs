// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the corpus            (Layer 4 - data)
//   Step 2: Build / load vocabulary    (Layer 6 - infra)
//   Step 3: Encode the text            (Layer 3 - domain)
//   Step 4: Cut into sequences         (Layer 4 - data)
//   Step 5: Split train/validation     (Layer 4 - data)
//   Step 6: Save config                (Layer 6 - infra)
//   Step 7: Run training loop          (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{ensure, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::CharDataset,
    loader::{corpus_source, SHAKESPEARE_URL},
    sequencer::examples_per_epoch,
    splitter::split_train_val,
};
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::{
    backend::{BackendKind, BackendTask},
    model::CharRnnConfig,
    trainer::{run_training, TrainReport},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved next to the checkpoints so generation can rebuild the
// same architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Local corpus file; when absent `corpus_url` is downloaded
    pub corpus_path:         Option<String>,
    pub corpus_url:          String,
    pub cache_dir:           String,
    pub checkpoint_dir:      String,
    pub seq_length:          usize,
    pub batch_size:          usize,
    pub epochs:              usize,
    pub learning_rate:       f64,
    pub embedding_dim:       usize,
    pub rnn_units:           usize,
    pub checkpoint_every:    usize,
    pub log_every:           usize,
    /// Fraction of sequences held out for validation, chosen by a seeded shuffle
    pub validation_fraction: f64,
    pub stateful:            bool,
    pub drop_remainder:      bool,
    pub seed:                u64,
    pub backend:             BackendKind,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpus_path:         None,
            corpus_url:          SHAKESPEARE_URL.to_string(),
            cache_dir:           "data".to_string(),
            checkpoint_dir:      "training_checkpoints".to_string(),
            seq_length:          100,
            batch_size:          64,
            epochs:              10,
            learning_rate:       1e-3,
            embedding_dim:       256,
            rnn_units:           1024,
            checkpoint_every:    5,
            log_every:           100,
            validation_fraction: 0.0,
            stateful:            false,
            drop_remainder:      true,
            seed:                42,
            backend:             BackendKind::Ndarray,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline on the configured backend.
    pub fn execute(self) -> Result<TrainReport> {
        let backend = self.config.backend;
        backend.run(self)
    }

    fn train<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainReport> {
        let cfg = &self.config;
        ensure!(cfg.seq_length > 0, "seq_length must be positive");
        ensure!(
            (0.0..1.0).contains(&cfg.validation_fraction),
            "validation_fraction must be in [0, 1), got {}",
            cfg.validation_fraction
        );

        // ── Step 1: Load the corpus ───────────────────────────────────────────
        let source = corpus_source(cfg.corpus_path.as_deref(), &cfg.corpus_url, &cfg.cache_dir);
        let corpus = source.load()?;
        tracing::info!("Loaded {} characters from '{}'", corpus.char_len(), corpus.source);

        // ── Step 2: Build / load vocabulary ───────────────────────────────────
        let vocab = VocabStore::new(&cfg.checkpoint_dir).load_or_build(&corpus.text)?;

        // ── Step 3: Encode the text as ids ────────────────────────────────────
        let ids = vocab.encode(&corpus.text)?;

        // ── Step 4: Cut into (input, target) sequences ────────────────────────
        let dataset = CharDataset::from_ids(&ids, cfg.seq_length);
        tracing::info!(
            "{} sequences of length {} ({} windows per epoch)",
            dataset.sample_count(),
            cfg.seq_length,
            examples_per_epoch(ids.len(), cfg.seq_length)
        );

        // ── Step 5: Train / validation split ──────────────────────────────────
        let (train_dataset, val_dataset) = if cfg.validation_fraction > 0.0 {
            let (train, val) = split_train_val(dataset.into_samples(), 1.0 - cfg.validation_fraction, cfg.seed);
            tracing::info!("Split: {} train, {} validation", train.len(), val.len());
            (CharDataset::new(train), Some(CharDataset::new(val)))
        } else {
            (dataset, None)
        };

        // ── Step 6: Save config for generation ────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;

        // ── Step 7: Run training loop (Layer 5) ───────────────────────────────
        let model_cfg = CharRnnConfig::new(vocab.len(), cfg.embedding_dim, cfg.rnn_units);
        let (_, report) = run_training::<B>(
            cfg, &model_cfg, train_dataset, val_dataset, &ckpt_manager, device,
        )?;

        Ok(report)
    }
}

impl BackendTask for TrainUseCase {
    type Output = Result<TrainReport>;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Self::Output {
        self.train::<B>(device)
    }
}
