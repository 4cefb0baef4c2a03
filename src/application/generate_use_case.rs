// ============================================================
// Layer 2 — GenerateUseCase
// ============================================================
// Loads the latest checkpoint and continues a prompt:
//
//   Step 1: Rebuild model + vocab from checkpoint_dir  (Layer 5/6)
//   Step 2: Apply temperature / mode / seed            (Layer 5)
//   Step 3: Generate                                   (Layer 5)
//
// Generation needs no gradients, so the model runs on the
// inner (non-autodiff) backend.

use anyhow::Result;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::domain::traits::TextGenerator;
use crate::ml::{
    backend::{BackendKind, BackendTask},
    generator::CharGenerator,
    sampling::SamplingMode,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub checkpoint_dir: String,
    pub start_string:   String,
    pub num_generate:   usize,
    pub temperature:    f32,
    pub mode:           SamplingMode,
    /// Fixed seed for reproducible output
    pub seed:           Option<u64>,
    pub backend:        BackendKind,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: "training_checkpoints".to_string(),
            start_string:   "ROMEO: ".to_string(),
            num_generate:   1000,
            temperature:    1.0,
            mode:           SamplingMode::Sample,
            seed:           None,
            backend:        BackendKind::Ndarray,
        }
    }
}

pub struct GenerateUseCase {
    config: GenerateConfig,
}

impl GenerateUseCase {
    pub fn new(config: GenerateConfig) -> Self {
        Self { config }
    }

    /// Returns the start string followed by the generated text.
    pub fn execute(self) -> Result<String> {
        let backend = self.config.backend;
        backend.run(self)
    }
}

impl BackendTask for GenerateUseCase {
    type Output = Result<String>;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Self::Output {
        let cfg = self.config;

        // ── Step 1: Rebuild the model from disk ───────────────────────────────
        let generator = CharGenerator::<B::InnerBackend>::from_checkpoint(&cfg.checkpoint_dir, device)?;

        // ── Step 2: Sampling settings ─────────────────────────────────────────
        let mut generator = generator.with_temperature(cfg.temperature)?.with_mode(cfg.mode);
        if let Some(seed) = cfg.seed {
            generator = generator.with_seed(seed);
        }

        // ── Step 3: Generate ──────────────────────────────────────────────────
        tracing::info!(
            "Generating {} characters at temperature {} ({:?})",
            cfg.num_generate, cfg.temperature, cfg.mode
        );
        generator.generate(&cfg.start_string, cfg.num_generate)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{TrainConfig, TrainUseCase};
    use tempfile::TempDir;

    #[test]
    fn test_generate_after_training() {
        let dir    = TempDir::new().unwrap();
        let corpus = dir.path().join("corpus.txt");
        std::fs::write(&corpus, "ROMEO: o romeo, romeo. ".repeat(6)).unwrap();
        let ckpt_dir = dir.path().join("ckpt").display().to_string();

        TrainUseCase::new(TrainConfig {
            corpus_path:    Some(corpus.display().to_string()),
            checkpoint_dir: ckpt_dir.clone(),
            seq_length:     6,
            batch_size:     2,
            epochs:         1,
            embedding_dim:  4,
            rnn_units:      8,
            ..TrainConfig::default()
        })
        .execute()
        .unwrap();

        let run = || {
            GenerateUseCase::new(GenerateConfig {
                checkpoint_dir: ckpt_dir.clone(),
                num_generate:   20,
                seed:           Some(3),
                ..GenerateConfig::default()
            })
            .execute()
            .unwrap()
        };
        let text = run();
        assert!(text.starts_with("ROMEO: "));
        assert_eq!(text.chars().count(), "ROMEO: ".len() + 20);
        assert_eq!(text, run());
    }

    #[test]
    fn test_missing_checkpoint_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        let cfg = GenerateConfig {
            checkpoint_dir: dir.path().join("none").display().to_string(),
            ..GenerateConfig::default()
        };
        assert!(GenerateUseCase::new(cfg).execute().is_err());
    }
}
