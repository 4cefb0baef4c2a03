// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Walks through the data pipeline and the untrained model,
// printing what each stage produces:
//
//   Step 1: Corpus length and opening text
//   Step 2: Vocabulary and the char → index mapping
//   Step 3: Encoded text cut into sequences
//   Step 4: One (input, target) pair, step by step
//   Step 5: Untrained model on the first batch: shape,
//           parameter count, sampled predictions, mean loss
//
// An untrained model predicts every character with roughly
// equal probability, so its loss sits near ln(vocab_size).

use anyhow::{anyhow, ensure, Result};
use burn::{
    data::dataloader::batcher::Batcher,
    module::Module,
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::CharBatcher,
    dataset::CharDataset,
    loader::{corpus_source, SHAKESPEARE_URL},
    sequencer::chunk_sequences,
};
use crate::domain::vocab::CharVocab;
use crate::ml::{
    backend::{BackendKind, BackendTask},
    model::{sequence_loss, CharRnnConfig},
    sampling::{select_next, SamplingMode},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectConfig {
    pub corpus_path:   Option<String>,
    pub corpus_url:    String,
    pub cache_dir:     String,
    pub seq_length:    usize,
    pub batch_size:    usize,
    pub embedding_dim: usize,
    pub rnn_units:     usize,
    pub seed:          u64,
    pub backend:       BackendKind,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            corpus_path:   None,
            corpus_url:    SHAKESPEARE_URL.to_string(),
            cache_dir:     "data".to_string(),
            seq_length:    100,
            batch_size:    64,
            embedding_dim: 256,
            rnn_units:     1024,
            seed:          42,
            backend:       BackendKind::Ndarray,
        }
    }
}

/// The numbers the walkthrough prints, kept for callers and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectReport {
    pub text_len:         usize,
    pub vocab_size:       usize,
    pub sequences:        usize,
    pub prediction_shape: [usize; 3],
    pub num_params:       usize,
    pub mean_loss:        f64,
}

pub struct InspectUseCase {
    config: InspectConfig,
}

impl InspectUseCase {
    pub fn new(config: InspectConfig) -> Self {
        Self { config }
    }

    pub fn execute(self) -> Result<InspectReport> {
        let backend = self.config.backend;
        backend.run(self)
    }

    fn inspect<B: Backend>(&self, device: B::Device) -> Result<InspectReport> {
        let cfg = &self.config;
        ensure!(cfg.seq_length > 0, "seq_length must be positive");
        ensure!(cfg.batch_size > 0, "batch_size must be positive");

        // ── Step 1: The corpus ────────────────────────────────────────────────
        let corpus = corpus_source(cfg.corpus_path.as_deref(), &cfg.corpus_url, &cfg.cache_dir).load()?;
        println!("Length of text: {} characters\n", corpus.char_len());
        println!("{}\n", corpus.head(250));

        // ── Step 2: The vocabulary ────────────────────────────────────────────
        let vocab = CharVocab::from_text(&corpus.text)?;
        println!("{} unique characters\n", vocab.len());
        println!("{{");
        for (i, c) in vocab.chars().iter().take(20).enumerate() {
            println!("  {:>6}: {:3},", format!("{c:?}"), i);
        }
        println!("  ...\n}}\n");

        let ids = vocab.encode(&corpus.text)?;
        let head: String = corpus.text.chars().take(13).collect();
        println!(
            "{:?} ---- characters mapped to int ---- > {:?}\n",
            head,
            &ids[..ids.len().min(13)]
        );

        // ── Step 3: Sequences ─────────────────────────────────────────────────
        for chunk in chunk_sequences(&ids, cfg.seq_length).iter().take(5) {
            println!("{:?}", vocab.decode(chunk)?);
        }
        println!();

        let dataset = CharDataset::from_ids(&ids, cfg.seq_length);
        let sequences = dataset.sample_count();
        ensure!(
            sequences > 0,
            "corpus of {} characters is too short for sequences of length {}",
            ids.len(),
            cfg.seq_length
        );
        let samples = dataset.into_samples();

        // ── Step 4: The first (input, target) pair ────────────────────────────
        let first = &samples[0];
        println!("Input data:  {:?}", vocab.decode(&first.input)?);
        println!("Target data: {:?}\n", vocab.decode(&first.target)?);
        for (i, (&x, &y)) in first.input.iter().zip(&first.target).take(5).enumerate() {
            println!("Step {i:4}");
            println!("  input: {} ({:?})", x, vocab.index_to_char(x)?);
            println!("  expected output: {} ({:?})", y, vocab.index_to_char(y)?);
        }
        println!();

        // ── Step 5: The untrained model ───────────────────────────────────────
        let model = CharRnnConfig::new(vocab.len(), cfg.embedding_dim, cfg.rnn_units).init::<B>(&device);
        let batch = CharBatcher::<B>::new(device.clone())
            .batch(samples.iter().take(cfg.batch_size).cloned().collect());

        let (logits, _) = model.forward(batch.inputs, None);
        let prediction_shape = logits.dims();
        println!(
            "{:?} # (batch_size, sequence_length, vocab_size)",
            prediction_shape
        );
        let num_params = model.num_params();
        println!("Model: embedding {} → lstm {} → dense {}", cfg.embedding_dim, cfg.rnn_units, vocab.len());
        println!("Total params: {num_params}\n");

        let [_, seq, vocab_size] = prediction_shape;
        let first_logits: Vec<f32> = logits
            .clone()
            .slice([0..1, 0..seq, 0..vocab_size])
            .reshape([seq, vocab_size])
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read logits: {e:?}"))?;

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let sampled = first_logits
            .chunks(vocab_size)
            .map(|row| select_next(row, SamplingMode::Sample, 1.0, &mut rng).map(|i| i as u32))
            .collect::<Result<Vec<u32>>>()?;
        println!("Input:\n{:?}\n", vocab.decode(&first.input)?);
        println!("Next Char Predictions:\n{:?}\n", vocab.decode(&sampled)?);

        let mean_loss = sequence_loss(logits, batch.targets).into_scalar().elem::<f64>();
        println!("Prediction shape: {:?} # (batch_size, sequence_length, vocab_size)", prediction_shape);
        println!("Mean loss:        {mean_loss:.4}");
        println!("ln(vocab_size):   {:.4}", (vocab.len() as f64).ln());

        Ok(InspectReport {
            text_len: corpus.char_len(),
            vocab_size: vocab.len(),
            sequences,
            prediction_shape,
            num_params,
            mean_loss,
        })
    }
}

impl BackendTask for InspectUseCase {
    type Output = Result<InspectReport>;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Self::Output {
        self.inspect::<B::InnerBackend>(device)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_walkthrough_numbers() {
        let dir  = TempDir::new().unwrap();
        let path = dir.path().join("corpus.txt");
        let text = "First Citizen:\nBefore we proceed any further, hear me speak.\n".repeat(3);
        std::fs::write(&path, &text).unwrap();

        let report = InspectUseCase::new(InspectConfig {
            corpus_path:   Some(path.display().to_string()),
            seq_length:    10,
            batch_size:    4,
            embedding_dim: 8,
            rnn_units:     16,
            ..InspectConfig::default()
        })
        .execute()
        .unwrap();

        let vocab = report.vocab_size;
        assert_eq!(report.text_len, text.chars().count());
        assert_eq!(report.prediction_shape, [4, 10, vocab]);
        assert_eq!(report.sequences, report.text_len / 11);

        // embedding + lstm (4 gates, two biases each) + dense
        let lstm = 4 * (8 * 16 + 16 + 16 * 16 + 16);
        assert_eq!(report.num_params, vocab * 8 + lstm + 16 * vocab + vocab);

        // Untrained loss is close to uniform guessing.
        assert!((report.mean_loss - (vocab as f64).ln()).abs() < 0.5);
    }

    #[test]
    fn test_corpus_shorter_than_a_sequence_is_an_error() {
        let dir  = TempDir::new().unwrap();
        let path = dir.path().join("tiny.txt");
        std::fs::write(&path, "abc").unwrap();
        let cfg = InspectConfig { corpus_path: Some(path.display().to_string()), ..InspectConfig::default() };
        assert!(InspectUseCase::new(cfg).execute().is_err());
    }
}
