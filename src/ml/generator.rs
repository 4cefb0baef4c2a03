// ============================================================
// Layer 5 — Text Generator
// ============================================================
// Loads the latest checkpoint and produces text one character
// at a time:
//
//   1. Encode the start string with the saved vocabulary
//   2. Run it through the model from a zero state
//   3. Take the logits of the last step, pick the next id
//   4. Feed that single id back with the carried LSTM state
//   5. Repeat `num_generate` times
//
// The model runs with a batch of one. Weights were saved from
// a batched training run, but nothing in them depends on the
// batch size, so they load into a batch-1 model unchanged.

use anyhow::{anyhow, ensure, Context, Result};
use burn::{nn::LstmState, prelude::*};
use rand::{rngs::StdRng, SeedableRng};

use crate::application::train_use_case::TrainConfig;
use crate::domain::{traits::TextGenerator, vocab::CharVocab};
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::{
    model::{CharRnn, CharRnnConfig},
    sampling::{select_next, SamplingMode},
};

pub struct CharGenerator<B: Backend> {
    model:       CharRnn<B>,
    vocab:       CharVocab,
    device:      B::Device,
    temperature: f32,
    mode:        SamplingMode,
    rng:         StdRng,
}

impl<B: Backend> CharGenerator<B> {
    pub fn new(model: CharRnn<B>, vocab: CharVocab, device: B::Device) -> Self {
        Self {
            model,
            vocab,
            device,
            temperature: 1.0,
            mode:        SamplingMode::default(),
            rng:         StdRng::from_entropy(),
        }
    }

    /// Rebuild the model from `<dir>/train_config.json` and `<dir>/vocab.json`,
    /// then load the most recent weights.
    pub fn from_checkpoint(dir: &str, device: B::Device) -> Result<Self> {
        let ckpt = CheckpointManager::new(dir)?;
        let train_cfg: TrainConfig = ckpt.load_config()?;
        let vocab = VocabStore::new(dir).load()?;

        let model_cfg = CharRnnConfig::new(vocab.len(), train_cfg.embedding_dim, train_cfg.rnn_units);
        let model = model_cfg.init::<B>(&device);
        let model = ckpt
            .load_latest(model, &device)
            .with_context(|| format!("No checkpoint in '{dir}'. Run `train` first"))?;

        tracing::info!("Loaded model with vocab size {}", vocab.len());
        Ok(Self::new(model, vocab, device))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Result<Self> {
        ensure!(temperature > 0.0, "temperature must be positive, got {temperature}");
        self.temperature = temperature;
        Ok(self)
    }

    pub fn with_mode(mut self, mode: SamplingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn vocab(&self) -> &CharVocab {
        &self.vocab
    }

    /// Logits of the final time step of `ids`, plus the state after it.
    fn step(&self, ids: &[u32], state: Option<LstmState<B, 2>>) -> Result<(Vec<f32>, LstmState<B, 2>)> {
        let data: Vec<i32> = ids.iter().map(|&i| i as i32).collect();
        let input = Tensor::<B, 1, Int>::from_ints(data.as_slice(), &self.device)
            .reshape([1, ids.len()]);

        let (logits, state) = self.model.forward(input, state);
        let [_, seq, vocab] = logits.dims();
        let last = logits
            .slice([0..1, seq - 1..seq, 0..vocab])
            .reshape([vocab]);
        let last = last
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("cannot read logits: {e:?}"))?;
        Ok((last, state))
    }
}

impl<B: Backend> TextGenerator for CharGenerator<B> {
    fn generate(&mut self, start: &str, num_generate: usize) -> Result<String> {
        ensure!(!start.is_empty(), "start string must not be empty");
        let input_ids = self.vocab.encode(start)?;

        let mut text = String::from(start);
        if num_generate == 0 {
            return Ok(text);
        }

        let (mut logits, mut state) = self.step(&input_ids, None)?;
        for i in 0..num_generate {
            let next = select_next(&logits, self.mode, self.temperature, &mut self.rng)? as u32;
            text.push(self.vocab.index_to_char(next)?);

            if i + 1 < num_generate {
                let (l, s) = self.step(&[next], Some(state))?;
                logits = l;
                state  = s;
            }
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn generator() -> CharGenerator<TestBackend> {
        let device = Default::default();
        let vocab  = CharVocab::from_text("abcdefgh ").unwrap();
        let model  = CharRnnConfig::new(vocab.len(), 8, 16).init::<TestBackend>(&device);
        CharGenerator::new(model, vocab, device).with_seed(7)
    }

    #[test]
    fn test_output_starts_with_prompt_and_has_requested_length() {
        let mut g = generator();
        let text  = g.generate("abc", 25).unwrap();
        assert!(text.starts_with("abc"));
        assert_eq!(text.chars().count(), 28);
        assert!(text.chars().all(|c| g.vocab().char_to_index(c).is_ok()));
    }

    #[test]
    fn test_zero_characters_returns_prompt() {
        let mut g = generator();
        assert_eq!(g.generate("bad", 0).unwrap(), "bad");
    }

    #[test]
    fn test_empty_prompt_rejected() {
        let mut g = generator();
        assert!(g.generate("", 10).is_err());
    }

    #[test]
    fn test_unknown_prompt_char_rejected() {
        let mut g = generator();
        assert!(g.generate("xyz", 10).is_err());
    }

    #[test]
    fn test_same_seed_same_text() {
        let a = generator().generate("ab", 30).unwrap();
        let b = generator().generate("ab", 30).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_greedy_is_deterministic_without_seed() {
        let device = Default::default();
        let vocab  = CharVocab::from_text("xyz").unwrap();
        let model  = CharRnnConfig::new(3, 4, 8).init::<TestBackend>(&device);
        let mut g  = CharGenerator::new(model, vocab, device).with_mode(SamplingMode::Greedy);
        let first  = g.generate("x", 10).unwrap();
        let second = g.generate("x", 10).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_non_positive_temperature_rejected() {
        assert!(generator().with_temperature(0.0).is_err());
    }

    #[test]
    fn test_from_checkpoint_round_trip() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let vocab  = CharVocab::from_text("hello world").unwrap();
        let cfg    = TrainConfig { embedding_dim: 4, rnn_units: 8, ..TrainConfig::default() };
        let model  = CharRnnConfig::new(vocab.len(), 4, 8).init::<TestBackend>(&device);

        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        ckpt.save_config(&cfg).unwrap();
        ckpt.save_model(&model, 1).unwrap();
        VocabStore::new(dir.path()).save(&vocab).unwrap();

        let path = dir.path().display().to_string();
        let mut g = CharGenerator::<TestBackend>::from_checkpoint(&path, device)
            .unwrap()
            .with_mode(SamplingMode::Greedy);
        let text = g.generate("hel", 5).unwrap();
        assert_eq!(text.chars().count(), 8);
    }

    #[test]
    fn test_missing_checkpoint_is_error() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().display().to_string();
        assert!(CharGenerator::<TestBackend>::from_checkpoint(&path, Default::default()).is_err());
    }
}
