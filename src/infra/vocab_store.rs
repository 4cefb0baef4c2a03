// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Persists the character vocabulary next to the checkpoints so
// generation uses exactly the mapping the model was trained on,
// even if the corpus file changes or is no longer available.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::domain::vocab::CharVocab;

const VOCAB_FILE: &str = "vocab.json";

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(VOCAB_FILE)
    }

    /// Reuse a saved vocabulary or build one from `text` and save it.
    pub fn load_or_build(&self, text: &str) -> Result<CharVocab> {
        if self.path().exists() {
            tracing::info!("Loading existing vocabulary from disk");
            let vocab = self.load()?;
            // A stale vocab.json would make encode() fail later; catch it here.
            if let Some(c) = text.chars().find(|&c| vocab.char_to_index(c).is_err()) {
                anyhow::bail!(
                    "Saved vocabulary in '{}' has no entry for {c:?}; \
                     remove it or use a fresh checkpoint dir",
                    self.path().display()
                );
            }
            Ok(vocab)
        } else {
            let vocab = CharVocab::from_text(text)?;
            tracing::info!("Built vocabulary of {} characters", vocab.len());
            self.save(&vocab)?;
            Ok(vocab)
        }
    }

    pub fn load(&self) -> Result<CharVocab> {
        let path = self.path();
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Cannot load vocabulary from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, vocab: &CharVocab) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.path();
        std::fs::write(&path, serde_json::to_string(vocab)?)
            .with_context(|| format!("Cannot write vocabulary to '{}'", path.display()))?;
        Ok(())
    }
}
