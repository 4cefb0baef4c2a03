// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits, so a
// local file and a downloaded dataset look the same to it.

use anyhow::Result;

use crate::domain::corpus::Corpus;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Anything that can produce the training text.
///
/// Implementations:
///   - FileCorpus   → reads a local UTF-8 file
///   - RemoteCorpus → downloads once, then reads the cached copy
pub trait CorpusSource {
    fn load(&self) -> Result<Corpus>;
}

// ─── TextGenerator ────────────────────────────────────────────────────────────
/// Anything that can continue a prompt with `num_generate` characters.
pub trait TextGenerator {
    /// Returns the start string followed by the generated characters.
    fn generate(&mut self, start_string: &str, num_generate: usize) -> Result<String>;
}
