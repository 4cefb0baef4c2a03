// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the raw corpus and tensor batches:
//
//   corpus file / URL
//       │
//       ▼
//   FileCorpus / RemoteCorpus  → UTF-8 text
//       │
//       ▼
//   CharVocab (domain)         → text as ids
//       │
//       ▼
//   sequencer                  → (input, target) windows
//       │
//       ▼
//   CharDataset                → Burn's Dataset trait
//       │
//       ▼
//   CharBatcher                → [batch, seq] Int tensors
//
// The functional-model demos build their in-memory arrays in
// `arrays`, which also implements Burn's Dataset trait.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Loads the corpus from disk or a cached download
pub mod loader;

/// Cuts id streams into shifted input/target windows
pub mod sequencer;

/// Implements Burn's Dataset trait for character windows
pub mod dataset;

/// Implements Burn's Batcher trait for character windows
pub mod batcher;

/// Shuffled and order-preserving train/validation splits
pub mod splitter;

/// Row-major arrays with a leading example dimension
pub mod arrays;
