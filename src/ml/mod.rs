// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Model architectures, training loops and inference. The data
// layer only touches Burn through its Dataset / Batcher traits.
//
// What's in this layer:
//
//   backend.rs   — CPU (NdArray) or GPU (Wgpu) selection
//
//   model.rs     — The character model:
//                  • Embedding of character ids
//                  • One LSTM returning every time step
//                  • Dense projection to vocabulary logits
//
//   trainer.rs   — The training loop
//                  Forward pass, sparse cross-entropy on
//                  logits, backward pass, Adam step, metrics
//                  and periodic checkpoints
//
//   sampling.rs  — Next-character choice from logits
//                  (temperature sampling or greedy)
//
//   generator.rs — Loads the latest checkpoint and generates
//                  text one character at a time, carrying the
//                  recurrent state between steps
//
//   functional/  — Graph-built models with compile / fit
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Karpathy (2015) The Unreasonable Effectiveness of RNNs

/// Device and backend selection
pub mod backend;

/// Embedding → LSTM → Dense character model
pub mod model;

/// Training loop with checkpointing
pub mod trainer;

/// Temperature and greedy sampling
pub mod sampling;

/// Text generation from a checkpoint
pub mod generator;

/// Functional (graph) model API
pub mod functional;
