// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by training and generation:
//
//   checkpoint.rs  — model weights via Burn's CompactRecorder,
//                    the latest-epoch pointer and the training
//                    config as JSON
//
//   vocab_store.rs — the character vocabulary as JSON, so
//                    generation maps ids back to the same chars
//
//   metrics.rs     — per-epoch loss and timing as CSV
//
//   model_store.rs — functional models saved as model.json
//                    plus a full-precision weight record
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Vocabulary persistence
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;

/// Functional model save / load
pub mod model_store;
