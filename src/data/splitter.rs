// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// split_train_val shuffles with a seeded RNG, then cuts. Used for
// the character corpus, whose chunks are ordered by position in
// the text.
//
// split_index is shared with ArrayDataset::split_tail, which keeps
// row order the way a `validation_split` argument to fit() does.
// The index is clamped, so tiny or empty inputs never panic.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = split_index(total, train_fraction);
    let val      = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}

/// Index separating the leading `train_fraction` of `total` items.
pub fn split_index(total: usize, train_fraction: f64) -> usize {
    let fraction = train_fraction.clamp(0.0, 1.0);
    (((total as f64) * fraction).round() as usize).min(total)
}
