// ============================================================
// Layer 4 — Character Batcher
// ============================================================
// Implements Burn's Batcher trait to stack CharSamples into
// two Int tensors of shape [batch_size, seq_len].
//
// All samples come from fixed-size chunks, so no padding is
// needed: we flatten row by row and reshape.
//
//   [s1_t1 .. s1_tS, s2_t1 .. sN_tS] → [N, S]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::CharSample;

/// A batch of next-character examples.
#[derive(Debug, Clone)]
pub struct CharBatch<B: Backend> {
    /// Input ids — shape: [batch_size, seq_len]
    pub inputs: Tensor<B, 2, Int>,

    /// Ids of the following characters — shape: [batch_size, seq_len]
    pub targets: Tensor<B, 2, Int>,
}

impl<B: Backend> CharBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.inputs.dims()[0]
    }
}

#[derive(Clone, Debug)]
pub struct CharBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> CharBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<CharSample, CharBatch<B>> for CharBatcher<B> {
    fn batch(&self, items: Vec<CharSample>) -> CharBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.first().map(CharSample::seq_len).unwrap_or(0);

        let input_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.input.iter().map(|&x| x as i32))
            .collect();

        let target_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.target.iter().map(|&x| x as i32))
            .collect();

        let inputs = Tensor::<B, 1, Int>::from_ints(
            input_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        let targets = Tensor::<B, 1, Int>::from_ints(
            target_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        CharBatch { inputs, targets }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_batch_shapes_and_values() {
        let device  = Default::default();
        let batcher = CharBatcher::<NdArray>::new(device);
        let items = vec![
            CharSample { input: vec![0, 1, 2], target: vec![1, 2, 3] },
            CharSample { input: vec![4, 5, 6], target: vec![5, 6, 7] },
        ];

        let batch = batcher.batch(items);
        assert_eq!(batch.inputs.dims(),  [2, 3]);
        assert_eq!(batch.targets.dims(), [2, 3]);
        assert_eq!(batch.batch_size(), 2);

        let targets: Vec<i64> = batch.targets
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .unwrap();
        assert_eq!(targets, vec![1, 2, 3, 5, 6, 7]);
    }
}
