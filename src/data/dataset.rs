use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::sequencer::{chunk_sequences, split_input_target};

/// One next-character example: `target[i]` is the char after `input[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharSample {
    pub input:  Vec<u32>,
    pub target: Vec<u32>,
}

impl CharSample {
    pub fn seq_len(&self) -> usize {
        self.input.len()
    }
}

pub struct CharDataset {
    samples: Vec<CharSample>,
}

impl CharDataset {
    pub fn new(samples: Vec<CharSample>) -> Self { Self { samples } }

    /// Chunk the encoded corpus and split every chunk into input/target.
    pub fn from_ids(ids: &[u32], seq_length: usize) -> Self {
        let samples = chunk_sequences(ids, seq_length)
            .iter()
            .map(|chunk| {
                let (input, target) = split_input_target(chunk);
                CharSample { input, target }
            })
            .collect();
        Self { samples }
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    pub fn into_samples(self) -> Vec<CharSample> { self.samples }
}

impl Dataset<CharSample> for CharDataset {
    fn get(&self, index: usize) -> Option<CharSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ids_builds_shifted_pairs() {
        let ids: Vec<u32> = (0..11).collect();
        let ds = CharDataset::from_ids(&ids, 4);
        assert_eq!(ds.len(), 2);

        let first = ds.get(0).unwrap();
        assert_eq!(first.input,  vec![0, 1, 2, 3]);
        assert_eq!(first.target, vec![1, 2, 3, 4]);
        assert_eq!(first.seq_len(), 4);

        let second = ds.get(1).unwrap();
        assert_eq!(second.input, vec![5, 6, 7, 8]);
        assert!(ds.get(2).is_none());
    }
}
