// ============================================================
// Layer 5 — Next-character Selection
// ============================================================
// Picks the next id from one row of logits.
//
//   Sample — divide by temperature, softmax, draw from the
//            categorical distribution. Low temperatures give
//            more predictable text, high ones more surprising.
//   Greedy — argmax. Deterministic, but tends to loop.

use anyhow::{ensure, Context, Result};
use rand::{distributions::WeightedIndex, prelude::Distribution, Rng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMode {
    #[default]
    Sample,
    Greedy,
}

/// Softmax of `logits / temperature`, computed with the max subtracted.
pub fn softmax_with_temperature(logits: &[f32], temperature: f32) -> Result<Vec<f32>> {
    ensure!(temperature > 0.0, "temperature must be positive, got {temperature}");
    ensure!(!logits.is_empty(), "cannot sample from empty logits");

    let scaled: Vec<f32> = logits.iter().map(|&l| l / temperature).collect();
    let max = scaled.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scaled.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    Ok(exps.into_iter().map(|e| e / sum).collect())
}

/// Draw an index from the categorical distribution defined by `logits`.
pub fn sample_categorical<R: Rng + ?Sized>(logits: &[f32], temperature: f32, rng: &mut R) -> Result<usize> {
    let probs = softmax_with_temperature(logits, temperature)?;
    let dist  = WeightedIndex::new(&probs).context("invalid next-character distribution")?;
    Ok(dist.sample(rng))
}

pub fn argmax(logits: &[f32]) -> Option<usize> {
    logits
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

pub fn select_next<R: Rng + ?Sized>(
    logits:      &[f32],
    mode:        SamplingMode,
    temperature: f32,
    rng:         &mut R,
) -> Result<usize> {
    match mode {
        SamplingMode::Sample => sample_categorical(logits, temperature, rng),
        SamplingMode::Greedy => argmax(logits).context("cannot pick from empty logits"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax_with_temperature(&[1.0, 2.0, 3.0], 1.0).unwrap();
        let sum: f32 = p.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn test_low_temperature_sharpens() {
        let warm = softmax_with_temperature(&[1.0, 2.0], 1.0).unwrap();
        let cold = softmax_with_temperature(&[1.0, 2.0], 0.1).unwrap();
        assert!(cold[1] > warm[1]);
    }

    #[test]
    fn test_non_positive_temperature_rejected() {
        assert!(softmax_with_temperature(&[1.0], 0.0).is_err());
        assert!(softmax_with_temperature(&[1.0], -1.0).is_err());
    }

    #[test]
    fn test_dominant_logit_is_always_sampled() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let i = sample_categorical(&[0.0, 60.0, 0.0], 1.0, &mut rng).unwrap();
            assert_eq!(i, 1);
        }
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let logits = [0.3, 0.1, 0.5, 0.2];
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| sample_categorical(&logits, 1.0, &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(9), draw(9));
    }

    #[test]
    fn test_argmax_first_max_wins() {
        assert_eq!(argmax(&[0.1, 0.9, 0.9, 0.2]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
