use std::sync::atomic::{AtomicU64, Ordering};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::traits::Sampler;

/// Visits every index once, in a fresh random order on each pass.
///
/// A seeded sampler derives the order of pass `k` from `seed + k`, so a run
/// can be replayed exactly.
#[derive(Debug, Default)]
pub struct RandomSampler {
    seed: Option<u64>,
    pass: AtomicU64,
}

impl RandomSampler {
    /// An unseeded sampler drawing from the thread-local generator.
    pub fn new() -> Self {
        RandomSampler::default()
    }

    pub fn with_seed(seed: u64) -> Self {
        RandomSampler {
            seed: Some(seed),
            pass: AtomicU64::new(0),
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

impl Sampler for RandomSampler {
    fn iter(&self, dataset_len: usize) -> Box<dyn Iterator<Item = usize> + Send + Sync> {
        let mut indices: Vec<usize> = (0..dataset_len).collect();
        match self.seed {
            Some(seed) => {
                let pass = self.pass.fetch_add(1, Ordering::Relaxed);
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(pass));
                indices.shuffle(&mut rng);
            }
            None => indices.shuffle(&mut rand::thread_rng()),
        }
        Box::new(indices.into_iter())
    }

    fn len(&self, dataset_len: usize) -> usize {
        dataset_len
    }
}

#[cfg(test)]
#[path = "random_sampler_test.rs"]
mod tests;
