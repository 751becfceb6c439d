//! Randomness used by training: bootstrap resampling, per-node feature
//! subsets and the per-tree generator streams.
use rand::distributions::{Distribution, Uniform};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

/// Returns a generator seeded for one tree.  Each tree owns its own stream so
/// trees can be trained independently.
pub fn seeded(seed: u64) -> XorShiftRng {
    XorShiftRng::seed_from_u64(seed)
}

/// Draws one seed per tree from the caller's generator
pub fn tree_seeds<R: Rng + ?Sized>(n_trees: usize, rng: &mut R) -> Vec<u64> {
    (0..n_trees).map(|_| rng.gen::<u64>()).collect()
}

/// Samples `n_samples` row indices uniformly with replacement into `out`
pub fn bootstrap_into<R: Rng + ?Sized>(n_samples: usize, rng: &mut R, out: &mut Vec<usize>) {
    out.clear();
    if n_samples == 0 {
        return;
    }
    out.reserve(n_samples);
    let dist = Uniform::from(0..n_samples);
    for _ in 0..n_samples {
        out.push(dist.sample(rng));
    }
}

/// Samples `n_samples` row indices uniformly with replacement
pub fn bootstrap_indices<R: Rng + ?Sized>(n_samples: usize, rng: &mut R) -> Vec<usize> {
    let mut out = Vec::with_capacity(n_samples);
    bootstrap_into(n_samples, rng, &mut out);
    out
}

/// Size of a random feature subset: `max(1, round(sqrt(n_features)))`
pub fn sqrt_subset_size(n_features: usize) -> usize {
    ((n_features as f64).sqrt().round() as usize).max(1)
}

/// Produces the candidate features for one split search.  A subset is
/// re-drawn on every call.
#[derive(Debug, Clone)]
pub struct FeatureSampler {
    candidates: Vec<usize>,
    take: usize,
}

impl FeatureSampler {
    /// Every feature, in index order, on every draw
    pub fn all(n_features: usize) -> Self {
        FeatureSampler {
            candidates: (0..n_features).collect(),
            take: n_features,
        }
    }

    /// A fresh random subset of `max(1, round(sqrt(n_features)))` features per draw
    pub fn sqrt(n_features: usize) -> Self {
        FeatureSampler {
            candidates: (0..n_features).collect(),
            take: sqrt_subset_size(n_features).min(n_features),
        }
    }

    /// Number of features returned by each draw
    pub fn len(&self) -> usize {
        self.take
    }

    /// True when the sampler has no features to offer
    pub fn is_empty(&self) -> bool {
        self.take == 0
    }

    /// Draws the candidate features for the next node
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &[usize] {
        let n = self.candidates.len();
        if self.take < n {
            // Partial Fisher-Yates over the current permutation
            for i in 0..self.take {
                let j = rng.gen_range(i, n);
                self.candidates.swap(i, j);
            }
        }
        &self.candidates[..self.take]
    }
}

#[cfg(test)]
mod sampler_tests {
    use super::*;

    #[test]
    fn test_bootstrap_size_and_range() {
        let mut prng = seeded(123123123);
        let idx = bootstrap_indices(1000, &mut prng);
        assert_eq!(idx.len(), 1000);
        assert!(idx.iter().all(|&i| i < 1000));
        assert!(bootstrap_indices(0, &mut prng).is_empty());
    }

    #[test]
    fn test_bootstrap_unique_fraction() {
        let n = 200_000;
        let mut prng = seeded(42);
        let idx = bootstrap_indices(n, &mut prng);
        let mut seen = vec![false; n];
        for i in idx {
            seen[i] = true;
        }
        let unique = seen.iter().filter(|&&s| s).count() as f64 / n as f64;
        let expected = 1. - (-1f64).exp();
        assert!((unique - expected).abs() < 0.01, "unique fraction {}", unique);
    }

    #[test]
    fn test_same_seed_same_stream() {
        let a = bootstrap_indices(50, &mut seeded(7));
        let b = bootstrap_indices(50, &mut seeded(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_subset_size() {
        assert_eq!(sqrt_subset_size(1), 1);
        assert_eq!(sqrt_subset_size(2), 1);
        assert_eq!(sqrt_subset_size(3), 2);
        assert_eq!(sqrt_subset_size(54), 7);
        assert_eq!(sqrt_subset_size(100), 10);
    }

    #[test]
    fn test_feature_sampler() {
        let mut prng = seeded(99);
        let mut all = FeatureSampler::all(4);
        assert_eq!(all.draw(&mut prng), &[0, 1, 2, 3]);

        let mut sub = FeatureSampler::sqrt(16);
        assert_eq!(sub.len(), 4);
        let mut hits = vec![0; 16];
        for _ in 0..400 {
            let drawn = sub.draw(&mut prng).to_vec();
            let mut dedup = drawn.clone();
            dedup.sort();
            dedup.dedup();
            assert_eq!(dedup.len(), 4);
            for f in drawn {
                hits[f] += 1;
            }
        }
        // Every feature gets picked at some point
        assert!(hits.iter().all(|&h| h > 0));
    }
}
