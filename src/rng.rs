use rand::prelude::*;
use rand_distr::Normal;

/// Seeded random source owned by the simulation thread.
///
/// Every stochastic decision in a run (placement, initial velocities,
/// patient zero, transmission, infection duration, death) draws from this
/// single stream, so identical seeds reproduce identical runs.
pub struct SimRng {
    rng: StdRng,
}

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        SimRng {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform real in [0, 1).
    pub fn uniform(&mut self) -> f64 {
        self.rng.random()
    }

    /// Uniform real in [lo, hi).
    pub fn uniform_in(&mut self, lo: f64, hi: f64) -> f64 {
        if lo >= hi {
            return lo;
        }
        self.rng.random_range(lo..hi)
    }

    /// Uniform index in [0, n). `n` must be non-zero.
    pub fn pick(&mut self, n: usize) -> usize {
        self.rng.random_range(0..n)
    }

    /// Sample from Normal(mean, std_dev). Degenerate parameters fall back
    /// to the mean.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        match Normal::new(mean, std_dev) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => mean,
        }
    }

    /// Bernoulli trial with success probability `p` in [0, 1].
    pub fn bernoulli(&mut self, p: f64) -> bool {
        self.rng.random_bool(p)
    }
}
