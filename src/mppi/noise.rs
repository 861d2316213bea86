//! Gaussian sampling noise for the control perturbations.
//!
//! The generator owns the random state handed to it by the caller so a
//! seeded controller always reproduces the same trajectory batches.

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use crate::mppi::config::NoiseConfig;

/// One batch of noise, N rows by T columns per channel
#[derive(Debug, Clone)]
pub struct NoiseBatch {
    pub vx: DMatrix<f64>,
    pub vy: DMatrix<f64>,
    pub wz: DMatrix<f64>,
}

pub struct NoiseGenerator {
    rng: StdRng,
    vx_std: f64,
    vy_std: f64,
    wz_std: f64,
    holonomic: bool,
}

impl NoiseGenerator {
    /// `config` is expected to be sanitized (finite, non-negative deviations)
    pub fn new(config: &NoiseConfig, holonomic: bool, rng: StdRng) -> Self {
        NoiseGenerator {
            rng,
            vx_std: valid_std(config.vx_std),
            vy_std: valid_std(config.vy_std),
            wz_std: valid_std(config.wz_std),
            holonomic,
        }
    }

    pub fn with_seed(config: &NoiseConfig, holonomic: bool, seed: u64) -> Self {
        Self::new(config, holonomic, StdRng::seed_from_u64(seed))
    }

    /// Replace the random state
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn std_devs(&self) -> (f64, f64, f64) {
        (self.vx_std, self.vy_std, self.wz_std)
    }

    /// Draw a fresh batch. `vy` stays zero for non-holonomic robots.
    pub fn generate(&mut self, batch_size: usize, time_steps: usize) -> NoiseBatch {
        let vx = sample_matrix(&mut self.rng, self.vx_std, batch_size, time_steps);
        let vy = if self.holonomic {
            sample_matrix(&mut self.rng, self.vy_std, batch_size, time_steps)
        } else {
            DMatrix::zeros(batch_size, time_steps)
        };
        let wz = sample_matrix(&mut self.rng, self.wz_std, batch_size, time_steps);
        NoiseBatch { vx, vy, wz }
    }
}

fn valid_std(std_dev: f64) -> f64 {
    if std_dev.is_finite() { std_dev.max(0.0) } else { 0.0 }
}

/// Zero mean normal samples with deviation `std_dev`
fn sample_matrix(rng: &mut StdRng, std_dev: f64, rows: usize, cols: usize) -> DMatrix<f64> {
    DMatrix::from_fn(rows, cols, |_, _| {
        let z: f64 = StandardNormal.sample(rng);
        z * std_dev
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NoiseConfig {
        NoiseConfig { vx_std: 0.2, vy_std: 0.3, wz_std: 0.4 }
    }

    #[test]
    fn test_same_seed_same_batch() {
        let mut a = NoiseGenerator::with_seed(&config(), true, 42);
        let mut b = NoiseGenerator::with_seed(&config(), true, 42);
        let na = a.generate(8, 5);
        let nb = b.generate(8, 5);
        assert_eq!(na.vx, nb.vx);
        assert_eq!(na.vy, nb.vy);
        assert_eq!(na.wz, nb.wz);

        a.reseed(42);
        let again = a.generate(8, 5);
        assert_eq!(again.vx, na.vx);
    }

    #[test]
    fn test_non_holonomic_has_no_lateral_noise() {
        let mut gen = NoiseGenerator::with_seed(&config(), false, 1);
        let noise = gen.generate(4, 6);
        assert!(noise.vy.iter().all(|&v| v == 0.0));
        assert!(noise.vx.iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_sample_statistics() {
        let mut gen = NoiseGenerator::with_seed(&config(), true, 5);
        let noise = gen.generate(2000, 10);
        let n = noise.wz.len() as f64;
        let mean = noise.wz.sum() / n;
        let var = noise.wz.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 0.02, "mean = {}", mean);
        assert!((var.sqrt() - 0.4).abs() < 0.02, "std = {}", var.sqrt());
        assert_eq!(gen.std_devs(), (0.2, 0.3, 0.4));
    }
}
