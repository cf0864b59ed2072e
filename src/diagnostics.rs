//! Memory self-test and parameter sweeps.
//!
//! These drive a [`MemoryEngine`] end to end: write one pattern a number of
//! times, read it back, report how much of it survived. The sweep repeats
//! that over a grid of configurations; turning rows into CSV or HTTP
//! responses is left to the caller.

use crate::error::{Result, SdmError};
use crate::kernel::BitVector;
use crate::memory::{AddressMode, EngineConfig, MemoryEngine};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Bits shown in report previews.
pub const PREVIEW_BITS: usize = 16;

/// Compact outcome of one self-test.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MemoryTestSummary {
    pub vector_dim: usize,
    pub num_locations: usize,
    pub access_radius: usize,
    pub reinforce: usize,
    pub match_ratio: f64,
    pub input_ones: usize,
    pub recalled_ones: usize,
    pub input_preview: String,
    pub recalled_preview: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MemoryTestReport {
    pub summary: MemoryTestSummary,
    pub input: BitVector,
    pub recalled: BitVector,
}

/// Build one engine, write a random pattern `reinforce` times, read it back.
///
/// The pattern is sparse (at the configured sparsity, at least one bit)
/// when the engine uses sparse addresses, uniform otherwise. Requires
/// `reinforce >= 1` and `access_radius < vector_dim`.
pub fn run_memory_test<R: Rng + ?Sized>(
    config: &EngineConfig,
    reinforce: usize,
    rng: &mut R,
) -> Result<MemoryTestReport> {
    check_test_config(config, reinforce)?;
    let mut engine = MemoryEngine::new(config)?;
    let input = test_pattern(config, rng);
    let (recalled, match_ratio) = reinforce_and_recall(&mut engine, &input, reinforce)?;

    let summary = MemoryTestSummary {
        vector_dim: config.vector_dim,
        num_locations: config.num_locations,
        access_radius: config.access_radius,
        reinforce,
        match_ratio,
        input_ones: input.count_ones(),
        recalled_ones: recalled.count_ones(),
        input_preview: input.preview(PREVIEW_BITS),
        recalled_preview: recalled.preview(PREVIEW_BITS),
    };
    debug!(
        vector_dim = summary.vector_dim,
        access_radius = summary.access_radius,
        reinforce,
        match_ratio,
        "memory test"
    );

    Ok(MemoryTestReport {
        summary,
        input,
        recalled,
    })
}

/// Mean match ratio over `trials` fresh patterns stored in one engine.
///
/// Later trials see the residue of earlier ones, so this measures recall
/// under growing load rather than in isolation.
pub fn test_configuration<R: Rng + ?Sized>(
    config: &EngineConfig,
    reinforce: usize,
    trials: usize,
    rng: &mut R,
) -> Result<f64> {
    check_test_config(config, reinforce)?;
    if trials == 0 {
        return Err(SdmError::InvalidConfig("trials must be positive".to_string()));
    }
    let mut engine = MemoryEngine::new(config)?;
    let mut total = 0.0;
    for _ in 0..trials {
        let pattern = test_pattern(config, rng);
        let (_, ratio) = reinforce_and_recall(&mut engine, &pattern, reinforce)?;
        total += ratio;
    }
    Ok(total / trials as f64)
}

fn check_test_config(config: &EngineConfig, reinforce: usize) -> Result<()> {
    config.validate()?;
    if reinforce == 0 {
        return Err(SdmError::InvalidConfig("reinforce must be at least 1".to_string()));
    }
    if config.access_radius >= config.vector_dim {
        return Err(SdmError::InvalidConfig(format!(
            "access_radius {} must be below vector_dim {}",
            config.access_radius, config.vector_dim
        )));
    }
    Ok(())
}

fn test_pattern<R: Rng + ?Sized>(config: &EngineConfig, rng: &mut R) -> BitVector {
    match config.address_mode() {
        AddressMode::Sparse { ones } => BitVector::random_sparse(config.vector_dim, ones.max(1), rng),
        AddressMode::Dense => BitVector::random_dense(config.vector_dim, rng),
    }
}

fn reinforce_and_recall(
    engine: &mut MemoryEngine,
    pattern: &BitVector,
    reinforce: usize,
) -> Result<(BitVector, f64)> {
    for _ in 0..reinforce {
        engine.write(pattern)?;
    }
    let recalled = engine.read(pattern)?.output;
    let ratio = recalled.match_ratio(pattern)?;
    Ok((recalled, ratio))
}

/// Cartesian grid of self-test configurations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepGrid {
    pub vector_dims: Vec<usize>,
    pub num_locations: Vec<usize>,
    /// Radius as a fraction of `vector_dim`, each in `(0, 1)`.
    pub radius_factors: Vec<f64>,
    pub reinforce: Vec<usize>,
    pub sparsity: f64,
}

impl Default for SweepGrid {
    fn default() -> Self {
        Self {
            vector_dims: vec![32, 64, 128, 256, 512, 1024],
            num_locations: vec![500, 1000, 3000, 5000, 8000],
            radius_factors: vec![0.05, 0.1, 0.2, 0.4, 0.6, 0.78, 0.9],
            reinforce: vec![30],
            sparsity: 0.03,
        }
    }
}

/// One sweep configuration and its outcome.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SweepRow {
    pub vector_dim: usize,
    pub num_locations: usize,
    pub access_radius: usize,
    pub reinforce: usize,
    pub match_ratio: f64,
    pub input_ones: usize,
    pub recalled_ones: usize,
    pub duration_secs: f64,
    pub radius_factor: f64,
    /// Fraction of input bits set.
    pub input_sparsity: f64,
}

impl SweepGrid {
    /// Number of configurations in the grid.
    pub fn len(&self) -> usize {
        self.vector_dims.len()
            * self.num_locations.len()
            * self.radius_factors.len()
            * self.reinforce.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(f) = self.radius_factors.iter().find(|f| !(**f > 0.0 && **f < 1.0)) {
            return Err(SdmError::InvalidConfig(format!(
                "radius factor must be in (0, 1), got {}",
                f
            )));
        }
        if self.reinforce.contains(&0) {
            return Err(SdmError::InvalidConfig("reinforce must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Run every configuration in order: dims, then locations, then radius
    /// factors, then reinforcement counts.
    ///
    /// `access_radius = max(1, floor(vector_dim * factor))`. Engines and
    /// patterns are all seeded from `seed`.
    pub fn run(&self, seed: u64) -> Result<Vec<SweepRow>> {
        self.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut rows = Vec::with_capacity(self.len());

        for &vector_dim in &self.vector_dims {
            for &num_locations in &self.num_locations {
                for &factor in &self.radius_factors {
                    for &reinforce in &self.reinforce {
                        let access_radius = ((vector_dim as f64 * factor) as usize).max(1);
                        let config = EngineConfig::new(vector_dim, num_locations, access_radius)
                            .with_sparsity(self.sparsity)
                            .with_seed(seed);

                        let start = Instant::now();
                        let report = run_memory_test(&config, reinforce, &mut rng)?;
                        let duration_secs = start.elapsed().as_secs_f64();

                        let s = report.summary;
                        rows.push(SweepRow {
                            vector_dim,
                            num_locations,
                            access_radius,
                            reinforce,
                            match_ratio: s.match_ratio,
                            input_ones: s.input_ones,
                            recalled_ones: s.recalled_ones,
                            duration_secs,
                            radius_factor: factor,
                            input_sparsity: s.input_ones as f64 / vector_dim as f64,
                        });
                    }
                }
            }
        }

        info!(configurations = rows.len(), "sweep finished");
        Ok(rows)
    }
}

/// Row with the highest match ratio; the earliest wins ties.
pub fn best_row(rows: &[SweepRow]) -> Option<&SweepRow> {
    rows.iter().fold(None, |best: Option<&SweepRow>, row| match best {
        Some(b) if b.match_ratio >= row.match_ratio => Some(b),
        _ => Some(row),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_pattern_retained() {
        let config = EngineConfig::new(32, 3000, 18).with_seed(3);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let report = run_memory_test(&config, 30, &mut rng).unwrap();
        assert!(
            report.summary.match_ratio > 0.9,
            "Sparse pattern should survive 30 writes, got {}",
            report.summary.match_ratio
        );
        assert_eq!(report.summary.input_ones, 1);
        assert_eq!(report.summary.input_preview.len(), PREVIEW_BITS);
        assert_eq!(report.input.len(), 32);
    }

    #[test]
    fn test_dense_pattern_in_dense_mode() {
        let config = EngineConfig::new(64, 200, 30).with_sparsity(0.5).with_seed(1);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let report = run_memory_test(&config, 1, &mut rng).unwrap();
        assert!(report.summary.input_ones > 10, "Dense patterns are uniform");
    }

    #[test]
    fn test_rejects_bad_test_config() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let at_dim = EngineConfig::new(16, 100, 16);
        assert!(run_memory_test(&at_dim, 5, &mut rng).is_err());
        let ok = EngineConfig::new(16, 100, 4);
        assert!(run_memory_test(&ok, 0, &mut rng).is_err());
        assert!(test_configuration(&ok, 5, 0, &mut rng).is_err());
    }

    #[test]
    fn test_configuration_mean() {
        let config = EngineConfig::new(32, 3000, 18).with_seed(4);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mean = test_configuration(&config, 10, 3, &mut rng).unwrap();
        assert!((0.0..=1.0).contains(&mean));
    }

    #[test]
    fn test_small_sweep() {
        let grid = SweepGrid {
            vector_dims: vec![16, 32],
            num_locations: vec![100],
            radius_factors: vec![0.05, 0.5],
            reinforce: vec![1, 5],
            sparsity: 0.03,
        };
        assert_eq!(grid.len(), 8);
        let rows = grid.run(9).unwrap();
        assert_eq!(rows.len(), 8);

        // floor(16 * 0.05) == 0 is lifted to 1
        assert_eq!(rows[0].access_radius, 1);
        assert_eq!(rows[2].access_radius, 8);
        assert_eq!(rows[7].access_radius, 16);
        assert!(rows.iter().all(|r| r.radius_factor == 0.05 || r.radius_factor == 0.5));

        let best = best_row(&rows).unwrap();
        assert!(rows.iter().all(|r| r.match_ratio <= best.match_ratio));
    }

    #[test]
    fn test_sweep_rejects_factor_one() {
        let grid = SweepGrid {
            radius_factors: vec![1.0],
            ..SweepGrid::default()
        };
        assert!(grid.run(0).is_err());
    }

    #[test]
    fn test_best_row_prefers_first() {
        assert!(best_row(&[]).is_none());
        let row = |match_ratio| SweepRow {
            vector_dim: 8,
            num_locations: 10,
            access_radius: 1,
            reinforce: 1,
            match_ratio,
            input_ones: 0,
            recalled_ones: 0,
            duration_secs: 0.0,
            radius_factor: 0.1,
            input_sparsity: 0.0,
        };
        let rows = vec![row(0.5), row(0.9), row(0.9)];
        let best = best_row(&rows).unwrap();
        assert!(std::ptr::eq(best, &rows[1]));
    }
}
