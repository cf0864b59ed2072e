//! The sparse distributed memory engine.
//!
//! A fixed table of random "hard locations" is generated once at
//! construction. Writing a pattern reinforces the signed counters of every
//! location whose address lies within `access_radius` (Hamming) of the
//! pattern; reading aggregates the counters of the locations near the
//! query, weighted by `1 / (1 + distance)`, and thresholds at zero.
//!
//! # Example
//!
//! ```rust
//! use sdm_swarm::memory::{EngineConfig, MemoryEngine};
//! use sdm_swarm::BitVector;
//!
//! # fn main() -> sdm_swarm::Result<()> {
//! let config = EngineConfig::new(32, 3000, 18).with_seed(7);
//! let mut engine = MemoryEngine::new(&config)?;
//!
//! let pattern = BitVector::from_indices(32, &[3])?;
//! for _ in 0..30 {
//!     engine.write(&pattern)?;
//! }
//!
//! let recalled = engine.read(&pattern)?;
//! assert!(recalled.output.match_ratio(&pattern)? > 0.9);
//! # Ok(())
//! # }
//! ```

use super::config::{AddressMode, EngineConfig};
use super::stats::{MemoryStatistics, ReadRecord, StatsLog, WriteRecord};
use crate::error::{Result, SdmError};
use crate::kernel::bitvec::{hamming_distance, BitVector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Output of [`MemoryEngine::read`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadResult {
    /// Recalled pattern (all zeros on a miss).
    pub output: BitVector,
    /// Largest absolute weighted bit signal (0.0 on a miss).
    pub confidence: f64,
    /// Number of activated locations.
    pub activated: usize,
}

impl ReadResult {
    /// No location was within the access radius.
    pub fn is_miss(&self) -> bool {
        self.activated == 0
    }
}

/// Copy of the reinforcement state (`counters` and `access_counts`).
///
/// Used to run an evaluation and then roll the engine back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub vector_dim: usize,
    pub num_locations: usize,
    /// Flat row-major: num_locations rows × vector_dim columns.
    pub counters: Vec<i64>,
    pub access_counts: Vec<u64>,
}

/// Sparse distributed memory over fixed random hard locations.
#[derive(Clone, Debug)]
pub struct MemoryEngine {
    vector_dim: usize,
    num_locations: usize,
    access_radius: usize,
    sparsity: f64,
    seed: u64,
    mode: AddressMode,

    addresses: Vec<BitVector>,
    /// Row-major flat storage: counters[i * vector_dim .. (i+1) * vector_dim] = location i.
    counters: Vec<i64>,
    access_counts: Vec<u64>,

    stats: StatsLog,
}

impl MemoryEngine {
    /// Build an engine whose addresses come from a `ChaCha8Rng` seeded
    /// with `config.seed`.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(config, &mut rng)
    }

    /// Build an engine drawing its addresses from a caller-owned generator.
    ///
    /// Several engines can share one generator to get independent tables
    /// from a single seed. `config.seed` is kept for reporting only.
    pub fn with_rng<R: Rng + ?Sized>(config: &EngineConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;

        let mode = config.address_mode();
        let addresses: Vec<BitVector> = (0..config.num_locations)
            .map(|_| match mode {
                AddressMode::Sparse { ones } => {
                    BitVector::random_sparse(config.vector_dim, ones, rng)
                }
                AddressMode::Dense => BitVector::random_dense(config.vector_dim, rng),
            })
            .collect();

        debug!(
            vector_dim = config.vector_dim,
            num_locations = config.num_locations,
            access_radius = config.access_radius,
            ?mode,
            "memory engine initialized"
        );

        Ok(Self {
            vector_dim: config.vector_dim,
            num_locations: config.num_locations,
            access_radius: config.access_radius,
            sparsity: config.sparsity,
            seed: config.seed,
            mode,
            addresses,
            counters: vec![0; config.num_locations * config.vector_dim],
            access_counts: vec![0; config.num_locations],
            stats: StatsLog::default(),
        })
    }

    // --- Accessors ---

    pub fn vector_dim(&self) -> usize {
        self.vector_dim
    }

    pub fn num_locations(&self) -> usize {
        self.num_locations
    }

    pub fn access_radius(&self) -> usize {
        self.access_radius
    }

    pub fn sparsity(&self) -> f64 {
        self.sparsity
    }

    pub fn address_mode(&self) -> AddressMode {
        self.mode
    }

    /// The configuration this engine was built from, with the radius
    /// currently in effect.
    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            vector_dim: self.vector_dim,
            num_locations: self.num_locations,
            access_radius: self.access_radius,
            sparsity: self.sparsity,
            seed: self.seed,
        }
    }

    /// Change the radius used by future reads and writes.
    ///
    /// Past reinforcement is not recomputed.
    pub fn set_access_radius(&mut self, radius: usize) -> Result<()> {
        if radius > self.vector_dim {
            return Err(SdmError::InvalidConfig(format!(
                "access_radius {} exceeds vector_dim {}",
                radius, self.vector_dim
            )));
        }
        self.access_radius = radius;
        Ok(())
    }

    /// Hard-location addresses, fixed since construction.
    pub fn addresses(&self) -> &[BitVector] {
        &self.addresses
    }

    /// Counter row of location `i`, if it exists.
    pub fn counters(&self, i: usize) -> Option<&[i64]> {
        if i >= self.num_locations {
            return None;
        }
        let base = i * self.vector_dim;
        Some(&self.counters[base..base + self.vector_dim])
    }

    pub fn access_counts(&self) -> &[u64] {
        &self.access_counts
    }

    // --- Core operations ---

    /// Write `pattern` with strength 1. Returns the number of activated
    /// locations.
    pub fn write(&mut self, pattern: &BitVector) -> Result<usize> {
        self.write_with_strength(pattern, 1)
    }

    /// Reinforce every location within `access_radius` of `pattern`.
    ///
    /// Each activated location adds `strength` to the counters where the
    /// pattern has a 1 and subtracts it where the pattern has a 0. Counters
    /// are unbounded.
    pub fn write_with_strength(&mut self, pattern: &BitVector, strength: u32) -> Result<usize> {
        self.check_dim(pattern)?;

        let strength = i64::from(strength);
        let dim = self.vector_dim;
        let mut activated = 0;

        for i in 0..self.num_locations {
            let dist = hamming_distance(pattern.bits(), self.addresses[i].bits());
            if dist > self.access_radius {
                continue;
            }
            activated += 1;
            self.access_counts[i] += 1;

            let row = &mut self.counters[i * dim..(i + 1) * dim];
            for (c, &bit) in row.iter_mut().zip(pattern.bits()) {
                if bit == 1 {
                    *c += strength;
                } else {
                    *c -= strength;
                }
            }
        }

        self.stats.record_write(WriteRecord {
            activated,
            activation_rate: activated as f64 / self.num_locations as f64,
            pattern_density: pattern.density(),
        });

        Ok(activated)
    }

    /// Recall the pattern stored near `query`.
    ///
    /// An empty activation set is a valid miss: the output is all zeros
    /// with confidence 0.0. Reads leave counters and access counts alone;
    /// they only append to the statistics log.
    pub fn read(&mut self, query: &BitVector) -> Result<ReadResult> {
        self.check_dim(query)?;

        let activated = self.scan(query);
        let mean_distance = if activated.is_empty() {
            0.0
        } else {
            activated.iter().map(|&(_, d)| d as f64).sum::<f64>() / activated.len() as f64
        };
        let result = self.recall(&activated);

        self.stats.record_read(ReadRecord {
            activated: result.activated,
            activation_rate: result.activated as f64 / self.num_locations as f64,
            confidence: result.confidence,
            mean_distance,
        });

        Ok(result)
    }

    /// Indices and distances of every location within `access_radius` of
    /// `query`. Read-only; nothing is logged.
    pub fn activated_locations(&self, query: &BitVector) -> Result<Vec<(usize, usize)>> {
        self.check_dim(query)?;
        Ok(self.scan(query))
    }

    /// Number of locations within `access_radius` of `query`.
    pub fn activation_count(&self, query: &BitVector) -> Result<usize> {
        self.check_dim(query)?;
        Ok(self
            .addresses
            .iter()
            .filter(|addr| hamming_distance(query.bits(), addr.bits()) <= self.access_radius)
            .count())
    }

    // --- State and statistics ---

    /// Copy the reinforcement state.
    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            vector_dim: self.vector_dim,
            num_locations: self.num_locations,
            counters: self.counters.clone(),
            access_counts: self.access_counts.clone(),
        }
    }

    /// Roll counters and access counts back to `snapshot`.
    ///
    /// The address table, radius and statistics log are untouched.
    pub fn restore(&mut self, snapshot: &MemorySnapshot) -> Result<()> {
        if snapshot.vector_dim != self.vector_dim {
            return Err(SdmError::DimensionMismatch {
                expected: self.vector_dim,
                got: snapshot.vector_dim,
            });
        }
        if snapshot.num_locations != self.num_locations
            || snapshot.counters.len() != self.counters.len()
            || snapshot.access_counts.len() != self.access_counts.len()
        {
            return Err(SdmError::InvalidConfig(format!(
                "snapshot shape {}x{} does not match engine {}x{}",
                snapshot.num_locations, snapshot.vector_dim, self.num_locations, self.vector_dim
            )));
        }
        self.counters.copy_from_slice(&snapshot.counters);
        self.access_counts.copy_from_slice(&snapshot.access_counts);
        Ok(())
    }

    /// Utilization, access-count and magnitude summary plus the logs.
    pub fn statistics(&self) -> MemoryStatistics {
        let used = self.access_counts.iter().filter(|&&c| c > 0).count();
        let total_access: u64 = self.access_counts.iter().sum();
        let magnitude: f64 = self.counters.iter().map(|c| c.unsigned_abs() as f64).sum();

        MemoryStatistics {
            memory_utilization: used as f64 / self.num_locations as f64,
            mean_access_count: total_access as f64 / self.num_locations as f64,
            max_access_count: self.access_counts.iter().copied().max().unwrap_or(0),
            memory_magnitude: magnitude / self.counters.len() as f64,
            total_writes: self.stats.total_writes,
            total_reads: self.stats.total_reads,
            last_activated: self.stats.last_activated,
            last_confidence: self.stats.last_confidence,
            write_log: self.stats.writes.clone(),
            read_log: self.stats.reads.clone(),
        }
    }

    /// Clear the statistics log. Memory contents are kept.
    pub fn reset_statistics(&mut self) {
        self.stats.reset();
    }

    /// Fail fast when a pattern's length differs from `vector_dim`.
    pub fn check_dim(&self, pattern: &BitVector) -> Result<()> {
        if pattern.len() != self.vector_dim {
            return Err(SdmError::DimensionMismatch {
                expected: self.vector_dim,
                got: pattern.len(),
            });
        }
        Ok(())
    }

    // --- Private helpers ---

    fn scan(&self, query: &BitVector) -> Vec<(usize, usize)> {
        self.addresses
            .iter()
            .enumerate()
            .filter_map(|(i, addr)| {
                let dist = hamming_distance(query.bits(), addr.bits());
                (dist <= self.access_radius).then_some((i, dist))
            })
            .collect()
    }

    fn recall(&self, activated: &[(usize, usize)]) -> ReadResult {
        let dim = self.vector_dim;
        if activated.is_empty() {
            return ReadResult {
                output: BitVector::zeros(dim),
                confidence: 0.0,
                activated: 0,
            };
        }

        let total_weight: f64 = activated.iter().map(|&(_, d)| weight(d)).sum();
        let mut sums = vec![0.0f64; dim];
        for &(i, d) in activated {
            let w = weight(d) / total_weight;
            let row = &self.counters[i * dim..(i + 1) * dim];
            for (s, &c) in sums.iter_mut().zip(row) {
                *s += w * c as f64;
            }
        }

        let bools: Vec<bool> = sums.iter().map(|&s| s > 0.0).collect();
        let confidence = sums.iter().fold(0.0f64, |m, s| m.max(s.abs()));

        ReadResult {
            output: BitVector::from_bools(&bools),
            confidence,
            activated: activated.len(),
        }
    }
}

#[inline]
fn weight(distance: usize) -> f64 {
    1.0 / (1.0 + distance as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(dim: usize, locations: usize, radius: usize, sparsity: f64) -> MemoryEngine {
        let config = EngineConfig::new(dim, locations, radius)
            .with_sparsity(sparsity)
            .with_seed(42);
        MemoryEngine::new(&config).unwrap()
    }

    #[test]
    fn test_sparse_addresses_have_exact_weight() {
        let e = engine(128, 200, 20, 0.03);
        assert_eq!(e.address_mode(), AddressMode::Sparse { ones: 4 });
        assert!(e.addresses().iter().all(|a| a.count_ones() == 4));
    }

    #[test]
    fn test_dense_addresses() {
        let e = engine(256, 100, 100, 0.5);
        assert_eq!(e.address_mode(), AddressMode::Dense);
        let mean_density: f64 =
            e.addresses().iter().map(|a| a.density()).sum::<f64>() / 100.0;
        assert!(
            (0.45..0.55).contains(&mean_density),
            "Expected dense addresses near 0.5, got {}",
            mean_density
        );
    }

    #[test]
    fn test_same_seed_same_addresses() {
        let a = engine(64, 50, 10, 0.03);
        let b = engine(64, 50, 10, 0.03);
        assert_eq!(a.addresses(), b.addresses());
    }

    #[test]
    fn test_fresh_engine_reads_zero() {
        let mut e = engine(32, 500, 16, 0.03);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let query = BitVector::random_dense(32, &mut rng);
        let result = e.read(&query).unwrap();
        assert_eq!(result.output, BitVector::zeros(32));
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_write_updates_counters_signed() {
        // Radius == vector_dim activates every location
        let mut e = engine(8, 10, 8, 0.03);
        let pattern = BitVector::from_bits(vec![1, 0, 0, 1, 0, 0, 0, 0]).unwrap();

        assert_eq!(e.write_with_strength(&pattern, 3).unwrap(), 10);
        let row = e.counters(0).unwrap();
        assert_eq!(row, &[3, -3, -3, 3, -3, -3, -3, -3]);
        assert!(e.access_counts().iter().all(|&c| c == 1));
        assert!(e.counters(10).is_none());
    }

    #[test]
    fn test_write_recall_round_trip() {
        let mut e = engine(32, 3000, 18, 0.03);
        let pattern = BitVector::from_indices(32, &[5]).unwrap();
        for _ in 0..30 {
            e.write(&pattern).unwrap();
        }
        let result = e.read(&pattern).unwrap();
        assert!(result.output.match_ratio(&pattern).unwrap() > 0.9);
        assert!(result.confidence > 0.0);
    }

    #[test]
    fn test_radius_zero_miss() {
        let mut e = engine(64, 500, 0, 0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let pattern = BitVector::random_dense(64, &mut rng);
        e.write(&pattern).unwrap();

        let mut bits = pattern.bits().to_vec();
        bits[0] ^= 1;
        let query = BitVector::from_bits(bits).unwrap();

        let result = e.read(&query).unwrap();
        assert!(result.is_miss());
        assert_eq!(result.output, BitVector::zeros(64));
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_read_does_not_mutate_memory() {
        let mut e = engine(32, 300, 16, 0.03);
        let pattern = BitVector::from_indices(32, &[1, 2]).unwrap();
        e.write(&pattern).unwrap();
        let before = e.snapshot();
        e.read(&pattern).unwrap();
        e.read(&BitVector::zeros(32)).unwrap();
        assert_eq!(e.snapshot(), before);
    }

    #[test]
    fn test_dimension_mismatch_fails_before_mutation() {
        let mut e = engine(32, 100, 16, 0.03);
        let before = e.snapshot();
        assert!(matches!(
            e.write(&BitVector::zeros(31)),
            Err(SdmError::DimensionMismatch { expected: 32, got: 31 })
        ));
        assert!(e.read(&BitVector::zeros(33)).is_err());
        assert_eq!(e.snapshot(), before);
        assert_eq!(e.statistics().total_writes, 0);
    }

    #[test]
    fn test_set_access_radius_bounds() {
        let mut e = engine(16, 10, 4, 0.03);
        assert!(e.set_access_radius(16).is_ok());
        assert!(e.set_access_radius(17).is_err());
        assert_eq!(e.access_radius(), 16);
    }

    #[test]
    fn test_activation_count_monotone_in_radius() {
        let mut e = engine(64, 1000, 0, 0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let query = BitVector::random_dense(64, &mut rng);

        let mut previous = 0;
        for r in 0..=64 {
            e.set_access_radius(r).unwrap();
            let count = e.activation_count(&query).unwrap();
            assert!(count >= previous, "Activation dropped at radius {}", r);
            assert_eq!(count, e.activated_locations(&query).unwrap().len());
            previous = count;
        }
        assert_eq!(previous, 1000);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut e = engine(16, 50, 16, 0.03);
        let pattern = BitVector::from_indices(16, &[0]).unwrap();
        let clean = e.snapshot();
        e.write(&pattern).unwrap();
        assert_ne!(e.snapshot(), clean);
        e.restore(&clean).unwrap();
        assert_eq!(e.snapshot(), clean);

        let other = engine(8, 50, 8, 0.03).snapshot();
        assert!(e.restore(&other).is_err());
    }

    #[test]
    fn test_statistics() {
        let mut e = engine(8, 10, 8, 0.03);
        let pattern = BitVector::from_bits(vec![1, 1, 0, 0, 0, 0, 0, 0]).unwrap();
        e.write(&pattern).unwrap();
        e.write(&pattern).unwrap();
        e.read(&pattern).unwrap();

        let stats = e.statistics();
        assert_eq!(stats.memory_utilization, 1.0);
        assert_eq!(stats.mean_access_count, 2.0);
        assert_eq!(stats.max_access_count, 2);
        assert_eq!(stats.memory_magnitude, 2.0);
        assert_eq!(stats.total_writes, 2);
        assert_eq!(stats.total_reads, 1);
        assert_eq!(stats.write_log.len(), 2);
        assert!((stats.write_log[0].pattern_density - 0.25).abs() < 1e-12);
        assert_eq!(stats.read_log[0].activated, 10);
        assert!((stats.last_confidence - 2.0).abs() < 1e-12);

        e.reset_statistics();
        let stats = e.statistics();
        assert_eq!(stats.total_writes, 0);
        assert!(stats.write_log.is_empty());
        assert_eq!(stats.max_access_count, 2, "Reset leaves memory contents alone");
    }
}
