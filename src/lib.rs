//! # sdm-swarm: Sparse Distributed Memory with Radius Consensus
//!
//! A Kanerva-style sparse distributed memory over binary vectors, plus
//! optimizers that tune its access radius, alone or across a swarm of
//! independent memories.
//!
//! ## Quick Start
//!
//! ```rust
//! use sdm_swarm::{BitVector, EngineConfig, MemoryEngine};
//! use sdm_swarm::{PerformanceMetric, RadiusOptimizer, RadiusRange, SearchStrategy};
//!
//! # fn main() -> sdm_swarm::Result<()> {
//! let mut engine = MemoryEngine::new(&EngineConfig::new(32, 500, 8).with_seed(1))?;
//! let patterns = vec![
//!     BitVector::from_indices(32, &[2, 17])?,
//!     BitVector::from_indices(32, &[9])?,
//! ];
//!
//! // Store and recall
//! engine.write(&patterns[0])?;
//! let recalled = engine.read(&patterns[0])?;
//! println!("confidence {:.2}", recalled.confidence);
//!
//! // Tune the radius
//! let mut optimizer = RadiusOptimizer::new(SearchStrategy::Exhaustive);
//! let best = optimizer.optimize(
//!     &mut engine,
//!     &patterns,
//!     PerformanceMetric::ActivationRate,
//!     Some(RadiusRange::new(1, 16)),
//! )?;
//! assert!(RadiusRange::new(1, 16).contains(best.radius));
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! - [`kernel`]: `BitVector` and encoders from real-valued input
//! - [`memory`]: the engine, its configuration and statistics
//! - [`optimize`]: metrics, search strategies, single and swarm optimizers
//! - [`diagnostics`]: memory self-test and parameter sweeps
//!
//! Logging goes through `tracing`; install a subscriber to see it.

pub mod diagnostics;
pub mod error;
pub mod kernel;
pub mod memory;
pub mod optimize;

// Re-exports for convenience
pub use error::{Result, SdmError};
pub use kernel::{BitVector, SparseEncoder};
pub use memory::{AddressMode, EngineConfig, MemoryEngine, MemoryStatistics, ReadResult};
pub use optimize::{
    EvaluationMode, LeaderSpec, OptimizationResult, PerformanceMetric, RadiusOptimizer,
    RadiusRange, SearchStrategy, SearchTrace, SwarmConfig, SwarmMode, SwarmRadiusOptimizer,
};
