//! Access-radius optimization for one engine or a swarm of engines.
//!
//! [`RadiusOptimizer`] searches a [`RadiusRange`] on a single engine with one
//! of the [`SearchStrategy`] variants. [`SwarmRadiusOptimizer`] negotiates a
//! shared radius across engines that only exchange scalar proposals.

pub mod metric;
pub mod result;
pub mod single;
pub mod strategy;
pub mod swarm;

pub use metric::PerformanceMetric;
pub use result::{OptimizationResult, SearchTrace};
pub use single::{EvaluationMode, RadiusOptimizer};
pub use strategy::{RadiusRange, SearchStrategy};
pub use swarm::{LeaderSpec, SwarmConfig, SwarmMode, SwarmRadiusOptimizer};
