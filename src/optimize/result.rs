//! Optimizer output records.

use super::metric::PerformanceMetric;
use serde::Serialize;

/// Outcome of one optimizer invocation. Not part of engine state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub radius: usize,
    pub score: f64,
    pub strategy: &'static str,
    pub metric: PerformanceMetric,
    pub trace: SearchTrace,
}

/// Strategy-specific record of how the radius was found.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchTrace {
    Exhaustive {
        /// `(radius, score)` for every radius in the range, in order.
        scores: Vec<(usize, f64)>,
    },
    Evolutionary {
        best_per_generation: Vec<f64>,
        final_population: Vec<usize>,
    },
    GradientAscent {
        radius_history: Vec<usize>,
        score_history: Vec<f64>,
        converged: bool,
    },
    Consensus {
        /// Each agent's last proposal, in agent order.
        proposals: Vec<usize>,
        iterations: usize,
        agreement: f64,
        /// Final agreement meets the consensus threshold.
        converged: bool,
    },
    Hierarchical {
        /// Consensus radius of each contiguous cluster.
        cluster_radii: Vec<usize>,
        /// Leaders' last proposals in the global round.
        leader_proposals: Vec<usize>,
        iterations: usize,
        agreement: f64,
        converged: bool,
    },
    Independent {
        /// Each agent's exhaustive-search optimum.
        radii: Vec<usize>,
    },
}
