//! Access-radius negotiation across several independent memory engines.
//!
//! Agents never see each other's addresses or counters. Each round they
//! exchange one scalar proposal: every agent scores a handful of radii on
//! its own engine and reports its favourite, and the swarm checks how many
//! proposals sit within ±1 of their mean.
//!
//! Three modes are available:
//!
//! - **Consensus**: exhaustive proposals, then rounds over
//!   `{mean - 1, mean, mean + 1}` until agreement reaches the threshold.
//! - **Hierarchical**: consensus inside contiguous clusters, then
//!   consensus among one leader per cluster.
//! - **Independent**: exhaustive optimum per agent, averaged, no rounds.
//!
//! With the `parallel` feature, per-agent work within a round runs on the
//! rayon pool. Each agent only touches its own engine.

use super::metric::{check_patterns, PerformanceMetric};
use super::result::{OptimizationResult, SearchTrace};
use super::single::{EvaluationMode, RadiusOptimizer};
use super::strategy::{RadiusRange, SearchStrategy};
use crate::error::{Result, SdmError};
use crate::kernel::BitVector;
use crate::memory::{EngineConfig, MemoryEngine};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// How the swarm combines per-agent proposals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwarmMode {
    #[default]
    Consensus,
    Hierarchical,
    Independent,
}

impl SwarmMode {
    pub fn name(&self) -> &'static str {
        match self {
            SwarmMode::Consensus => "swarm_consensus",
            SwarmMode::Hierarchical => "hierarchical",
            SwarmMode::Independent => "independent_average",
        }
    }
}

/// Swarm optimizer settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    pub mode: SwarmMode,
    /// Fraction of proposals that must lie within ±1 of the mean.
    pub consensus_threshold: f64,
    /// Maximum negotiation rounds.
    pub max_iterations: usize,
    /// Lower bound on hierarchical cluster size.
    pub min_cluster_size: usize,
    /// Write the negotiated radius back into every agent that admits it.
    pub apply_to_agents: bool,
    pub evaluation: EvaluationMode,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            mode: SwarmMode::Consensus,
            consensus_threshold: 0.8,
            max_iterations: 10,
            min_cluster_size: 3,
            apply_to_agents: false,
            evaluation: EvaluationMode::Cumulative,
        }
    }
}

impl SwarmConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.consensus_threshold) {
            return Err(SdmError::InvalidConfig(format!(
                "consensus_threshold must be in [0, 1], got {}",
                self.consensus_threshold
            )));
        }
        if self.min_cluster_size == 0 {
            return Err(SdmError::InvalidConfig(
                "min_cluster_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A cluster leader: the cluster's consensus plus enough configuration to
/// build an engine if the leader ever has to score a radius itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderSpec {
    pub cluster: usize,
    pub radius: usize,
    /// Mean agent score at the cluster's consensus.
    pub score: f64,
    pub vector_dim: usize,
    pub num_locations: usize,
    pub sparsity: f64,
    pub seed: u64,
}

impl LeaderSpec {
    /// Describe the leader of `cluster`, shaped like its first agent.
    pub fn for_cluster(
        representative: &MemoryEngine,
        cluster: usize,
        radius: usize,
        score: f64,
    ) -> Self {
        let config = representative
            .config()
            .with_label_seed(&format!("cluster-leader-{}", cluster));
        Self {
            cluster,
            radius,
            score,
            vector_dim: config.vector_dim,
            num_locations: config.num_locations,
            sparsity: config.sparsity,
            seed: config.seed,
        }
    }

    /// Build a fresh engine for this leader, set to its radius.
    pub fn materialize(&self) -> Result<MemoryEngine> {
        let config = EngineConfig {
            vector_dim: self.vector_dim,
            num_locations: self.num_locations,
            access_radius: self.radius.min(self.vector_dim),
            sparsity: self.sparsity,
            seed: self.seed,
        };
        MemoryEngine::new(&config)
    }
}

/// Negotiates one access radius across a set of engines.
#[derive(Clone, Debug, Default)]
pub struct SwarmRadiusOptimizer {
    config: SwarmConfig,
}

impl SwarmRadiusOptimizer {
    pub fn new(config: SwarmConfig) -> Self {
        Self { config }
    }

    pub fn with_mode(mode: SwarmMode) -> Self {
        Self::new(SwarmConfig {
            mode,
            ..SwarmConfig::default()
        })
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Negotiate a radius for `agents` against a shared pattern set.
    ///
    /// Every agent must match the patterns' dimension and admit a non-empty
    /// default range `[1, vector_dim / 2]`; this is checked for all agents
    /// before any engine is evaluated.
    pub fn optimize_across_swarm(
        &self,
        agents: &mut [MemoryEngine],
        patterns: &[BitVector],
        metric: PerformanceMetric,
    ) -> Result<OptimizationResult> {
        self.config.validate()?;
        if agents.is_empty() {
            return Err(SdmError::EmptyInput("agent set".to_string()));
        }
        for agent in agents.iter() {
            agent.valid_range().validate(agent.vector_dim())?;
            check_patterns(agent, patterns)?;
        }

        info!(
            agents = agents.len(),
            mode = self.config.mode.name(),
            metric = metric.name(),
            "optimizing radius across swarm"
        );

        let (radius, score, trace) = match self.config.mode {
            SwarmMode::Consensus => {
                let outcome = self.consensus(agents, patterns, metric)?;
                (
                    outcome.radius,
                    outcome.score,
                    SearchTrace::Consensus {
                        proposals: outcome.proposals,
                        iterations: outcome.iterations,
                        agreement: outcome.agreement,
                        converged: outcome.converged,
                    },
                )
            }
            SwarmMode::Hierarchical => self.hierarchical(agents, patterns, metric)?,
            SwarmMode::Independent => self.independent(agents, patterns, metric)?,
        };

        if self.config.apply_to_agents {
            for (i, agent) in agents.iter_mut().enumerate() {
                if agent.set_access_radius(radius).is_err() {
                    warn!(agent = i, radius, "radius exceeds agent vector_dim, not applied");
                }
            }
        }

        info!(radius, score, mode = self.config.mode.name(), "swarm optimization finished");

        Ok(OptimizationResult {
            radius,
            score,
            strategy: self.config.mode.name(),
            metric,
            trace,
        })
    }

    fn consensus<A: Agent + Send>(
        &self,
        agents: &mut [A],
        patterns: &[BitVector],
        metric: PerformanceMetric,
    ) -> Result<Consensus> {
        let evaluation = self.config.evaluation;
        let mut proposals =
            map_agents(agents, |_, agent| agent.propose(patterns, metric, evaluation))?;

        let mut rounds = 0;
        while rounds < self.config.max_iterations {
            rounds += 1;
            let mean = truncated_mean(&proposals);
            let agreement = agreement_ratio(&proposals, mean);
            debug!(round = rounds, mean, agreement, "consensus round");

            if agreement >= self.config.consensus_threshold {
                break;
            }

            let previous = proposals;
            proposals = map_agents(agents, |i, agent| {
                let range = agent.valid_range();
                let mut best: Option<Proposal> = None;
                for candidate in [mean.checked_sub(1), Some(mean), Some(mean + 1)]
                    .into_iter()
                    .flatten()
                    .filter(|&r| range.contains(r))
                {
                    let score = agent.score(patterns, candidate, metric, evaluation)?;
                    if best.map_or(true, |b| score > b.score) {
                        best = Some(Proposal {
                            radius: candidate,
                            score,
                        });
                    }
                }
                // No candidate in range: the agent stands by its last proposal
                Ok(best.unwrap_or(previous[i]))
            })?;
        }

        // Re-proposals from the last allowed round may already agree
        let agreement = agreement_ratio(&proposals, truncated_mean(&proposals));
        Ok(Consensus {
            radius: rounded_mean(&proposals),
            score: mean_score(&proposals),
            agreement,
            proposals: proposals.iter().map(|p| p.radius).collect(),
            iterations: rounds,
            converged: agreement >= self.config.consensus_threshold,
        })
    }

    fn hierarchical(
        &self,
        agents: &mut [MemoryEngine],
        patterns: &[BitVector],
        metric: PerformanceMetric,
    ) -> Result<(usize, f64, SearchTrace)> {
        let group_size = self.config.min_cluster_size.max(agents.len() / 3);
        let mut cluster_radii = Vec::new();
        let mut leaders = Vec::new();

        for (idx, cluster) in agents.chunks_mut(group_size).enumerate() {
            info!(cluster = idx + 1, agents = cluster.len(), "optimizing cluster");
            let outcome = self.consensus(cluster, patterns, metric)?;
            cluster_radii.push(outcome.radius);
            leaders.push(Leader::new(LeaderSpec::for_cluster(
                &cluster[0],
                idx,
                outcome.radius,
                outcome.score,
            )));
        }

        info!(leaders = leaders.len(), "global consensus among cluster leaders");
        let global = self.consensus(&mut leaders, patterns, metric)?;

        Ok((
            global.radius,
            global.score,
            SearchTrace::Hierarchical {
                cluster_radii,
                leader_proposals: global.proposals,
                iterations: global.iterations,
                agreement: global.agreement,
                converged: global.converged,
            },
        ))
    }

    fn independent(
        &self,
        agents: &mut [MemoryEngine],
        patterns: &[BitVector],
        metric: PerformanceMetric,
    ) -> Result<(usize, f64, SearchTrace)> {
        let evaluation = self.config.evaluation;
        let proposals = map_agents(agents, |_, agent| agent.propose(patterns, metric, evaluation))?;
        Ok((
            truncated_mean(&proposals),
            mean_score(&proposals),
            SearchTrace::Independent {
                radii: proposals.iter().map(|p| p.radius).collect(),
            },
        ))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Proposal {
    radius: usize,
    score: f64,
}

#[derive(Debug)]
struct Consensus {
    radius: usize,
    score: f64,
    proposals: Vec<usize>,
    iterations: usize,
    agreement: f64,
    converged: bool,
}

/// A swarm participant: proposes a radius and scores candidates against
/// its own private state.
trait Agent {
    /// Radii this agent will consider.
    fn valid_range(&self) -> RadiusRange;

    /// Opening proposal.
    fn propose(
        &mut self,
        patterns: &[BitVector],
        metric: PerformanceMetric,
        evaluation: EvaluationMode,
    ) -> Result<Proposal>;

    fn score(
        &mut self,
        patterns: &[BitVector],
        radius: usize,
        metric: PerformanceMetric,
        evaluation: EvaluationMode,
    ) -> Result<f64>;
}

impl Agent for MemoryEngine {
    fn valid_range(&self) -> RadiusRange {
        RadiusRange::default_for(self.vector_dim())
    }

    fn propose(
        &mut self,
        patterns: &[BitVector],
        metric: PerformanceMetric,
        evaluation: EvaluationMode,
    ) -> Result<Proposal> {
        let range = self.valid_range();
        let result = RadiusOptimizer::new(SearchStrategy::Exhaustive)
            .with_evaluation(evaluation)
            .optimize(self, patterns, metric, Some(range))?;
        Ok(Proposal {
            radius: result.radius,
            score: result.score,
        })
    }

    fn score(
        &mut self,
        patterns: &[BitVector],
        radius: usize,
        metric: PerformanceMetric,
        evaluation: EvaluationMode,
    ) -> Result<f64> {
        RadiusOptimizer::new(SearchStrategy::Exhaustive)
            .with_evaluation(evaluation)
            .evaluate_radius(self, patterns, radius, metric)
    }
}

/// Cluster leader; its engine is built on the first evaluation.
struct Leader {
    spec: LeaderSpec,
    engine: Option<MemoryEngine>,
}

impl Leader {
    fn new(spec: LeaderSpec) -> Self {
        Self { spec, engine: None }
    }
}

impl Agent for Leader {
    fn valid_range(&self) -> RadiusRange {
        RadiusRange::default_for(self.spec.vector_dim)
    }

    fn propose(
        &mut self,
        _patterns: &[BitVector],
        _metric: PerformanceMetric,
        _evaluation: EvaluationMode,
    ) -> Result<Proposal> {
        Ok(Proposal {
            radius: self.spec.radius,
            score: self.spec.score,
        })
    }

    fn score(
        &mut self,
        patterns: &[BitVector],
        radius: usize,
        metric: PerformanceMetric,
        evaluation: EvaluationMode,
    ) -> Result<f64> {
        let engine = match self.engine.take() {
            Some(engine) => engine,
            None => {
                debug!(cluster = self.spec.cluster, "materializing leader engine");
                self.spec.materialize()?
            }
        };
        self.engine.insert(engine).score(patterns, radius, metric, evaluation)
    }
}

#[cfg(feature = "parallel")]
fn map_agents<A, T, F>(agents: &mut [A], f: F) -> Result<Vec<T>>
where
    A: Send,
    T: Send,
    F: Fn(usize, &mut A) -> Result<T> + Sync + Send,
{
    use rayon::prelude::*;
    agents
        .par_iter_mut()
        .enumerate()
        .map(|(i, agent)| f(i, agent))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn map_agents<A, T, F>(agents: &mut [A], f: F) -> Result<Vec<T>>
where
    A: Send,
    T: Send,
    F: Fn(usize, &mut A) -> Result<T> + Sync + Send,
{
    agents
        .iter_mut()
        .enumerate()
        .map(|(i, agent)| f(i, agent))
        .collect()
}

fn truncated_mean(proposals: &[Proposal]) -> usize {
    if proposals.is_empty() {
        return 0;
    }
    proposals.iter().map(|p| p.radius).sum::<usize>() / proposals.len()
}

fn rounded_mean(proposals: &[Proposal]) -> usize {
    if proposals.is_empty() {
        return 0;
    }
    let sum = proposals.iter().map(|p| p.radius).sum::<usize>() as f64;
    (sum / proposals.len() as f64).round() as usize
}

fn mean_score(proposals: &[Proposal]) -> f64 {
    if proposals.is_empty() {
        return 0.0;
    }
    proposals.iter().map(|p| p.score).sum::<f64>() / proposals.len() as f64
}

/// Fraction of proposals within ±1 of `mean`.
fn agreement_ratio(proposals: &[Proposal], mean: usize) -> f64 {
    if proposals.is_empty() {
        return 0.0;
    }
    let agreeing = proposals
        .iter()
        .filter(|p| p.radius.abs_diff(mean) <= 1)
        .count();
    agreeing as f64 / proposals.len() as f64
}
