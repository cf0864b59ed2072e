//! Access-radius search for a single memory engine.
//!
//! Candidate radii are scored by temporarily setting the engine's radius,
//! evaluating a [`PerformanceMetric`] and restoring the original radius.
//! Evaluations of one engine are strictly sequential: with the match-based
//! metrics each evaluation observes the reinforcement left by the ones
//! before it, unless [`EvaluationMode::Isolated`] rolls the engine back.
//!
//! # Example
//!
//! ```rust
//! use sdm_swarm::memory::{EngineConfig, MemoryEngine};
//! use sdm_swarm::optimize::{PerformanceMetric, RadiusOptimizer, SearchStrategy};
//! use sdm_swarm::BitVector;
//!
//! # fn main() -> sdm_swarm::Result<()> {
//! let mut engine = MemoryEngine::new(&EngineConfig::new(32, 500, 8).with_seed(1))?;
//! let patterns = vec![BitVector::from_indices(32, &[2, 9])?];
//!
//! let mut optimizer = RadiusOptimizer::new(SearchStrategy::Exhaustive);
//! let result = optimizer.optimize(&mut engine, &patterns, PerformanceMetric::ActivationRate, None)?;
//! // One-bit addresses sit at distance 1 or 3 from a two-bit pattern
//! assert_eq!(result.radius, 3);
//! assert_eq!(engine.access_radius(), 8, "The engine's own radius is restored");
//! # Ok(())
//! # }
//! ```

use super::metric::{check_patterns, PerformanceMetric};
use super::result::{OptimizationResult, SearchTrace};
use super::strategy::{RadiusRange, SearchStrategy};
use crate::error::{Result, SdmError};
use crate::kernel::BitVector;
use crate::memory::MemoryEngine;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Whether candidate evaluations may leave reinforcement behind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Match-based metrics keep reinforcing the engine across evaluations.
    #[default]
    Cumulative,
    /// Snapshot counters before each evaluation and restore them after.
    Isolated,
}

/// Searches for the access radius that maximizes a metric on one engine.
#[derive(Clone, Debug)]
pub struct RadiusOptimizer {
    strategy: SearchStrategy,
    evaluation: EvaluationMode,
    rng: ChaCha8Rng,
}

impl RadiusOptimizer {
    /// Create an optimizer with cumulative evaluation and seed 0.
    pub fn new(strategy: SearchStrategy) -> Self {
        Self::with_seed(strategy, 0)
    }

    /// Create an optimizer whose evolutionary draws use `seed`.
    pub fn with_seed(strategy: SearchStrategy, seed: u64) -> Self {
        Self {
            strategy,
            evaluation: EvaluationMode::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn with_evaluation(mut self, evaluation: EvaluationMode) -> Self {
        self.evaluation = evaluation;
        self
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    pub fn evaluation(&self) -> EvaluationMode {
        self.evaluation
    }

    /// Find the best radius for `engine` within `radius_range`.
    ///
    /// `radius_range` defaults to `[1, vector_dim / 2]`. Patterns, range and
    /// strategy parameters are validated before the engine is touched. The
    /// engine's radius is left as it was; apply the result explicitly with
    /// [`MemoryEngine::set_access_radius`].
    pub fn optimize(
        &mut self,
        engine: &mut MemoryEngine,
        patterns: &[BitVector],
        metric: PerformanceMetric,
        radius_range: Option<RadiusRange>,
    ) -> Result<OptimizationResult> {
        let range = radius_range.unwrap_or_else(|| RadiusRange::default_for(engine.vector_dim()));
        range.validate(engine.vector_dim())?;
        check_patterns(engine, patterns)?;
        self.strategy.validate()?;

        debug!(
            strategy = self.strategy.name(),
            metric = metric.name(),
            min = range.min,
            max = range.max,
            "optimizing access radius"
        );

        let (radius, score, trace) = match self.strategy {
            SearchStrategy::Exhaustive => self.exhaustive(engine, patterns, metric, range)?,
            SearchStrategy::Evolutionary {
                population_size,
                generations,
                tournament_size,
                mutation_rate,
            } => self.evolutionary(
                engine,
                patterns,
                metric,
                range,
                Evolution {
                    population_size,
                    generations,
                    tournament_size,
                    mutation_rate,
                },
            )?,
            SearchStrategy::GradientAscent {
                step,
                max_iterations,
                tolerance,
            } => self.gradient_ascent(
                engine,
                patterns,
                metric,
                range,
                step,
                max_iterations,
                tolerance,
            )?,
        };

        info!(
            strategy = self.strategy.name(),
            metric = metric.name(),
            radius,
            score,
            "radius optimization finished"
        );

        Ok(OptimizationResult {
            radius,
            score,
            strategy: self.strategy.name(),
            metric,
            trace,
        })
    }

    /// Score one candidate radius.
    ///
    /// The engine's radius is restored afterwards, also on error. In
    /// [`EvaluationMode::Isolated`] its counters and access counts are
    /// rolled back as well.
    pub fn evaluate_radius(
        &self,
        engine: &mut MemoryEngine,
        patterns: &[BitVector],
        radius: usize,
        metric: PerformanceMetric,
    ) -> Result<f64> {
        let original = engine.access_radius();
        let snapshot = match self.evaluation {
            EvaluationMode::Isolated if metric.mutates_engine() => Some(engine.snapshot()),
            _ => None,
        };

        engine.set_access_radius(radius)?;
        let score = metric.evaluate(engine, patterns);
        engine.set_access_radius(original)?;
        if let Some(snapshot) = snapshot {
            engine.restore(&snapshot)?;
        }

        score
    }

    fn exhaustive(
        &self,
        engine: &mut MemoryEngine,
        patterns: &[BitVector],
        metric: PerformanceMetric,
        range: RadiusRange,
    ) -> Result<(usize, f64, SearchTrace)> {
        let mut best: Option<(usize, f64)> = None;
        let mut scores = Vec::with_capacity(range.len());

        for radius in range.iter() {
            let score = self.evaluate_radius(engine, patterns, radius, metric)?;
            debug!(radius, score, "exhaustive candidate");
            scores.push((radius, score));
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((radius, score));
            }
        }

        let (radius, score) =
            best.ok_or_else(|| SdmError::EmptyInput("radius range".to_string()))?;
        Ok((radius, score, SearchTrace::Exhaustive { scores }))
    }

    fn evolutionary(
        &mut self,
        engine: &mut MemoryEngine,
        patterns: &[BitVector],
        metric: PerformanceMetric,
        range: RadiusRange,
        params: Evolution,
    ) -> Result<(usize, f64, SearchTrace)> {
        let mut population: Vec<usize> = (0..params.population_size)
            .map(|_| self.rng.gen_range(range.min..=range.max))
            .collect();
        let mut best_per_generation = Vec::with_capacity(params.generations);

        for generation in 0..params.generations {
            let fitness = self.score_all(engine, patterns, metric, &population)?;
            let best = fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            best_per_generation.push(best);

            let mut next = Vec::with_capacity(params.population_size);
            for _ in 0..params.population_size {
                let contenders =
                    index::sample(&mut self.rng, params.population_size, params.tournament_size);
                let winner = first_argmax(&fitness, contenders.iter());
                next.push(population[winner]);
            }

            for individual in next.iter_mut() {
                if self.rng.gen::<f64>() < params.mutation_rate {
                    *individual = self.rng.gen_range(range.min..=range.max);
                }
            }
            population = next;

            debug!(generation = generation + 1, best_fitness = best, "generation complete");
        }

        let final_fitness = self.score_all(engine, patterns, metric, &population)?;
        let winner = first_argmax(&final_fitness, 0..population.len());

        Ok((
            population[winner],
            final_fitness[winner],
            SearchTrace::Evolutionary {
                best_per_generation,
                final_population: population,
            },
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn gradient_ascent(
        &self,
        engine: &mut MemoryEngine,
        patterns: &[BitVector],
        metric: PerformanceMetric,
        range: RadiusRange,
        step: usize,
        max_iterations: usize,
        tolerance: f64,
    ) -> Result<(usize, f64, SearchTrace)> {
        let mut current = range.midpoint();
        let mut radius_history = Vec::new();
        let mut score_history = Vec::new();
        let mut converged = false;

        for iteration in 0..max_iterations {
            let current_score = self.evaluate_radius(engine, patterns, current, metric)?;
            radius_history.push(current);
            score_history.push(current_score);

            // Sum of the left and right finite differences
            let mut gradient = 0.0;
            if current > range.min {
                let left = self.evaluate_radius(engine, patterns, current - 1, metric)?;
                gradient += current_score - left;
            }
            if current < range.max {
                let right = self.evaluate_radius(engine, patterns, current + 1, metric)?;
                gradient += right - current_score;
            }

            if gradient > tolerance {
                current = (current + step).min(range.max);
            } else if gradient < -tolerance {
                current = current.saturating_sub(step).max(range.min);
            } else {
                converged = true;
                break;
            }

            debug!(
                iteration = iteration + 1,
                radius = current,
                score = current_score,
                gradient,
                "gradient step"
            );
        }

        let score = self.evaluate_radius(engine, patterns, current, metric)?;
        Ok((
            current,
            score,
            SearchTrace::GradientAscent {
                radius_history,
                score_history,
                converged,
            },
        ))
    }

    fn score_all(
        &self,
        engine: &mut MemoryEngine,
        patterns: &[BitVector],
        metric: PerformanceMetric,
        radii: &[usize],
    ) -> Result<Vec<f64>> {
        radii
            .iter()
            .map(|&r| self.evaluate_radius(engine, patterns, r, metric))
            .collect()
    }
}

#[derive(Clone, Copy, Debug)]
struct Evolution {
    population_size: usize,
    generations: usize,
    tournament_size: usize,
    mutation_rate: f64,
}

/// Index of the highest score among `candidates`; the first one wins ties.
fn first_argmax(scores: &[f64], candidates: impl IntoIterator<Item = usize>) -> usize {
    let mut best: Option<usize> = None;
    for i in candidates {
        if best.map_or(true, |b| scores[i] > scores[b]) {
            best = Some(i);
        }
    }
    best.unwrap_or(0)
}
