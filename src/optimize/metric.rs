//! Scoring functions for a candidate access radius.
//!
//! Every metric is evaluated at the engine's current radius and follows a
//! "higher is better" convention. The match-based metrics write the
//! patterns into the engine before reading them back, so evaluating them
//! reinforces the engine; see [`PerformanceMetric::mutates_engine`].

use crate::error::{Result, SdmError};
use crate::kernel::BitVector;
use crate::memory::MemoryEngine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Available radius-quality metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMetric {
    /// Write each pattern, read it back, average the fraction of equal bits
    MatchRatio,
    /// Mean fraction of locations activated per pattern (read-only)
    ActivationRate,
    /// Write all patterns, then `1 - mean(1 - match)` over read-backs
    InterferenceLevel,
    /// Match ratio weighted by read confidence
    RetrievalAccuracy,
}

impl PerformanceMetric {
    pub const ALL: [PerformanceMetric; 4] = [
        PerformanceMetric::MatchRatio,
        PerformanceMetric::ActivationRate,
        PerformanceMetric::InterferenceLevel,
        PerformanceMetric::RetrievalAccuracy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PerformanceMetric::MatchRatio => "match_ratio",
            PerformanceMetric::ActivationRate => "activation_rate",
            PerformanceMetric::InterferenceLevel => "interference_level",
            PerformanceMetric::RetrievalAccuracy => "retrieval_accuracy",
        }
    }

    /// Whether evaluating this metric writes into the engine.
    pub fn mutates_engine(&self) -> bool {
        !matches!(self, PerformanceMetric::ActivationRate)
    }

    /// Score `patterns` against `engine` at its current radius.
    ///
    /// All patterns are dimension-checked before the first write.
    pub fn evaluate(&self, engine: &mut MemoryEngine, patterns: &[BitVector]) -> Result<f64> {
        check_patterns(engine, patterns)?;
        match self {
            PerformanceMetric::MatchRatio => match_ratio(engine, patterns),
            PerformanceMetric::ActivationRate => activation_rate(engine, patterns),
            PerformanceMetric::InterferenceLevel => {
                Ok(1.0 - interference_level(engine, patterns)?)
            }
            PerformanceMetric::RetrievalAccuracy => retrieval_accuracy(engine, patterns),
        }
    }
}

impl fmt::Display for PerformanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PerformanceMetric {
    type Err = SdmError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| SdmError::InvalidConfig(format!("unknown metric '{}'", s)))
    }
}

/// Non-empty, and every pattern matches the engine's dimension.
pub(crate) fn check_patterns(engine: &MemoryEngine, patterns: &[BitVector]) -> Result<()> {
    if patterns.is_empty() {
        return Err(SdmError::EmptyInput("pattern set".to_string()));
    }
    for p in patterns {
        engine.check_dim(p)?;
    }
    Ok(())
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn match_ratio(engine: &mut MemoryEngine, patterns: &[BitVector]) -> Result<f64> {
    let mut ratios = Vec::with_capacity(patterns.len());
    for p in patterns {
        engine.write(p)?;
        let recalled = engine.read(p)?;
        ratios.push(recalled.output.match_ratio(p)?);
    }
    Ok(mean(ratios.into_iter()))
}

fn activation_rate(engine: &MemoryEngine, patterns: &[BitVector]) -> Result<f64> {
    let locations = engine.num_locations() as f64;
    let mut rates = Vec::with_capacity(patterns.len());
    for p in patterns {
        rates.push(engine.activation_count(p)? as f64 / locations);
    }
    Ok(mean(rates.into_iter()))
}

/// Mean retrieval degradation after storing every pattern once.
///
/// Defined as 0.0 for fewer than two patterns (nothing to interfere with).
fn interference_level(engine: &mut MemoryEngine, patterns: &[BitVector]) -> Result<f64> {
    if patterns.len() < 2 {
        return Ok(0.0);
    }
    for p in patterns {
        engine.write(p)?;
    }
    let mut degradation = Vec::with_capacity(patterns.len());
    for p in patterns {
        let recalled = engine.read(p)?;
        degradation.push(1.0 - recalled.output.match_ratio(p)?);
    }
    Ok(mean(degradation.into_iter()))
}

fn retrieval_accuracy(engine: &mut MemoryEngine, patterns: &[BitVector]) -> Result<f64> {
    let mut weighted = Vec::with_capacity(patterns.len());
    for p in patterns {
        engine.write(p)?;
        let recalled = engine.read(p)?;
        weighted.push(recalled.output.match_ratio(p)? * recalled.confidence);
    }
    Ok(mean(weighted.into_iter()))
}
