//! Search strategies and radius ranges.

use crate::error::{Result, SdmError};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Inclusive range of candidate radii.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadiusRange {
    pub min: usize,
    pub max: usize,
}

impl RadiusRange {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// `[1, vector_dim / 2]`, the default search window.
    ///
    /// Empty (and rejected by [`RadiusRange::validate`]) for `vector_dim < 2`.
    pub fn default_for(vector_dim: usize) -> Self {
        Self::new(1, vector_dim / 2)
    }

    /// Reject empty ranges and ranges reaching past `vector_dim`.
    pub fn validate(&self, vector_dim: usize) -> Result<()> {
        if self.min > self.max || self.max > vector_dim {
            return Err(SdmError::InvalidRadiusRange {
                min: self.min,
                max: self.max,
                vector_dim,
            });
        }
        Ok(())
    }

    /// Number of candidate radii.
    pub fn len(&self) -> usize {
        if self.min > self.max {
            0
        } else {
            self.max - self.min + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, radius: usize) -> bool {
        (self.min..=self.max).contains(&radius)
    }

    pub fn iter(&self) -> RangeInclusive<usize> {
        self.min..=self.max
    }

    /// Integer midpoint, rounded down.
    pub fn midpoint(&self) -> usize {
        self.min + (self.max - self.min) / 2
    }
}

/// How the single-engine optimizer explores the radius range.
///
/// A closed set: [`RadiusOptimizer`](crate::optimize::RadiusOptimizer)
/// dispatches on the variant in one place.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Score every radius in the range; ties keep the smaller radius.
    Exhaustive,
    /// Tournament selection with uniform-redraw mutation.
    Evolutionary {
        population_size: usize,
        generations: usize,
        tournament_size: usize,
        mutation_rate: f64,
    },
    /// Discrete hill climb driven by finite differences.
    GradientAscent {
        step: usize,
        max_iterations: usize,
        /// Gradients within `±tolerance` count as converged.
        tolerance: f64,
    },
}

impl SearchStrategy {
    /// Population 20, 10 generations, tournaments of 3, mutation 0.1.
    pub fn evolutionary() -> Self {
        SearchStrategy::Evolutionary {
            population_size: 20,
            generations: 10,
            tournament_size: 3,
            mutation_rate: 0.1,
        }
    }

    /// Step 1, at most 50 iterations, tolerance 0.01.
    pub fn gradient_ascent() -> Self {
        SearchStrategy::GradientAscent {
            step: 1,
            max_iterations: 50,
            tolerance: 0.01,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SearchStrategy::Exhaustive => "exhaustive",
            SearchStrategy::Evolutionary { .. } => "evolutionary",
            SearchStrategy::GradientAscent { .. } => "gradient_ascent",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            SearchStrategy::Exhaustive => Ok(()),
            SearchStrategy::Evolutionary {
                population_size,
                tournament_size,
                mutation_rate,
                ..
            } => {
                if population_size == 0 {
                    return Err(SdmError::InvalidConfig(
                        "population_size must be positive".to_string(),
                    ));
                }
                if tournament_size == 0 || tournament_size > population_size {
                    return Err(SdmError::InvalidConfig(format!(
                        "tournament_size {} must be in [1, {}]",
                        tournament_size, population_size
                    )));
                }
                if !(0.0..=1.0).contains(&mutation_rate) {
                    return Err(SdmError::InvalidConfig(format!(
                        "mutation_rate must be in [0, 1], got {}",
                        mutation_rate
                    )));
                }
                Ok(())
            }
            SearchStrategy::GradientAscent {
                step, tolerance, ..
            } => {
                if step == 0 {
                    return Err(SdmError::InvalidConfig("step must be positive".to_string()));
                }
                if !(tolerance >= 0.0) {
                    return Err(SdmError::InvalidConfig(format!(
                        "tolerance must be non-negative, got {}",
                        tolerance
                    )));
                }
                Ok(())
            }
        }
    }
}

impl Default for SearchStrategy {
    fn default() -> Self {
        Self::evolutionary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_range() {
        let r = RadiusRange::default_for(32);
        assert_eq!((r.min, r.max), (1, 16));
        assert_eq!(r.len(), 16);
        assert_eq!(r.midpoint(), 8);
        assert!(r.validate(32).is_ok());
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(RadiusRange::new(5, 4).validate(32).is_err());
        assert!(RadiusRange::new(1, 33).validate(32).is_err());
        assert!(RadiusRange::default_for(1).validate(1).is_err());
        assert!(RadiusRange::new(0, 0).validate(1).is_ok());
        assert!(RadiusRange::new(5, 4).is_empty());
    }

    #[test]
    fn test_strategy_validation() {
        assert!(SearchStrategy::evolutionary().validate().is_ok());
        assert!(SearchStrategy::gradient_ascent().validate().is_ok());
        assert!(SearchStrategy::Evolutionary {
            population_size: 2,
            generations: 1,
            tournament_size: 3,
            mutation_rate: 0.1,
        }
        .validate()
        .is_err());
        assert!(SearchStrategy::GradientAscent {
            step: 0,
            max_iterations: 5,
            tolerance: 0.01,
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_strategy_serde_tag() {
        let json = serde_json::to_string(&SearchStrategy::Exhaustive).unwrap();
        assert_eq!(json, r#"{"kind":"exhaustive"}"#);
        let parsed: SearchStrategy =
            serde_json::from_str(r#"{"kind":"gradient_ascent","step":2,"max_iterations":5,"tolerance":0.0}"#)
                .unwrap();
        assert_eq!(parsed.name(), "gradient_ascent");
    }
}
