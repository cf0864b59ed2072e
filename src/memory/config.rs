//! Engine configuration and address-generation mode.

use crate::error::{Result, SdmError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// How hard-location addresses are generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressMode {
    /// Exactly `ones` bits set per address, positions chosen without
    /// replacement.
    Sparse { ones: usize },
    /// Every bit drawn uniformly from {0, 1}.
    Dense,
}

impl AddressMode {
    /// Sparsity at or above this switches to dense addresses.
    pub const DENSE_THRESHOLD: f64 = 0.1;

    /// Pick the address mode for a target sparsity.
    ///
    /// Below [`AddressMode::DENSE_THRESHOLD`] each address carries
    /// `round(vector_dim * sparsity)` ones, which may be zero.
    pub fn for_sparsity(vector_dim: usize, sparsity: f64) -> Self {
        if sparsity >= Self::DENSE_THRESHOLD {
            AddressMode::Dense
        } else {
            AddressMode::Sparse {
                ones: (vector_dim as f64 * sparsity).round() as usize,
            }
        }
    }
}

/// Construction parameters for a [`MemoryEngine`](crate::memory::MemoryEngine).
///
/// Defaults match the sensor-node build: 128-bit vectors, 1000 locations,
/// radius 20, 3% address sparsity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub vector_dim: usize,
    pub num_locations: usize,
    pub access_radius: usize,
    pub sparsity: f64,
    /// Seed for the address generator.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vector_dim: 128,
            num_locations: 1000,
            access_radius: 20,
            sparsity: 0.03,
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// Create a config with the default sparsity and seed.
    pub fn new(vector_dim: usize, num_locations: usize, access_radius: usize) -> Self {
        Self {
            vector_dim,
            num_locations,
            access_radius,
            ..Self::default()
        }
    }

    pub fn with_sparsity(mut self, sparsity: f64) -> Self {
        self.sparsity = sparsity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Derive a seed from `(seed, label)`.
    ///
    /// Uses SHA-256 of `seed || label`, so differently named agents built
    /// from one base config get independent but reproducible addresses.
    pub fn with_label_seed(mut self, label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(label.as_bytes());
        let hash = hasher.finalize();

        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&hash[0..8]);
        self.seed = u64::from_le_bytes(seed_bytes);
        self
    }

    /// Address mode implied by `sparsity`.
    pub fn address_mode(&self) -> AddressMode {
        AddressMode::for_sparsity(self.vector_dim, self.sparsity)
    }

    /// Check dimensions, radius and sparsity.
    pub fn validate(&self) -> Result<()> {
        if self.vector_dim == 0 {
            return Err(SdmError::InvalidConfig(
                "vector_dim must be positive".to_string(),
            ));
        }
        if self.num_locations == 0 {
            return Err(SdmError::InvalidConfig(
                "num_locations must be positive".to_string(),
            ));
        }
        if self.access_radius > self.vector_dim {
            return Err(SdmError::InvalidConfig(format!(
                "access_radius {} exceeds vector_dim {}",
                self.access_radius, self.vector_dim
            )));
        }
        if !(self.sparsity > 0.0 && self.sparsity <= 1.0) {
            return Err(SdmError::InvalidConfig(format!(
                "sparsity must be in (0, 1], got {}",
                self.sparsity
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
