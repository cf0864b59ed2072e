//! Binary vector type for sparse distributed memory.
//!
//! Bits are stored one per byte (`0` or `1`). That keeps indexing and
//! counter updates trivial and lets the optional `simd` feature hand the
//! raw bytes straight to a binary Hamming kernel: with a single bit per
//! byte, differing bytes and differing bits coincide.

use crate::error::{Result, SdmError};
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// A fixed-length binary vector with elements in {0, 1}.
///
/// Patterns handed to the engine, hard-location addresses and read outputs
/// all use this type. A `BitVector` is never mutated by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitVector {
    bits: Vec<u8>,
}

impl BitVector {
    /// Create an all-zero vector.
    pub fn zeros(len: usize) -> Self {
        Self { bits: vec![0; len] }
    }

    /// Create a vector from raw 0/1 bytes.
    ///
    /// Any byte other than 0 or 1 is rejected.
    pub fn from_bits(bits: Vec<u8>) -> Result<Self> {
        if let Some(pos) = bits.iter().position(|&b| b > 1) {
            return Err(SdmError::InvalidConfig(format!(
                "bit {} has value {}, expected 0 or 1",
                pos, bits[pos]
            )));
        }
        Ok(Self { bits })
    }

    /// Create a vector from booleans.
    pub fn from_bools(bools: &[bool]) -> Self {
        Self {
            bits: bools.iter().map(|&b| u8::from(b)).collect(),
        }
    }

    /// Create a vector of length `len` with the given positions set to 1.
    pub fn from_indices(len: usize, ones: &[usize]) -> Result<Self> {
        let mut bits = vec![0u8; len];
        for &i in ones {
            if i >= len {
                return Err(SdmError::InvalidConfig(format!(
                    "index {} out of bounds for length {}",
                    i, len
                )));
            }
            bits[i] = 1;
        }
        Ok(Self { bits })
    }

    /// Draw every bit independently and uniformly from {0, 1}.
    pub fn random_dense<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        Self {
            bits: (0..len).map(|_| u8::from(rng.gen::<bool>())).collect(),
        }
    }

    /// Set exactly `ones` bits, chosen uniformly without replacement.
    ///
    /// `ones` is capped at `len`.
    pub fn random_sparse<R: Rng + ?Sized>(len: usize, ones: usize, rng: &mut R) -> Self {
        let mut bits = vec![0u8; len];
        for i in index::sample(rng, len, ones.min(len)).iter() {
            bits[i] = 1;
        }
        Self { bits }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Raw 0/1 bytes.
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Whether bit `i` is set.
    ///
    /// # Panics
    /// Panics if `i >= self.len()`.
    pub fn get(&self, i: usize) -> bool {
        self.bits[i] == 1
    }

    /// Number of bits set to 1.
    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b == 1).count()
    }

    /// Mean bit value (fraction of ones). `0.0` for an empty vector.
    pub fn density(&self) -> f64 {
        if self.bits.is_empty() {
            return 0.0;
        }
        self.count_ones() as f64 / self.bits.len() as f64
    }

    /// Hamming distance to `other`.
    pub fn hamming(&self, other: &BitVector) -> Result<usize> {
        self.check_len(other)?;
        Ok(hamming_distance(&self.bits, &other.bits))
    }

    /// Fraction of positions where both vectors agree.
    ///
    /// Two empty vectors agree everywhere and score 1.0.
    pub fn match_ratio(&self, other: &BitVector) -> Result<f64> {
        self.check_len(other)?;
        if self.bits.is_empty() {
            return Ok(1.0);
        }
        let differing = hamming_distance(&self.bits, &other.bits);
        Ok((self.bits.len() - differing) as f64 / self.bits.len() as f64)
    }

    /// The first `n` bits rendered as a `0`/`1` string.
    pub fn preview(&self, n: usize) -> String {
        self.bits
            .iter()
            .take(n)
            .map(|&b| if b == 1 { '1' } else { '0' })
            .collect()
    }

    fn check_len(&self, other: &BitVector) -> Result<()> {
        if self.bits.len() != other.bits.len() {
            return Err(SdmError::DimensionMismatch {
                expected: self.bits.len(),
                got: other.bits.len(),
            });
        }
        Ok(())
    }
}

/// Hamming distance between two equal-length 0/1 byte slices.
#[cfg(feature = "simd")]
pub(crate) fn hamming_distance(a: &[u8], b: &[u8]) -> usize {
    use simsimd::BinarySimilarity;
    match u8::hamming(a, b) {
        Some(d) => d as usize,
        None => scalar_hamming(a, b),
    }
}

/// Hamming distance between two equal-length 0/1 byte slices.
#[cfg(not(feature = "simd"))]
pub(crate) fn hamming_distance(a: &[u8], b: &[u8]) -> usize {
    scalar_hamming(a, b)
}

#[inline]
fn scalar_hamming(a: &[u8], b: &[u8]) -> usize {
    debug_assert_eq!(a.len(), b.len(), "Dimension mismatch in hamming");
    a.iter().zip(b.iter()).filter(|(x, y)| x != y).count()
}

impl Index<usize> for BitVector {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.bits[index]
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.preview(self.bits.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_zeros() {
        let v = BitVector::zeros(64);
        assert_eq!(v.len(), 64);
        assert_eq!(v.count_ones(), 0);
        assert_eq!(v.density(), 0.0);
    }

    #[test]
    fn test_from_bits_rejects_non_binary() {
        assert!(BitVector::from_bits(vec![0, 1, 1, 0]).is_ok());
        assert!(BitVector::from_bits(vec![0, 2, 1]).is_err());
    }

    #[test]
    fn test_hamming() {
        let a = BitVector::from_bits(vec![1, 0, 1, 1, 0]).unwrap();
        let b = BitVector::from_bits(vec![1, 1, 0, 1, 0]).unwrap();
        assert_eq!(a.hamming(&b).unwrap(), 2);
        assert_eq!(a.hamming(&a).unwrap(), 0);
    }

    #[test]
    fn test_hamming_length_mismatch() {
        let a = BitVector::zeros(8);
        let b = BitVector::zeros(9);
        match a.hamming(&b) {
            Err(SdmError::DimensionMismatch { expected, got }) => {
                assert_eq!((expected, got), (8, 9));
            }
            other => panic!("Expected dimension mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_match_ratio() {
        let a = BitVector::from_bits(vec![1, 0, 1, 1]).unwrap();
        let b = BitVector::from_bits(vec![1, 0, 0, 1]).unwrap();
        assert!((a.match_ratio(&b).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_random_sparse_exact_ones() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for ones in [0, 1, 5, 32] {
            let v = BitVector::random_sparse(32, ones, &mut rng);
            assert_eq!(v.count_ones(), ones, "Expected exactly {} ones", ones);
        }
        // Capped at the vector length
        let v = BitVector::random_sparse(8, 100, &mut rng);
        assert_eq!(v.count_ones(), 8);
    }

    #[test]
    fn test_random_dense_is_roughly_balanced() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let v = BitVector::random_dense(4096, &mut rng);
        let density = v.density();
        assert!(
            (0.45..0.55).contains(&density),
            "Expected density near 0.5, got {}",
            density
        );
    }

    #[test]
    fn test_preview_and_display() {
        let v = BitVector::from_indices(20, &[0, 3, 17]).unwrap();
        assert_eq!(v.preview(4), "1001");
        assert_eq!(v.to_string().len(), 20);
        assert!(BitVector::from_indices(4, &[4]).is_err());
    }
}
