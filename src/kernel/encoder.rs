//! Encoders from real-valued input and short text to binary patterns.
//!
//! - **Sparsify**: keep the top few percent of a dense signal (camera
//!   frames, sensor sweeps) as set bits. This is how raw sensor input is
//!   brought into the sparse regime the memory is tuned for.
//! - **Thermometer**: a scalar in `[min, max]` sets a prefix of bits, so
//!   nearby values share most of their set bits.
//! - **Segments**: a short sequence in `[-1, 1]` gives each element its
//!   own segment, filled proportionally to the value.
//! - **Text**: each byte of a short string sets three hashed positions.

use crate::error::{Result, SdmError};
use crate::kernel::bitvec::BitVector;

/// Encoders for turning real-valued data into [`BitVector`] patterns.
pub struct SparseEncoder;

impl SparseEncoder {
    /// Default fraction of positions kept by [`SparseEncoder::sparsify`].
    pub const DEFAULT_KEEP_FRACTION: f64 = 0.03;

    /// Fraction of positions forced on when nothing clears the percentile.
    pub const FALLBACK_FRACTION: f64 = 0.02;

    /// Bytes of input read by [`SparseEncoder::encode_text`].
    pub const TEXT_LENGTH: usize = 32;

    /// Threshold `values` at their `(1 - keep_fraction)` percentile.
    ///
    /// Bits are set where the value is strictly above the percentile. A
    /// flat input leaves nothing above it; in that case the indices of the
    /// largest `floor(len * 0.02)` values (at least one) are set instead.
    pub fn sparsify(values: &[f64], keep_fraction: f64) -> Result<BitVector> {
        if values.is_empty() {
            return Err(SdmError::EmptyInput("values to sparsify".to_string()));
        }
        if !(keep_fraction > 0.0 && keep_fraction <= 1.0) {
            return Err(SdmError::InvalidConfig(format!(
                "keep_fraction must be in (0, 1], got {}",
                keep_fraction
            )));
        }

        let threshold = percentile(values, 1.0 - keep_fraction);
        let mut bools: Vec<bool> = values.iter().map(|&v| v > threshold).collect();

        if !bools.iter().any(|&b| b) {
            let take = ((values.len() as f64 * Self::FALLBACK_FRACTION) as usize).max(1);
            let mut order: Vec<usize> = (0..values.len()).collect();
            order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
            for &i in order.iter().take(take) {
                bools[i] = true;
            }
        }

        Ok(BitVector::from_bools(&bools))
    }

    /// Thermometer-encode `value` over `[min, max]` into `dim` bits.
    ///
    /// Values are clamped to the range; bits `0..=position` are set where
    /// `position = floor(normalized * (dim - 1))`.
    pub fn encode_scalar(value: f64, min: f64, max: f64, dim: usize) -> Result<BitVector> {
        check_scalar_range(min, max)?;
        if dim == 0 {
            return Err(SdmError::InvalidConfig("dim must be positive".to_string()));
        }

        let normalized = ((value - min) / (max - min)).clamp(0.0, 1.0);
        let position = (normalized * (dim - 1) as f64) as usize;
        let ones: Vec<usize> = (0..=position.min(dim - 1)).collect();
        BitVector::from_indices(dim, &ones)
    }

    /// Invert [`SparseEncoder::encode_scalar`] from the highest set bit.
    ///
    /// An all-zero vector decodes to `min`.
    pub fn decode_scalar(vector: &BitVector, min: f64, max: f64) -> Result<f64> {
        check_scalar_range(min, max)?;
        if vector.len() < 2 {
            return Ok(min);
        }
        let highest = (0..vector.len()).rev().find(|&i| vector.get(i)).unwrap_or(0);
        let normalized = highest as f64 / (vector.len() - 1) as f64;
        Ok(min + normalized * (max - min))
    }

    /// Encode up to `segments` values in `[-1, 1]` into `dim` bits.
    ///
    /// Each element owns `dim / segments` consecutive bits and fills a
    /// prefix proportional to `(value + 1) / 2`. Elements past `segments`
    /// are ignored.
    pub fn encode_sequence(values: &[f64], dim: usize, segments: usize) -> Result<BitVector> {
        let width = segment_width(dim, segments)?;
        let mut ones = Vec::new();
        for (i, &v) in values.iter().take(segments).enumerate() {
            let normalized = ((v + 1.0) / 2.0).clamp(0.0, 1.0);
            let filled = (normalized * width as f64) as usize;
            let start = i * width;
            ones.extend(start..start + filled);
        }
        BitVector::from_indices(dim, &ones)
    }

    /// Invert [`SparseEncoder::encode_sequence`]: one value per segment.
    pub fn decode_sequence(vector: &BitVector, segments: usize) -> Result<Vec<f64>> {
        let width = segment_width(vector.len(), segments)?;
        Ok((0..segments)
            .map(|s| {
                let start = s * width;
                let active = vector.bits()[start..start + width]
                    .iter()
                    .filter(|&&b| b == 1)
                    .count();
                active as f64 / width as f64 * 2.0 - 1.0
            })
            .collect())
    }

    /// Hash the first [`SparseEncoder::TEXT_LENGTH`] bytes of `text` into
    /// `dim` bits, three bits per byte.
    ///
    /// Byte `c` at position `i` sets `(17c + 31i)`, `(23c + 47i)` and
    /// `(41c + 53i)`, all modulo `dim`. Not invertible.
    pub fn encode_text(text: &str, dim: usize) -> Result<BitVector> {
        if dim == 0 {
            return Err(SdmError::InvalidConfig("dim must be positive".to_string()));
        }
        let mut ones = Vec::new();
        for (i, c) in text.bytes().take(Self::TEXT_LENGTH).enumerate() {
            let c = c as usize;
            ones.push((c * 17 + i * 31) % dim);
            ones.push((c * 23 + i * 47) % dim);
            ones.push((c * 41 + i * 53) % dim);
        }
        BitVector::from_indices(dim, &ones)
    }
}

fn check_scalar_range(min: f64, max: f64) -> Result<()> {
    if !(min.is_finite() && max.is_finite() && max > min) {
        return Err(SdmError::InvalidConfig(format!(
            "scalar range [{}, {}] is empty",
            min, max
        )));
    }
    Ok(())
}

fn segment_width(dim: usize, segments: usize) -> Result<usize> {
    if segments == 0 || segments > dim {
        return Err(SdmError::InvalidConfig(format!(
            "cannot split {} bits into {} segments",
            dim, segments
        )));
    }
    Ok(dim / segments)
}

/// Linear-interpolated percentile, `q` in `[0, 1]`.
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
