//! Kernel layer: binary vectors and the encoders that produce them.
//!
//! This layer has no dependencies on [`memory`](crate::memory) or
//! [`optimize`](crate::optimize).
//!
//! # Example
//!
//! ```rust
//! use sdm_swarm::kernel::{BitVector, SparseEncoder};
//!
//! let readings = [0.1, 0.9, 0.2, 0.05, 0.95, 0.3, 0.4, 0.0];
//! let pattern = SparseEncoder::sparsify(&readings, 0.25).unwrap();
//! assert_eq!(pattern.count_ones(), 2);
//!
//! let other = BitVector::from_indices(8, &[1, 4]).unwrap();
//! assert_eq!(pattern.hamming(&other).unwrap(), 0);
//! ```

pub mod bitvec;
pub mod encoder;

pub use bitvec::BitVector;
pub use encoder::SparseEncoder;
