//! Memory layer: the sparse distributed memory engine.
//!
//! - [`EngineConfig`] / [`AddressMode`]: shape of the hard-location table.
//! - [`MemoryEngine`]: write, read, activation scans, snapshots.
//! - [`MemoryStatistics`]: usage counters and write/read logs.

pub mod config;
pub mod engine;
pub mod stats;

pub use config::{AddressMode, EngineConfig};
pub use engine::{MemoryEngine, MemorySnapshot, ReadResult};
pub use stats::{MemoryStatistics, ReadRecord, WriteRecord};
