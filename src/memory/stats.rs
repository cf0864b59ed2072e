//! Running statistics for engine reads and writes.
//!
//! The logs are append-only diagnostics. Nothing in the engine's read or
//! write logic consults them.

use serde::{Deserialize, Serialize};

/// One `write` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WriteRecord {
    pub activated: usize,
    pub activation_rate: f64,
    /// Mean bit value of the written pattern.
    pub pattern_density: f64,
}

/// One `read` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadRecord {
    pub activated: usize,
    pub activation_rate: f64,
    pub confidence: f64,
    /// Mean Hamming distance across activated locations (0.0 on a miss).
    pub mean_distance: f64,
}

/// Point-in-time summary returned by
/// [`MemoryEngine::statistics`](crate::memory::MemoryEngine::statistics).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryStatistics {
    /// Fraction of locations activated by at least one write.
    pub memory_utilization: f64,
    pub mean_access_count: f64,
    pub max_access_count: u64,
    /// Mean absolute counter value.
    pub memory_magnitude: f64,
    pub total_writes: u64,
    pub total_reads: u64,
    pub last_activated: usize,
    pub last_confidence: f64,
    pub write_log: Vec<WriteRecord>,
    pub read_log: Vec<ReadRecord>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct StatsLog {
    pub(crate) writes: Vec<WriteRecord>,
    pub(crate) reads: Vec<ReadRecord>,
    pub(crate) total_writes: u64,
    pub(crate) total_reads: u64,
    pub(crate) last_activated: usize,
    pub(crate) last_confidence: f64,
}

impl StatsLog {
    pub(crate) fn record_write(&mut self, record: WriteRecord) {
        self.total_writes += 1;
        self.last_activated = record.activated;
        self.writes.push(record);
    }

    pub(crate) fn record_read(&mut self, record: ReadRecord) {
        self.total_reads += 1;
        self.last_activated = record.activated;
        self.last_confidence = record.confidence;
        self.reads.push(record);
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
