//! Cumulative per-stream counters read by the statistics layer.

use crate::error::SpillwayResult;
use arrow::record_batch::RecordBatch;
use std::time::Duration;

/// Counters accumulated by a stream over its lifetime.
///
/// Only blocks handed to the immediate consumer are counted. A block that a
/// background prefetch produced but nobody read is not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockStreamProfile {
    rows: u64,
    blocks: u64,
    bytes: u64,
    execution_time: Duration,
}

impl BlockStreamProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one `read()` call that took `elapsed`.
    ///
    /// Time is always added; rows, blocks and bytes only when a block was
    /// actually delivered.
    pub fn observe(&mut self, result: &SpillwayResult<Option<RecordBatch>>, elapsed: Duration) {
        self.execution_time += elapsed;
        if let Ok(Some(batch)) = result {
            self.record_block(batch);
        }
    }

    /// Count a delivered block without touching the timer.
    pub fn record_block(&mut self, batch: &RecordBatch) {
        self.rows += batch.num_rows() as u64;
        self.blocks += 1;
        self.bytes += batch.get_array_memory_size() as u64;
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn execution_time(&self) -> Duration {
        self.execution_time
    }
}
