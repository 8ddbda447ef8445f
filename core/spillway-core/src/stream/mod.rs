//! Block Input Stream: pull-based streaming execution model
//!
//! A stream hands out Arrow `RecordBatch` blocks one at a time. `Ok(None)`
//! is the end-of-stream sentinel; streams are single-pass, so calling
//! `read()` after the sentinel is outside the contract.
//!
//! ```text
//! consumer ── read() ──▶ AsynchronousBlockStream ── (worker) read() ──▶ child
//!                                                                   │
//!                                          SpilledFilesStream ◀─────┘
//!                                          ├── SpilledFileStream (file 0)
//!                                          └── SpilledFileStream (file 1) ...
//! ```

pub mod asynchronous;
mod blocks_list;
mod limit;
mod profile;

pub use asynchronous::AsynchronousBlockStream;
pub use blocks_list::BlocksListStream;
pub use limit::LimitBlockStream;
pub use profile::BlockStreamProfile;

use crate::error::SpillwayResult;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

/// 블록 스트림 트레이트: Pull 기반 실행 모델
pub trait BlockInputStream: Send {
    /// Stream name for diagnostics and statistics.
    fn name(&self) -> &'static str;

    /// Schema every produced block conforms to.
    fn header(&self) -> SchemaRef;

    /// Called once before the first `read()`.
    fn read_prefix(&mut self) -> SpillwayResult<()> {
        Ok(())
    }

    /// 다음 블록 반환 (None이면 끝)
    fn read(&mut self) -> SpillwayResult<Option<RecordBatch>>;

    /// Called once after the last `read()`.
    fn read_suffix(&mut self) -> SpillwayResult<()> {
        Ok(())
    }

    /// Directly wrapped streams, for plan traversal.
    fn children(&self) -> Vec<&dyn BlockInputStream> {
        Vec::new()
    }

    /// Visit every directly wrapped stream, including children shared with
    /// a background worker that [`children`](Self::children) cannot lend out.
    fn for_each_child(&self, visit: &mut dyn FnMut(&dyn BlockInputStream)) {
        for child in self.children() {
            visit(child);
        }
    }

    /// Profiling counters, if this stream keeps them.
    fn profile(&self) -> Option<&BlockStreamProfile> {
        None
    }
}

/// Drain a stream through its full prefix/read/suffix lifecycle.
pub fn read_all(stream: &mut dyn BlockInputStream) -> SpillwayResult<Vec<RecordBatch>> {
    stream.read_prefix()?;
    let mut blocks = Vec::new();
    while let Some(block) = stream.read()? {
        blocks.push(block);
    }
    stream.read_suffix()?;
    Ok(blocks)
}
