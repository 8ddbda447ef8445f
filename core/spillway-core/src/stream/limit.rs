//! Limit Stream: LIMIT/OFFSET over a child stream

use crate::error::SpillwayResult;
use crate::stream::{BlockInputStream, BlockStreamProfile};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use std::time::Instant;

/// Limit 스트림 (LIMIT/OFFSET)
///
/// Stops pulling from its child as soon as `count` rows were emitted, so an
/// expensive child (a spilled-files reader, for one) is abandoned early.
pub struct LimitBlockStream {
    input: Box<dyn BlockInputStream>,
    count: usize,
    offset: usize,
    /// Total rows emitted so far
    emitted: usize,
    /// Total rows skipped so far (for offset)
    skipped: usize,
    profile: BlockStreamProfile,
}

impl LimitBlockStream {
    pub fn new(input: Box<dyn BlockInputStream>, count: usize, offset: usize) -> Self {
        Self {
            input,
            count,
            offset,
            emitted: 0,
            skipped: 0,
            profile: BlockStreamProfile::new(),
        }
    }

    /// Hand back the child, e.g. to drop it explicitly.
    pub fn into_input(self) -> Box<dyn BlockInputStream> {
        self.input
    }

    fn next_block(&mut self) -> SpillwayResult<Option<RecordBatch>> {
        if self.emitted >= self.count {
            return Ok(None);
        }

        while let Some(batch) = self.input.read()? {
            let batch_rows = batch.num_rows();
            let mut start = 0;

            if self.skipped < self.offset {
                let remaining_to_skip = self.offset - self.skipped;
                if batch_rows <= remaining_to_skip {
                    self.skipped += batch_rows;
                    continue;
                }
                self.skipped = self.offset;
                start = remaining_to_skip;
            }

            let available = batch_rows - start;
            if available == 0 {
                continue;
            }
            let take = available.min(self.count - self.emitted);
            self.emitted += take;
            if start == 0 && take == batch_rows {
                return Ok(Some(batch));
            }
            return Ok(Some(batch.slice(start, take)));
        }

        Ok(None)
    }
}

impl BlockInputStream for LimitBlockStream {
    fn name(&self) -> &'static str {
        "Limit"
    }

    fn header(&self) -> SchemaRef {
        self.input.header()
    }

    fn read_prefix(&mut self) -> SpillwayResult<()> {
        self.input.read_prefix()
    }

    fn read(&mut self) -> SpillwayResult<Option<RecordBatch>> {
        let started = Instant::now();
        let result = self.next_block();
        self.profile.observe(&result, started.elapsed());
        result
    }

    fn read_suffix(&mut self) -> SpillwayResult<()> {
        self.input.read_suffix()
    }

    fn children(&self) -> Vec<&dyn BlockInputStream> {
        vec![self.input.as_ref()]
    }

    fn profile(&self) -> Option<&BlockStreamProfile> {
        Some(&self.profile)
    }
}
