//! BlocksList Stream: sequential emission of pre-materialized blocks

use crate::error::{SpillwayError, SpillwayResult};
use crate::stream::{BlockInputStream, BlockStreamProfile};
use arrow::array::ArrayRef;
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use std::time::Instant;

/// 메모리 블록 스트림: 미리 적재된 RecordBatch를 순차적으로 반환
pub struct BlocksListStream {
    header: SchemaRef,
    /// Column indices to keep; empty means all columns.
    projection: Vec<usize>,
    blocks: Vec<RecordBatch>,
    position: usize,
    profile: BlockStreamProfile,
}

impl BlocksListStream {
    pub fn new(header: SchemaRef, blocks: Vec<RecordBatch>) -> Self {
        Self {
            header,
            projection: Vec::new(),
            blocks,
            position: 0,
            profile: BlockStreamProfile::new(),
        }
    }

    /// Emit only the given columns of every block.
    pub fn with_projection(mut self, projection: Vec<usize>) -> SpillwayResult<Self> {
        if !projection.is_empty() {
            let mut fields = Vec::with_capacity(projection.len());
            for &idx in &projection {
                if idx >= self.header.fields().len() {
                    return Err(SpillwayError::InvalidArguments(format!(
                        "projection column {} out of range for {} columns",
                        idx,
                        self.header.fields().len()
                    )));
                }
                fields.push(self.header.field(idx).clone());
            }
            self.header = Arc::new(Schema::new(fields));
        }
        self.projection = projection;
        Ok(self)
    }

    /// Number of blocks not yet emitted.
    pub fn remaining(&self) -> usize {
        self.blocks.len() - self.position
    }

    fn next_block(&mut self) -> SpillwayResult<Option<RecordBatch>> {
        let Some(block) = self.blocks.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;

        if self.projection.is_empty() {
            return Ok(Some(block.clone()));
        }

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(self.projection.len());
        for &idx in &self.projection {
            let Some(column) = block.columns().get(idx) else {
                return Err(SpillwayError::InvalidArguments(format!(
                    "block {} has {} columns, projection needs column {}",
                    self.position - 1,
                    block.num_columns(),
                    idx
                )));
            };
            columns.push(Arc::clone(column));
        }
        Ok(Some(RecordBatch::try_new(Arc::clone(&self.header), columns)?))
    }
}

impl BlockInputStream for BlocksListStream {
    fn name(&self) -> &'static str {
        "BlocksList"
    }

    fn header(&self) -> SchemaRef {
        Arc::clone(&self.header)
    }

    fn read(&mut self) -> SpillwayResult<Option<RecordBatch>> {
        let started = Instant::now();
        let result = self.next_block();
        self.profile.observe(&result, started.elapsed());
        result
    }

    fn profile(&self) -> Option<&BlockStreamProfile> {
        Some(&self.profile)
    }
}
