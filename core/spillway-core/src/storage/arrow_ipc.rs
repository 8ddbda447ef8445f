//! Arrow IPC framing for spilled blocks.
//!
//! Two shapes are used:
//! - one self-contained IPC *file* per block ([`write_ipc_batch`] /
//!   [`read_ipc_batch`]), framed by the caller
//! - one IPC *stream* carrying every block of a spilled file
//!   ([`IpcBlockWriter`] / [`IpcBlockReader`])

use crate::error::{SpillwayError, SpillwayResult};
use arrow::datatypes::SchemaRef;
use arrow::ipc::{reader, writer};
use arrow::record_batch::RecordBatch;
use std::io::{BufReader, Cursor, Read, Write};

/// Serialize one block as a standalone Arrow IPC file.
pub fn write_ipc_batch(batch: &RecordBatch) -> SpillwayResult<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut writer = writer::FileWriter::try_new(&mut buffer, &batch.schema())?;
        writer.write(batch)?;
        writer.finish()?;
    }
    Ok(buffer)
}

/// Deserialize a block written by [`write_ipc_batch`].
pub fn read_ipc_batch(bytes: &[u8]) -> SpillwayResult<RecordBatch> {
    let mut reader = reader::FileReader::try_new(Cursor::new(bytes), None)
        .map_err(|e| SpillwayError::Decode(format!("arrow ipc read error: {}", e)))?;

    reader
        .next()
        .ok_or_else(|| SpillwayError::Decode("no batch in arrow ipc frame".to_string()))?
        .map_err(|e| SpillwayError::Decode(format!("arrow ipc batch read error: {}", e)))
}

/// Writes blocks as a single Arrow IPC stream.
pub struct IpcBlockWriter<W: Write> {
    inner: writer::StreamWriter<W>,
}

impl<W: Write> IpcBlockWriter<W> {
    /// Starts the stream by writing the schema message.
    pub fn try_new(sink: W, header: &SchemaRef) -> SpillwayResult<Self> {
        Ok(Self {
            inner: writer::StreamWriter::try_new(sink, header)?,
        })
    }

    pub fn write(&mut self, batch: &RecordBatch) -> SpillwayResult<()> {
        self.inner.write(batch)?;
        Ok(())
    }

    /// Writes the end-of-stream marker and hands back the sink.
    pub fn finish(mut self) -> SpillwayResult<W> {
        self.inner.finish()?;
        Ok(self.inner.into_inner()?)
    }
}

/// Reads blocks from an Arrow IPC stream.
pub struct IpcBlockReader<R: Read> {
    inner: reader::StreamReader<BufReader<R>>,
}

impl<R: Read> IpcBlockReader<R> {
    /// Consumes the schema message at the head of the stream.
    pub fn try_new(source: R) -> SpillwayResult<Self> {
        let inner = reader::StreamReader::try_new(BufReader::new(source), None)
            .map_err(|e| SpillwayError::Decode(format!("arrow ipc stream header: {}", e)))?;
        Ok(Self { inner })
    }

    pub fn schema(&self) -> SchemaRef {
        self.inner.schema()
    }

    /// Next block, or `None` at the end-of-stream marker.
    pub fn next_block(&mut self) -> SpillwayResult<Option<RecordBatch>> {
        match self.inner.next() {
            None => Ok(None),
            Some(Ok(batch)) => Ok(Some(batch)),
            Some(Err(e)) => Err(SpillwayError::Decode(format!("arrow ipc stream: {}", e))),
        }
    }
}
