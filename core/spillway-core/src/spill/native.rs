//! Native block encoding inside a spilled file, per format version.

use super::varint::{try_read_var_uint, write_var_uint};
use super::{CURRENT_SPILL_VERSION, MAX_SUPPORTED_SPILL_VERSION, MIN_SPILL_VERSION};
use crate::error::{SpillwayError, SpillwayResult};
use crate::storage::arrow_ipc::{
    IpcBlockReader, IpcBlockWriter, read_ipc_batch, write_ipc_batch,
};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use std::io::{Read, Write};
use std::sync::Arc;

/// Upper bound for one version-1 frame, to fail fast on corrupt lengths.
const MAX_FRAME_LEN: u64 = 1 << 32;

enum Decoder<R: Read> {
    /// Version 1: `[varuint length][arrow ipc file]` repeated until EOF.
    Framed(R),
    /// Version 2: one arrow ipc stream.
    Stream(IpcBlockReader<R>),
}

/// Decodes blocks of one spilled file, given the header the writer used.
pub struct NativeBlockReader<R: Read> {
    header: SchemaRef,
    version: i64,
    decoder: Decoder<R>,
}

impl<R: Read> NativeBlockReader<R> {
    pub fn try_new(input: R, header: SchemaRef, version: i64) -> SpillwayResult<Self> {
        if version < MIN_SPILL_VERSION {
            return Err(SpillwayError::Decode(format!(
                "invalid spill format version {}",
                version
            )));
        }
        if version > MAX_SUPPORTED_SPILL_VERSION {
            return Err(SpillwayError::UnsupportedSpillVersion {
                max_supported: MAX_SUPPORTED_SPILL_VERSION,
                file_version: version,
            });
        }

        let decoder = if version == 1 {
            Decoder::Framed(input)
        } else {
            let reader = IpcBlockReader::try_new(input)?;
            check_fields(&header, &reader.schema())?;
            Decoder::Stream(reader)
        };

        Ok(Self {
            header,
            version,
            decoder,
        })
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn header(&self) -> SchemaRef {
        Arc::clone(&self.header)
    }

    /// Next block, or `None` once the file is exhausted.
    pub fn read(&mut self) -> SpillwayResult<Option<RecordBatch>> {
        let decoded = match &mut self.decoder {
            Decoder::Framed(input) => {
                let Some(len) = try_read_var_uint(input)? else {
                    return Ok(None);
                };
                if len > MAX_FRAME_LEN {
                    return Err(SpillwayError::Decode(format!(
                        "block frame of {} bytes exceeds limit",
                        len
                    )));
                }
                let mut frame = Vec::new();
                input.by_ref().take(len).read_to_end(&mut frame)?;
                if frame.len() as u64 != len {
                    return Err(SpillwayError::Decode(format!(
                        "truncated block frame: expected {} bytes, found {}",
                        len,
                        frame.len()
                    )));
                }
                read_ipc_batch(&frame)?
            }
            Decoder::Stream(reader) => match reader.next_block()? {
                Some(batch) => batch,
                None => return Ok(None),
            },
        };

        check_fields(&self.header, &decoded.schema())?;
        let batch = RecordBatch::try_new(Arc::clone(&self.header), decoded.columns().to_vec())?;
        Ok(Some(batch))
    }
}

enum Encoder<W: Write> {
    Framed(W),
    Stream(IpcBlockWriter<W>),
}

/// Encodes blocks for a spilled file in a chosen format version.
pub struct NativeBlockWriter<W: Write> {
    header: SchemaRef,
    encoder: Encoder<W>,
}

impl<W: Write> NativeBlockWriter<W> {
    /// Writer for `version`, which must be between 1 and the current version.
    pub fn try_new(output: W, header: SchemaRef, version: i64) -> SpillwayResult<Self> {
        let encoder = match version {
            1 => Encoder::Framed(output),
            2 => Encoder::Stream(IpcBlockWriter::try_new(output, &header)?),
            _ => {
                return Err(SpillwayError::InvalidArguments(format!(
                    "cannot write spill format version {}, supported 1..={}",
                    version, CURRENT_SPILL_VERSION
                )));
            }
        };
        Ok(Self { header, encoder })
    }

    pub fn write(&mut self, batch: &RecordBatch) -> SpillwayResult<()> {
        check_fields(&self.header, &batch.schema())?;
        match &mut self.encoder {
            Encoder::Framed(output) => {
                let frame = write_ipc_batch(batch)?;
                write_var_uint(frame.len() as u64, output)?;
                output.write_all(&frame)?;
                Ok(())
            }
            Encoder::Stream(writer) => writer.write(batch),
        }
    }

    /// Terminates the encoding and hands back the output.
    pub fn finish(self) -> SpillwayResult<W> {
        match self.encoder {
            Encoder::Framed(output) => Ok(output),
            Encoder::Stream(writer) => writer.finish(),
        }
    }
}

fn check_fields(header: &SchemaRef, actual: &SchemaRef) -> SpillwayResult<()> {
    if header.fields() != actual.fields() {
        return Err(SpillwayError::Schema(format!(
            "block schema {:?} does not match header {:?}",
            actual.fields(),
            header.fields()
        )));
    }
    Ok(())
}
