//! Writer for one spilled file.

use super::native::NativeBlockWriter;
use super::varint::write_var_int;
use super::{CURRENT_SPILL_VERSION, MIN_SPILL_VERSION};
use crate::error::{SpillwayError, SpillwayResult};
use crate::storage::{EncryptionPath, FileProvider, SpillCompression, SpillSink};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes blocks into a new spilled file.
///
/// Layout: the whole file is one compressed stream; its first value is the
/// format version as a zigzag varint, followed by the native encoding of
/// the blocks for that version. The file is complete only after
/// [`finish`](Self::finish).
pub struct SpilledFileWriter {
    path: PathBuf,
    writer: NativeBlockWriter<Box<dyn SpillSink>>,
    rows: u64,
    blocks: u64,
}

impl SpilledFileWriter {
    pub fn create(
        path: &Path,
        header: SchemaRef,
        provider: &dyn FileProvider,
        compression: SpillCompression,
        version: i64,
    ) -> SpillwayResult<Self> {
        if !(MIN_SPILL_VERSION..=CURRENT_SPILL_VERSION).contains(&version) {
            return Err(SpillwayError::InvalidArguments(format!(
                "cannot write spill format version {}, supported {}..={}",
                version, MIN_SPILL_VERSION, CURRENT_SPILL_VERSION
            )));
        }

        let raw = provider.open_write(path, &EncryptionPath::for_file(path))?;
        let mut sink = compression.compress(raw)?;
        write_var_int(version, &mut sink)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: NativeBlockWriter::try_new(sink, header, version)?,
            rows: 0,
            blocks: 0,
        })
    }

    pub fn write(&mut self, batch: &RecordBatch) -> SpillwayResult<()> {
        self.writer.write(batch)?;
        self.rows += batch.num_rows() as u64;
        self.blocks += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    /// Flush every layer and make the file durable.
    pub fn finish(self) -> SpillwayResult<PathBuf> {
        let sink = self.writer.finish()?;
        sink.finish()?;
        debug!(
            path = %self.path.display(),
            rows = self.rows,
            blocks = self.blocks,
            "spilled file written"
        );
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spill::varint::read_var_int;
    use crate::storage::PlainFileProvider;
    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::io::Cursor;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn header() -> SchemaRef {
        Arc::new(Schema::new(vec![Field::new("n", DataType::Int64, false)]))
    }

    #[test]
    fn version_is_first_value_of_plain_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v1.spill");
        let writer =
            SpilledFileWriter::create(&path, header(), &PlainFileProvider, SpillCompression::None, 1)
                .unwrap();
        assert_eq!(writer.finish().unwrap(), path);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(read_var_int(&mut Cursor::new(bytes)).unwrap(), 1);
    }

    #[test]
    fn counts_written_blocks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("count.spill");
        let mut writer = SpilledFileWriter::create(
            &path,
            header(),
            &PlainFileProvider,
            SpillCompression::default(),
            CURRENT_SPILL_VERSION,
        )
        .unwrap();
        let batch =
            RecordBatch::try_new(header(), vec![Arc::new(Int64Array::from_iter_values(0..9))])
                .unwrap();
        writer.write(&batch).unwrap();
        writer.write(&batch.slice(0, 4)).unwrap();
        assert_eq!(writer.rows(), 13);
        assert_eq!(writer.blocks(), 2);
        writer.finish().unwrap();
    }

    #[test]
    fn rejects_unwritable_versions_without_creating_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.spill");
        for version in [0, CURRENT_SPILL_VERSION + 1] {
            let result = SpilledFileWriter::create(
                &path,
                header(),
                &PlainFileProvider,
                SpillCompression::None,
                version,
            );
            assert!(matches!(result, Err(SpillwayError::InvalidArguments(_))));
        }
        assert!(!path.exists());
    }
}
