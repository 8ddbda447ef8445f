//! Reader for one spilled file.

use super::native::NativeBlockReader;
use super::varint::read_var_int;
use crate::error::{SpillwayError, SpillwayResult};
use crate::storage::{EncryptionPath, FileProvider, SpillCompression};
use crate::stream::{BlockInputStream, BlockStreamProfile};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

/// 스필 파일 하나를 블록 스트림으로 복원
///
/// The file handle is held from [`open`](Self::open) until the stream is
/// dropped.
pub struct SpilledFileStream {
    path: PathBuf,
    reader: NativeBlockReader<Box<dyn Read + Send>>,
    profile: BlockStreamProfile,
}

impl SpilledFileStream {
    /// Open `path`, check its format version against `max_supported_spill_version`
    /// and prepare the block decoder.
    pub fn open(
        path: &Path,
        header: SchemaRef,
        provider: &dyn FileProvider,
        compression: SpillCompression,
        max_supported_spill_version: i64,
    ) -> SpillwayResult<Self> {
        let raw = provider.open_read(path, &EncryptionPath::for_file(path))?;
        let mut input = compression.decompress(raw)?;

        let file_version = read_var_int(&mut input)?;
        if file_version > max_supported_spill_version {
            return Err(SpillwayError::UnsupportedSpillVersion {
                max_supported: max_supported_spill_version,
                file_version,
            });
        }

        let reader = NativeBlockReader::try_new(input, header, file_version)?;
        debug!(path = %path.display(), version = file_version, "opened spilled file");

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            profile: BlockStreamProfile::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format version recorded in the file.
    pub fn version(&self) -> i64 {
        self.reader.version()
    }
}

impl BlockInputStream for SpilledFileStream {
    fn name(&self) -> &'static str {
        "SpilledFile"
    }

    fn header(&self) -> SchemaRef {
        self.reader.header()
    }

    fn read(&mut self) -> SpillwayResult<Option<RecordBatch>> {
        let started = Instant::now();
        let result = self.reader.read();
        self.profile.observe(&result, started.elapsed());
        result
    }

    fn profile(&self) -> Option<&BlockStreamProfile> {
        Some(&self.profile)
    }
}

impl Drop for SpilledFileStream {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), blocks = self.profile.blocks(), "closed spilled file");
    }
}
