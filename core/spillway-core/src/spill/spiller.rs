//! Operator-side owner of spilled files.

use super::files_stream::SpilledFilesStream;
use super::writer::SpilledFileWriter;
use crate::config::SpillConfig;
use crate::error::{SpillwayError, SpillwayResult};
use crate::storage::FileProviderRef;
use crate::stream::BlockInputStream;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Creates, tracks and deletes the spilled files of one operator.
///
/// Files live in a private directory created under
/// [`SpillConfig::spill_dir`] (or the system temp dir); dropping the spiller
/// deletes the directory with everything in it. Readers returned by
/// [`restore`](Self::restore) do not keep the files alive, so the spiller
/// must outlive them.
pub struct Spiller {
    config: SpillConfig,
    id: String,
    header: SchemaRef,
    provider: FileProviderRef,
    dir: TempDir,
    partitions: Vec<Vec<PathBuf>>,
    next_file_seq: u64,
}

impl Spiller {
    pub fn new(
        config: SpillConfig,
        id: &str,
        header: SchemaRef,
        partitions: usize,
        provider: FileProviderRef,
    ) -> SpillwayResult<Self> {
        config.validate()?;
        if partitions == 0 {
            return Err(SpillwayError::InvalidArguments(
                "spiller needs at least one partition".to_string(),
            ));
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("spillway-");
        let dir = match &config.spill_dir {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        debug!(spiller = id, dir = %dir.path().display(), partitions, "spiller created");

        Ok(Self {
            config,
            id: id.to_string(),
            header,
            provider,
            dir,
            partitions: vec![Vec::new(); partitions],
            next_file_seq: 0,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn header(&self) -> SchemaRef {
        Arc::clone(&self.header)
    }

    pub fn directory(&self) -> &Path {
        self.dir.path()
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Write `blocks` into a new file of `partition`.
    pub fn spill_blocks(&mut self, partition: usize, blocks: &[RecordBatch]) -> SpillwayResult<PathBuf> {
        let mut writer = self.new_file(partition)?;
        for block in blocks {
            writer.write(block)?;
        }
        self.commit(partition, writer)
    }

    /// Drain `stream` into a new file of `partition`.
    pub fn spill_stream(
        &mut self,
        partition: usize,
        stream: &mut dyn BlockInputStream,
    ) -> SpillwayResult<PathBuf> {
        let mut writer = self.new_file(partition)?;
        stream.read_prefix()?;
        while let Some(block) = stream.read()? {
            writer.write(&block)?;
        }
        stream.read_suffix()?;
        self.commit(partition, writer)
    }

    /// Files of `partition` in spill order.
    pub fn spilled_files(&self, partition: usize) -> SpillwayResult<&[PathBuf]> {
        self.check_partition(partition)?;
        Ok(&self.partitions[partition])
    }

    pub fn has_spilled_data(&self) -> bool {
        self.partitions.iter().any(|files| !files.is_empty())
    }

    /// Stream over every block spilled into `partition`, in spill order.
    pub fn restore(&self, partition: usize) -> SpillwayResult<SpilledFilesStream> {
        let files = self.spilled_files(partition)?.to_vec();
        Ok(SpilledFilesStream::from_config(
            files,
            Arc::clone(&self.header),
            Arc::clone(&self.provider),
            &self.config,
        ))
    }

    /// Delete the files of `partition`; the partition stays usable.
    pub fn remove_partition(&mut self, partition: usize) -> SpillwayResult<()> {
        self.check_partition(partition)?;
        for path in std::mem::take(&mut self.partitions[partition]) {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        debug!(spiller = %self.id, partition, "spilled partition removed");
        Ok(())
    }

    fn new_file(&mut self, partition: usize) -> SpillwayResult<SpilledFileWriter> {
        self.check_partition(partition)?;
        let path = self.dir.path().join(format!(
            "{}_{}_{}.spill",
            self.id, partition, self.next_file_seq
        ));
        self.next_file_seq += 1;
        SpilledFileWriter::create(
            &path,
            Arc::clone(&self.header),
            self.provider.as_ref(),
            self.config.compression,
            self.config.spill_version,
        )
    }

    fn commit(&mut self, partition: usize, writer: SpilledFileWriter) -> SpillwayResult<PathBuf> {
        let path = writer.finish()?;
        self.partitions[partition].push(path.clone());
        Ok(path)
    }

    fn check_partition(&self, partition: usize) -> SpillwayResult<()> {
        if partition >= self.partitions.len() {
            return Err(SpillwayError::InvalidArguments(format!(
                "partition {} out of range, spiller has {}",
                partition,
                self.partitions.len()
            )));
        }
        Ok(())
    }
}

impl Drop for Spiller {
    fn drop(&mut self) {
        let files: usize = self.partitions.iter().map(Vec::len).sum();
        debug!(spiller = %self.id, files, "dropping spiller");
        for path in self.partitions.iter().flatten() {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove spilled file"),
            }
        }
    }
}
