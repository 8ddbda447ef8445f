//! One logical stream over an ordered set of spilled files.

use super::file_stream::SpilledFileStream;
use crate::config::SpillConfig;
use crate::error::{SpillwayError, SpillwayResult};
use crate::storage::{FileProviderRef, SpillCompression};
use crate::stream::{BlockInputStream, BlockStreamProfile};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

enum State {
    /// No file open; `cursor` is the next file to open.
    Idle { cursor: usize },
    /// File at `cursor` is open.
    Reading {
        cursor: usize,
        file: Box<SpilledFileStream>,
    },
    Exhausted,
    /// An earlier read failed with this message.
    Failed(String),
}

/// 스필 파일 목록을 하나의 스트림으로 연결
///
/// Files are opened one at a time, in order, and only after the previous
/// one was exhausted; empty files are skipped without surfacing an
/// end-of-stream in between. The files themselves are never deleted here.
///
/// The first failure ends the stream: it is returned once as-is, and every
/// later `read()` returns [`SpillwayError::Poisoned`] with its message.
pub struct SpilledFilesStream {
    files: Vec<PathBuf>,
    header: SchemaRef,
    provider: FileProviderRef,
    compression: SpillCompression,
    max_supported_spill_version: i64,
    state: State,
    profile: BlockStreamProfile,
}

impl SpilledFilesStream {
    pub fn new(
        files: Vec<PathBuf>,
        header: SchemaRef,
        provider: FileProviderRef,
        max_supported_spill_version: i64,
    ) -> Self {
        Self {
            files,
            header,
            provider,
            compression: SpillCompression::default(),
            max_supported_spill_version,
            state: State::Idle { cursor: 0 },
            profile: BlockStreamProfile::new(),
        }
    }

    /// Reader using the codec and version limit of `config`.
    pub fn from_config(
        files: Vec<PathBuf>,
        header: SchemaRef,
        provider: FileProviderRef,
        config: &SpillConfig,
    ) -> Self {
        Self::new(files, header, provider, config.max_supported_spill_version)
            .with_compression(config.compression)
    }

    /// Codec the files were written with.
    pub fn with_compression(mut self, compression: SpillCompression) -> Self {
        self.compression = compression;
        self
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Index of the file currently open, if any.
    pub fn current_file(&self) -> Option<usize> {
        match self.state {
            State::Reading { cursor, .. } => Some(cursor),
            _ => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, State::Exhausted)
    }

    fn next_block(&mut self) -> SpillwayResult<Option<RecordBatch>> {
        loop {
            match std::mem::replace(&mut self.state, State::Exhausted) {
                State::Exhausted => return Ok(None),
                State::Failed(message) => {
                    let err = SpillwayError::Poisoned(message.clone());
                    self.state = State::Failed(message);
                    return Err(err);
                }
                State::Idle { cursor } if cursor >= self.files.len() => return Ok(None),
                State::Idle { cursor } => {
                    let file = SpilledFileStream::open(
                        &self.files[cursor],
                        Arc::clone(&self.header),
                        self.provider.as_ref(),
                        self.compression,
                        self.max_supported_spill_version,
                    )
                    .map_err(|e| self.fail(e))?;
                    self.state = State::Reading {
                        cursor,
                        file: Box::new(file),
                    };
                }
                State::Reading { cursor, mut file } => match file.read() {
                    Ok(Some(block)) => {
                        self.state = State::Reading { cursor, file };
                        return Ok(Some(block));
                    }
                    Ok(None) => {
                        drop(file);
                        self.state = State::Idle { cursor: cursor + 1 };
                    }
                    Err(e) => return Err(self.fail(e)),
                },
            }
        }
    }

    fn fail(&mut self, err: SpillwayError) -> SpillwayError {
        self.state = State::Failed(err.to_string());
        err
    }
}

impl BlockInputStream for SpilledFilesStream {
    fn name(&self) -> &'static str {
        "SpilledFiles"
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

    fn children(&self) -> Vec<&dyn BlockInputStream> {
        match &self.state {
            State::Reading { file, .. } => vec![file.as_ref() as &dyn BlockInputStream],
            _ => Vec::new(),
        }
    }

    fn profile(&self) -> Option<&BlockStreamProfile> {
        Some(&self.profile)
    }
}

impl std::fmt::Debug for SpilledFilesStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Idle { cursor } => format!("Idle({})", cursor),
            State::Reading { cursor, .. } => format!("Reading({})", cursor),
            State::Exhausted => "Exhausted".to_string(),
            State::Failed(message) => format!("Failed({})", message),
        };
        f.debug_struct("SpilledFilesStream")
            .field("files", &self.files.len())
            .field("state", &state)
            .field("max_supported_spill_version", &self.max_supported_spill_version)
            .finish()
    }
}
