//! # Spillway: 스트리밍 실행 코어
//!
//! Pull-based block streams over Arrow `RecordBatch`es, with two pieces that
//! do the heavy lifting:
//!
//! - [`AsynchronousBlockStream`]: runs a child stream one block ahead on a
//!   background worker and lets the consumer `poll` with a timeout
//! - [`SpilledFilesStream`]: reads blocks back from an ordered set of
//!   spilled files (compressed, optionally encrypted, versioned)
//!
//! ## 빠른 시작
//!
//! ```rust
//! use spillway_core::{
//!     AsynchronousBlockStream, BlockInputStream, PlainFileProvider, SpillConfig, Spiller,
//! };
//! use arrow::array::Int64Array;
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> spillway_core::SpillwayResult<()> {
//! let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)]));
//! let block = RecordBatch::try_new(
//!     schema.clone(),
//!     vec![Arc::new(Int64Array::from(vec![1, 2, 3]))],
//! )?;
//!
//! // 메모리 초과 → 디스크로 스필
//! let mut spiller = Spiller::new(SpillConfig::default(), "sort", schema, 1, PlainFileProvider::shared())?;
//! spiller.spill_blocks(0, &[block.clone(), block.clone()])?;
//!
//! // 스필 파일 복원 + 백그라운드 프리페치
//! let mut stream = AsynchronousBlockStream::new(Box::new(spiller.restore(0)?));
//! stream.read_prefix()?;
//! let mut rows = 0;
//! loop {
//!     while !stream.poll(Duration::from_millis(10))? {
//!         // check for cancellation here
//!     }
//!     match stream.read()? {
//!         Some(block) => rows += block.num_rows(),
//!         None => break,
//!     }
//! }
//! stream.read_suffix()?;
//! assert_eq!(rows, 6);
//! # Ok(())
//! # }
//! ```
//!
//! ## 모듈
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`stream`] | `BlockInputStream` trait, profiling, async prefetch |
//! | [`spill`] | spill file format, writer, readers, `Spiller` |
//! | [`storage`] | file providers, compression, encryption, Arrow IPC |
//! | [`task`] | single-worker background tasks |
//! | [`statistics`] | per-stream counters as JSON |
//! | [`config`] | spill / async settings |

pub mod config;
pub mod error;
pub mod logging;
pub mod spill;
pub mod statistics;
pub mod storage;
pub mod stream;
pub mod task;

pub use config::{AsyncStreamConfig, SpillConfig};
pub use error::{SpillwayError, SpillwayResult};
pub use spill::{
    CURRENT_SPILL_VERSION, MAX_SUPPORTED_SPILL_VERSION, SpilledFileStream, SpilledFileWriter,
    SpilledFilesStream, Spiller,
};
pub use statistics::StreamStatistics;
pub use storage::{
    EncryptedFileProvider, EncryptionConfig, FileProvider, FileProviderRef, PlainFileProvider,
    SpillCompression,
};
pub use stream::{
    AsynchronousBlockStream, BlockInputStream, BlockStreamProfile, BlocksListStream,
    LimitBlockStream, read_all,
};
