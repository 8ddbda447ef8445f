//! Spilled data: file format, writers and readers.
//!
//! When an operator exceeds its memory budget it writes blocks to spilled
//! files through a [`Spiller`]; the recovery path reads them back as one
//! stream with [`SpilledFilesStream`].
//!
//! # File layout
//!
//! ```text
//! ┌──────────────────────── compressed stream ───────────────────────┐
//! │ varint version │ native block encoding for that version ...       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The header (schema) is not stored; readers are given the same header the
//! writer used. A reader rejects files newer than its configured maximum
//! version and reads every older one.

mod file_stream;
mod files_stream;
mod native;
mod spiller;
pub mod varint;
mod writer;

pub use file_stream::SpilledFileStream;
pub use files_stream::SpilledFilesStream;
pub use native::{NativeBlockReader, NativeBlockWriter};
pub use spiller::Spiller;
pub use writer::SpilledFileWriter;

/// Version written by default.
pub const CURRENT_SPILL_VERSION: i64 = 2;

/// Newest version this build can decode.
pub const MAX_SUPPORTED_SPILL_VERSION: i64 = 2;

/// Oldest version this build can decode.
pub const MIN_SPILL_VERSION: i64 = 1;
