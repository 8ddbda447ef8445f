//! Error types for the Spillway streaming core.
//!
//! All public APIs return `SpillwayResult<T>`: no panics in library code.

use thiserror::Error;

/// Unified error type for all Spillway operations.
#[derive(Debug, Error)]
pub enum SpillwayError {
    /// Apache Arrow error (RecordBatch / IPC operations)
    #[error("arrow error: {source}")]
    Arrow {
        #[from]
        source: arrow::error::ArrowError,
    },

    /// Standard I/O error
    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A spilled file was written with a newer format than this reader understands
    #[error(
        "spill file is not supported, max supported version {max_supported}, file version {file_version}"
    )]
    UnsupportedSpillVersion {
        max_supported: i64,
        file_version: i64,
    },

    /// Malformed block data in a spilled file
    #[error("decode error: {0}")]
    Decode(String),

    /// Decoded block does not match the declared header
    #[error("schema error: {0}")]
    Schema(String),

    /// Encryption/decryption error
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Invalid configuration value
    #[error("config error: {0}")]
    Config(String),

    /// Invalid arguments
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Background worker could not be created or panicked while computing a block
    #[error("background worker failed: {0}")]
    WorkerPanicked(String),

    /// The stream already delivered a failure and cannot be read further
    #[error("stream poisoned by earlier failure: {0}")]
    Poisoned(String),
}

/// Result type alias for all Spillway operations.
pub type SpillwayResult<T> = Result<T, SpillwayError>;

impl From<serde_json::Error> for SpillwayError {
    fn from(err: serde_json::Error) -> Self {
        SpillwayError::Config(err.to_string())
    }
}
