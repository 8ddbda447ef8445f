//! Storage layer for spilled data.
//!
//! Everything between a decoded block and the bytes on disk:
//! [`file_provider`] opens files (optionally encrypted via [`encryption`]),
//! [`compression`] wraps the byte stream, [`arrow_ipc`] frames blocks.

pub mod arrow_ipc;
pub mod compression;
pub mod encryption;
pub mod file_provider;

pub use compression::SpillCompression;
pub use encryption::{EncryptionAlgorithm, EncryptionConfig};
pub use file_provider::{
    EncryptedFileProvider, EncryptionPath, FileProvider, FileProviderRef, PlainFileProvider,
    SpillSink,
};
