//! File access for spilled files.
//!
//! Readers and writers never touch `std::fs` directly: they ask a
//! [`FileProvider`] for a byte stream, passing the [`EncryptionPath`] that
//! addresses the file's at-rest key material. Two providers ship here:
//!
//! - [`PlainFileProvider`]: plain buffered files
//! - [`EncryptedFileProvider`]: whole-file AEAD, see [`super::encryption`]

use crate::error::SpillwayResult;
use crate::storage::encryption::EncryptionConfig;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;
use std::sync::Arc;

/// Shared handle to a file provider.
pub type FileProviderRef = Arc<dyn FileProvider>;

/// Addressing metadata for at-rest decryption of one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncryptionPath {
    /// Full path of the file being encrypted.
    pub full_path: String,
    /// File name inside a container file; empty for standalone files.
    pub file_name: String,
}

impl EncryptionPath {
    pub fn new(full_path: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            full_path: full_path.into(),
            file_name: file_name.into(),
        }
    }

    /// Encryption path of a standalone file.
    pub fn for_file(path: &Path) -> Self {
        Self::new(path.to_string_lossy(), "")
    }

    /// Bytes bound into the AEAD tag.
    pub fn associated_data(&self) -> Vec<u8> {
        let mut aad = Vec::with_capacity(self.full_path.len() + 1 + self.file_name.len());
        aad.extend_from_slice(self.full_path.as_bytes());
        aad.push(0);
        aad.extend_from_slice(self.file_name.as_bytes());
        aad
    }
}

/// Writable end of a spilled file.
///
/// Bytes are durable only after [`finish`](SpillSink::finish) returned
/// `Ok`; dropping a sink without finishing leaves the file incomplete.
pub trait SpillSink: Write + Send {
    fn finish(self: Box<Self>) -> SpillwayResult<()>;
}

/// Storage collaborator that hands out byte streams for spilled files.
pub trait FileProvider: Send + Sync {
    /// Open `path` for sequential reading.
    fn open_read(
        &self,
        path: &Path,
        encryption_path: &EncryptionPath,
    ) -> SpillwayResult<Box<dyn Read + Send>>;

    /// Create (or truncate) `path` for writing.
    fn open_write(
        &self,
        path: &Path,
        encryption_path: &EncryptionPath,
    ) -> SpillwayResult<Box<dyn SpillSink>>;

    /// Whether files from this provider are encrypted at rest.
    fn is_encrypted(&self) -> bool {
        false
    }
}

// ───────────────────────────────────────────────────────────────
// PlainFileProvider
// ───────────────────────────────────────────────────────────────

/// Unencrypted files on the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainFileProvider;

impl PlainFileProvider {
    pub fn shared() -> FileProviderRef {
        Arc::new(Self)
    }
}

impl FileProvider for PlainFileProvider {
    fn open_read(
        &self,
        path: &Path,
        _encryption_path: &EncryptionPath,
    ) -> SpillwayResult<Box<dyn Read + Send>> {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }

    fn open_write(
        &self,
        path: &Path,
        _encryption_path: &EncryptionPath,
    ) -> SpillwayResult<Box<dyn SpillSink>> {
        Ok(Box::new(PlainFileSink {
            writer: BufWriter::new(create_file(path)?),
        }))
    }
}

struct PlainFileSink {
    writer: BufWriter<File>,
}

impl Write for PlainFileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl SpillSink for PlainFileSink {
    fn finish(mut self: Box<Self>) -> SpillwayResult<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// EncryptedFileProvider
// ───────────────────────────────────────────────────────────────

/// Files sealed whole with AEAD; the encryption path is the associated data.
///
/// The whole file is buffered in memory on both ends, which suits spill
/// files sized to the operator's memory budget.
#[derive(Debug, Clone)]
pub struct EncryptedFileProvider {
    encryption: EncryptionConfig,
}

impl EncryptedFileProvider {
    pub fn new(encryption: EncryptionConfig) -> Self {
        Self { encryption }
    }

    pub fn shared(encryption: EncryptionConfig) -> FileProviderRef {
        Arc::new(Self::new(encryption))
    }
}

impl FileProvider for EncryptedFileProvider {
    fn open_read(
        &self,
        path: &Path,
        encryption_path: &EncryptionPath,
    ) -> SpillwayResult<Box<dyn Read + Send>> {
        let mut sealed = Vec::new();
        File::open(path)?.read_to_end(&mut sealed)?;
        let plain = self
            .encryption
            .open(&sealed, &encryption_path.associated_data())?;
        Ok(Box::new(Cursor::new(plain)))
    }

    fn open_write(
        &self,
        path: &Path,
        encryption_path: &EncryptionPath,
    ) -> SpillwayResult<Box<dyn SpillSink>> {
        let file = create_file(path)?;
        Ok(Box::new(EncryptedFileSink {
            file,
            buffer: Vec::new(),
            aad: encryption_path.associated_data(),
            encryption: self.encryption.clone(),
        }))
    }

    fn is_encrypted(&self) -> bool {
        true
    }
}

struct EncryptedFileSink {
    file: File,
    buffer: Vec<u8>,
    aad: Vec<u8>,
    encryption: EncryptionConfig,
}

impl Write for EncryptedFileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SpillSink for EncryptedFileSink {
    fn finish(mut self: Box<Self>) -> SpillwayResult<()> {
        let sealed = self.encryption.seal(&self.buffer, &self.aad)?;
        self.file.write_all(&sealed)?;
        self.file.sync_data()?;
        Ok(())
    }
}

fn create_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpillwayError;
    use tempfile::tempdir;

    fn write_through(provider: &dyn FileProvider, path: &Path, data: &[u8]) {
        let mut sink = provider
            .open_write(path, &EncryptionPath::for_file(path))
            .unwrap();
        sink.write_all(data).unwrap();
        sink.finish().unwrap();
    }

    fn read_through(provider: &dyn FileProvider, path: &Path) -> SpillwayResult<Vec<u8>> {
        let mut reader = provider.open_read(path, &EncryptionPath::for_file(path))?;
        let mut out = Vec::new();
        reader.read_to_end(&mut out)?;
        Ok(out)
    }

    #[test]
    fn plain_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.spill");
        let provider = PlainFileProvider;

        write_through(&provider, &path, b"hello spill");
        assert_eq!(read_through(&provider, &path).unwrap(), b"hello spill");
        assert_eq!(std::fs::read(&path).unwrap(), b"hello spill");
        assert!(!provider.is_encrypted());
    }

    #[test]
    fn encrypted_round_trip_hides_plaintext() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sealed.spill");
        let provider = EncryptedFileProvider::new(EncryptionConfig::from_key([3u8; 32]));

        write_through(&provider, &path, b"secret rows");
        let on_disk = std::fs::read(&path).unwrap();
        assert!(!on_disk.windows(11).any(|w| w == b"secret rows"));
        assert_eq!(read_through(&provider, &path).unwrap(), b"secret rows");
        assert!(provider.is_encrypted());
    }

    #[test]
    fn encrypted_file_bound_to_its_path() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("a.spill");
        let moved = dir.path().join("b.spill");
        let provider = EncryptedFileProvider::new(EncryptionConfig::from_key([9u8; 32]));

        write_through(&provider, &original, b"rows");
        std::fs::rename(&original, &moved).unwrap();

        assert!(matches!(
            read_through(&provider, &moved),
            Err(SpillwayError::Encryption(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = read_through(&PlainFileProvider, &dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, SpillwayError::Io { .. }));
    }

    #[test]
    fn associated_data_separates_fields() {
        let a = EncryptionPath::new("ab", "c").associated_data();
        let b = EncryptionPath::new("a", "bc").associated_data();
        assert_ne!(a, b);
    }
}
