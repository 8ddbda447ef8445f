//! Compression layer for spilled files.
//!
//! A spilled file is one compressed byte stream. The codec is not recorded
//! in the file, so readers must be configured with the codec the writer used.
//!
//! | Algorithm | Speed | Ratio | Use Case |
//! |-----------|-------|-------|----------|
//! | None | ★★★★★ | ★ | Debugging, tmpfs-backed spill directories |
//! | ZSTD | ★★★★ | ★★★★★ | Default: spill to disk |
//!
//! # Example
//!
//! ```rust
//! use spillway_core::storage::compression::SpillCompression;
//!
//! let codec = SpillCompression::default();
//! assert_eq!(codec, SpillCompression::Zstd { level: 1 });
//!
//! let codec: SpillCompression = "zstd:9".parse().unwrap();
//! assert_eq!(codec.to_string(), "zstd:9");
//! ```

use crate::error::{SpillwayError, SpillwayResult};
use crate::storage::file_provider::SpillSink;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::str::FromStr;

/// Lowest ZSTD level accepted (levels below 1 are ZSTD's "fast" modes).
const ZSTD_MIN_LEVEL: i32 = 1;

/// Highest ZSTD level accepted.
const ZSTD_MAX_LEVEL: i32 = 22;

/// Codec applied to the whole spilled file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpillCompression {
    /// Raw bytes.
    None,
    /// Zstandard streaming frames.
    Zstd { level: i32 },
}

impl Default for SpillCompression {
    /// Level 1: spill is write-once read-once, so speed beats ratio.
    fn default() -> Self {
        Self::Zstd { level: 1 }
    }
}

impl std::fmt::Display for SpillCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Zstd { level } => write!(f, "zstd:{}", level),
        }
    }
}

impl FromStr for SpillCompression {
    type Err = SpillwayError;

    /// Accepts `none`, `zstd` and `zstd:<level>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.split_once(':') {
            None if lowered == "none" => Ok(Self::None),
            None if lowered == "zstd" => Ok(Self::default()),
            Some(("zstd", level)) => {
                let level: i32 = level.parse().map_err(|_| {
                    SpillwayError::Config(format!("invalid zstd level '{}'", level))
                })?;
                Self::zstd(level)
            }
            _ => Err(SpillwayError::Config(format!(
                "unknown spill compression '{}'",
                s
            ))),
        }
    }
}

impl SpillCompression {
    /// ZSTD at `level`, rejected outside 1-22.
    pub fn zstd(level: i32) -> SpillwayResult<Self> {
        if !(ZSTD_MIN_LEVEL..=ZSTD_MAX_LEVEL).contains(&level) {
            return Err(SpillwayError::Config(format!(
                "zstd level {} out of range {}-{}",
                level, ZSTD_MIN_LEVEL, ZSTD_MAX_LEVEL
            )));
        }
        Ok(Self::Zstd { level })
    }

    /// Wrap a raw file reader in the matching decompressing reader.
    pub fn decompress(&self, input: Box<dyn Read + Send>) -> SpillwayResult<Box<dyn Read + Send>> {
        match self {
            Self::None => Ok(input),
            Self::Zstd { .. } => Ok(Box::new(zstd::stream::read::Decoder::new(input)?)),
        }
    }

    /// Wrap a raw file sink in the matching compressing sink.
    pub fn compress(&self, sink: Box<dyn SpillSink>) -> SpillwayResult<Box<dyn SpillSink>> {
        match self {
            Self::None => Ok(sink),
            Self::Zstd { level } => Ok(Box::new(ZstdSink {
                encoder: zstd::stream::write::Encoder::new(sink, *level)?,
            })),
        }
    }
}

/// Compressing sink; finishing it writes the final ZSTD frame, then finishes
/// the underlying sink.
struct ZstdSink {
    encoder: zstd::stream::write::Encoder<'static, Box<dyn SpillSink>>,
}

impl Write for ZstdSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encoder.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }
}

impl SpillSink for ZstdSink {
    fn finish(self: Box<Self>) -> SpillwayResult<()> {
        let inner = self.encoder.finish()?;
        inner.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io::Cursor;
    use std::sync::Arc;

    /// In-memory sink that publishes its bytes on finish.
    struct VecSink {
        buf: Vec<u8>,
        out: Arc<Mutex<Option<Vec<u8>>>>,
    }

    impl Write for VecSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.buf.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SpillSink for VecSink {
        fn finish(self: Box<Self>) -> SpillwayResult<()> {
            *self.out.lock() = Some(self.buf);
            Ok(())
        }
    }

    fn round_trip(codec: SpillCompression, payload: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let out = Arc::new(Mutex::new(None));
        let sink = Box::new(VecSink {
            buf: Vec::new(),
            out: Arc::clone(&out),
        });
        let mut sink = codec.compress(sink).unwrap();
        sink.write_all(payload).unwrap();
        sink.finish().unwrap();

        let stored = out.lock().take().unwrap();
        let mut reader = codec
            .decompress(Box::new(Cursor::new(stored.clone())))
            .unwrap();
        let mut restored = Vec::new();
        reader.read_to_end(&mut restored).unwrap();
        (stored, restored)
    }

    #[test]
    fn zstd_round_trip_shrinks_repetitive_data() {
        let payload = vec![42u8; 64 * 1024];
        let (stored, restored) = round_trip(SpillCompression::default(), &payload);
        assert_eq!(restored, payload);
        assert!(stored.len() < payload.len() / 10);
    }

    #[test]
    fn none_passes_bytes_through() {
        let payload = b"plain spill bytes".to_vec();
        let (stored, restored) = round_trip(SpillCompression::None, &payload);
        assert_eq!(stored, payload);
        assert_eq!(restored, payload);
    }

    #[test]
    fn parse_and_display() {
        assert_eq!("none".parse::<SpillCompression>().unwrap(), SpillCompression::None);
        assert_eq!(
            "ZSTD".parse::<SpillCompression>().unwrap(),
            SpillCompression::Zstd { level: 1 }
        );
        assert_eq!(
            "zstd:7".parse::<SpillCompression>().unwrap().to_string(),
            "zstd:7"
        );
        assert!("zstd:40".parse::<SpillCompression>().is_err());
        assert!("lz5".parse::<SpillCompression>().is_err());
    }
}
