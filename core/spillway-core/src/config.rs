//! 스필 / 비동기 스트림 설정
//!
//! Defaults come from [`Default`]; a JSON file ([`SpillConfig::load`]) and
//! `SPILLWAY_*` environment variables ([`SpillConfig::apply_env`]) can
//! override them.

use crate::error::{SpillwayError, SpillwayResult};
use crate::spill::{CURRENT_SPILL_VERSION, MAX_SUPPORTED_SPILL_VERSION, MIN_SPILL_VERSION};
use crate::storage::SpillCompression;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory that holds spill directories.
pub const ENV_SPILL_DIR: &str = "SPILLWAY_SPILL_DIR";
/// Newest spill format version readers accept.
pub const ENV_MAX_SUPPORTED_SPILL_VERSION: &str = "SPILLWAY_MAX_SUPPORTED_SPILL_VERSION";
/// Spill format version writers produce.
pub const ENV_SPILL_VERSION: &str = "SPILLWAY_SPILL_VERSION";
/// Spill codec, e.g. `none` or `zstd:3`.
pub const ENV_SPILL_COMPRESSION: &str = "SPILLWAY_SPILL_COMPRESSION";

/// 스필 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpillConfig {
    /// Parent of spill directories; the system temp dir when unset.
    pub spill_dir: Option<PathBuf>,
    /// Files with a newer version are rejected on open.
    pub max_supported_spill_version: i64,
    /// Version of newly written files.
    pub spill_version: i64,
    pub compression: SpillCompression,
}

impl Default for SpillConfig {
    fn default() -> Self {
        Self {
            spill_dir: None,
            max_supported_spill_version: MAX_SUPPORTED_SPILL_VERSION,
            spill_version: CURRENT_SPILL_VERSION,
            compression: SpillCompression::default(),
        }
    }
}

impl SpillConfig {
    pub fn with_spill_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spill_dir = Some(dir.into());
        self
    }

    pub fn with_max_supported_spill_version(mut self, version: i64) -> Self {
        self.max_supported_spill_version = version;
        self
    }

    pub fn with_spill_version(mut self, version: i64) -> Self {
        self.spill_version = version;
        self
    }

    pub fn with_compression(mut self, compression: SpillCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Check version bounds and codec parameters.
    pub fn validate(&self) -> SpillwayResult<()> {
        if !(MIN_SPILL_VERSION..=MAX_SUPPORTED_SPILL_VERSION)
            .contains(&self.max_supported_spill_version)
        {
            return Err(SpillwayError::Config(format!(
                "max_supported_spill_version {} outside {}..={}",
                self.max_supported_spill_version, MIN_SPILL_VERSION, MAX_SUPPORTED_SPILL_VERSION
            )));
        }
        if !(MIN_SPILL_VERSION..=CURRENT_SPILL_VERSION).contains(&self.spill_version) {
            return Err(SpillwayError::Config(format!(
                "spill_version {} outside {}..={}",
                self.spill_version, MIN_SPILL_VERSION, CURRENT_SPILL_VERSION
            )));
        }
        if let SpillCompression::Zstd { level } = self.compression {
            SpillCompression::zstd(level)?;
        }
        Ok(())
    }

    /// 파일에서 로드 (missing fields keep their defaults)
    pub fn load(path: &Path) -> SpillwayResult<Self> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// 파일에 저장
    pub fn save(&self, path: &Path) -> SpillwayResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }

    /// 환경 변수에서 로드
    pub fn apply_env(self) -> SpillwayResult<Self> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source.
    pub fn apply_vars<F>(mut self, lookup: F) -> SpillwayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_SPILL_DIR) {
            self.spill_dir = Some(PathBuf::from(dir));
        }
        if let Some(value) = lookup(ENV_MAX_SUPPORTED_SPILL_VERSION) {
            self.max_supported_spill_version = parse_version(ENV_MAX_SUPPORTED_SPILL_VERSION, &value)?;
        }
        if let Some(value) = lookup(ENV_SPILL_VERSION) {
            self.spill_version = parse_version(ENV_SPILL_VERSION, &value)?;
        }
        if let Some(value) = lookup(ENV_SPILL_COMPRESSION) {
            self.compression = value.parse()?;
        }
        self.validate()?;
        Ok(self)
    }
}

fn parse_version(name: &str, value: &str) -> SpillwayResult<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| SpillwayError::Config(format!("{} is not an integer: '{}'", name, value)))
}

/// 비동기 스트림 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsyncStreamConfig {
    /// Name of the prefetch worker thread.
    pub thread_name: String,
}

impl Default for AsyncStreamConfig {
    fn default() -> Self {
        Self {
            thread_name: "spillway-async".to_string(),
        }
    }
}

impl AsyncStreamConfig {
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}
