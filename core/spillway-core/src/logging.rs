//! Logging setup for spill and prefetch diagnostics
//!
//! The crate only emits `tracing` events; a subscriber is installed here
//! when the `logging` feature is on. Events of interest:
//!
//! - `debug`: prefetch tasks scheduled, spilled files opened, written and
//!   removed
//! - `warn`: an asynchronous stream dropped while still holding a failure
//!   nobody read, spill files that could not be deleted
//!
//! The filter comes from `SPILLWAY_LOG`, then `RUST_LOG`, then the level
//! passed in, scoped to this crate.

/// Environment variable with a filter that overrides `RUST_LOG`.
pub const LOG_ENV: &str = "SPILLWAY_LOG";

#[cfg(feature = "logging")]
use tracing_subscriber::{EnvFilter, fmt};

/// Filter directive for `level` restricted to this crate's events.
pub fn crate_directive(level: &str) -> String {
    format!("spillway_core={}", level.trim().to_ascii_lowercase())
}

#[cfg(feature = "logging")]
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(crate_directive(level)))
}

/// 기본 설정으로 로깅 초기화 (info)
///
/// ```rust
/// spillway_core::logging::init();
/// ```
#[cfg(feature = "logging")]
pub fn init() {
    init_with_level("info")
}

/// Install a subscriber at `level` unless an environment filter is set.
///
/// Lines carry the thread name, so work done on a prefetch worker (named by
/// `AsyncStreamConfig::thread_name`) stands apart from the consumer.
/// A second call is a no-op.
#[cfg(feature = "logging")]
pub fn init_with_level(level: &str) {
    let _ = fmt()
        .with_env_filter(build_filter(level))
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(true)
        .try_init();
}

/// Debug-level events captured by the test harness.
#[cfg(feature = "logging")]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new(crate_directive("debug")))
        .with_thread_names(true)
        .with_test_writer()
        .try_init();
}

#[cfg(not(feature = "logging"))]
pub fn init() {}

#[cfg(not(feature = "logging"))]
pub fn init_with_level(_level: &str) {}

#[cfg(not(feature = "logging"))]
pub fn init_test() {}
