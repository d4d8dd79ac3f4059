//! Process-wide logging setup for engine binaries and tests.

/// Tracing subscriber configuration.
pub mod tracing;

pub use crate::tracing::{LogConfig, LogFormat};

/// Install the default subscriber (JSON, `RUST_LOG` filter, `info` fallback).
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    crate::tracing::init(&LogConfig::from_env());
}
