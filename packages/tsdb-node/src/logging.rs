//! Process-wide tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LogLevel;

/// Installs a `fmt` subscriber with an `EnvFilter` seeded from `--log-level`,
/// overridable at runtime via `RUST_LOG`.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    fmt().with_env_filter(filter).with_target(true).json().init();
}
