//! Tracing subscriber bootstrap for binaries and manual test runs.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

use crate::config::{EnvConfig, DEFAULT_LOG_FILTER};

/// Installs a global fmt subscriber filtered by `config.log_filter`.
///
/// Returns `false` when a global subscriber was already installed, which
/// makes repeated calls (for example from several tests) harmless.
pub fn init_logging(config: &EnvConfig) -> bool {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|error| {
        eprintln!(
            "invalid log filter '{}': {error}; using '{DEFAULT_LOG_FILTER}'",
            config.log_filter
        );
        EnvFilter::new(DEFAULT_LOG_FILTER)
    });

    fmt()
        .with_env_filter(filter)
        .with_ansi(config.log_ansi)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
