//! Logging configuration and initialization
//!
//! Console logging goes to stderr so result data piped to stdout stays
//! clean. The `--verbose` flag raises the level from info to debug; a
//! `RUST_LOG` environment filter takes precedence over both.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Logging configuration for one CLI invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    /// Show detailed operations (debug level).
    pub verbose: bool,
}

/// Install the global tracing subscriber. Call once at startup.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let default_level = if config.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))?;

    Ok(())
}
