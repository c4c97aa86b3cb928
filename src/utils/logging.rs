//! Logging setup
//!
//! Components log through `tracing`; installing a subscriber is left to the
//! embedding process. [`init_logging`] is a convenience for hosts that have
//! none of their own.

use crate::config::LoggingConfig;
use crate::utils::error::{AcceleratorError, Result};
use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber
///
/// `RUST_LOG` takes precedence over `config.level` when set. Returns `Ok(false)`
/// if a global subscriber was already installed by someone else.
pub fn init_logging(config: &LoggingConfig) -> Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            AcceleratorError::config(format!("Invalid log level '{}': {}", config.level, e))
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    let installed = if config.json_enabled() {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    Ok(installed)
}
