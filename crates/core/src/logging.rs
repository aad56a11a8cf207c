//! Structured logging infrastructure for the HMI core.
//!
//! This module provides centralized logging initialization with support
//! for structured JSON output and environment-based configuration.

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging from configuration.
///
/// Log level comes from the `RUST_LOG` environment variable, falling back to
/// `config.default_filter`. `config.json` selects JSON output for log
/// aggregation. A second call returns an error instead of panicking.
///
/// # Example
/// ```no_run
/// use hmicore_core::{logging, LoggingConfig};
///
/// logging::init_with(&LoggingConfig::default()).unwrap();
/// tracing::info!(component = "signal_hub", "Hub ready");
/// ```
pub fn init_with(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = env_filter(&config.default_filter);
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init()?;
    }
    Ok(())
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}
