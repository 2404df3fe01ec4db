//! Logging initialisation.
//!
//! `RUST_LOG` takes precedence over the configured level when it is set.

use sentiscope_core::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Build the level filter for `config`.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(&config.level))
}

/// Filter for a configured level; an unparseable level means `info`.
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if the format is unknown or a global subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = env_filter(config);
    let installed = match config.format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        "text" => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        other => anyhow::bail!("Unknown logging.format '{other}' (expected 'text' or 'json')"),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to initialise logging: {e}"))
}
