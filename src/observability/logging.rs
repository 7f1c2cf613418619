//! Diagnostic logging.
//!
//! Uses `tracing` with a fmt subscriber. `RUST_LOG` wins over the configured
//! level. Access log lines do not go through here; see `access_log`.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Filter directives for a configured level: our crates and tower-http at
/// that level, everything else at `warn`.
pub fn default_directives(level: &str) -> String {
    format!(
        "warn,httpd_chain={level},httpd={level},tower_http={level}",
        level = level
    )
}

/// Install the global subscriber.
pub fn init(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(&config.log_level)))
        .unwrap_or_else(|_| EnvFilter::new(default_directives("info")));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
