//! # Structured Logging
//!
//! Subscriber setup and span helpers built on the tracing ecosystem.
//!
//! Every remote call runs inside an `rp_call` span carrying the operation
//! name, the environment and a per-call id, so a request and its outcome can be
//! correlated in JSON output.

use tracing_subscriber::EnvFilter;

use crate::{
    config::LoggingConfig,
    errors::{Error, Result},
};

/// Create a tracing span for one remote operation.
///
/// ```rust,ignore
/// let span = rp_span!(Operation::Collect, Environment::Test);
/// let span = rp_span!(Operation::Sign, Environment::Test, personal_number = "19900101****");
/// ```
#[macro_export]
macro_rules! rp_span {
    ($operation:expr, $environment:expr) => {
        tracing::info_span!(
            "rp_call",
            operation = %$operation,
            environment = %$environment,
            call_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $environment:expr, $($field:tt)*) => {
        tracing::info_span!(
            "rp_call",
            operation = %$operation,
            environment = %$environment,
            call_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Installing twice
/// is not an error, so tests and embedding applications can call this freely.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            Error::config(format!("Invalid log level '{}': {}", config.log_level, e))
        })?,
    };

    let installed = if config.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init()
    };

    if installed.is_err() {
        tracing::debug!("Log subscriber already installed; keeping the existing one");
    }
    Ok(())
}
