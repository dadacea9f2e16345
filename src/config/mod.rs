//! # Configuration Management
//!
//! Environment profiles, the transport security policy and the settings used to
//! build a client from `BANKID_*` environment variables.

pub mod environment;
pub mod tls;

pub use environment::{Environment, EnvironmentProfile, TEST_MARKER};
pub use tls::{TransportSecurityPolicy, MIN_VERIFY_DEPTH};

use std::{path::PathBuf, time::Duration};

use validator::Validate;

use crate::{
    errors::{Error, Result},
    utils::CertificateResolver,
};

/// Settings for building a client outside of code, e.g. from the CLI.
#[derive(Debug, Clone, Validate)]
pub struct ClientSettings {
    /// File name of the client identity under the certificate directory
    #[validate(length(min = 1, message = "Certificate name cannot be empty"))]
    pub cert_name: String,

    pub environment: Environment,

    /// Installation root holding the `certs/` directory (None = crate root)
    pub cert_root: Option<PathBuf>,

    /// Per-request timeout in seconds (None = transport default)
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub request_timeout_seconds: Option<u64>,

    #[validate(nested)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Validate)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

impl ClientSettings {
    /// Settings for a certificate name with every other value at its default.
    pub fn new<S: Into<String>>(cert_name: S, environment: Environment) -> Self {
        Self {
            cert_name: cert_name.into(),
            environment,
            cert_root: None,
            request_timeout_seconds: None,
            logging: LoggingConfig::default(),
        }
    }

    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let cert_name = std::env::var("BANKID_CERT_NAME")
            .map_err(|_| Error::config("BANKID_CERT_NAME is not set"))?
            .trim()
            .to_string();

        let environment = match std::env::var("BANKID_ENVIRONMENT") {
            Ok(value) => value.parse()?,
            Err(_) => Environment::default(),
        };

        let cert_root = std::env::var("BANKID_CERT_ROOT")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        let request_timeout_seconds = std::env::var("BANKID_REQUEST_TIMEOUT_SECONDS")
            .ok()
            .map(|value| {
                value.trim().parse::<u64>().map_err(|e| {
                    Error::config(format!("Invalid BANKID_REQUEST_TIMEOUT_SECONDS: {}", e))
                })
            })
            .transpose()?;

        let log_level =
            std::env::var("BANKID_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let json_logging = std::env::var("BANKID_LOG_JSON")
            .ok()
            .map(|value| parse_flag(&value))
            .unwrap_or(false);

        let settings = Self {
            cert_name,
            environment,
            cert_root,
            request_timeout_seconds,
            logging: LoggingConfig { log_level, json_logging },
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self)
            .map_err(|errors| Error::config(format!("Validation failed: {errors}")))
    }

    /// Resolver rooted at the configured installation root
    pub fn resolver(&self) -> CertificateResolver {
        match &self.cert_root {
            Some(root) => CertificateResolver::new(root),
            None => CertificateResolver::default(),
        }
    }

    /// Request timeout as Duration, if one is configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}

/// Serializes tests that read or write `BANKID_*` process variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Truthy spellings accepted for boolean settings.
pub(crate) fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
