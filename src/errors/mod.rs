//! # Error Handling
//!
//! Error types for the BankID relying-party client, defined with `thiserror`.
//! Every failure is returned to the caller as a typed [`Error`]; nothing is
//! swallowed at the client boundary.

pub mod tls;

pub use tls::TlsError;

use crate::service::FaultStatus;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the relying-party client
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid settings or environment values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Certificate lookup, loading or TLS policy errors
    #[error("Certificate error: {0}")]
    Certificate(#[from] TlsError),

    /// The secured session could not be established at construction
    #[error("Session establishment failed: {message}")]
    Session {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An operation was invoked on a client whose construction failed
    #[error("Client is not configured: {0}")]
    NotConfigured(String),

    /// Network or TLS failure during a remote call
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The remote service rejected the call with a SOAP fault
    #[error("Remote fault {code}: {message}")]
    RemoteFault {
        code: String,
        message: String,
        status: Option<FaultStatus>,
    },

    /// Malformed envelope, descriptor or response
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a session error without an underlying source
    pub fn session<S: Into<String>>(message: S) -> Self {
        Self::Session { message: message.into(), source: None }
    }

    /// Create a session error wrapping the failure that caused it
    pub fn session_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Session { message: message.into(), source: Some(source) }
    }

    /// Create a transport error without an underlying source
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport { message: message.into(), source: None }
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a remote fault error
    pub fn remote_fault<C: Into<String>, M: Into<String>>(
        code: C,
        message: M,
        status: Option<FaultStatus>,
    ) -> Self {
        Self::RemoteFault { code: code.into(), message: message.into(), status }
    }

    /// True when the remote service answered and refused the request
    pub fn is_remote_rejection(&self) -> bool {
        matches!(self, Error::RemoteFault { .. })
    }

    /// The service's fault status, if the error carries one
    pub fn fault_status(&self) -> Option<&FaultStatus> {
        match self {
            Error::RemoteFault { status, .. } => status.as_ref(),
            _ => None,
        }
    }

    /// Short machine-readable label, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Certificate(_) => "certificate",
            Error::Session { .. } => "session",
            Error::NotConfigured(_) => "not_configured",
            Error::Transport { .. } => "transport",
            Error::RemoteFault { .. } => "remote_fault",
            Error::Protocol(_) => "protocol",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport { message: error.to_string(), source: Some(error) }
    }
}
