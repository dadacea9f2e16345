use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Certificate and TLS policy errors surfaced while building a session.
#[derive(Debug, Error)]
pub enum TlsError {
    /// The client identity certificate is not present in the certificate directory.
    #[error("Client certificate '{name}' was not found in the certificate directory")]
    ClientCertificateNotFound { name: String },

    /// The environment's trust anchor is not present in the certificate directory.
    #[error("Trust anchor '{name}' was not found in the certificate directory")]
    TrustAnchorNotFound { name: String },

    /// A certificate file could not be read.
    #[error("Failed to read certificate at {path}: {source}")]
    CertificateReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No certificates were found in the supplied PEM file.
    #[error("Certificate file {path} does not contain any certificates")]
    EmptyCertificateChain { path: PathBuf },

    /// The certificate PEM contents were invalid or unreadable.
    #[error("Certificate file {path} is not a valid PEM: {source}")]
    InvalidCertificatePem {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The trust anchor could not be added to the root store.
    #[error("Trust anchor {path} was rejected: {source}")]
    InvalidTrustAnchor {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The identity PEM does not carry a supported private key.
    #[error("Identity file {path} does not contain a supported private key")]
    InvalidPrivateKey {
        path: PathBuf,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The identity certificate and its private key do not match.
    #[error("Certificate and private key do not match")]
    CertificateKeyMismatch,

    /// The certificate is not yet valid.
    #[error("Certificate at {path} is not valid before {not_before}")]
    CertificateNotYetValid { path: PathBuf, not_before: DateTime<Utc> },

    /// The certificate is expired.
    #[error("Certificate at {path} expired at {not_after}")]
    CertificateExpired { path: PathBuf, not_after: DateTime<Utc> },

    /// Metadata could not be extracted from the certificate.
    #[error("Failed to extract certificate metadata from {path}: {source}")]
    CertificateMetadata {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The transport security policy violates one of its invariants.
    #[error("Invalid transport security policy: {0}")]
    InvalidPolicy(String),

    /// rustls refused to build the client configuration.
    #[error("Failed to build TLS client configuration: {0}")]
    ConfigBuild(String),
}
