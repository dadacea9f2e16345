//! # bankid-rp
//!
//! Relying-party client for the BankID identification and signing service.
//! A [`BankIdClient`] holds one mutually authenticated, certificate-pinned TLS
//! session with the service and exposes its three operations:
//!
//! - `authenticate`: start an identification order for a personal number
//! - `sign`: ask the user to sign a payload
//! - `collect`: poll an order once
//!
//! ## Architecture
//!
//! ```text
//! BankIdClient → Transport (SOAP) → pinned rustls session → relying-party API
//!      ↓                ↓
//! CertificateResolver   EnvironmentProfile / TransportSecurityPolicy
//! ```
//!
//! Every operation returns a [`Result`]; callers tell "not configured",
//! transport failures and remote rejections apart through [`Error`].
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use bankid_rp::{BankIdClient, CertificateResolver, Environment, ExtraOptions, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let resolver = CertificateResolver::default();
//!     let client = BankIdClient::connect(&resolver, "rp-test.pem", Environment::Test).await;
//!
//!     let order = client
//!         .sign("199001011234", b"Pay $10", b"", ExtraOptions::new())
//!         .await?
//!         .order()?;
//!     println!("order {}", order.order_ref);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod observability;
pub mod service;
pub mod transport;
pub mod utils;

// Re-export commonly used types and traits
pub use config::{ClientSettings, Environment, EnvironmentProfile, TransportSecurityPolicy};
pub use errors::{Error, Result, TlsError};
pub use observability::init_logging;
pub use service::{
    AuthenticateRequest, BankIdClient, CollectRequest, CollectResponse, ExtraOptions, FaultStatus,
    Operation, OrderResponse, ProgressStatus, RemoteRequest, ServiceResponse, SignRequest,
    UserInfo,
};
pub use transport::{SessionOptions, SoapTransport, Transport};
pub use utils::{normalize_text, CertificateResolver};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
