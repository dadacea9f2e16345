//! # Observability
//!
//! Structured logging for the relying-party client.

pub mod logging;

pub use logging::init_logging;
