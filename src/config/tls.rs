use std::path::{Path, PathBuf};

use rustls::{crypto::CryptoProvider, SupportedCipherSuite};

use crate::{config::EnvironmentProfile, errors::TlsError};

/// Lower bound for the certificate chain verification depth.
pub const MIN_VERIFY_DEPTH: usize = 5;

/// Suite name fragments that must never appear in the negotiated cipher list.
const FORBIDDEN_SUITE_MARKERS: &[&str] = &["EXPORT", "NULL", "ANON", "RC4", "DES", "MD5"];

/// Mandatory TLS properties for a session with the relying-party API.
#[derive(Debug, Clone)]
pub struct TransportSecurityPolicy {
    pub verify_peer: bool,
    pub verify_depth: usize,
    /// The only certificate trusted when validating the server.
    pub trust_anchor_path: PathBuf,
    /// Name that must appear in the server's presented chain.
    pub peer_identity: String,
    pub disable_compression: bool,
    pub enable_sni: bool,
    pub cipher_suites: Vec<SupportedCipherSuite>,
}

impl TransportSecurityPolicy {
    /// Build the policy for a profile whose trust anchor resolved to `trust_anchor_path`.
    pub fn for_profile(profile: &EnvironmentProfile, trust_anchor_path: &Path) -> Self {
        Self {
            verify_peer: true,
            verify_depth: MIN_VERIFY_DEPTH,
            trust_anchor_path: trust_anchor_path.to_path_buf(),
            peer_identity: profile.peer_identity().to_string(),
            disable_compression: true,
            enable_sni: true,
            cipher_suites: allowed_cipher_suites(),
        }
    }

    /// Reject any policy that weakens the mandatory properties.
    pub fn validate(&self) -> Result<(), TlsError> {
        if !self.verify_peer {
            return Err(TlsError::InvalidPolicy("peer verification must be enabled".into()));
        }
        if self.verify_depth < MIN_VERIFY_DEPTH {
            return Err(TlsError::InvalidPolicy(format!(
                "verification depth {} is below the minimum of {MIN_VERIFY_DEPTH}",
                self.verify_depth
            )));
        }
        if self.peer_identity.trim().is_empty() {
            return Err(TlsError::InvalidPolicy("expected peer identity is empty".into()));
        }
        if !self.disable_compression {
            return Err(TlsError::InvalidPolicy("TLS compression must be disabled".into()));
        }
        if !self.enable_sni {
            return Err(TlsError::InvalidPolicy("SNI must be enabled".into()));
        }
        if self.cipher_suites.is_empty() {
            return Err(TlsError::InvalidPolicy("cipher suite list is empty".into()));
        }
        if let Some(suite) = self.cipher_suites.iter().find(|suite| is_forbidden(suite)) {
            return Err(TlsError::InvalidPolicy(format!(
                "cipher suite {:?} is not allowed",
                suite.suite()
            )));
        }
        Ok(())
    }

    /// ring provider restricted to the policy's cipher suites.
    pub fn crypto_provider(&self) -> CryptoProvider {
        CryptoProvider {
            cipher_suites: self.cipher_suites.clone(),
            ..rustls::crypto::ring::default_provider()
        }
    }
}

/// TLS 1.3 AEAD suites and TLS 1.2 ECDHE suites with AEAD ciphers.
pub fn allowed_cipher_suites() -> Vec<SupportedCipherSuite> {
    use rustls::crypto::ring::cipher_suite;

    vec![
        cipher_suite::TLS13_AES_256_GCM_SHA384,
        cipher_suite::TLS13_AES_128_GCM_SHA256,
        cipher_suite::TLS13_CHACHA20_POLY1305_SHA256,
        cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
        cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
        cipher_suite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
        cipher_suite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
        cipher_suite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        cipher_suite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    ]
}

fn is_forbidden(suite: &SupportedCipherSuite) -> bool {
    let name = format!("{:?}", suite.suite()).to_uppercase();
    FORBIDDEN_SUITE_MARKERS.iter().any(|marker| name.contains(marker))
}
