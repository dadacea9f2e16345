//! rustls client configuration for the pinned, mutually authenticated session.

use std::sync::Arc;

use rustls::{
    client::{
        danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
        WebPkiServerVerifier,
    },
    pki_types::{CertificateDer, ServerName, UnixTime},
    CertificateError, ClientConfig, DigitallySignedStruct, SignatureScheme,
};
use tracing::warn;
use x509_parser::prelude::*;

use crate::{
    config::TransportSecurityPolicy,
    errors::TlsError,
    utils::{load_trust_anchor, ClientIdentity},
};

/// Server verifier that runs standard WebPKI validation against the single
/// trust anchor and then requires a presented certificate whose subject is
/// the expected peer identity.
#[derive(Debug)]
pub struct PinnedPeerVerifier {
    inner: Arc<WebPkiServerVerifier>,
    peer_identity: String,
    verify_depth: usize,
}

impl PinnedPeerVerifier {
    pub fn new(inner: Arc<WebPkiServerVerifier>, peer_identity: String, verify_depth: usize) -> Self {
        Self { inner, peer_identity, verify_depth }
    }

    pub fn peer_identity(&self) -> &str {
        &self.peer_identity
    }
}

impl ServerCertVerifier for PinnedPeerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if intermediates.len() > self.verify_depth {
            warn!(
                presented = intermediates.len(),
                max_depth = self.verify_depth,
                "Server chain exceeds verification depth"
            );
            return Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ));
        }

        let verified = self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        )?;

        let chain = std::iter::once(end_entity).chain(intermediates.iter());
        if !chain_presents_identity(chain, &self.peer_identity) {
            warn!(expected = %self.peer_identity, "Server chain does not present the pinned identity");
            return Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ));
        }

        Ok(verified)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// True when the subject common name of any presented certificate equals
/// `identity` exactly. Unparseable certificates never match.
pub fn chain_presents_identity<'a, 'b: 'a, I>(chain: I, identity: &str) -> bool
where
    I: IntoIterator<Item = &'a CertificateDer<'b>>,
{
    chain.into_iter().any(|der| match X509Certificate::from_der(der.as_ref()) {
        Ok((_, cert)) => cert
            .subject()
            .iter_common_name()
            .filter_map(|attr| attr.as_str().ok())
            .any(|cn| cn == identity),
        Err(_) => false,
    })
}

/// Build the client configuration: only the policy's trust anchor file is
/// trusted, the restricted suites are offered, SNI is sent and the client
/// identity is presented when the server asks for it.
pub fn build_client_config(
    policy: &TransportSecurityPolicy,
    identity: &ClientIdentity,
) -> Result<ClientConfig, TlsError> {
    policy.validate()?;
    let roots = load_trust_anchor(&policy.trust_anchor_path)?;

    let provider = Arc::new(policy.crypto_provider());

    let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider.clone())
        .build()
        .map_err(|e| TlsError::ConfigBuild(format!("server verifier: {e}")))?;
    let verifier =
        PinnedPeerVerifier::new(inner, policy.peer_identity.clone(), policy.verify_depth);

    let mut config = ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])
        .map_err(|e| TlsError::ConfigBuild(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_client_auth_cert(identity.chain.clone(), identity.private_key.clone_key())
        .map_err(|e| TlsError::ConfigBuild(format!("client identity: {e}")))?;
    config.enable_sni = policy.enable_sni;

    Ok(config)
}
