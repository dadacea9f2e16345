//! # Transport
//!
//! The secured SOAP session with the relying-party service. [`SoapTransport`]
//! owns the mutually authenticated HTTPS client; the [`Transport`] trait is
//! the seam the client facade calls through, so tests can substitute it.

pub mod soap;
pub mod tls;
pub mod xml;

pub use tls::{build_client_config, chain_presents_identity, PinnedPeerVerifier};

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::{
    config::{Environment, TransportSecurityPolicy},
    errors::{Error, Result, TlsError},
    service::{Operation, Parameters},
    utils::{load_client_identity, CertificateResolver},
};

/// One request/response exchange with the remote service.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Invoke `operation` with `params` and return the decoded result tree.
    async fn call(&self, operation: Operation, params: Parameters) -> Result<Value>;
}

/// Tunables applied when the session is established.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Upper bound for each remote call (None = wait for the service)
    pub request_timeout: Option<Duration>,
}

impl SessionOptions {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

/// SOAP over the pinned mTLS session.
#[derive(Debug, Clone)]
pub struct SoapTransport {
    http: reqwest::Client,
    endpoint: Url,
}

impl SoapTransport {
    /// Wrap an already configured HTTP client.
    pub fn new(http: reqwest::Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Resolve certificates, build the TLS session and load the service
    /// descriptor for `environment`.
    pub async fn establish(
        resolver: &CertificateResolver,
        cert_name: &str,
        environment: Environment,
        options: &SessionOptions,
    ) -> Result<Self> {
        let profile = environment.profile();

        let client_path = resolver
            .resolve(cert_name)
            .ok_or_else(|| TlsError::ClientCertificateNotFound { name: cert_name.to_string() })?;
        let anchor_path = resolver.resolve(profile.trust_anchor()).ok_or_else(|| {
            TlsError::TrustAnchorNotFound { name: profile.trust_anchor().to_string() }
        })?;

        let identity = load_client_identity(&client_path)?;

        info!(
            environment = %environment,
            subject = %identity.info.subject,
            not_after = %identity.info.not_after,
            trust_anchor = %anchor_path.display(),
            "Loaded client identity"
        );

        let policy = TransportSecurityPolicy::for_profile(profile, &anchor_path);
        let tls = tls::build_client_config(&policy, &identity)?;

        let endpoint = parse_url(profile.endpoint())?;
        let descriptor_url = parse_url(profile.descriptor_url())?;
        Self::connect(endpoint, &descriptor_url, tls, options).await
    }

    /// Build the HTTPS client from a finished TLS configuration and verify the
    /// service descriptor at `descriptor_url` over it.
    pub async fn connect(
        endpoint: Url,
        descriptor_url: &Url,
        tls: rustls::ClientConfig,
        options: &SessionOptions,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder().use_preconfigured_tls(tls).https_only(true);
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::session_with_source("Failed to build HTTPS client", Box::new(e)))?;

        let transport = Self::new(http, endpoint);
        transport.verify_descriptor(descriptor_url.as_str()).await?;
        Ok(transport)
    }

    /// Fetch the service descriptor and require every client operation in it.
    pub async fn verify_descriptor(&self, descriptor_url: &str) -> Result<()> {
        let response = self
            .http
            .get(descriptor_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| {
                Error::session_with_source(
                    format!("Failed to load service descriptor from {descriptor_url}"),
                    Box::new(e),
                )
            })?;

        let document = response.text().await.map_err(|e| {
            Error::session_with_source("Failed to read service descriptor", Box::new(e))
        })?;

        let declared = soap::descriptor_operations(&document)
            .map_err(|e| Error::session_with_source("Invalid service descriptor", Box::new(e)))?;

        let missing: Vec<&str> = Operation::ALL
            .iter()
            .map(|op| op.name())
            .filter(|name| !declared.contains(*name))
            .collect();
        if !missing.is_empty() {
            return Err(Error::session(format!(
                "Service descriptor does not declare: {}",
                missing.join(", ")
            )));
        }

        debug!(url = descriptor_url, "Service descriptor verified");
        Ok(())
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::config(format!("Invalid URL '{raw}': {e}")))
}

#[async_trait]
impl Transport for SoapTransport {
    async fn call(&self, operation: Operation, params: Parameters) -> Result<Value> {
        let envelope = soap::encode_request(operation, &params)?;

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, soap::CONTENT_TYPE)
            .header("SOAPAction", "\"\"")
            .body(envelope)
            .send()
            .await
            .map_err(|e| Error::Transport {
                message: format!("{operation} request failed: {e}"),
                source: Some(e),
            })?;

        let status = response.status();
        let body = response.text().await?;
        let decoded = soap::decode_response(operation, &body);

        if status.is_success() {
            return decoded;
        }
        match decoded {
            Err(fault @ Error::RemoteFault { .. }) => Err(fault),
            _ => Err(Error::transport(format!("{operation} returned HTTP {status}"))),
        }
    }
}
