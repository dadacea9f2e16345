//! # Service Client
//!
//! [`BankIdClient`] owns the secured session (or the reason it could not be
//! established) and maps each operation onto exactly one remote call.
//!
//! ```rust,no_run
//! use bankid_rp::{BankIdClient, CertificateResolver, Environment, ExtraOptions};
//!
//! # async fn run() -> bankid_rp::Result<()> {
//! let resolver = CertificateResolver::default();
//! let client = BankIdClient::try_connect(&resolver, "rp-test.pem", Environment::Test).await?;
//!
//! let order = client.authenticate("199001011234", ExtraOptions::new()).await?.order()?;
//! let status = client.collect(&order.order_ref).await?.collect_status()?;
//! println!("{:?}", status.progress_status);
//! # Ok(())
//! # }
//! ```

pub mod requests;
pub mod responses;

pub use requests::{
    AuthenticateRequest, CollectRequest, ExtraOptions, Operation, Parameters, RemoteRequest,
    SignRequest, ORDER_REF_KEY, PERSONAL_NUMBER_KEY, USER_NON_VISIBLE_DATA_KEY,
    USER_VISIBLE_DATA_KEY,
};
pub use responses::{
    CollectResponse, FaultStatus, OrderResponse, ProgressStatus, ServiceResponse, UserInfo,
};

use std::{fmt, sync::Arc, time::Instant};

use tracing::{info, warn, Instrument};

use crate::{
    config::{ClientSettings, Environment, EnvironmentProfile},
    errors::{Error, Result},
    transport::{SessionOptions, SoapTransport, Transport},
    utils::{mask_personal_number, CertificateResolver},
};

enum SessionState {
    Ready(Arc<dyn Transport>),
    Failed(Error),
}

/// Client for the relying-party service, bound to one environment for its
/// whole lifetime.
pub struct BankIdClient {
    environment: Environment,
    state: SessionState,
}

impl fmt::Debug for BankIdClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("BankIdClient");
        debug.field("environment", &self.environment);
        match &self.state {
            SessionState::Ready(transport) => debug.field("transport", transport),
            SessionState::Failed(error) => debug.field("session_error", &error.to_string()),
        };
        debug.finish()
    }
}

impl BankIdClient {
    /// Establish the session. A failure does not abort construction: the
    /// client keeps it and every operation returns [`Error::NotConfigured`].
    pub async fn connect(
        resolver: &CertificateResolver,
        cert_name: &str,
        environment: Environment,
    ) -> Self {
        Self::connect_with_options(resolver, cert_name, environment, &SessionOptions::default())
            .await
    }

    pub async fn connect_with_options(
        resolver: &CertificateResolver,
        cert_name: &str,
        environment: Environment,
        options: &SessionOptions,
    ) -> Self {
        match SoapTransport::establish(resolver, cert_name, environment, options).await {
            Ok(transport) => {
                info!(environment = %environment, endpoint = %transport.endpoint(), "Session established");
                Self::with_transport(environment, Arc::new(transport))
            }
            Err(error) => {
                warn!(
                    environment = %environment,
                    error_kind = error.kind(),
                    error = %error,
                    "Session establishment failed; operations will be refused"
                );
                Self { environment, state: SessionState::Failed(error) }
            }
        }
    }

    /// Establish the session and return the failure directly.
    pub async fn try_connect(
        resolver: &CertificateResolver,
        cert_name: &str,
        environment: Environment,
    ) -> Result<Self> {
        Self::try_connect_with_options(resolver, cert_name, environment, &SessionOptions::default())
            .await
    }

    pub async fn try_connect_with_options(
        resolver: &CertificateResolver,
        cert_name: &str,
        environment: Environment,
        options: &SessionOptions,
    ) -> Result<Self> {
        let transport = SoapTransport::establish(resolver, cert_name, environment, options).await?;
        info!(environment = %environment, endpoint = %transport.endpoint(), "Session established");
        Ok(Self::with_transport(environment, Arc::new(transport)))
    }

    /// Build a client from validated settings.
    pub async fn from_settings(settings: &ClientSettings) -> Self {
        if let Err(error) = settings.validate() {
            return Self { environment: settings.environment, state: SessionState::Failed(error) };
        }

        let options = SessionOptions { request_timeout: settings.request_timeout() };
        Self::connect_with_options(
            &settings.resolver(),
            &settings.cert_name,
            settings.environment,
            &options,
        )
        .await
    }

    /// Client over an existing transport.
    pub fn with_transport(environment: Environment, transport: Arc<dyn Transport>) -> Self {
        Self { environment, state: SessionState::Ready(transport) }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn profile(&self) -> &'static EnvironmentProfile {
        self.environment.profile()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    /// Why the session could not be established, if it could not.
    pub fn session_error(&self) -> Option<&Error> {
        match &self.state {
            SessionState::Ready(_) => None,
            SessionState::Failed(error) => Some(error),
        }
    }

    /// Start an identification order. `personalNumber` overrides any entry of
    /// the same name in `options`.
    pub async fn authenticate(
        &self,
        personal_number: &str,
        options: ExtraOptions,
    ) -> Result<ServiceResponse> {
        let span = crate::rp_span!(
            Operation::Authenticate,
            self.environment,
            personal_number = %mask_personal_number(personal_number)
        );
        let request = AuthenticateRequest::new(personal_number).with_options(options);
        self.dispatch(request).instrument(span).await
    }

    /// Start a signing order. Both payloads are base64-encoded independently;
    /// empty hidden data is still sent.
    pub async fn sign(
        &self,
        personal_number: &str,
        visible_data: &[u8],
        hidden_data: &[u8],
        options: ExtraOptions,
    ) -> Result<ServiceResponse> {
        let span = crate::rp_span!(
            Operation::Sign,
            self.environment,
            personal_number = %mask_personal_number(personal_number),
            visible_bytes = visible_data.len(),
            hidden_bytes = hidden_data.len()
        );
        let request = SignRequest::new(personal_number, visible_data)
            .with_hidden_data(hidden_data)
            .with_options(options);
        self.dispatch(request).instrument(span).await
    }

    /// [`sign`](Self::sign) without hidden data.
    pub async fn sign_visible(
        &self,
        personal_number: &str,
        visible_data: &[u8],
        options: ExtraOptions,
    ) -> Result<ServiceResponse> {
        self.sign(personal_number, visible_data, &[], options).await
    }

    /// Poll an order once.
    pub async fn collect(&self, order_ref: &str) -> Result<ServiceResponse> {
        let span = crate::rp_span!(Operation::Collect, self.environment);
        self.dispatch(CollectRequest::new(order_ref)).instrument(span).await
    }

    /// Send any typed request.
    pub async fn execute<R: RemoteRequest>(&self, request: R) -> Result<ServiceResponse> {
        let span = crate::rp_span!(R::OPERATION, self.environment);
        self.dispatch(request).instrument(span).await
    }

    async fn dispatch<R: RemoteRequest>(&self, request: R) -> Result<ServiceResponse> {
        let transport = match &self.state {
            SessionState::Ready(transport) => transport,
            SessionState::Failed(error) => {
                warn!("Operation refused: session was not established");
                return Err(Error::NotConfigured(error.to_string()));
            }
        };

        let started = Instant::now();
        match transport.call(R::OPERATION, request.into_parameters()).await {
            Ok(body) => {
                info!(elapsed_ms = started.elapsed().as_millis() as u64, "Remote call completed");
                Ok(ServiceResponse::new(R::OPERATION, body))
            }
            Err(error) => {
                warn!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error_kind = error.kind(),
                    fault_status = ?error.fault_status(),
                    error = %error,
                    "Remote call failed"
                );
                Err(error)
            }
        }
    }
}
