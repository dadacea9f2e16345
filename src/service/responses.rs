//! Remote results and their typed views.
//!
//! The service's answer is kept verbatim as a `serde_json::Value` tree; the
//! typed structs below are convenience views over it.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::Operation;
use crate::errors::{Error, Result};

/// Success value of one remote operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceResponse {
    operation: Operation,
    body: serde_json::Value,
}

impl ServiceResponse {
    pub fn new(operation: Operation, body: serde_json::Value) -> Self {
        Self { operation, body }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The remote structure, unmodified.
    pub fn value(&self) -> &serde_json::Value {
        &self.body
    }

    pub fn into_value(self) -> serde_json::Value {
        self.body
    }

    /// Deserialize the remote structure into `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            Error::protocol(format!("Unexpected {} response: {}", self.operation, e))
        })
    }

    /// View of an `Authenticate`/`Sign` answer.
    pub fn order(&self) -> Result<OrderResponse> {
        self.parse()
    }

    /// View of a `Collect` answer.
    pub fn collect_status(&self) -> Result<CollectResponse> {
        self.parse()
    }
}

/// Order started by `Authenticate` or `Sign`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_ref: String,
    #[serde(default)]
    pub auto_start_token: Option<String>,
}

/// Current state of an order as reported by `Collect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectResponse {
    pub progress_status: ProgressStatus,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub ocsp_response: Option<String>,
    #[serde(default)]
    pub user_info: Option<UserInfo>,
}

/// End user details returned with a completed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub personal_number: Option<String>,
    #[serde(default)]
    pub not_before: Option<String>,
    #[serde(default)]
    pub not_after: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

/// Order progress reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressStatus {
    OutstandingTransaction,
    NoClient,
    Started,
    UserSign,
    UserReq,
    Complete,
    #[serde(other)]
    Unknown,
}

impl ProgressStatus {
    pub fn is_complete(self) -> bool {
        matches!(self, ProgressStatus::Complete)
    }

    /// Still waiting on the end user; the caller should collect again later.
    pub fn is_pending(self) -> bool {
        !matches!(self, ProgressStatus::Complete | ProgressStatus::Unknown)
    }
}

/// `faultStatus` carried in the service's SOAP fault detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultStatus {
    InvalidParameters,
    AccessDeniedRp,
    AlreadyInProgress,
    ExpiredTransaction,
    UserCancel,
    ClientErr,
    CertificateErr,
    Cancelled,
    StartFailed,
    Retry,
    InternalError,
    #[serde(other)]
    Unknown,
}

impl FaultStatus {
    /// Map the wire code onto a status; unrecognized codes become `Unknown`.
    pub fn from_code(code: &str) -> Self {
        serde_json::from_value(serde_json::Value::String(code.trim().to_string()))
            .unwrap_or(FaultStatus::Unknown)
    }

    /// True for faults the service documents as worth retrying later.
    pub fn is_retryable(self) -> bool {
        matches!(self, FaultStatus::Retry | FaultStatus::InternalError)
    }
}
