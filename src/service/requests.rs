//! Typed requests for the three remote operations.
//!
//! Caller-supplied extension parameters are merged first; the fixed fields of
//! each request are written afterwards and therefore always win.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::encode_payload;

pub const PERSONAL_NUMBER_KEY: &str = "personalNumber";
pub const USER_VISIBLE_DATA_KEY: &str = "userVisibleData";
pub const USER_NON_VISIBLE_DATA_KEY: &str = "userNonVisibleData";
pub const ORDER_REF_KEY: &str = "orderRef";

/// Named parameters sent to the remote endpoint.
pub type Parameters = serde_json::Map<String, Value>;

/// Forward-compatible extension parameters supplied by the caller.
pub type ExtraOptions = serde_json::Map<String, Value>;

/// Remote operations exposed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Authenticate,
    Sign,
    Collect,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Operation::Authenticate, Operation::Sign, Operation::Collect];

    /// Operation name as declared by the service descriptor.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Authenticate => "Authenticate",
            Operation::Sign => "Sign",
            Operation::Collect => "Collect",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A request that maps onto exactly one remote call.
pub trait RemoteRequest {
    const OPERATION: Operation;

    fn into_parameters(self) -> Parameters;
}

/// Start an identification order for a personal number.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticateRequest {
    pub personal_number: String,
    pub options: ExtraOptions,
}

impl AuthenticateRequest {
    pub fn new<S: Into<String>>(personal_number: S) -> Self {
        Self { personal_number: personal_number.into(), options: ExtraOptions::new() }
    }

    pub fn with_options(mut self, options: ExtraOptions) -> Self {
        self.options = options;
        self
    }
}

impl RemoteRequest for AuthenticateRequest {
    const OPERATION: Operation = Operation::Authenticate;

    fn into_parameters(self) -> Parameters {
        let mut params = self.options;
        params.insert(PERSONAL_NUMBER_KEY.to_string(), Value::String(self.personal_number));
        params
    }
}

/// Start a signing order. Both payloads are raw bytes; encoding happens when
/// the parameters are built.
#[derive(Debug, Clone, PartialEq)]
pub struct SignRequest {
    pub personal_number: String,
    pub user_visible_data: Vec<u8>,
    pub user_non_visible_data: Vec<u8>,
    pub options: ExtraOptions,
}

impl SignRequest {
    pub fn new<S: Into<String>, V: Into<Vec<u8>>>(personal_number: S, visible_data: V) -> Self {
        Self {
            personal_number: personal_number.into(),
            user_visible_data: visible_data.into(),
            user_non_visible_data: Vec::new(),
            options: ExtraOptions::new(),
        }
    }

    pub fn with_hidden_data<H: Into<Vec<u8>>>(mut self, hidden_data: H) -> Self {
        self.user_non_visible_data = hidden_data.into();
        self
    }

    pub fn with_options(mut self, options: ExtraOptions) -> Self {
        self.options = options;
        self
    }
}

impl RemoteRequest for SignRequest {
    const OPERATION: Operation = Operation::Sign;

    fn into_parameters(self) -> Parameters {
        let mut params = self.options;
        params.insert(PERSONAL_NUMBER_KEY.to_string(), Value::String(self.personal_number));
        params.insert(
            USER_VISIBLE_DATA_KEY.to_string(),
            Value::String(encode_payload(&self.user_visible_data)),
        );
        params.insert(
            USER_NON_VISIBLE_DATA_KEY.to_string(),
            Value::String(encode_payload(&self.user_non_visible_data)),
        );
        params
    }
}

/// Poll an order once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectRequest {
    pub order_ref: String,
}

impl CollectRequest {
    pub fn new<S: Into<String>>(order_ref: S) -> Self {
        Self { order_ref: order_ref.into() }
    }
}

impl RemoteRequest for CollectRequest {
    const OPERATION: Operation = Operation::Collect;

    fn into_parameters(self) -> Parameters {
        let mut params = Parameters::new();
        params.insert(ORDER_REF_KEY.to_string(), Value::String(self.order_ref));
        params
    }
}
