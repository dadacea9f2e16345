//! Deployment targets of the relying-party API.
//!
//! Each [`Environment`] maps to exactly one immutable [`EnvironmentProfile`].
//! Profiles cannot be built outside this module, so an endpoint can never be
//! paired with another environment's trust anchor or peer identity.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Marker carried by the test environment's expected peer identity.
pub const TEST_MARKER: &str = "TEST";

/// Closed set of deployment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Test,
}

/// Values bound to one environment.
#[derive(Debug, PartialEq, Eq)]
pub struct EnvironmentProfile {
    endpoint: &'static str,
    descriptor_url: &'static str,
    trust_anchor: &'static str,
    peer_identity: &'static str,
}

static PRODUCTION: EnvironmentProfile = EnvironmentProfile {
    endpoint: "https://appapi.bankid.com/rp/v4",
    descriptor_url: "https://appapi.bankid.com/rp/v4?wsdl",
    trust_anchor: "appapi.bankid.com.pem",
    peer_identity: "BankID SSL Root Certification Authority",
};

static TEST: EnvironmentProfile = EnvironmentProfile {
    endpoint: "https://appapi.test.bankid.com/rp/v4",
    descriptor_url: "https://appapi.test.bankid.com/rp/v4?wsdl",
    trust_anchor: "appapi.test.bankid.com.pem",
    peer_identity: "BankID SSL Root Certification Authority TEST",
};

impl Environment {
    /// Map the legacy boolean test flag onto an environment.
    pub fn from_test_flag(test: bool) -> Self {
        if test {
            Environment::Test
        } else {
            Environment::Production
        }
    }

    /// The immutable profile for this environment.
    pub fn profile(self) -> &'static EnvironmentProfile {
        match self {
            Environment::Production => &PRODUCTION,
            Environment::Test => &TEST,
        }
    }

    pub fn is_test(self) -> bool {
        matches!(self, Environment::Test)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" | "live" => Ok(Environment::Production),
            "test" | "testing" => Ok(Environment::Test),
            other => Err(Error::config(format!("Unknown environment '{other}'"))),
        }
    }
}

impl EnvironmentProfile {
    /// SOAP endpoint the operations are posted to.
    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    /// Location of the service descriptor fetched at session establishment.
    pub fn descriptor_url(&self) -> &'static str {
        self.descriptor_url
    }

    /// File name of the trust anchor, resolved through the certificate resolver.
    pub fn trust_anchor(&self) -> &'static str {
        self.trust_anchor
    }

    /// Name the server's certificate chain must present.
    pub fn peer_identity(&self) -> &'static str {
        self.peer_identity
    }
}
