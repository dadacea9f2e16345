use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::anyhow;
use chrono::{DateTime, TimeZone, Utc};
use ring::{
    rand::SystemRandom,
    signature::{
        EcdsaKeyPair, Ed25519KeyPair, KeyPair, RsaKeyPair, ECDSA_P256_SHA256_ASN1_SIGNING,
        ECDSA_P384_SHA384_ASN1_SIGNING,
    },
};
use rustls::{
    pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer},
    RootCertStore,
};
use x509_parser::prelude::*;

use crate::errors::TlsError;

/// Directory under the installation root holding certificate files.
pub const CERTS_DIR: &str = "certs";

/// Maps certificate file names to paths under `<root>/certs/`.
///
/// Lookups only check for existence; a missing file yields `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateResolver {
    root: PathBuf,
}

impl Default for CertificateResolver {
    /// Resolver rooted at the crate's installation directory.
    fn default() -> Self {
        Self::new(env!("CARGO_MANIFEST_DIR"))
    }
}

impl CertificateResolver {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn certs_dir(&self) -> PathBuf {
        self.root.join(CERTS_DIR)
    }

    /// Full path of `name` if it exists as a file in the certificate directory.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let path = self.certs_dir().join(name);
        if path.is_file() {
            Some(path)
        } else {
            None
        }
    }
}

/// Metadata extracted from the leaf certificate for logging and validation.
#[derive(Debug, Clone)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    pub serial_number: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// Client identity used for mutual authentication: certificate chain plus key
/// read from a single PEM file.
#[derive(Debug)]
pub struct ClientIdentity {
    pub path: PathBuf,
    pub chain: Vec<CertificateDer<'static>>,
    pub private_key: PrivateKeyDer<'static>,
    pub info: CertificateInfo,
}

/// Load and validate a combined certificate + private key PEM.
pub fn load_client_identity(path: &Path) -> Result<ClientIdentity, TlsError> {
    let bytes = fs::read(path)
        .map_err(|e| TlsError::CertificateReadError { path: path.to_path_buf(), source: e })?;

    let chain = read_certificates(&bytes, path)?;

    let private_key = PrivateKeyDer::from_pem_slice(&bytes).map_err(|err| {
        TlsError::InvalidPrivateKey { path: path.to_path_buf(), source: Some(anyhow!(err)) }
    })?;

    let parsed = parse_certificate_metadata(&chain[0], path)?;

    validate_certificate_dates(&parsed.info, path)?;
    enforce_public_key_match(&parsed.algorithm_oid, &parsed.public_key, &private_key, path)?;

    Ok(ClientIdentity { path: path.to_path_buf(), chain, private_key, info: parsed.info })
}

/// Load a trust anchor file into a root store containing nothing else.
pub fn load_trust_anchor(path: &Path) -> Result<RootCertStore, TlsError> {
    let bytes = fs::read(path)
        .map_err(|e| TlsError::CertificateReadError { path: path.to_path_buf(), source: e })?;

    let mut roots = RootCertStore::empty();
    for cert in read_certificates(&bytes, path)? {
        roots.add(cert).map_err(|err| TlsError::InvalidTrustAnchor {
            path: path.to_path_buf(),
            source: anyhow!(err),
        })?;
    }
    Ok(roots)
}

fn read_certificates(bytes: &[u8], path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let certs: Vec<CertificateDer<'static>> = CertificateDer::pem_slice_iter(bytes)
        .map(|result| {
            result.map_err(|err| TlsError::InvalidCertificatePem {
                path: path.to_path_buf(),
                source: anyhow!(err),
            })
        })
        .collect::<Result<_, _>>()?;

    if certs.is_empty() {
        return Err(TlsError::EmptyCertificateChain { path: path.to_path_buf() });
    }
    Ok(certs)
}

struct ParsedCertificate {
    info: CertificateInfo,
    algorithm_oid: String,
    public_key: Vec<u8>,
}

fn parse_certificate_metadata(
    cert: &CertificateDer<'static>,
    path: &Path,
) -> Result<ParsedCertificate, TlsError> {
    let (_, parsed) = X509Certificate::from_der(cert.as_ref()).map_err(|err| {
        TlsError::CertificateMetadata { path: path.to_path_buf(), source: anyhow!("{err}") }
    })?;

    let validity = parsed.validity();
    let not_before = to_chrono(validity.not_before.timestamp(), path)?;
    let not_after = to_chrono(validity.not_after.timestamp(), path)?;

    let spki = parsed.public_key();

    Ok(ParsedCertificate {
        info: CertificateInfo {
            subject: parsed.subject().to_string(),
            issuer: parsed.issuer().to_string(),
            serial_number: format!("{:x}", parsed.serial),
            not_before,
            not_after,
        },
        algorithm_oid: spki.algorithm.algorithm.to_id_string(),
        public_key: spki.subject_public_key.data.to_vec(),
    })
}

fn to_chrono(timestamp: i64, path: &Path) -> Result<DateTime<Utc>, TlsError> {
    Utc.timestamp_opt(timestamp, 0).single().ok_or_else(|| TlsError::CertificateMetadata {
        path: path.to_path_buf(),
        source: anyhow!("failed to convert certificate time"),
    })
}

fn validate_certificate_dates(info: &CertificateInfo, path: &Path) -> Result<(), TlsError> {
    let now = Utc::now();
    if info.not_before > now {
        return Err(TlsError::CertificateNotYetValid {
            path: path.to_path_buf(),
            not_before: info.not_before,
        });
    }
    if info.not_after <= now {
        return Err(TlsError::CertificateExpired {
            path: path.to_path_buf(),
            not_after: info.not_after,
        });
    }
    Ok(())
}

fn enforce_public_key_match(
    algorithm_oid: &str,
    public_key: &[u8],
    private_key: &PrivateKeyDer<'static>,
    key_path: &Path,
) -> Result<(), TlsError> {
    let key_bytes = private_key.secret_der();

    match algorithm_oid {
        "1.3.101.112" => {
            let key_pair = Ed25519KeyPair::from_pkcs8_maybe_unchecked(key_bytes)
                .map_err(|_| TlsError::CertificateKeyMismatch)?;
            compare_bytes(key_pair.public_key().as_ref(), public_key)
        }
        "1.2.840.10045.2.1" => {
            let rng = SystemRandom::new();
            for alg in [&ECDSA_P256_SHA256_ASN1_SIGNING, &ECDSA_P384_SHA384_ASN1_SIGNING] {
                if let Ok(key_pair) = EcdsaKeyPair::from_pkcs8(alg, key_bytes, &rng) {
                    return compare_bytes(key_pair.public_key().as_ref(), public_key);
                }
            }
            Err(TlsError::CertificateKeyMismatch)
        }
        "1.2.840.113549.1.1.1" => {
            let key_pair = RsaKeyPair::from_pkcs8(key_bytes)
                .or_else(|_| RsaKeyPair::from_der(key_bytes))
                .map_err(|_| TlsError::InvalidPrivateKey {
                    path: key_path.to_path_buf(),
                    source: None,
                })?;
            // Both sides are the DER RSAPublicKey structure.
            compare_bytes(key_pair.public().as_ref(), public_key)
        }
        _ => Ok(()),
    }
}

fn compare_bytes(expected: &[u8], actual: &[u8]) -> Result<(), TlsError> {
    if expected == actual {
        Ok(())
    } else {
        Err(TlsError::CertificateKeyMismatch)
    }
}
