use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use bankid_rp::{utils::certificates::CERTS_DIR, CertificateResolver};
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, PKCS_ECDSA_P256_SHA256,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tempfile::TempDir;
use time::{Duration, OffsetDateTime};

pub const TEST_ROOT_CN: &str = "BankID SSL Root Certification Authority TEST";
pub const TEST_HOST: &str = "appapi.test.bankid.com";
pub const TEST_ANCHOR_FILE: &str = "appapi.test.bankid.com.pem";

/// Ephemeral CA plus an installation root whose `certs/` directory tests can
/// populate.
pub struct TestPki {
    temp_dir: TempDir,
    pub ca_cert: Certificate,
    pub ca_key: KeyPair,
}

impl TestPki {
    /// CA whose subject common name is `common_name`.
    pub fn new(common_name: &str) -> anyhow::Result<Self> {
        let mut params = CertificateParams::new(Vec::<String>::new()).context("ca params")?;
        params.distinguished_name.push(DnType::CommonName, common_name);
        params.distinguished_name.push(DnType::OrganizationName, "Finansiell ID-Teknik BID AB");
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);

        let ca_key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).context("ca key")?;
        let ca_cert = params.self_signed(&ca_key).context("self-sign ca")?;

        let temp_dir = TempDir::new().context("create temp dir")?;
        fs::create_dir(temp_dir.path().join(CERTS_DIR)).context("create certs dir")?;

        Ok(Self { temp_dir, ca_cert, ca_key })
    }

    pub fn resolver(&self) -> CertificateResolver {
        CertificateResolver::new(self.temp_dir.path())
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn certs_path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(CERTS_DIR).join(name)
    }

    /// Leaf certificate for `common_name`, signed by the CA.
    pub fn issue(
        &self,
        common_name: &str,
        dns_names: &[&str],
        not_after: OffsetDateTime,
    ) -> anyhow::Result<(Certificate, KeyPair)> {
        let names = dns_names.iter().map(|name| name.to_string()).collect::<Vec<_>>();
        let mut params = CertificateParams::new(names).context("leaf params")?;
        params.distinguished_name.push(DnType::CommonName, common_name);
        params.not_before = not_after.min(OffsetDateTime::now_utc()) - Duration::days(30);
        params.not_after = not_after;
        params.extended_key_usages = if dns_names.is_empty() {
            vec![ExtendedKeyUsagePurpose::ClientAuth]
        } else {
            vec![ExtendedKeyUsagePurpose::ServerAuth]
        };

        let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).context("leaf key")?;
        let cert = params.signed_by(&key, &self.ca_cert, &self.ca_key).context("sign leaf")?;
        Ok((cert, key))
    }

    /// Leaf for `host` followed by the CA, as a server would present it.
    pub fn server_chain(
        &self,
        host: &str,
    ) -> anyhow::Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
        let (cert, key) = self.issue(host, &[host], in_days(365))?;
        let chain = vec![cert.der().clone(), self.ca_cert.der().clone()];
        let key = PrivateKeyDer::from(PrivatePkcs8KeyDer::from(key.serialize_der()));
        Ok((chain, key))
    }

    /// Server certificate for the test host.
    pub fn server_certificate(&self) -> anyhow::Result<Certificate> {
        let (cert, _) = self.issue(TEST_HOST, &[TEST_HOST], in_days(365))?;
        Ok(cert)
    }

    /// Write a combined certificate chain + key PEM into `certs/`.
    pub fn write_client_identity(
        &self,
        name: &str,
        not_after: OffsetDateTime,
    ) -> anyhow::Result<PathBuf> {
        let (cert, key) = self.issue("Test RP client", &[], not_after)?;
        let pem = format!("{}{}{}", cert.pem(), self.ca_cert.pem(), key.serialize_pem());
        self.write(name, pem)
    }

    /// Identity whose private key belongs to a different certificate.
    pub fn write_mismatched_identity(&self, name: &str) -> anyhow::Result<PathBuf> {
        let (cert, _) = self.issue("Test RP client", &[], in_days(365))?;
        let other = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).context("other key")?;
        self.write(name, format!("{}{}", cert.pem(), other.serialize_pem()))
    }

    /// The CA certificate as the environment's trust anchor.
    pub fn write_trust_anchor(&self, name: &str) -> anyhow::Result<PathBuf> {
        self.write(name, self.ca_cert.pem())
    }

    pub fn write<C: AsRef<[u8]>>(&self, name: &str, contents: C) -> anyhow::Result<PathBuf> {
        let path = self.certs_path(name);
        fs::write(&path, contents).with_context(|| format!("write {name}"))?;
        Ok(path)
    }
}

pub fn in_days(days: i64) -> OffsetDateTime {
    OffsetDateTime::now_utc() + Duration::days(days)
}
