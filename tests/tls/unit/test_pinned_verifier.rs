use std::sync::Arc;

use bankid_rp::{
    config::{tls::MIN_VERIFY_DEPTH, Environment},
    transport::{build_client_config, chain_presents_identity, PinnedPeerVerifier},
    utils::{load_client_identity, load_trust_anchor},
    TlsError, TransportSecurityPolicy,
};
use rustls::{
    client::{danger::ServerCertVerifier, WebPkiServerVerifier},
    pki_types::{CertificateDer, ServerName, UnixTime},
};

use crate::tls::support::{in_days, TestPki, TEST_ANCHOR_FILE, TEST_HOST, TEST_ROOT_CN};

fn verifier_for(pki: &TestPki, identity: &str) -> PinnedPeerVerifier {
    let anchor = pki.write_trust_anchor(TEST_ANCHOR_FILE).expect("write anchor");
    let roots = load_trust_anchor(&anchor).expect("load anchor");
    let policy = TransportSecurityPolicy::for_profile(Environment::Test.profile(), &anchor);

    let inner = WebPkiServerVerifier::builder_with_provider(
        Arc::new(roots),
        Arc::new(policy.crypto_provider()),
    )
    .build()
    .expect("build webpki verifier");

    PinnedPeerVerifier::new(inner, identity.to_string(), MIN_VERIFY_DEPTH)
}

fn server_name() -> ServerName<'static> {
    ServerName::try_from(TEST_HOST).expect("valid dns name")
}

#[test]
fn accepts_chain_presenting_expected_authority() {
    let pki = TestPki::new(TEST_ROOT_CN).expect("create pki");
    let server = pki.server_certificate().expect("server cert");
    let verifier = verifier_for(&pki, TEST_ROOT_CN);

    let result = verifier.verify_server_cert(
        server.der(),
        &[pki.ca_cert.der().clone()],
        &server_name(),
        &[],
        UnixTime::now(),
    );
    assert!(result.is_ok(), "expected pinned chain to verify: {result:?}");
}

#[test]
fn issuer_name_alone_does_not_satisfy_identity() {
    let pki = TestPki::new(TEST_ROOT_CN).expect("create pki");
    let server = pki.server_certificate().expect("server cert");
    let verifier = verifier_for(&pki, TEST_ROOT_CN);

    // the leaf is issued by the pinned authority but the chain never presents it
    let result =
        verifier.verify_server_cert(server.der(), &[], &server_name(), &[], UnixTime::now());
    assert!(result.is_err());
}

#[test]
fn rejects_chain_without_expected_identity() {
    let pki = TestPki::new("Some Other Root CA").expect("create pki");
    let server = pki.server_certificate().expect("server cert");
    let verifier = verifier_for(&pki, TEST_ROOT_CN);

    let result =
        verifier.verify_server_cert(server.der(), &[], &server_name(), &[], UnixTime::now());
    assert!(result.is_err());
}

#[test]
fn identity_match_is_exact() {
    let pki = TestPki::new(TEST_ROOT_CN).expect("create pki");
    let server = pki.server_certificate().expect("server cert");

    // production identity is a prefix of the test identity and must not match
    let verifier = verifier_for(&pki, "BankID SSL Root Certification Authority");
    let result = verifier.verify_server_cert(
        server.der(),
        &[pki.ca_cert.der().clone()],
        &server_name(),
        &[],
        UnixTime::now(),
    );
    assert!(result.is_err());
}

#[test]
fn rejects_wrong_host_even_with_pinned_identity() {
    let pki = TestPki::new(TEST_ROOT_CN).expect("create pki");
    let server = pki.server_certificate().expect("server cert");
    let verifier = verifier_for(&pki, TEST_ROOT_CN);

    let other = ServerName::try_from("appapi.bankid.com").expect("valid dns name");
    let result = verifier.verify_server_cert(
        server.der(),
        &[pki.ca_cert.der().clone()],
        &other,
        &[],
        UnixTime::now(),
    );
    assert!(result.is_err());
}

#[test]
fn rejects_chain_deeper_than_verify_depth() {
    let pki = TestPki::new(TEST_ROOT_CN).expect("create pki");
    let server = pki.server_certificate().expect("server cert");
    let verifier = verifier_for(&pki, TEST_ROOT_CN);

    let intermediates: Vec<CertificateDer<'static>> =
        (0..=MIN_VERIFY_DEPTH).map(|_| pki.ca_cert.der().clone()).collect();
    let result = verifier.verify_server_cert(
        server.der(),
        &intermediates,
        &server_name(),
        &[],
        UnixTime::now(),
    );
    assert!(result.is_err());
}

#[test]
fn identity_is_matched_on_subject_names() {
    let pki = TestPki::new(TEST_ROOT_CN).expect("create pki");
    let server = pki.server_certificate().expect("server cert");

    assert!(chain_presents_identity([server.der()], TEST_HOST));
    assert!(!chain_presents_identity([server.der()], TEST_ROOT_CN));
    assert!(chain_presents_identity([server.der(), pki.ca_cert.der()], TEST_ROOT_CN));
    assert!(!chain_presents_identity(
        [server.der(), pki.ca_cert.der()],
        "BankID SSL Root Certification Authority"
    ));

    let garbage = CertificateDer::from(vec![0x30, 0x03, 0x02, 0x01, 0x00]);
    assert!(!chain_presents_identity([&garbage], TEST_ROOT_CN));
}

#[test]
fn client_config_presents_identity_with_sni() {
    let pki = TestPki::new(TEST_ROOT_CN).expect("create pki");
    let identity_path = pki.write_client_identity("rp-test.pem", in_days(60)).expect("identity");
    let anchor = pki.write_trust_anchor(TEST_ANCHOR_FILE).expect("anchor");

    let identity = load_client_identity(&identity_path).expect("load identity");
    let policy = TransportSecurityPolicy::for_profile(Environment::Test.profile(), &anchor);

    let config = build_client_config(&policy, &identity).expect("client config");
    assert!(config.enable_sni);
}

#[test]
fn client_config_requires_policy_trust_anchor() {
    let pki = TestPki::new(TEST_ROOT_CN).expect("create pki");
    let identity_path = pki.write_client_identity("rp-test.pem", in_days(60)).expect("identity");
    let identity = load_client_identity(&identity_path).expect("load identity");

    let policy = TransportSecurityPolicy::for_profile(
        Environment::Test.profile(),
        &pki.certs_path(TEST_ANCHOR_FILE),
    );
    let err = build_client_config(&policy, &identity).expect_err("anchor file absent");
    assert!(matches!(err, TlsError::CertificateReadError { .. }));
}

#[test]
fn client_config_rejects_weakened_policy() {
    let pki = TestPki::new(TEST_ROOT_CN).expect("create pki");
    let identity_path = pki.write_client_identity("rp-test.pem", in_days(60)).expect("identity");
    let anchor = pki.write_trust_anchor(TEST_ANCHOR_FILE).expect("anchor");

    let identity = load_client_identity(&identity_path).expect("load identity");
    let policy = TransportSecurityPolicy {
        verify_depth: 1,
        ..TransportSecurityPolicy::for_profile(Environment::Test.profile(), &anchor)
    };

    let err = build_client_config(&policy, &identity).expect_err("weak policy");
    assert!(matches!(err, TlsError::InvalidPolicy(_)));
}
