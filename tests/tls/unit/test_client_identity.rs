use bankid_rp::{
    utils::{load_client_identity, load_trust_anchor},
    TlsError,
};
use chrono::Utc;

use crate::tls::support::{in_days, TestPki, TEST_ANCHOR_FILE, TEST_ROOT_CN};

#[test]
fn loads_combined_identity_pem() {
    let pki = TestPki::new(TEST_ROOT_CN).expect("create pki");
    let path = pki.write_client_identity("rp-test.pem", in_days(60)).expect("write identity");

    let identity = load_client_identity(&path).expect("load identity");
    assert_eq!(identity.chain.len(), 2);
    assert!(identity.info.subject.contains("CN=Test RP client"));
    assert!(identity.info.issuer.contains(TEST_ROOT_CN));
    assert!(identity.info.not_after > Utc::now());
    assert_eq!(identity.path, path);
}

#[test]
fn rejects_expired_identity() {
    let pki = TestPki::new(TEST_ROOT_CN).expect("create pki");
    let path = pki.write_client_identity("expired.pem", in_days(-1)).expect("write identity");

    let err = load_client_identity(&path).expect_err("expired");
    assert!(matches!(err, TlsError::CertificateExpired { .. }));
    assert!(format!("{err}").contains("expired"));
}

#[test]
fn rejects_mismatched_key() {
    let pki = TestPki::new(TEST_ROOT_CN).expect("create pki");
    let path = pki.write_mismatched_identity("mismatch.pem").expect("write identity");

    let err = load_client_identity(&path).expect_err("mismatch");
    assert!(format!("{err}").contains("do not match"));
}

#[test]
fn rejects_certificate_without_key() {
    let pki = TestPki::new(TEST_ROOT_CN).expect("create pki");
    let path = pki.write_trust_anchor("cert-only.pem").expect("write cert");

    let err = load_client_identity(&path).expect_err("no key");
    assert!(matches!(err, TlsError::InvalidPrivateKey { .. }));
}

#[test]
fn trust_anchor_store_holds_only_the_anchor() {
    let pki = TestPki::new(TEST_ROOT_CN).expect("create pki");
    let path = pki.write_trust_anchor(TEST_ANCHOR_FILE).expect("write anchor");

    let roots = load_trust_anchor(&path).expect("load anchor");
    assert_eq!(roots.len(), 1);
}
