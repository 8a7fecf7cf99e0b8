//! End-to-end tests for the time-stamp authority engine
//!
//! Issues tokens with freshly generated identities and feeds them back
//! through the validator.

use chrono::{TimeZone, Utc};
use num_bigint::BigUint;
use p12_keystore::{KeyStore, KeyStoreEntry, PrivateKeyChain};
use tsa_signing::asn1::{MessageImprint, TimeStampReq};
use tsa_signing::{
    EmbeddedResources, Error, FixedClock, FixedSerialNumberGenerator, KeystoreConfig,
    RandomSerialNumberGenerator, SigningIdentity, SystemClock, TimeStampAuthority, TsaConfig,
};
use tsa_types::{FailureInfo, HashAlgorithm, ResponseStatus};

fn generate_key_and_certificate() -> (rcgen::KeyPair, rcgen::Certificate) {
    let key_pair = rcgen::KeyPair::generate().unwrap();
    let mut params = rcgen::CertificateParams::new(vec!["tsa.example.com".to_string()]).unwrap();
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, "Test TSA");
    let certificate = params.self_signed(&key_pair).unwrap();
    (key_pair, certificate)
}

fn test_identity() -> SigningIdentity {
    let (key_pair, certificate) = generate_key_and_certificate();
    SigningIdentity::from_key_and_certificates(
        &key_pair.serialize_der(),
        certificate.der().as_ref(),
        Vec::new(),
    )
    .unwrap()
}

fn authority(identity: SigningIdentity) -> TimeStampAuthority {
    TimeStampAuthority::with_identity(
        identity,
        &TsaConfig::default(),
        Box::new(RandomSerialNumberGenerator::new()),
        Box::new(SystemClock),
    )
    .unwrap()
}

fn request_bytes(algorithm: HashAlgorithm, digest: Vec<u8>, cert_req: bool) -> Vec<u8> {
    let imprint = MessageImprint::new(algorithm, digest).unwrap();
    TimeStampReq::new(imprint)
        .unwrap()
        .with_cert_req(cert_req)
        .to_der()
        .unwrap()
}

#[test]
fn granted_response_echoes_request_and_validates() {
    let tsa = authority(test_identity());
    let digest = vec![0xab; 32];
    let bytes = request_bytes(HashAlgorithm::Sha256, digest.clone(), true);

    let response = tsa.sign_request(&bytes).unwrap();
    assert_eq!(response.status, ResponseStatus::Granted);
    assert_eq!(response.failure_info, None);
    assert!(response.serial_number.is_some());
    assert_eq!(response.request.digest, digest);
    assert_eq!(response.request.encoded, bytes);

    let result = tsa.validate(&response.encoded).unwrap();
    assert!(result.signed_by_this_tsa, "{:?}", result.failure_reason);
    assert_eq!(result.status, ResponseStatus::Granted);
    assert_eq!(result.hash_algorithm, Some(HashAlgorithm::Sha256));
    assert_eq!(result.hash.as_deref(), Some(&digest[..]));
    assert_eq!(result.nonce, response.request.nonce);
    assert_eq!(result.serial_number, response.serial_number);
}

#[test]
fn p384_identity_signs_and_validates() {
    let key_pair = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P384_SHA384).unwrap();
    let mut params = rcgen::CertificateParams::new(vec!["tsa.example.com".to_string()]).unwrap();
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, "Test TSA P-384");
    let certificate = params.self_signed(&key_pair).unwrap();
    let identity = SigningIdentity::from_key_and_certificates(
        &key_pair.serialize_der(),
        certificate.der().as_ref(),
        Vec::new(),
    )
    .unwrap();

    let tsa = authority(identity);
    let bytes = request_bytes(HashAlgorithm::Sha512, vec![0x11; 64], true);

    let response = tsa.sign_request(&bytes).unwrap();
    let result = tsa.validate(&response.encoded).unwrap();
    assert!(result.signed_by_this_tsa, "{:?}", result.failure_reason);
}

#[test]
fn certificate_is_embedded_only_when_requested() {
    let tsa = authority(test_identity());

    let with_certificate = tsa
        .sign_request(&request_bytes(HashAlgorithm::Sha256, vec![0x01; 32], true))
        .unwrap();
    let result = tsa.validate(&with_certificate.encoded).unwrap();
    assert!(result.signing_certificate.is_some());

    let without_certificate = tsa
        .sign_request(&request_bytes(HashAlgorithm::Sha256, vec![0x02; 32], false))
        .unwrap();
    let result = tsa.validate(&without_certificate.encoded).unwrap();
    assert!(result.signing_certificate.is_none());
    assert!(result.signed_by_this_tsa, "{:?}", result.failure_reason);
}

#[test]
fn response_signed_by_different_key_is_not_valid_but_not_an_error() {
    let issuing_tsa = authority(test_identity());
    let other_tsa = authority(test_identity());

    let response = issuing_tsa
        .sign_request(&request_bytes(HashAlgorithm::Sha256, vec![0x42; 32], true))
        .unwrap();

    let result = other_tsa.validate(&response.encoded).unwrap();
    assert!(!result.signed_by_this_tsa);
    assert!(result.failure_reason.is_some());
}

#[test]
fn garbage_bytes_raise_invalid_response() {
    let tsa = authority(test_identity());

    let result = tsa.validate(&[0x00, 0x01, 0x02, 0x03]);
    assert!(matches!(result, Err(Error::InvalidResponse(_))));

    let truncated = {
        let response = tsa
            .sign_request(&request_bytes(HashAlgorithm::Sha256, vec![0x17; 32], true))
            .unwrap();
        response.encoded[..response.encoded.len() / 3].to_vec()
    };
    assert!(matches!(
        tsa.validate(&truncated),
        Err(Error::InvalidResponse(_))
    ));
}

#[test]
fn unaccepted_hash_algorithm_is_rejected() {
    // SHA-384 resolves in the registry but is outside the default
    // accepted set of SHA256 and SHA512
    let tsa = authority(test_identity());
    let bytes = request_bytes(HashAlgorithm::Sha384, vec![0x05; 48], false);

    let response = tsa.sign_request(&bytes).unwrap();
    assert_eq!(response.status, ResponseStatus::Rejection);
    assert_eq!(response.failure_info, Some(FailureInfo::BadAlgorithm));
    assert!(response.serial_number.is_none());
    assert!(response.status_text.is_some());

    let result = tsa.validate(&response.encoded).unwrap();
    assert!(!result.signed_by_this_tsa);
    assert_eq!(result.status, ResponseStatus::Rejection);
    assert_eq!(result.failure_info, Some(FailureInfo::BadAlgorithm));
    assert_eq!(result.serial_number, None);
}

#[test]
fn foreign_policy_is_rejected_with_unaccepted_policy() {
    let tsa = authority(test_identity());
    let imprint = MessageImprint::new(HashAlgorithm::Sha256, vec![0x06; 32]).unwrap();
    let bytes = TimeStampReq::new_without_nonce(imprint)
        .with_policy(const_oid::ObjectIdentifier::new_unwrap("1.3.6.1.4.1.99999.1"))
        .to_der()
        .unwrap();

    let response = tsa.sign_request(&bytes).unwrap();
    assert_eq!(response.status, ResponseStatus::Rejection);
    assert_eq!(response.failure_info, Some(FailureInfo::UnacceptedPolicy));
}

#[test]
fn matching_explicit_policy_is_granted() {
    let tsa = authority(test_identity());
    let imprint = MessageImprint::new(HashAlgorithm::Sha256, vec![0x07; 32]).unwrap();
    let bytes = TimeStampReq::new_without_nonce(imprint)
        .with_policy(const_oid::ObjectIdentifier::new_unwrap("1.2"))
        .to_der()
        .unwrap();

    let response = tsa.sign_request(&bytes).unwrap();
    assert_eq!(response.status, ResponseStatus::Granted);
}

#[test]
fn pinned_clock_and_serial_are_reflected_in_the_token() {
    let instant = Utc.with_ymd_and_hms(2024, 11, 5, 8, 0, 0).unwrap();
    let serial = BigUint::from(424_242u32);
    let tsa = TimeStampAuthority::with_identity(
        test_identity(),
        &TsaConfig::default(),
        Box::new(FixedSerialNumberGenerator(serial.clone())),
        Box::new(FixedClock(instant)),
    )
    .unwrap();

    let response = tsa
        .sign_request(&request_bytes(HashAlgorithm::Sha512, vec![0x0f; 64], true))
        .unwrap();
    assert_eq!(response.generation_time, instant);
    assert_eq!(response.serial_number, Some(serial.clone()));

    let result = tsa.validate(&response.encoded).unwrap();
    assert_eq!(result.generation_time, Some(instant));
    assert_eq!(result.serial_number, Some(serial));
}

#[test]
fn malformed_request_and_unknown_algorithm_are_distinct() {
    let tsa = authority(test_identity());

    assert!(matches!(
        tsa.sign_request(&[0xde, 0xad]),
        Err(Error::InvalidRequest(_))
    ));

    let md5_imprint = MessageImprint {
        hash_algorithm: spki::AlgorithmIdentifierOwned {
            oid: const_oid::ObjectIdentifier::new_unwrap("1.2.840.113549.2.5"),
            parameters: None,
        },
        hashed_message: der::asn1::OctetString::new(vec![0u8; 16]).unwrap(),
    };
    let bytes = TimeStampReq::new_without_nonce(md5_imprint).to_der().unwrap();
    assert!(matches!(
        tsa.sign_request(&bytes),
        Err(Error::UnknownHashAlgorithm { .. })
    ));
}

fn pkcs12_bytes(password: &str) -> Vec<u8> {
    let (key_pair, certificate) = generate_key_and_certificate();
    let p12_certificate = p12_keystore::Certificate::from_der(certificate.der().as_ref()).unwrap();
    let key_chain = PrivateKeyChain::new(
        key_pair.serialize_der(),
        [0x01u8; 20],
        vec![p12_certificate],
    );

    let mut keystore = KeyStore::new();
    keystore.add_entry("tsa", KeyStoreEntry::PrivateKeyChain(key_chain));
    keystore.writer(password).write().unwrap()
}

#[test]
fn initializes_from_embedded_pkcs12_keystore() {
    let resources = EmbeddedResources::new().with("test-store.p12", pkcs12_bytes("changeit"));
    let config = TsaConfig {
        keystore: KeystoreConfig {
            path: "embedded:/test-store.p12".to_string(),
            password: Some("changeit".to_string()),
        },
        ..TsaConfig::default()
    };

    let tsa = TimeStampAuthority::initialize(
        &config,
        &resources,
        Box::new(RandomSerialNumberGenerator::new()),
        Box::new(SystemClock),
    )
    .unwrap();

    let response = tsa
        .sign_request(&request_bytes(HashAlgorithm::Sha256, vec![0x2a; 32], true))
        .unwrap();
    let result = tsa.validate(&response.encoded).unwrap();
    assert!(result.signed_by_this_tsa, "{:?}", result.failure_reason);
}

#[test]
fn initializes_from_filesystem_pkcs12_keystore() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("store.p12");
    std::fs::write(&path, pkcs12_bytes("secret")).unwrap();

    let config = TsaConfig {
        keystore: KeystoreConfig {
            path: path.to_string_lossy().into_owned(),
            password: Some("secret".to_string()),
        },
        ..TsaConfig::default()
    };

    let tsa = TimeStampAuthority::initialize(
        &config,
        &EmbeddedResources::new(),
        Box::new(RandomSerialNumberGenerator::new()),
        Box::new(SystemClock),
    )
    .unwrap();

    assert!(tsa
        .sign_request(&request_bytes(HashAlgorithm::Sha512, vec![0x2b; 64], false))
        .is_ok());
}

#[test]
fn initialization_fails_for_missing_keystore() {
    let config = TsaConfig {
        keystore: KeystoreConfig {
            path: "/nonexistent/store.p12".to_string(),
            password: None,
        },
        ..TsaConfig::default()
    };

    let result = TimeStampAuthority::initialize(
        &config,
        &EmbeddedResources::new(),
        Box::new(RandomSerialNumberGenerator::new()),
        Box::new(SystemClock),
    );
    assert!(matches!(result, Err(Error::Initialization(_))));
}
