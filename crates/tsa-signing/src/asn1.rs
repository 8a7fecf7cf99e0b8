//! ASN.1 types for the RFC 3161 Time-Stamp Protocol
//!
//! This module defines the DER structures exchanged by the protocol as
//! specified in RFC 3161, plus the `SigningCertificateV2` attribute from
//! RFC 5035 which every issued token carries.

use const_oid::ObjectIdentifier;
use der::{
    asn1::{BitString, GeneralizedTime, Int, OctetString},
    Any, Decode, Encode, Sequence,
};
use num_bigint::{BigInt, BigUint, Sign};
use rand::Rng;
use spki::AlgorithmIdentifierOwned;
use tsa_types::{FailureInfo, HashAlgorithm};
use x509_cert::ext::{pkix::name::GeneralName, Extensions};

/// OID for SHA-1: 1.3.14.3.2.26
pub const OID_SHA1: ObjectIdentifier = const_oid::db::rfc5912::ID_SHA_1;

/// OID for SHA-256: 2.16.840.1.101.3.4.2.1
pub const OID_SHA256: ObjectIdentifier = const_oid::db::rfc5912::ID_SHA_256;

/// OID for SHA-384: 2.16.840.1.101.3.4.2.2
pub const OID_SHA384: ObjectIdentifier = const_oid::db::rfc5912::ID_SHA_384;

/// OID for SHA-512: 2.16.840.1.101.3.4.2.3
pub const OID_SHA512: ObjectIdentifier = const_oid::db::rfc5912::ID_SHA_512;

/// OID for id-ct-TSTInfo: 1.2.840.113549.1.9.16.1.4
pub const OID_TST_INFO: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.1.4");

/// OID for id-signedData: 1.2.840.113549.1.7.2
pub const OID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");

/// OID for the content-type signed attribute: 1.2.840.113549.1.9.3
pub const OID_CONTENT_TYPE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");

/// OID for the message-digest signed attribute: 1.2.840.113549.1.9.4
pub const OID_MESSAGE_DIGEST: ObjectIdentifier = const_oid::db::rfc6268::ID_MESSAGE_DIGEST;

/// OID for the signingCertificateV2 signed attribute: 1.2.840.113549.1.9.16.2.47
pub const OID_SIGNING_CERTIFICATE_V2: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.47");

/// Map a registry algorithm to its DER object identifier
pub fn digest_oid(algorithm: HashAlgorithm) -> ObjectIdentifier {
    match algorithm {
        HashAlgorithm::Sha1 => OID_SHA1,
        HashAlgorithm::Sha256 => OID_SHA256,
        HashAlgorithm::Sha384 => OID_SHA384,
        HashAlgorithm::Sha512 => OID_SHA512,
    }
}

/// Resolve a DER object identifier against the hash algorithm registry
pub fn digest_from_oid(oid: &ObjectIdentifier) -> Option<HashAlgorithm> {
    HashAlgorithm::from_oid(&oid.to_string())
}

/// Build an `AlgorithmIdentifier` for a digest algorithm
///
/// Parameters are omitted per RFC 5754.
pub fn digest_algorithm_identifier(algorithm: HashAlgorithm) -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: digest_oid(algorithm),
        parameters: None,
    }
}

/// Generates a random nonce suitable for RFC 3161 timestamp requests.
///
/// The nonce is generated as 8 random bytes and encoded as a positive
/// INTEGER according to DER rules: when the high bit is set, a leading
/// 0x00 is prepended so the value is interpreted as positive.
pub fn generate_positive_nonce_bytes() -> Vec<u8> {
    let mut rng = rand::rng();
    let nonce_random: [u8; 8] = rng.random();
    positive_int_bytes(&nonce_random)
}

/// Pad a big-endian magnitude so it encodes as a positive DER INTEGER
pub fn positive_int_bytes(magnitude: &[u8]) -> Vec<u8> {
    let stripped: &[u8] = {
        let mut slice = magnitude;
        while slice.len() > 1 && slice[0] == 0 {
            slice = &slice[1..];
        }
        slice
    };

    if stripped.is_empty() {
        return vec![0x00];
    }

    if stripped[0] & 0x80 != 0 {
        let mut padded = vec![0x00];
        padded.extend_from_slice(stripped);
        padded
    } else {
        stripped.to_vec()
    }
}

/// Encode a non-negative arbitrary-precision integer as a DER INTEGER
pub fn int_from_biguint(value: &BigUint) -> der::Result<Int> {
    Int::new(&positive_int_bytes(&value.to_bytes_be()))
}

/// Decode a DER INTEGER into a non-negative arbitrary-precision integer
///
/// Returns `None` for negative values.
pub fn biguint_from_int(value: &Int) -> Option<BigUint> {
    let bigint = bigint_from_int(value);
    match bigint.sign() {
        Sign::Minus => None,
        _ => bigint.to_biguint(),
    }
}

/// Decode a DER INTEGER into an arbitrary-precision integer
pub fn bigint_from_int(value: &Int) -> BigInt {
    BigInt::from_signed_bytes_be(value.as_bytes())
}

/// Encode an arbitrary-precision integer as a DER INTEGER
pub fn int_from_bigint(value: &BigInt) -> der::Result<Int> {
    Int::new(&value.to_signed_bytes_be())
}

/// Message imprint containing hash algorithm and hashed message.
///
/// RFC 3161 Section 2.4.1
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct MessageImprint {
    /// Hash algorithm used
    pub hash_algorithm: AlgorithmIdentifierOwned,
    /// Hashed message
    pub hashed_message: OctetString,
}

impl MessageImprint {
    /// Create a new message imprint
    pub fn new(algorithm: HashAlgorithm, digest: Vec<u8>) -> der::Result<Self> {
        Ok(Self {
            hash_algorithm: digest_algorithm_identifier(algorithm),
            hashed_message: OctetString::new(digest)?,
        })
    }
}

/// Time-stamp request
/// RFC 3161 Section 2.4.1
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TimeStampReq {
    /// Version (must be 1)
    pub version: u8,
    /// Message imprint to be timestamped
    pub message_imprint: MessageImprint,
    /// Optional policy OID
    #[asn1(optional = "true")]
    pub req_policy: Option<ObjectIdentifier>,
    /// Optional nonce
    #[asn1(optional = "true")]
    pub nonce: Option<Int>,
    /// Whether to include certificates in the response
    #[asn1(default = "default_false")]
    pub cert_req: bool,
    /// Optional extensions
    #[asn1(context_specific = "0", optional = "true", tag_mode = "IMPLICIT")]
    pub extensions: Option<Extensions>,
}

fn default_false() -> bool {
    false
}

impl TimeStampReq {
    /// Create a new timestamp request with an automatically generated nonce
    pub fn new(message_imprint: MessageImprint) -> der::Result<Self> {
        let nonce = Int::new(&generate_positive_nonce_bytes())?;

        Ok(Self {
            version: 1,
            message_imprint,
            req_policy: None,
            nonce: Some(nonce),
            cert_req: true,
            extensions: None,
        })
    }

    /// Create a new timestamp request without a nonce
    pub fn new_without_nonce(message_imprint: MessageImprint) -> Self {
        Self {
            version: 1,
            message_imprint,
            req_policy: None,
            nonce: None,
            cert_req: true,
            extensions: None,
        }
    }

    /// Set the nonce manually (overrides the auto-generated nonce)
    pub fn with_nonce(mut self, nonce: &[u8]) -> der::Result<Self> {
        self.nonce = Some(Int::new(nonce)?);
        Ok(self)
    }

    /// Set the explicit policy the token is requested under
    pub fn with_policy(mut self, policy: ObjectIdentifier) -> Self {
        self.req_policy = Some(policy);
        self
    }

    /// Set whether to request certificates
    pub fn with_cert_req(mut self, cert_req: bool) -> Self {
        self.cert_req = cert_req;
        self
    }

    /// Encode to DER
    pub fn to_der(&self) -> der::Result<Vec<u8>> {
        Encode::to_der(self)
    }
}

/// PKI status values
/// RFC 3161 Section 2.4.2
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum PkiStatus {
    /// Granted
    Granted = 0,
    /// Granted with modifications
    GrantedWithMods = 1,
    /// Rejection
    Rejection = 2,
    /// Waiting
    Waiting = 3,
    /// Revocation warning
    RevocationWarning = 4,
    /// Revocation notification
    RevocationNotification = 5,
}

impl TryFrom<u8> for PkiStatus {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PkiStatus::Granted),
            1 => Ok(PkiStatus::GrantedWithMods),
            2 => Ok(PkiStatus::Rejection),
            3 => Ok(PkiStatus::Waiting),
            4 => Ok(PkiStatus::RevocationWarning),
            5 => Ok(PkiStatus::RevocationNotification),
            _ => Err(()),
        }
    }
}

/// PKI status info
/// RFC 3161 Section 2.4.2
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PkiStatusInfo {
    /// Status value
    pub status: u8,
    /// Optional free-text status messages
    #[asn1(optional = "true")]
    pub status_string: Option<Vec<String>>,
    /// Optional failure info
    #[asn1(optional = "true")]
    pub fail_info: Option<BitString>,
}

impl PkiStatusInfo {
    /// A `granted` status with no further information
    pub fn granted() -> Self {
        Self {
            status: PkiStatus::Granted as u8,
            status_string: None,
            fail_info: None,
        }
    }

    /// A `rejection` status with a reason text and failure info
    pub fn rejection(status_text: &str, failure_info: FailureInfo) -> der::Result<Self> {
        Ok(Self {
            status: PkiStatus::Rejection as u8,
            status_string: Some(vec![status_text.to_string()]),
            fail_info: Some(failure_info_bits(failure_info)?),
        })
    }

    /// Check if the status indicates success
    pub fn is_success(&self) -> bool {
        self.status == PkiStatus::Granted as u8 || self.status == PkiStatus::GrantedWithMods as u8
    }

    /// Get the status as an enum
    pub fn status_enum(&self) -> Option<PkiStatus> {
        PkiStatus::try_from(self.status).ok()
    }

    /// The first free-text status message, if any
    pub fn status_text(&self) -> Option<&str> {
        self.status_string
            .as_ref()
            .and_then(|texts| texts.first())
            .map(String::as_str)
    }

    /// The decoded failure info, if any
    pub fn failure_info(&self) -> Option<FailureInfo> {
        self.fail_info.as_ref().and_then(failure_info_from_bits)
    }
}

/// Encode a failure info value as the RFC 3161 `PKIFailureInfo` BIT STRING
pub fn failure_info_bits(failure_info: FailureInfo) -> der::Result<BitString> {
    let bit = failure_info.bit_position() as usize;
    let mut bytes = vec![0u8; bit / 8 + 1];
    bytes[bit / 8] = 0x80 >> (bit % 8);
    let unused = 7 - (bit % 8);
    BitString::new(unused as u8, bytes)
}

/// Decode the first set bit of a `PKIFailureInfo` BIT STRING
pub fn failure_info_from_bits(bits: &BitString) -> Option<FailureInfo> {
    for (index, byte) in bits.raw_bytes().iter().enumerate() {
        for offset in 0..8u32 {
            if byte & (0x80 >> offset) != 0 {
                return FailureInfo::from_bit_position(index as u32 * 8 + offset);
            }
        }
    }
    None
}

/// Accuracy of the timestamp
/// RFC 3161 Section 2.4.2
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Accuracy {
    /// Seconds
    #[asn1(optional = "true")]
    pub seconds: Option<u64>,
    /// Milliseconds (1-999)
    #[asn1(context_specific = "0", optional = "true")]
    pub millis: Option<u16>,
    /// Microseconds (1-999)
    #[asn1(context_specific = "1", optional = "true")]
    pub micros: Option<u16>,
}

/// TSTInfo - the actual timestamp token info
/// RFC 3161 Section 2.4.2
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TstInfo {
    /// Version (must be 1)
    pub version: u8,
    /// Policy OID
    pub policy: ObjectIdentifier,
    /// Message imprint
    pub message_imprint: MessageImprint,
    /// Serial number
    pub serial_number: Int,
    /// Generation time
    pub gen_time: GeneralizedTime,
    /// Accuracy
    #[asn1(optional = "true")]
    pub accuracy: Option<Accuracy>,
    /// Ordering
    #[asn1(default = "default_false")]
    pub ordering: bool,
    /// Nonce
    #[asn1(optional = "true")]
    pub nonce: Option<Int>,
    /// TSA name
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub tsa: Option<GeneralName>,
    /// Extensions
    #[asn1(context_specific = "1", optional = "true", tag_mode = "IMPLICIT")]
    pub extensions: Option<Extensions>,
}

impl TstInfo {
    /// Decode from DER bytes
    pub fn from_der_bytes(bytes: &[u8]) -> der::Result<Self> {
        Self::from_der(bytes)
    }
}

/// Time-stamp response
/// RFC 3161 Section 2.4.2
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TimeStampResp {
    /// Status information
    pub status: PkiStatusInfo,
    /// Time-stamp token (CMS ContentInfo)
    #[asn1(optional = "true")]
    pub time_stamp_token: Option<Any>,
}

impl TimeStampResp {
    /// Decode from DER bytes
    pub fn from_der_bytes(bytes: &[u8]) -> der::Result<Self> {
        Self::from_der(bytes)
    }

    /// Check if the response indicates success
    pub fn is_success(&self) -> bool {
        self.status.is_success() && self.time_stamp_token.is_some()
    }
}

/// ESSCertIDv2 identifying the signer certificate by digest
/// RFC 5035 Section 4
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct EssCertIdV2 {
    /// Digest algorithm; omitted when SHA-256 (the DEFAULT)
    #[asn1(optional = "true")]
    pub hash_algorithm: Option<AlgorithmIdentifierOwned>,
    /// Digest of the DER-encoded certificate
    pub cert_hash: OctetString,
}

/// SigningCertificateV2 signed attribute value
/// RFC 5035 Section 4
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SigningCertificateV2 {
    /// Certificate identifiers, signer first
    pub certs: Vec<EssCertIdV2>,
}

impl SigningCertificateV2 {
    /// Identify a certificate by its digest
    ///
    /// The algorithm identifier is omitted when it matches the SHA-256
    /// DEFAULT of the `ESSCertIDv2` definition.
    pub fn new(algorithm: HashAlgorithm, cert_hash: Vec<u8>) -> der::Result<Self> {
        let hash_algorithm = match algorithm {
            HashAlgorithm::Sha256 => None,
            other => Some(digest_algorithm_identifier(other)),
        };

        Ok(Self {
            certs: vec![EssCertIdV2 {
                hash_algorithm,
                cert_hash: OctetString::new(cert_hash)?,
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_imprint_encode() {
        let digest = vec![0u8; 32];
        let imprint = MessageImprint::new(HashAlgorithm::Sha256, digest).unwrap();
        let der = Encode::to_der(&imprint).unwrap();
        assert!(!der.is_empty());
    }

    #[test]
    fn test_timestamp_req_round_trip() {
        let imprint = MessageImprint::new(HashAlgorithm::Sha256, vec![0xab; 32]).unwrap();
        let req = TimeStampReq::new(imprint).unwrap();
        let der = req.to_der().unwrap();

        let decoded = TimeStampReq::from_der(&der).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn test_timestamp_req_has_nonce() {
        let imprint = MessageImprint::new(HashAlgorithm::Sha256, vec![0u8; 32]).unwrap();
        let req = TimeStampReq::new(imprint).unwrap();
        assert!(req.nonce.is_some(), "nonce should be automatically generated");
    }

    #[test]
    fn test_generate_positive_nonce_bytes() {
        for _ in 0..100 {
            let nonce_bytes = generate_positive_nonce_bytes();

            assert!(
                nonce_bytes.len() == 8 || nonce_bytes.len() == 9,
                "nonce length should be 8 or 9 bytes, got {}",
                nonce_bytes.len()
            );

            if nonce_bytes.len() == 9 {
                assert_eq!(nonce_bytes[0], 0x00);
                assert!(nonce_bytes[1] & 0x80 != 0);
            } else {
                assert!(nonce_bytes[0] & 0x80 == 0);
            }

            assert!(Int::new(&nonce_bytes).is_ok());
        }
    }

    #[test]
    fn test_positive_int_bytes_zero() {
        assert_eq!(positive_int_bytes(&[]), vec![0x00]);
        assert_eq!(positive_int_bytes(&[0x00, 0x00]), vec![0x00]);
    }

    #[test]
    fn test_biguint_int_round_trip() {
        let value = BigUint::from(0xdead_beef_u32);
        let int = int_from_biguint(&value).unwrap();
        assert_eq!(biguint_from_int(&int), Some(value));
    }

    #[test]
    fn test_biguint_from_negative_int_is_none() {
        let int = Int::new(&[0xff]).unwrap();
        assert_eq!(biguint_from_int(&int), None);
    }

    #[test]
    fn test_pki_status() {
        assert!(PkiStatus::try_from(0).is_ok());
        assert!(PkiStatus::try_from(5).is_ok());
        assert!(PkiStatus::try_from(6).is_err());
    }

    #[test]
    fn test_rejection_status_info_round_trip() {
        let info = PkiStatusInfo::rejection("unknown algorithm", FailureInfo::BadAlgorithm).unwrap();
        let der = Encode::to_der(&info).unwrap();
        let decoded = PkiStatusInfo::from_der(&der).unwrap();

        assert_eq!(decoded.status_enum(), Some(PkiStatus::Rejection));
        assert_eq!(decoded.status_text(), Some("unknown algorithm"));
        assert_eq!(decoded.failure_info(), Some(FailureInfo::BadAlgorithm));
    }

    #[test]
    fn test_failure_info_bits_round_trip() {
        for info in FailureInfo::ALL {
            let bits = failure_info_bits(info).unwrap();
            assert_eq!(failure_info_from_bits(&bits), Some(info));
        }
    }

    #[test]
    fn test_bad_alg_bit_encoding() {
        // badAlg is bit 0, which DER encodes as 0x80 with 7 unused bits
        let bits = failure_info_bits(FailureInfo::BadAlgorithm).unwrap();
        assert_eq!(bits.raw_bytes(), &[0x80]);
    }

    #[test]
    fn test_signing_certificate_v2_omits_sha256_identifier() {
        let attr = SigningCertificateV2::new(HashAlgorithm::Sha256, vec![0u8; 32]).unwrap();
        assert!(attr.certs[0].hash_algorithm.is_none());

        let attr = SigningCertificateV2::new(HashAlgorithm::Sha512, vec![0u8; 64]).unwrap();
        assert_eq!(
            attr.certs[0].hash_algorithm.as_ref().map(|alg| alg.oid),
            Some(OID_SHA512)
        );
    }
}
