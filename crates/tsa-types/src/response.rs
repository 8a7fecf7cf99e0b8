//! Decoded time-stamp request and response data
//!
//! The raw DER bytes carried by these structures are the authoritative wire
//! form; the structured fields are a decoding of those bytes and exist for
//! inspection and persistence.

use chrono::{DateTime, Utc};
use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};

use crate::hash::HashAlgorithm;
use crate::status::{FailureInfo, ResponseStatus};

/// The information included in a decoded `TimeStampReq`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeStampRequestData {
    /// The digest algorithm declared by the message imprint
    pub hash_algorithm: HashAlgorithm,
    /// The digest to be time-stamped
    #[serde(with = "crate::base64_bytes")]
    pub digest: Vec<u8>,
    /// The nonce which was included, if any
    pub nonce: Option<BigInt>,
    /// Whether the TSA certificate should be embedded in the response
    pub certificate_requested: bool,
    /// The OID of the policy the token was explicitly requested under
    pub policy_id: Option<String>,
    /// The ASN.1 DER encoded request
    #[serde(with = "crate::base64_bytes")]
    pub encoded: Vec<u8>,
}

/// A constructed or decoded time-stamp response together with the request
/// that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeStampResponseData {
    /// Identifier assigned by the persistence store; absent until saved
    pub id: Option<i64>,
    /// The status of the response as defined in `PKIStatus`
    pub status: ResponseStatus,
    /// An optional human-readable status text
    pub status_text: Option<String>,
    /// The reason the request was rejected; absent when granted
    pub failure_info: Option<FailureInfo>,
    /// The time the request was processed by the engine
    pub generation_time: DateTime<Utc>,
    /// The serial number embedded in the issued token; absent when rejected
    pub serial_number: Option<BigUint>,
    /// The request this response belongs to
    pub request: TimeStampRequestData,
    /// The ASN.1 DER encoded response
    #[serde(with = "crate::base64_bytes")]
    pub encoded: Vec<u8>,
}

impl TimeStampResponseData {
    /// Return a copy with the persistence identifier filled in
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}
