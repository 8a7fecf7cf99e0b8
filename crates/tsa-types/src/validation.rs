//! Validation outcome of a previously issued response

use chrono::{DateTime, Utc};
use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};

use crate::hash::HashAlgorithm;
use crate::status::{FailureInfo, ResponseStatus};

/// Information about the certificate embedded in a time-stamp token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningCertificateInformation {
    /// The issuer of the certificate
    pub issuer: String,
    /// The serial number of the certificate
    pub serial_number: BigUint,
    /// The expiration date of the certificate
    pub expiration_date: DateTime<Utc>,
    /// The ASN.1 DER encoded certificate
    #[serde(with = "crate::base64_bytes")]
    pub encoded: Vec<u8>,
}

/// The outcome of validating a time-stamp response
///
/// Created per validation call and never persisted. A response that decodes
/// but was not signed by the currently loaded identity yields
/// `signed_by_this_tsa = false` with a reason; it is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeStampValidationResult {
    /// The status of the response as defined in `PKIStatus`
    pub status: ResponseStatus,
    /// An optional reason text carried by the response
    pub status_text: Option<String>,
    /// The failure info carried by the response, if any
    pub failure_info: Option<FailureInfo>,
    /// The generation time of the token; absent when no token is present
    pub generation_time: Option<DateTime<Utc>>,
    /// The serial number of the token; absent when no token is present
    pub serial_number: Option<BigUint>,
    /// The nonce echoed by the token, if any
    pub nonce: Option<BigInt>,
    /// The digest algorithm of the message imprint
    pub hash_algorithm: Option<HashAlgorithm>,
    /// The digest covered by the token
    #[serde(with = "crate::encoding::optional_base64_bytes")]
    pub hash: Option<Vec<u8>>,
    /// The certificate embedded in the token, if present
    pub signing_certificate: Option<SigningCertificateInformation>,
    /// Whether the token was signed by the currently loaded identity
    pub signed_by_this_tsa: bool,
    /// Why the token failed validation; absent when `signed_by_this_tsa`
    pub failure_reason: Option<String>,
}

impl TimeStampValidationResult {
    /// A result for a response that carries no time-stamp token
    pub fn without_token(
        status: ResponseStatus,
        status_text: Option<String>,
        failure_info: Option<FailureInfo>,
    ) -> Self {
        Self {
            status,
            status_text,
            failure_info,
            generation_time: None,
            serial_number: None,
            nonce: None,
            hash_algorithm: None,
            hash: None,
            signing_certificate: None,
            signed_by_this_tsa: false,
            failure_reason: Some("response does not contain a time-stamp token".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_token_is_not_signed() {
        let result = TimeStampValidationResult::without_token(
            ResponseStatus::Rejection,
            Some("rejected".to_string()),
            Some(FailureInfo::BadRequest),
        );

        assert!(!result.signed_by_this_tsa);
        assert!(result.failure_reason.is_some());
        assert_eq!(result.serial_number, None);
        assert_eq!(result.generation_time, None);
    }
}
