//! TSP request decoding and validation
//!
//! Turns untrusted request bytes into validated [`TimeStampRequestData`].
//! Checks run in a fixed order: outer structure, version, hash algorithm
//! resolution, digest length, optional fields. The first failing check
//! determines the error; an unresolvable digest algorithm OID is reported
//! distinctly so callers can list the supported algorithms.

use der::Decode;
use tsa_types::TimeStampRequestData;

use crate::asn1::{bigint_from_int, digest_from_oid, TimeStampReq};
use crate::error::{Error, Result};

/// Protocol version every request must declare
const SUPPORTED_VERSION: u8 = 1;

/// Decode and validate an ASN.1 DER encoded TSP request
pub fn decode_request(bytes: &[u8]) -> Result<TimeStampRequestData> {
    let request = TimeStampReq::from_der(bytes)
        .map_err(|e| Error::InvalidRequest(format!("could not parse TSP request: {}", e)))?;

    if request.version != SUPPORTED_VERSION {
        return Err(Error::InvalidRequest(format!(
            "unsupported protocol version {}",
            request.version
        )));
    }

    let algorithm_oid = &request.message_imprint.hash_algorithm.oid;
    let hash_algorithm = digest_from_oid(algorithm_oid).ok_or_else(|| Error::UnknownHashAlgorithm {
        oid: algorithm_oid.to_string(),
    })?;

    let digest = request.message_imprint.hashed_message.as_bytes().to_vec();
    if digest.len() != hash_algorithm.digest_size() {
        return Err(Error::InvalidRequest(format!(
            "digest length {} does not match the expected length {} of {}",
            digest.len(),
            hash_algorithm.digest_size(),
            hash_algorithm
        )));
    }

    Ok(TimeStampRequestData {
        hash_algorithm,
        digest,
        nonce: request.nonce.as_ref().map(bigint_from_int),
        certificate_requested: request.cert_req,
        policy_id: request.req_policy.as_ref().map(|oid| oid.to_string()),
        encoded: bytes.to_vec(),
    })
}
