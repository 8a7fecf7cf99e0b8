//! Validation of previously issued responses
//!
//! Decodes a DER-encoded `TimeStampResp` and verifies its token signature
//! against the currently loaded identity. Cryptographic mismatch is a
//! normal outcome reported through the result; only bytes that cannot be
//! interpreted at all raise an error.

use chrono::{DateTime, Utc};
use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::{SignedData, SignerIdentifier};
use der::{
    asn1::{OctetString, SetOfVec},
    Decode, Encode,
};
use num_bigint::BigUint;
use tsa_types::{
    ResponseStatus, SigningCertificateInformation, TimeStampValidationResult,
};
use x509_cert::attr::Attribute;
use x509_cert::Certificate;

use crate::asn1::{
    bigint_from_int, biguint_from_int, digest_from_oid, TimeStampResp, TstInfo, OID_MESSAGE_DIGEST,
    OID_SIGNED_DATA, OID_TST_INFO,
};
use crate::error::{Error, Result};
use crate::hash::compute_digest;
use crate::identity::SigningIdentity;

/// Decode a previously issued response and verify it against the loaded
/// identity
///
/// Returns an error only when the bytes cannot be decoded far enough to
/// evaluate; a token signed by a different key yields a result with
/// `signed_by_this_tsa = false`.
pub fn validate_response(
    bytes: &[u8],
    identity: &SigningIdentity,
) -> Result<TimeStampValidationResult> {
    let response = TimeStampResp::from_der(bytes)
        .map_err(|e| Error::InvalidResponse(format!("could not parse TSP response: {}", e)))?;

    let status = ResponseStatus::from_value(response.status.status).ok_or_else(|| {
        Error::InvalidResponse(format!("unknown status value {}", response.status.status))
    })?;
    let status_text = response.status.status_text().map(str::to_string);
    let failure_info = response.status.failure_info();

    let Some(token) = &response.time_stamp_token else {
        return Ok(TimeStampValidationResult::without_token(
            status,
            status_text,
            failure_info,
        ));
    };

    tracing::debug!("decoding time-stamp token");

    let token_der = token
        .to_der()
        .map_err(|e| Error::InvalidResponse(format!("failed to re-encode token: {}", e)))?;
    let content_info = ContentInfo::from_der(&token_der)
        .map_err(|e| Error::InvalidResponse(format!("failed to decode ContentInfo: {}", e)))?;

    if content_info.content_type != OID_SIGNED_DATA {
        return Err(Error::InvalidResponse(
            "token content type is not SignedData".to_string(),
        ));
    }

    let signed_data_der = content_info
        .content
        .to_der()
        .map_err(|e| Error::InvalidResponse(format!("failed to encode SignedData: {}", e)))?;
    let signed_data = SignedData::from_der(&signed_data_der)
        .map_err(|e| Error::InvalidResponse(format!("failed to decode SignedData: {}", e)))?;

    if signed_data.encap_content_info.econtent_type != OID_TST_INFO {
        return Err(Error::InvalidResponse(
            "encapsulated content type is not TSTInfo".to_string(),
        ));
    }

    let econtent = signed_data
        .encap_content_info
        .econtent
        .as_ref()
        .ok_or_else(|| Error::InvalidResponse("token does not contain a TSTInfo".to_string()))?;
    let tst_info_der = econtent.value();
    let tst_info = TstInfo::from_der(tst_info_der)
        .map_err(|e| Error::InvalidResponse(format!("failed to decode TSTInfo: {}", e)))?;

    let imprint_oid = &tst_info.message_imprint.hash_algorithm.oid;
    let hash_algorithm = digest_from_oid(imprint_oid).ok_or_else(|| Error::UnknownHashAlgorithm {
        oid: imprint_oid.to_string(),
    })?;

    let generation_time = decode_generalized_time(&tst_info)?;
    let serial_number = biguint_from_int(&tst_info.serial_number)
        .ok_or_else(|| Error::InvalidResponse("negative serial number".to_string()))?;
    let nonce = tst_info.nonce.as_ref().map(bigint_from_int);
    let hash = tst_info.message_imprint.hashed_message.as_bytes().to_vec();

    let signing_certificate = extract_signing_certificate(&signed_data);

    let signature_check = check_token_signature(identity, &signed_data, tst_info_der);
    let signed_by_this_tsa = signature_check.is_ok();
    if let Err(reason) = &signature_check {
        tracing::info!(reason = %reason, "TSP response was not signed by this TSA");
    }

    Ok(TimeStampValidationResult {
        status,
        status_text,
        failure_info,
        generation_time: Some(generation_time),
        serial_number: Some(serial_number),
        nonce,
        hash_algorithm: Some(hash_algorithm),
        hash: Some(hash),
        signing_certificate,
        signed_by_this_tsa,
        failure_reason: signature_check.err(),
    })
}

fn decode_generalized_time(tst_info: &TstInfo) -> Result<DateTime<Utc>> {
    let unix_duration = tst_info.gen_time.to_unix_duration();
    DateTime::from_timestamp(unix_duration.as_secs() as i64, unix_duration.subsec_nanos())
        .ok_or_else(|| Error::InvalidResponse("invalid genTime in TSTInfo".to_string()))
}

/// Verify the token signature against the identity's public key
///
/// Returns the failure reason when any check does not pass; all failures
/// here are normal validation outcomes, not errors.
fn check_token_signature(
    identity: &SigningIdentity,
    signed_data: &SignedData,
    tst_info_der: &[u8],
) -> std::result::Result<(), String> {
    let signer_info = signed_data
        .signer_infos
        .0
        .get(0)
        .ok_or_else(|| "no signer info present".to_string())?;

    let signed_attrs = signer_info
        .signed_attrs
        .as_ref()
        .ok_or_else(|| "no signed attributes present".to_string())?;

    let digest_algorithm = digest_from_oid(&signer_info.digest_alg.oid)
        .ok_or_else(|| format!("unknown signer digest algorithm {}", signer_info.digest_alg.oid))?;

    // The message-digest attribute must cover the TSTInfo content
    let message_digest = message_digest_attribute(signed_attrs.iter())?;
    let content_digest = compute_digest(digest_algorithm, tst_info_der);
    if message_digest != content_digest {
        return Err(format!(
            "message digest mismatch: expected {}, got {}",
            hex::encode(&message_digest),
            hex::encode(&content_digest)
        ));
    }

    // RFC 5652: signed attributes are tagged [0] IMPLICIT inside SignerInfo
    // but the signature covers their encoding as a generic SET OF
    let attrs_vec: Vec<Attribute> = signed_attrs.iter().cloned().collect();
    let generic_set = SetOfVec::try_from(attrs_vec)
        .map_err(|e| format!("failed to re-encode signed attributes: {}", e))?;
    let signed_attrs_der = generic_set
        .to_der()
        .map_err(|e| format!("failed to re-encode signed attributes: {}", e))?;

    if !identity.verify_signature(
        &signed_attrs_der,
        signer_info.signature.as_bytes(),
        digest_algorithm,
    ) {
        return Err("signature was not produced by the loaded identity".to_string());
    }

    Ok(())
}

/// The value of the message-digest signed attribute
fn message_digest_attribute<'a>(
    mut attributes: impl Iterator<Item = &'a Attribute>,
) -> std::result::Result<Vec<u8>, String> {
    let attribute = attributes
        .find(|attribute| attribute.oid == OID_MESSAGE_DIGEST)
        .ok_or_else(|| "message-digest attribute not present".to_string())?;

    if attribute.values.len() != 1 {
        return Err("message-digest attribute must have exactly one value".to_string());
    }

    let value = attribute
        .values
        .get(0)
        .ok_or_else(|| "message-digest attribute value missing".to_string())?;

    value
        .decode_as::<OctetString>()
        .map(|octets| octets.as_bytes().to_vec())
        .map_err(|e| format!("message-digest attribute is not an OCTET STRING: {}", e))
}

/// Information about the signer certificate embedded in the token, if any
fn extract_signing_certificate(signed_data: &SignedData) -> Option<SigningCertificateInformation> {
    let certificates = embedded_certificates(signed_data);
    if certificates.is_empty() {
        return None;
    }

    let certificate = signed_data
        .signer_infos
        .0
        .get(0)
        .and_then(|signer_info| find_signer_certificate(&signer_info.sid, &certificates))
        .unwrap_or_else(|| certificates[0].clone());

    certificate_information(&certificate)
}

fn certificate_information(certificate: &Certificate) -> Option<SigningCertificateInformation> {
    let encoded = certificate.to_der().ok()?;
    let not_after = certificate
        .tbs_certificate
        .validity
        .not_after
        .to_unix_duration();
    let expiration_date = DateTime::from_timestamp(not_after.as_secs() as i64, 0)?;

    Some(SigningCertificateInformation {
        issuer: certificate.tbs_certificate.issuer.to_string(),
        serial_number: BigUint::from_bytes_be(certificate.tbs_certificate.serial_number.as_bytes()),
        expiration_date,
        encoded,
    })
}

/// Extract certificates from SignedData
fn embedded_certificates(signed_data: &SignedData) -> Vec<Certificate> {
    let mut certificates = Vec::new();

    if let Some(cert_set) = &signed_data.certificates {
        for cert_choice in cert_set.0.iter() {
            match cert_choice {
                CertificateChoices::Certificate(certificate) => {
                    certificates.push(certificate.clone());
                }
                CertificateChoices::Other(_) => {
                    tracing::debug!("skipping non-standard certificate format");
                }
            }
        }
    }

    certificates
}

/// Find the certificate matching the SignerIdentifier
///
/// Identification by subject key identifier falls back to `None`; the
/// engine only issues `IssuerAndSerialNumber` identifiers.
fn find_signer_certificate(
    signer_id: &SignerIdentifier,
    certificates: &[Certificate],
) -> Option<Certificate> {
    match signer_id {
        SignerIdentifier::IssuerAndSerialNumber(issuer_serial) => certificates
            .iter()
            .find(|certificate| {
                certificate.tbs_certificate.issuer == issuer_serial.issuer
                    && certificate.tbs_certificate.serial_number == issuer_serial.serial_number
            })
            .cloned(),
        SignerIdentifier::SubjectKeyIdentifier(_) => None,
    }
}
