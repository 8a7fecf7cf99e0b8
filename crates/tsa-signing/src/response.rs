//! Response building and signing
//!
//! [`TimeStampAuthority`] is the engine core: it is constructed once from
//! validated configuration and a loaded signing identity, then serves an
//! arbitrary number of concurrent signing calls. Each granted request
//! yields a `TSTInfo` wrapped in a CMS `SignedData` whose signer is the
//! loaded identity; policy rejections yield a `TimeStampResp` without a
//! token. The requester never chooses the signature algorithm; it is
//! bound to the TSA's key.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedData, SignerIdentifier, SignerInfo, SignerInfos,
};
use const_oid::ObjectIdentifier;
use der::{
    asn1::{GeneralizedTime, OctetString, SetOfVec},
    Any, Decode, Encode, Tag,
};
use tsa_types::{
    FailureInfo, HashAlgorithm, ResponseStatus, TimeStampRequestData, TimeStampResponseData,
    TimeStampValidationResult,
};
use x509_cert::attr::Attribute;
use x509_cert::Certificate;

use crate::asn1::{
    digest_algorithm_identifier, int_from_biguint, PkiStatusInfo, SigningCertificateV2,
    TimeStampReq, TimeStampResp, TstInfo, OID_CONTENT_TYPE, OID_MESSAGE_DIGEST, OID_SIGNED_DATA,
    OID_SIGNING_CERTIFICATE_V2, OID_TST_INFO,
};
use crate::clock::Clock;
use crate::config::TsaConfig;
use crate::error::{Error, Result};
use crate::hash::compute_digest;
use crate::identity::{keystore_loader, load_identity, EmbeddedResources, KeyAlgorithm, SigningIdentity};
use crate::request::decode_request;
use crate::serial::SerialNumberGenerator;
use crate::verify::validate_response;

/// The time-stamp authority engine
///
/// Constructed once during process startup; all fields are immutable
/// afterwards and shared read-only by concurrent operations.
pub struct TimeStampAuthority {
    identity: SigningIdentity,
    policy: ObjectIdentifier,
    accepted_algorithms: BTreeSet<HashAlgorithm>,
    signing_digest: HashAlgorithm,
    ess_certificate: SigningCertificateV2,
    serial_number_generator: Box<dyn SerialNumberGenerator>,
    clock: Box<dyn Clock>,
}

impl TimeStampAuthority {
    /// Initialize the engine: load the signing identity from the configured
    /// keystore and resolve the signing policy
    ///
    /// Any failure here is fatal; the engine never serves without a loaded
    /// identity.
    pub fn initialize(
        config: &TsaConfig,
        resources: &EmbeddedResources,
        serial_number_generator: Box<dyn SerialNumberGenerator>,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        tracing::info!("starting TSA initialization");

        let violations = config.validate();
        if !violations.is_empty() {
            let summary = violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::Initialization(format!(
                "invalid configuration: {}",
                summary
            )));
        }

        let loader = keystore_loader(&config.keystore.path, resources);
        let identity = load_identity(loader.as_ref(), config.keystore.password.as_deref())
            .map_err(|e| Error::Initialization(format!("could not load signing identity: {}", e)))?;

        Self::with_identity(identity, config, serial_number_generator, clock)
    }

    /// Build the engine around an already loaded signing identity
    pub fn with_identity(
        identity: SigningIdentity,
        config: &TsaConfig,
        serial_number_generator: Box<dyn SerialNumberGenerator>,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        let policy = ObjectIdentifier::new(&config.policy_oid).map_err(|e| {
            Error::Initialization(format!(
                "invalid policy OID '{}': {}",
                config.policy_oid, e
            ))
        })?;

        let accepted_algorithms: BTreeSet<HashAlgorithm> = config
            .accepted_hash_algorithms
            .iter()
            .filter(|identifier| !identifier.trim().is_empty())
            .map(|identifier| {
                HashAlgorithm::resolve(identifier).ok_or_else(|| {
                    Error::Initialization(format!("'{}' is not a digest algorithm", identifier))
                })
            })
            .collect::<Result<_>>()?;
        if accepted_algorithms.is_empty() {
            return Err(Error::Initialization(
                "no accepted hash algorithms configured".to_string(),
            ));
        }

        let signing_digest = match identity.algorithm() {
            KeyAlgorithm::EcdsaP256 => HashAlgorithm::Sha256,
            KeyAlgorithm::EcdsaP384 => HashAlgorithm::Sha384,
            KeyAlgorithm::Rsa => {
                let configured = HashAlgorithm::resolve(&config.signing_digest_algorithm)
                    .unwrap_or(HashAlgorithm::Sha256);
                if !identity.supports_signing_digest(configured) {
                    return Err(Error::Initialization(format!(
                        "{} is not supported as a signing digest",
                        configured
                    )));
                }
                configured
            }
        };

        let ess_algorithm =
            HashAlgorithm::resolve(&config.ess_cert_id_algorithm).unwrap_or(HashAlgorithm::Sha256);
        let cert_hash = compute_digest(ess_algorithm, identity.certificate_der());
        let ess_certificate = SigningCertificateV2::new(ess_algorithm, cert_hash)
            .map_err(|e| Error::Initialization(format!("could not build ESSCertIDv2: {}", e)))?;

        tracing::info!(
            policy = %policy,
            key_algorithm = identity.algorithm().name(),
            signing_digest = %signing_digest,
            "successfully initialized TSA; accepted hash algorithms: {:?}",
            accepted_algorithms.iter().map(HashAlgorithm::name).collect::<Vec<_>>()
        );

        Ok(Self {
            identity,
            policy,
            accepted_algorithms,
            signing_digest,
            ess_certificate,
            serial_number_generator,
            clock,
        })
    }

    /// The signing identity held by this engine
    pub fn identity(&self) -> &SigningIdentity {
        &self.identity
    }

    /// The policy OID responses are produced under
    pub fn policy(&self) -> &ObjectIdentifier {
        &self.policy
    }

    /// The digest algorithms this engine accepts in requests
    pub fn accepted_algorithms(&self) -> &BTreeSet<HashAlgorithm> {
        &self.accepted_algorithms
    }

    /// Decode, validate and answer a DER-encoded TSP request
    pub fn sign_request(&self, bytes: &[u8]) -> Result<TimeStampResponseData> {
        let request = decode_request(bytes)?;
        self.build_response(request)
    }

    /// Answer an already decoded request
    pub fn build_response(&self, request: TimeStampRequestData) -> Result<TimeStampResponseData> {
        if let Some(policy_id) = &request.policy_id {
            if *policy_id != self.policy.to_string() {
                let status_text = format!("policy '{}' is not accepted", policy_id);
                return self.reject(request, FailureInfo::UnacceptedPolicy, status_text);
            }
        }

        if !self.accepted_algorithms.contains(&request.hash_algorithm) {
            let status_text =
                format!("hash algorithm {} is not accepted", request.hash_algorithm);
            return self.reject(request, FailureInfo::BadAlgorithm, status_text);
        }

        self.grant(request)
    }

    /// Validate a previously issued response against this engine's identity
    pub fn validate(&self, bytes: &[u8]) -> Result<TimeStampValidationResult> {
        validate_response(bytes, &self.identity)
    }

    fn reject(
        &self,
        request: TimeStampRequestData,
        failure_info: FailureInfo,
        status_text: String,
    ) -> Result<TimeStampResponseData> {
        let status = PkiStatusInfo::rejection(&status_text, failure_info)?;
        let response = TimeStampResp {
            status,
            time_stamp_token: None,
        };
        let encoded = response.to_der()?;

        tracing::info!(reason = %status_text, "rejected TSP request");

        Ok(TimeStampResponseData {
            id: None,
            status: ResponseStatus::Rejection,
            status_text: Some(status_text),
            failure_info: Some(failure_info),
            generation_time: self.whole_second_now()?,
            serial_number: None,
            request,
            encoded,
        })
    }

    fn grant(&self, request: TimeStampRequestData) -> Result<TimeStampResponseData> {
        let serial_number = self.serial_number_generator.next_serial()?;
        let generation_time = self.whole_second_now()?;

        // The raw bytes are authoritative; the imprint and nonce are taken
        // from them so the token echoes the request verbatim.
        let request_asn = TimeStampReq::from_der(&request.encoded)
            .map_err(|e| Error::Signing(format!("validated request no longer decodes: {}", e)))?;

        let tst_info = TstInfo {
            version: 1,
            policy: self.policy,
            message_imprint: request_asn.message_imprint.clone(),
            serial_number: int_from_biguint(&serial_number)?,
            gen_time: generalized_time(generation_time)?,
            accuracy: None,
            ordering: false,
            nonce: request_asn.nonce.clone(),
            tsa: None,
            extensions: None,
        };
        let tst_info_der = tst_info.to_der()?;

        let signed_attrs = self.build_signed_attributes(&tst_info_der)?;
        let signed_attrs_der = signed_attrs.to_der()?;
        let signature = self.identity.sign(&signed_attrs_der, self.signing_digest)?;

        let certificate = self.identity.certificate();
        let signer_info = SignerInfo {
            version: CmsVersion::V1,
            sid: SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
                issuer: certificate.tbs_certificate.issuer.clone(),
                serial_number: certificate.tbs_certificate.serial_number.clone(),
            }),
            digest_alg: digest_algorithm_identifier(self.signing_digest),
            signed_attrs: Some(signed_attrs),
            signature_algorithm: self.identity.signature_algorithm(self.signing_digest)?,
            signature: OctetString::new(signature)?,
            unsigned_attrs: None,
        };

        let signed_data = SignedData {
            version: CmsVersion::V3,
            digest_algorithms: SetOfVec::try_from(vec![digest_algorithm_identifier(
                self.signing_digest,
            )])?,
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: OID_TST_INFO,
                econtent: Some(Any::new(Tag::OctetString, tst_info_der)?),
            },
            certificates: self.embedded_certificates(request.certificate_requested)?,
            crls: None,
            signer_infos: SignerInfos(SetOfVec::try_from(vec![signer_info])?),
        };

        let content_info = ContentInfo {
            content_type: OID_SIGNED_DATA,
            content: Any::encode_from(&signed_data)?,
        };

        let response = TimeStampResp {
            status: PkiStatusInfo::granted(),
            time_stamp_token: Some(Any::encode_from(&content_info)?),
        };
        let encoded = response.to_der()?;

        tracing::info!(serial = %serial_number, "successfully signed TSP request");

        Ok(TimeStampResponseData {
            id: None,
            status: ResponseStatus::Granted,
            status_text: None,
            failure_info: None,
            generation_time,
            serial_number: Some(serial_number),
            request,
            encoded,
        })
    }

    /// The certificates embedded in the token, iff the request asked for them
    fn embedded_certificates(&self, certificate_requested: bool) -> Result<Option<CertificateSet>> {
        if !certificate_requested {
            return Ok(None);
        }

        let mut choices = vec![CertificateChoices::Certificate(
            self.identity.certificate().clone(),
        )];
        for chain_der in self.identity.chain_der() {
            let chain_certificate = Certificate::from_der(chain_der).map_err(|e| {
                Error::Signing(format!("chain certificate no longer decodes: {}", e))
            })?;
            choices.push(CertificateChoices::Certificate(chain_certificate));
        }

        Ok(Some(CertificateSet(SetOfVec::try_from(choices)?)))
    }

    fn build_signed_attributes(&self, tst_info_der: &[u8]) -> Result<SetOfVec<Attribute>> {
        let message_digest = compute_digest(self.signing_digest, tst_info_der);

        let attributes = vec![
            Attribute {
                oid: OID_CONTENT_TYPE,
                values: SetOfVec::try_from(vec![Any::encode_from(&OID_TST_INFO)?])?,
            },
            Attribute {
                oid: OID_MESSAGE_DIGEST,
                values: SetOfVec::try_from(vec![Any::encode_from(&OctetString::new(
                    message_digest,
                )?)?])?,
            },
            Attribute {
                oid: OID_SIGNING_CERTIFICATE_V2,
                values: SetOfVec::try_from(vec![Any::encode_from(&self.ess_certificate)?])?,
            },
        ];

        Ok(SetOfVec::try_from(attributes)?)
    }

    /// The current time at the whole-second resolution tokens carry
    fn whole_second_now(&self) -> Result<DateTime<Utc>> {
        let now = self.clock.now();
        DateTime::from_timestamp(now.timestamp(), 0)
            .ok_or_else(|| Error::Signing("clock out of range".to_string()))
    }
}

/// Convert a timestamp to the DER `GeneralizedTime` embedded in tokens
fn generalized_time(time: DateTime<Utc>) -> Result<GeneralizedTime> {
    let seconds = time.timestamp();
    if seconds < 0 {
        return Err(Error::Signing("time before the unix epoch".to_string()));
    }

    Ok(GeneralizedTime::from_unix_duration(Duration::from_secs(
        seconds as u64,
    ))?)
}

