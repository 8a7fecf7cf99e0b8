//! Issue and validation services
//!
//! `IssueTimeStampService` wires the engine to its collaborators: sign,
//! save, then notify the registered listeners with the saved response.

use std::sync::Arc;

use tsa_signing::TimeStampAuthority;
use tsa_types::{TimeStampResponseData, TimeStampValidationResult};

use crate::error::Result;
use crate::listener::TimeStampListener;
use crate::repository::ResponseRepository;

/// Signs requests and persists the issued responses
pub struct IssueTimeStampService {
    authority: Arc<TimeStampAuthority>,
    repository: Arc<dyn ResponseRepository>,
    listeners: Vec<Arc<dyn TimeStampListener>>,
}

impl IssueTimeStampService {
    /// Wire the engine to its persistence collaborator
    pub fn new(authority: Arc<TimeStampAuthority>, repository: Arc<dyn ResponseRepository>) -> Self {
        Self {
            authority,
            repository,
            listeners: Vec::new(),
        }
    }

    /// Register a listener notified with each newly saved response
    pub fn register_listener(&mut self, listener: Arc<dyn TimeStampListener>) {
        self.listeners.push(listener);
    }

    /// Sign a DER-encoded request, save the response, notify listeners
    pub fn sign_request(&self, bytes: &[u8]) -> Result<TimeStampResponseData> {
        let response = self.authority.sign_request(bytes)?;
        let saved = self.repository.save(response)?;
        tracing::info!(id = ?saved.id, serial = ?saved.serial_number, "saved TSP response");

        for listener in &self.listeners {
            listener.on_response(&saved);
        }

        Ok(saved)
    }

    /// Look up a previously issued response
    pub fn find_response(&self, id: i64) -> Result<Option<TimeStampResponseData>> {
        self.repository.find_by_id(id)
    }
}

/// Validates previously issued responses against the engine's identity
pub struct ValidateTimeStampService {
    authority: Arc<TimeStampAuthority>,
}

impl ValidateTimeStampService {
    /// Service delegating to the engine's validator
    pub fn new(authority: Arc<TimeStampAuthority>) -> Self {
        Self { authority }
    }

    /// Validate a DER-encoded response
    pub fn validate_response(&self, bytes: &[u8]) -> Result<TimeStampValidationResult> {
        Ok(self.authority.validate(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryResponseRepository;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tsa_signing::asn1::{MessageImprint, TimeStampReq};
    use tsa_signing::{
        RandomSerialNumberGenerator, SigningIdentity, SystemClock, TsaConfig,
    };
    use tsa_types::{HashAlgorithm, ResponseStatus};

    fn authority() -> Arc<TimeStampAuthority> {
        let key_pair = rcgen::KeyPair::generate().unwrap();
        let mut params =
            rcgen::CertificateParams::new(vec!["tsa.example.com".to_string()]).unwrap();
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, "Test TSA");
        let certificate = params.self_signed(&key_pair).unwrap();
        let identity = SigningIdentity::from_key_and_certificates(
            &key_pair.serialize_der(),
            certificate.der().as_ref(),
            Vec::new(),
        )
        .unwrap();

        Arc::new(
            TimeStampAuthority::with_identity(
                identity,
                &TsaConfig::default(),
                Box::new(RandomSerialNumberGenerator::new()),
                Box::new(SystemClock),
            )
            .unwrap(),
        )
    }

    fn request_bytes() -> Vec<u8> {
        let imprint = MessageImprint::new(HashAlgorithm::Sha256, vec![0x33; 32]).unwrap();
        TimeStampReq::new(imprint).unwrap().to_der().unwrap()
    }

    #[test]
    fn test_sign_saves_and_notifies() {
        let authority = authority();
        let repository = Arc::new(InMemoryResponseRepository::new());
        let mut service = IssueTimeStampService::new(authority, repository.clone());

        let notifications = Arc::new(AtomicUsize::new(0));
        let counter = notifications.clone();
        service.register_listener(Arc::new(move |_: &TimeStampResponseData| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let saved = service.sign_request(&request_bytes()).unwrap();
        assert_eq!(saved.id, Some(1));
        assert_eq!(saved.status, ResponseStatus::Granted);
        assert_eq!(notifications.load(Ordering::SeqCst), 1);
        assert_eq!(repository.len(), 1);

        let found = service.find_response(1).unwrap();
        assert_eq!(found, Some(saved));
    }

    #[test]
    fn test_validate_round_trip_through_service() {
        let authority = authority();
        let issue = IssueTimeStampService::new(
            authority.clone(),
            Arc::new(InMemoryResponseRepository::new()),
        );
        let validate = ValidateTimeStampService::new(authority);

        let saved = issue.sign_request(&request_bytes()).unwrap();
        let result = validate.validate_response(&saved.encoded).unwrap();
        assert!(result.signed_by_this_tsa, "{:?}", result.failure_reason);
    }
}
