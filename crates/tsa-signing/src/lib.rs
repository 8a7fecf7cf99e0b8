//! RFC 3161 Time-Stamp Protocol engine
//!
//! This crate implements the server side of the Time-Stamp Protocol as
//! specified in RFC 3161: request decoding and validation, token signing
//! under an operator-controlled identity, and validation of previously
//! issued responses.
//!
//! Initialization is performed exactly once before traffic is served; a
//! [`TimeStampAuthority`] value only exists when its identity loaded
//! successfully. Afterwards, decode, sign and validate are synchronous,
//! CPU-bound operations safe to call from any number of threads.

pub mod asn1;
pub mod clock;
pub mod config;
pub mod error;
pub mod hash;
pub mod identity;
pub mod request;
pub mod response;
pub mod serial;
pub mod verify;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{is_valid_digest_algorithm_identifier, ConfigViolation, KeystoreConfig, TsaConfig};
pub use error::{Error, Result};
pub use identity::{
    keystore_loader, load_identity, EmbeddedKeystoreLoader, EmbeddedResources,
    FilesystemKeystoreLoader, KeyAlgorithm, KeystoreLoader, KeystoreSource, SigningIdentity,
    EMBEDDED_PATH_PREFIX,
};
pub use request::decode_request;
pub use response::TimeStampAuthority;
pub use serial::{FixedSerialNumberGenerator, RandomSerialNumberGenerator, SerialNumberGenerator};
pub use verify::validate_response;
