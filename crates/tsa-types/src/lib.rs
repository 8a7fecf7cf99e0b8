//! Domain types for an RFC 3161 Time-Stamp Authority
//!
//! This crate provides the protocol-independent data model shared by the
//! signing engine and its collaborators: the hash algorithm registry,
//! response status and failure-info classifications, and the decoded
//! request/response/validation data structures.

pub mod encoding;
pub mod hash;
pub mod response;
pub mod status;
pub mod validation;

// Re-export base64_bytes for field attributes in dependent crates
pub use encoding::base64_bytes;

pub use hash::HashAlgorithm;
pub use response::{TimeStampRequestData, TimeStampResponseData};
pub use status::{FailureInfo, ResponseStatus};
pub use validation::{SigningCertificateInformation, TimeStampValidationResult};
