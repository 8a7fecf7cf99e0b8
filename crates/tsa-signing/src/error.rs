//! Error types for the time-stamp protocol engine
//!
//! The variants follow the engine's error taxonomy: per-request input
//! errors are recoverable (reject that request, keep serving), identity
//! and key-material errors are fatal, and a cryptographic mismatch during
//! validation is reported through the validation result, never through
//! these types.

use thiserror::Error;

/// Errors that can occur in time-stamp protocol operations
#[derive(Error, Debug)]
pub enum Error {
    /// Request bytes are not a structurally valid TSP request
    #[error("Invalid TSP request: {0}")]
    InvalidRequest(String),

    /// The request declares a digest algorithm OID unknown to the registry
    #[error("Unknown hash algorithm OID '{oid}'")]
    UnknownHashAlgorithm {
        /// The unresolvable OID in dotted-decimal form
        oid: String,
    },

    /// Response bytes cannot be decoded far enough to evaluate
    #[error("Invalid TSP response: {0}")]
    InvalidResponse(String),

    /// Key material or certificate cannot be parsed or is unsupported
    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    /// The engine could not be initialized; fatal
    #[error("Could not initialize TSA: {0}")]
    Initialization(String),

    /// Signing failed; unrecoverable key-material or entropy fault
    #[error("Signing error: {0}")]
    Signing(String),
}

impl From<der::Error> for Error {
    fn from(e: der::Error) -> Self {
        Error::Signing(e.to_string())
    }
}

/// Result type for time-stamp protocol operations
pub type Result<T> = std::result::Result<T, Error>;
