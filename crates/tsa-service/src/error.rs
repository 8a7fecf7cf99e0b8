//! Error types for the service layer

use thiserror::Error;

/// Errors that can occur while issuing or querying responses
#[derive(Error, Debug)]
pub enum Error {
    /// The engine rejected or failed to process the request
    #[error(transparent)]
    Signing(#[from] tsa_signing::Error),

    /// The repository could not store or read a response
    #[error("Repository error: {0}")]
    Repository(String),
}

/// Result type for service operations
pub type Result<T> = std::result::Result<T, Error>;
