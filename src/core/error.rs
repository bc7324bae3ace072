//! Error types for the audit pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pipeline operations.
#[derive(Error, Debug)]
pub enum Error {
    // Ledger errors
    #[error("chain integrity violated at sequence {0}")]
    IntegrityViolation(u64),

    #[error("chain is halted pending manual review")]
    ChainHalted,

    #[error("ledger entry creation failed: {0}")]
    EntryCreationFailed(String),

    // Session errors
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session already sealed: {0}")]
    SessionSealed(String),

    // Attestation errors
    #[error("attestor node failed: {0}")]
    NodeFailure(String),

    #[error("stake below minimum: {0}")]
    InsufficientStake(u64),

    // Cryptography errors
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    // Serialization errors
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for Error {
    fn from(_: ed25519_dalek::SignatureError) -> Self {
        Error::SignatureVerificationFailed
    }
}
