//! Error types for token operations.

use thiserror::Error;

/// Errors that can occur while issuing, parsing or checking tokens.
#[derive(Debug, Error)]
pub enum ApiTokenError {
    /// The operating system random source could not supply bytes.
    #[error("Entropy unavailable: {0}")]
    EntropyUnavailable(String),

    /// The hashing primitive rejected its input or parameters.
    #[error("Hashing failed: {0}")]
    HashingFailed(String),

    /// Secret is longer than the hashing algorithm consumes.
    #[error("Secret too long: {len} bytes (max {max})")]
    SecretTooLong { len: usize, max: usize },

    /// Stored verifier is not a structurally valid hash.
    #[error("Verifier corrupt: {0}")]
    VerifierCorrupt(String),

    /// Token format is invalid (wrong number of parts, wrong payload size)
    #[error("Invalid token format")]
    InvalidFormat,

    /// Token prefix doesn't match expected value
    #[error("Invalid prefix: expected '{expected}', got '{got}'")]
    InvalidPrefix { expected: String, got: String },

    /// Version number is not supported
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(i16),

    /// Base32 decoding failed
    #[error("Invalid base32 encoding")]
    InvalidEncoding,

    /// The credential store failed while provisioning.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by a [`crate::CredentialStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store backend: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("credential store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Wrap any backend error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

/// Result type alias for token operations.
pub type Result<T> = std::result::Result<T, ApiTokenError>;
