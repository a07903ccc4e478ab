//! Shared error types for LAD.

use thiserror::Error;

/// Top-level error type for discovery, verification, and advertisement.
#[derive(Error, Debug)]
pub enum LadError {
    /// Transport or parse failure during an mDNS or well-known lookup.
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// A trust check (signature, domain, TLS expectation) failed.
    #[error("Verification error: {0}")]
    Verification(String),

    /// Invalid configuration (missing key files, bad paths, unsupported algorithm).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A consent callback failed to produce a decision.
    #[error("Consent error: {0}")]
    Consent(String),

    /// An HTTP request failed or returned an error status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// AgentCard signing failed.
    #[error("Signing error: {0}")]
    Signing(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for LadError {
    fn from(e: serde_json::Error) -> Self {
        LadError::Serialization(e.to_string())
    }
}

/// Alias for Result with LadError.
pub type LadResult<T> = Result<T, LadError>;
