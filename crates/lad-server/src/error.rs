//! Server error types.

use lad_types::error::LadError;
use thiserror::Error;

/// Errors from constructing or running a [`crate::LadServer`].
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration, signing, or I/O failure.
    #[error(transparent)]
    Lad(#[from] LadError),
    /// The listen address could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// Certificate or key could not be loaded.
    #[error("TLS error: {0}")]
    Tls(String),
}

/// Alias for Result with ServerError.
pub type ServerResult<T> = Result<T, ServerError>;
