//! Unified error types for shellcache.
//!
//! Every variant renders with a stable code prefix so hosts can match on
//! the failure class without parsing free-form text.

use tokio_rusqlite::rusqlite;

/// Unified error type for the caching engine and its adapters.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A manifest asset could not be fetched during install.
    #[error("INSTALL_FAILED: {asset}: {reason}")]
    InstallFailed { asset: String, reason: String },

    /// Store enumeration or deletion failed during activate.
    #[error("ACTIVATION_FAILED: {0}")]
    ActivationFailed(String),

    /// Neither the cache nor the network could satisfy the request.
    #[error("RESOLUTION_MISS: {0}")]
    ResolutionMiss(String),

    /// The transport failed to produce a response.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Store operation failed in a non-SQLite adapter.
    #[error("CACHE_ERROR: {0}")]
    Store(String),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A locator could not be parsed or resolved.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// A lifecycle event was delivered out of order.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),

    /// `respond_with` was invoked more than once for one fetch event.
    #[error("ALREADY_RESPONDED")]
    AlreadyResponded,
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}
