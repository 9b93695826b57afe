//! Structured errors for the host driver.
//!
//! Every failure printed on stdout carries a stable code taken from the
//! message prefix.

use shellcache_client::UrlError;
use shellcache_core::Error;

/// Errors reported per input line.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The input line could not be parsed.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The locator did not resolve to an http(s) URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(#[from] UrlError),

    /// The worker resolved the request to a failure.
    #[error("{0}")]
    Resolve(#[from] Error),
}

impl HostError {
    /// Stable error code, e.g. `RESOLUTION_MISS`.
    pub fn code(&self) -> String {
        let rendered = self.to_string();
        rendered.split(':').next().unwrap_or_default().trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(HostError::InvalidInput("x".into()).code(), "INVALID_INPUT");
        assert_eq!(HostError::InvalidUrl(UrlError::Empty).code(), "INVALID_URL");
        assert_eq!(HostError::Resolve(Error::ResolutionMiss("GET /".into())).code(), "RESOLUTION_MISS");
        assert_eq!(HostError::Resolve(Error::AlreadyResponded).code(), "ALREADY_RESPONDED");
    }
}
