//! Network transport seam.

use async_trait::async_trait;

use crate::Error;
use crate::http::{Request, Response};

/// Issues a request over the network.
///
/// Implementations return `Err` only when no response was obtained at all
/// (offline, DNS failure, connection reset, transport timeout). HTTP error
/// statuses are still `Ok` responses.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}
