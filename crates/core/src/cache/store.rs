//! Cache store adapter traits.

use async_trait::async_trait;

use crate::Error;
use crate::http::{RequestKey, Response};

/// An opened, named cache store.
///
/// Handles are cheap to clone so background writers can own one.
#[async_trait]
pub trait CacheHandle: Clone + Send + Sync + 'static {
    /// Name of the store this handle addresses.
    fn name(&self) -> &str;

    /// Look up the stored response for a request key.
    async fn match_request(&self, key: &RequestKey) -> Result<Option<Response>, Error>;

    /// Store a response, replacing any previous entry for the key.
    async fn put(&self, key: RequestKey, response: Response) -> Result<(), Error>;

    /// Remove one entry. Returns whether it existed.
    async fn delete(&self, key: &RequestKey) -> Result<bool, Error>;

    /// Keys of every entry, in insertion order.
    async fn keys(&self) -> Result<Vec<RequestKey>, Error>;
}

/// The collection of named stores owned by the host.
#[async_trait]
pub trait CacheStorage: Send + Sync + 'static {
    type Handle: CacheHandle;

    /// Open a store, creating it if absent.
    async fn open(&self, name: &str) -> Result<Self::Handle, Error>;

    /// Whether a store with this name exists.
    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// Delete a store and all its entries. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Names of every store, in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;
}
