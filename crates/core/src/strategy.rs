//! Request resolution policies.
//!
//! A deployment picks one [`Strategy`]:
//!
//! - `cache-first`: serve from the current store, fetch on a miss and refill
//!   the store in the background
//! - `network-first`: always fetch, refresh the store on success, fall back
//!   to the store when the network fails
//!
//! Only basic, non-redirected 200 responses are ever written. Background
//! writes run as detached tasks; the response path never awaits them and
//! their failures are logged, not surfaced.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::Error;
use crate::cache::{CacheHandle, CacheStorage};
use crate::generation::VersionRegistry;
use crate::http::{Request, RequestKey, Response};
use crate::transport::Transport;

/// Resolution strategy, selected once at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Cache-First-Then-Refill.
    #[default]
    CacheFirst,
    /// Network-First-Then-Cache-Fallback.
    NetworkFirst,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cache-first" => Ok(Strategy::CacheFirst),
            "network-first" => Ok(Strategy::NetworkFirst),
            other => Err(Error::InvalidState(format!("unknown strategy: {other}"))),
        }
    }
}

/// Where a resolved response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
}

/// Outcome of resolving one request.
#[derive(Debug)]
pub struct Resolved {
    pub response: Response,
    pub source: ResponseSource,
    /// Background store write started for this response, if any.
    pub refill: Option<JoinHandle<()>>,
}

impl Resolved {
    fn cached(response: Response) -> Self {
        Self { response, source: ResponseSource::Cache, refill: None }
    }
}

/// Applies the configured strategy against the current generation's store.
pub struct ResolutionPolicy<S, T> {
    strategy: Strategy,
    registry: VersionRegistry,
    storage: Arc<S>,
    transport: Arc<T>,
}

impl<S: CacheStorage, T: Transport> ResolutionPolicy<S, T> {
    pub fn new(strategy: Strategy, registry: VersionRegistry, storage: Arc<S>, transport: Arc<T>) -> Self {
        Self { strategy, registry, storage, transport }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Resolve a request to a response.
    ///
    /// Non-GET requests bypass the store and go straight to the network.
    pub async fn resolve(&self, request: &Request) -> Result<Resolved, Error> {
        if !request.is_cacheable() {
            tracing::debug!(method = %request.method, url = %request.url, "bypassing cache for non-GET request");
            let response = self.transport.fetch(request).await?;
            return Ok(Resolved { response, source: ResponseSource::Network, refill: None });
        }

        match self.strategy {
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::NetworkFirst => self.network_first(request).await,
        }
    }

    async fn cache_first(&self, request: &Request) -> Result<Resolved, Error> {
        let key = request.key();

        if let Some(hit) = self.lookup(&key).await? {
            tracing::debug!(cache = self.registry.cache_name(), url = %key.url, "cache hit");
            return Ok(Resolved::cached(hit));
        }

        tracing::debug!(cache = self.registry.cache_name(), url = %key.url, "cache miss, fetching");

        match self.transport.fetch(request).await {
            Ok(response) => Ok(self.from_network(key, response)),
            Err(e) => {
                tracing::warn!(url = %key.url, error = %e, "fetch failed with no cached copy");
                Err(Error::ResolutionMiss(format!("{key}: not cached and network failed: {e}")))
            }
        }
    }

    async fn network_first(&self, request: &Request) -> Result<Resolved, Error> {
        let key = request.key();

        let err = match self.transport.fetch(request).await {
            Ok(response) => return Ok(self.from_network(key, response)),
            Err(e) => e,
        };

        tracing::warn!(url = %key.url, error = %err, "fetch failed, falling back to cache");

        match self.lookup(&key).await? {
            Some(hit) => {
                tracing::debug!(cache = self.registry.cache_name(), url = %key.url, "served from cache fallback");
                Ok(Resolved::cached(hit))
            }
            None => Err(Error::ResolutionMiss(format!("{key}: network failed and not cached: {err}"))),
        }
    }

    async fn lookup(&self, key: &RequestKey) -> Result<Option<Response>, Error> {
        let cache = self.storage.open(self.registry.cache_name()).await?;
        cache.match_request(key).await
    }

    /// Return a network response, refilling the store if it is storable.
    fn from_network(&self, key: RequestKey, response: Response) -> Resolved {
        if !response.is_storable() {
            tracing::debug!(
                url = %key.url,
                status = response.status,
                response_type = response.response_type.as_str(),
                redirected = response.redirected,
                "response not eligible for caching"
            );
            return Resolved { response, source: ResponseSource::Network, refill: None };
        }

        let refill = self.spawn_refill(key, response.clone());
        Resolved { response, source: ResponseSource::Network, refill: Some(refill) }
    }

    fn spawn_refill(&self, key: RequestKey, response: Response) -> JoinHandle<()> {
        let storage = Arc::clone(&self.storage);
        let name = self.registry.cache_name().to_string();

        tokio::spawn(async move {
            let result: Result<(), Error> = async {
                let cache = storage.open(&name).await?;
                cache.put(key.clone(), response).await
            }
            .await;

            match result {
                Ok(()) => tracing::debug!(cache = %name, url = %key.url, "stored response"),
                Err(e) => tracing::warn!(cache = %name, url = %key.url, error = %e, "background cache write failed"),
            }
        })
    }
}
