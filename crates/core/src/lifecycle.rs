//! Install and activate handling for one cache generation.
//!
//! Install provisions the current generation's store and preloads the
//! manifest as a single all-or-nothing batch. Activate deletes every store
//! left by other generations.

use std::sync::Arc;

use futures_util::future::{join_all, try_join_all};
use serde::Serialize;
use url::Url;

use crate::Error;
use crate::cache::{CacheHandle, CacheStorage};
use crate::events::HostControl;
use crate::generation::VersionRegistry;
use crate::http::Request;
use crate::transport::Transport;

/// Host-policy flags applied after install and activate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TakeoverPolicy {
    /// Ask the host to activate as soon as install succeeds.
    pub skip_waiting: bool,
    /// Ask the host to control open clients as soon as activate succeeds.
    pub claim_clients: bool,
}

impl Default for TakeoverPolicy {
    fn default() -> Self {
        Self { skip_waiting: true, claim_clients: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cache: String,
    pub cached: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub cache: String,
    pub deleted: Vec<String>,
}

pub struct LifecycleController<S, T> {
    registry: VersionRegistry,
    assets: Vec<Url>,
    takeover: TakeoverPolicy,
    storage: Arc<S>,
    transport: Arc<T>,
}

impl<S: CacheStorage, T: Transport> LifecycleController<S, T> {
    pub fn new(
        registry: VersionRegistry, assets: Vec<Url>, takeover: TakeoverPolicy, storage: Arc<S>, transport: Arc<T>,
    ) -> Self {
        Self { registry, assets, takeover, storage, transport }
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    /// Open the current store and preload every manifest asset.
    ///
    /// All assets are fetched before anything is written; one failed or
    /// non-success fetch fails the whole install and writes nothing.
    pub async fn install(&self, host: &dyn HostControl) -> Result<InstallReport, Error> {
        let name = self.registry.cache_name();
        tracing::info!(generation = name, assets = self.assets.len(), "installing cache generation");

        let cache = self
            .storage
            .open(name)
            .await
            .map_err(|e| Error::InstallFailed { asset: name.to_string(), reason: format!("failed to open cache: {e}") })?;

        let fetches = self.assets.iter().map(|asset| async move {
            let request = Request::get(asset.clone());
            match self.transport.fetch(&request).await {
                Ok(response) if response.is_success() => Ok((request.key(), response)),
                Ok(response) => Err(Error::InstallFailed {
                    asset: asset.to_string(),
                    reason: format!("status {}", response.status),
                }),
                Err(e) => Err(Error::InstallFailed { asset: asset.to_string(), reason: e.to_string() }),
            }
        });

        let responses = try_join_all(fetches).await.inspect_err(|e| {
            tracing::error!(generation = name, error = %e, "install failed");
        })?;

        for (key, response) in responses {
            let asset = key.url.clone();
            cache
                .put(key, response)
                .await
                .map_err(|e| Error::InstallFailed { asset, reason: format!("failed to store: {e}") })?;
        }

        tracing::info!(generation = name, cached = self.assets.len(), "cached app shell");

        if self.takeover.skip_waiting {
            host.skip_waiting().await?;
            tracing::debug!(generation = name, "requested immediate activation");
        }

        Ok(InstallReport { cache: name.to_string(), cached: self.assets.len() })
    }

    /// Delete every store except the current one, then optionally claim
    /// open clients.
    ///
    /// Deletions run concurrently and all are awaited before the first
    /// failure, if any, is reported.
    pub async fn activate(&self, host: &dyn HostControl) -> Result<ActivateReport, Error> {
        let current = self.registry.cache_name();
        tracing::info!(generation = current, "activating cache generation");

        let names = self
            .storage
            .keys()
            .await
            .map_err(|e| Error::ActivationFailed(format!("failed to list caches: {e}")))?;

        let stale = self.registry.stale(&names);
        let deletions = stale.iter().map(|name| async move {
            tracing::info!(cache = name, "deleting old cache");
            self.storage
                .delete(name)
                .await
                .map_err(|e| Error::ActivationFailed(format!("failed to delete {name}: {e}")))
        });

        let results = join_all(deletions).await;
        if let Some(err) = results.into_iter().find_map(Result::err) {
            tracing::error!(generation = current, error = %err, "activation failed");
            return Err(err);
        }

        let has_current = self
            .storage
            .has(current)
            .await
            .map_err(|e| Error::ActivationFailed(format!("failed to check {current}: {e}")))?;
        if !has_current {
            tracing::warn!(generation = current, "current cache missing at activation, recreating empty");
            self.storage
                .open(current)
                .await
                .map_err(|e| Error::ActivationFailed(format!("failed to create {current}: {e}")))?;
        }

        if self.takeover.claim_clients {
            host.claim_clients().await?;
            tracing::debug!(generation = current, "claimed open clients");
        }

        Ok(ActivateReport { cache: current.to_string(), deleted: stale.into_iter().map(String::from).collect() })
    }
}
