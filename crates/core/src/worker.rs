//! The interface a host drives, and the cache worker that implements it.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::Error;
use crate::cache::CacheStorage;
use crate::events::{FetchEvent, HostControl};
use crate::generation::{GenerationId, VersionRegistry};
use crate::lifecycle::{ActivateReport, InstallReport, LifecycleController, TakeoverPolicy};
use crate::strategy::{ResolutionPolicy, Strategy};
use crate::transport::Transport;

/// Event handlers a host invokes over one worker generation's lifetime.
#[async_trait]
pub trait Worker: Send + Sync {
    async fn on_install(&self, host: &dyn HostControl) -> Result<InstallReport, Error>;

    async fn on_activate(&self, host: &dyn HostControl) -> Result<ActivateReport, Error>;

    /// Resolve the event's request and respond exactly once.
    async fn on_resolve(&self, event: &FetchEvent);
}

/// Everything the cache worker needs, already validated.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub generation: GenerationId,
    pub assets: Vec<Url>,
    pub strategy: Strategy,
    pub takeover: TakeoverPolicy,
}

/// Lifecycle controller plus resolution policy over one shared store and
/// transport.
pub struct CacheWorker<S, T> {
    lifecycle: LifecycleController<S, T>,
    policy: ResolutionPolicy<S, T>,
}

impl<S: CacheStorage, T: Transport> CacheWorker<S, T> {
    pub fn new(options: WorkerOptions, storage: Arc<S>, transport: Arc<T>) -> Self {
        let registry = VersionRegistry::new(options.generation);
        let policy =
            ResolutionPolicy::new(options.strategy, registry.clone(), Arc::clone(&storage), Arc::clone(&transport));
        let lifecycle = LifecycleController::new(registry, options.assets, options.takeover, storage, transport);
        Self { lifecycle, policy }
    }

    pub fn generation(&self) -> &GenerationId {
        self.lifecycle.registry().current()
    }

    pub fn strategy(&self) -> Strategy {
        self.policy.strategy()
    }
}

#[async_trait]
impl<S: CacheStorage, T: Transport> Worker for CacheWorker<S, T> {
    async fn on_install(&self, host: &dyn HostControl) -> Result<InstallReport, Error> {
        self.lifecycle.install(host).await
    }

    async fn on_activate(&self, host: &dyn HostControl) -> Result<ActivateReport, Error> {
        self.lifecycle.activate(host).await
    }

    async fn on_resolve(&self, event: &FetchEvent) {
        let outcome = self.policy.resolve(event.request()).await;

        let refill = match outcome {
            Ok(resolved) => {
                let refill = resolved.refill;
                if let Err(e) = event.respond_with(Ok(resolved.response)) {
                    tracing::warn!(url = %event.request().url, error = %e, "fetch event already answered");
                }
                refill
            }
            Err(err) => {
                tracing::debug!(url = %event.request().url, error = %err, "request resolved to failure");
                if let Err(e) = event.respond_with(Err(err)) {
                    tracing::warn!(url = %event.request().url, error = %e, "fetch event already answered");
                }
                None
            }
        };

        if let Some(task) = refill {
            event.wait_until(task);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheHandle, MemoryStorage};
    use crate::http::Request;
    use crate::testing::{MockTransport, url};

    struct NoopHost;

    #[async_trait]
    impl HostControl for NoopHost {
        async fn skip_waiting(&self) -> Result<(), Error> {
            Ok(())
        }

        async fn claim_clients(&self) -> Result<(), Error> {
            Ok(())
        }
    }

    fn options(generation: &str, strategy: Strategy, assets: &[&str]) -> WorkerOptions {
        WorkerOptions {
            generation: GenerationId::new(generation).unwrap(),
            assets: assets.iter().map(|a| url(a)).collect(),
            strategy,
            takeover: TakeoverPolicy::default(),
        }
    }

    #[tokio::test]
    async fn test_full_lifecycle_then_offline_resolution() {
        let storage = Arc::new(MemoryStorage::new());
        let transport = Arc::new(MockTransport::new().serve("/", "root").serve("/index.html", "index"));
        let worker = CacheWorker::new(
            options("shell-v1", Strategy::CacheFirst, &["/", "/index.html"]),
            Arc::clone(&storage),
            Arc::clone(&transport),
        );

        worker.on_install(&NoopHost).await.unwrap();
        worker.on_activate(&NoopHost).await.unwrap();
        transport.set_offline(true);

        let (event, rx) = FetchEvent::new(Request::get(url("/index.html")));
        worker.on_resolve(&event).await;

        let response = rx.await.unwrap().unwrap();
        assert_eq!(&response.body[..], b"index");
        assert_eq!(event.pending(), 0);
    }

    #[tokio::test]
    async fn test_resolve_registers_refill_as_extension() {
        let storage = Arc::new(MemoryStorage::new());
        let transport = Arc::new(MockTransport::new().serve("/app.js", "code"));
        let worker = CacheWorker::new(options("shell-v1", Strategy::NetworkFirst, &[]), Arc::clone(&storage), transport);

        let (event, rx) = FetchEvent::new(Request::get(url("/app.js")));
        worker.on_resolve(&event).await;

        assert!(event.has_responded());
        assert_eq!(event.pending(), 1);
        assert_eq!(&rx.await.unwrap().unwrap().body[..], b"code");

        event.settled().await;
        let cache = storage.open("shell-v1").await.unwrap();
        assert!(cache.match_request(&Request::get(url("/app.js")).key()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_resolve_failure_is_delivered() {
        let worker = CacheWorker::new(
            options("shell-v1", Strategy::CacheFirst, &[]),
            Arc::new(MemoryStorage::new()),
            Arc::new(MockTransport::offline()),
        );

        let (event, rx) = FetchEvent::new(Request::get(url("/missing")));
        worker.on_resolve(&event).await;

        assert!(matches!(rx.await.unwrap(), Err(Error::ResolutionMiss(_))));
    }

    #[tokio::test]
    async fn test_generations_are_isolated() {
        let storage = Arc::new(MemoryStorage::new());
        let v1 = CacheWorker::new(
            options("shell-v1", Strategy::CacheFirst, &["/"]),
            Arc::clone(&storage),
            Arc::new(MockTransport::new().serve("/", "v1 root")),
        );
        v1.on_install(&NoopHost).await.unwrap();

        let v2 = CacheWorker::new(
            options("shell-v2", Strategy::CacheFirst, &[]),
            Arc::clone(&storage),
            Arc::new(MockTransport::offline()),
        );
        let (event, rx) = FetchEvent::new(Request::get(url("/")));
        v2.on_resolve(&event).await;

        assert!(matches!(rx.await.unwrap(), Err(Error::ResolutionMiss(_))));
        assert_eq!(v2.generation().as_str(), "shell-v2");
        assert_eq!(v2.strategy(), Strategy::CacheFirst);
    }
}
