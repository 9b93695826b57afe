//! Test doubles for the transport and store seams.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use crate::Error;
use crate::cache::{CacheHandle, CacheStorage, MemoryCache, MemoryStorage};
use crate::http::{Request, RequestKey, Response};
use crate::transport::Transport;

pub(crate) const ROOT: &str = "http://localhost:8080/";

/// Resolve a path (or absolute URL) against the test application root.
pub(crate) fn url(path: &str) -> Url {
    Url::parse(ROOT).unwrap().join(path).unwrap()
}

/// Scripted transport: routes by URL, unknown URLs fail like an
/// unreachable host.
#[derive(Default)]
pub(crate) struct MockTransport {
    routes: Mutex<HashMap<String, Response>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn offline() -> Self {
        let transport = Self::default();
        transport.set_offline(true);
        transport
    }

    pub(crate) fn serve(self, path: &str, body: &'static str) -> Self {
        let target = url(path);
        self.respond(path, Response::ok(target, body))
    }

    pub(crate) fn respond(self, path: &str, response: Response) -> Self {
        self.routes.lock().insert(url(path).to_string(), response);
        self
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }
        self.routes
            .lock()
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| Error::Network(format!("unreachable: {}", request.url)))
    }
}

#[derive(Default)]
struct Faults {
    open: AtomicBool,
    put: AtomicBool,
    keys: AtomicBool,
    delete: AtomicBool,
    put_attempts: AtomicUsize,
}

/// In-memory storage with switchable failures.
#[derive(Clone, Default)]
pub(crate) struct FailingStorage {
    inner: MemoryStorage,
    faults: Arc<Faults>,
}

impl FailingStorage {
    pub(crate) fn failing_puts() -> Self {
        let storage = Self::default();
        storage.faults.put.store(true, Ordering::SeqCst);
        storage
    }

    pub(crate) fn failing_opens() -> Self {
        let storage = Self::default();
        storage.faults.open.store(true, Ordering::SeqCst);
        storage
    }

    pub(crate) fn failing_keys() -> Self {
        let storage = Self::default();
        storage.faults.keys.store(true, Ordering::SeqCst);
        storage
    }

    pub(crate) fn failing_deletes() -> Self {
        let storage = Self::default();
        storage.faults.delete.store(true, Ordering::SeqCst);
        storage
    }

    pub(crate) fn inner(&self) -> &MemoryStorage {
        &self.inner
    }

    pub(crate) fn put_attempts(&self) -> usize {
        self.faults.put_attempts.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub(crate) struct FailingCache {
    inner: MemoryCache,
    faults: Arc<Faults>,
}

#[async_trait]
impl CacheHandle for FailingCache {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn match_request(&self, key: &RequestKey) -> Result<Option<Response>, Error> {
        self.inner.match_request(key).await
    }

    async fn put(&self, key: RequestKey, response: Response) -> Result<(), Error> {
        self.faults.put_attempts.fetch_add(1, Ordering::SeqCst);
        if self.faults.put.load(Ordering::SeqCst) {
            return Err(Error::Store("disk full".into()));
        }
        self.inner.put(key, response).await
    }

    async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        self.inner.delete(key).await
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, Error> {
        self.inner.keys().await
    }
}

#[async_trait]
impl CacheStorage for FailingStorage {
    type Handle = FailingCache;

    async fn open(&self, name: &str) -> Result<FailingCache, Error> {
        if self.faults.open.load(Ordering::SeqCst) {
            return Err(Error::Store(format!("cannot open {name}")));
        }
        let inner = self.inner.open(name).await?;
        Ok(FailingCache { inner, faults: Arc::clone(&self.faults) })
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.inner.has(name).await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        if self.faults.delete.load(Ordering::SeqCst) {
            return Err(Error::Store(format!("cannot delete {name}")));
        }
        self.inner.delete(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        if self.faults.keys.load(Ordering::SeqCst) {
            return Err(Error::Store("cannot list caches".into()));
        }
        self.inner.keys().await
    }
}
