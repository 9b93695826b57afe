//! In-process cache storage.
//!
//! Keeps every store in memory behind `parking_lot` locks. No lock is held
//! across an await point.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::store::{CacheHandle, CacheStorage};
use crate::Error;
use crate::http::{RequestKey, Response};

/// One named in-memory store.
#[derive(Clone, Debug)]
pub struct MemoryCache {
    name: Arc<str>,
    entries: Arc<RwLock<Vec<(RequestKey, Response)>>>,
    live: Arc<AtomicBool>,
}

impl MemoryCache {
    fn new(name: &str) -> Self {
        Self { name: Arc::from(name), entries: Arc::default(), live: Arc::new(AtomicBool::new(true)) }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl CacheHandle for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, key: &RequestKey) -> Result<Option<Response>, Error> {
        Ok(self
            .entries
            .read()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, r)| r.clone()))
    }

    async fn put(&self, key: RequestKey, response: Response) -> Result<(), Error> {
        if !self.live.load(Ordering::Acquire) {
            return Err(Error::Store(format!("cache {} has been deleted", self.name)));
        }
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = response,
            None => entries.push((key, response)),
        }
        Ok(())
    }

    async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(k, _)| k != key);
        Ok(entries.len() != before)
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, Error> {
        Ok(self.entries.read().iter().map(|(k, _)| k.clone()).collect())
    }
}

/// Process-local collection of named stores.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    stores: Arc<RwLock<Vec<MemoryCache>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    type Handle = MemoryCache;

    async fn open(&self, name: &str) -> Result<MemoryCache, Error> {
        let mut stores = self.stores.write();
        if let Some(existing) = stores.iter().find(|c| &*c.name == name) {
            return Ok(existing.clone());
        }
        let cache = MemoryCache::new(name);
        stores.push(cache.clone());
        Ok(cache)
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        Ok(self.stores.read().iter().any(|c| &*c.name == name))
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut stores = self.stores.write();
        let Some(pos) = stores.iter().position(|c| &*c.name == name) else {
            return Ok(false);
        };
        let removed = stores.remove(pos);
        removed.live.store(false, Ordering::Release);
        Ok(true)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.stores.read().iter().map(|c| c.name.to_string()).collect())
    }
}
