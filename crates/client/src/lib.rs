//! Network side of shellcache.
//!
//! This crate provides the reqwest-backed transport the caching engine
//! fetches through, plus locator resolution shared by hosts.

pub mod fetch;

pub use fetch::{HttpTransport, TransportConfig, UrlError, classify, resolve_locator};
