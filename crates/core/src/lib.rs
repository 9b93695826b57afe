//! Core caching decision engine for shellcache.
//!
//! This crate provides:
//! - Versioned cache lifecycle (install, activate) per generation
//! - Cache-first and network-first request resolution
//! - Cache store adapters (SQLite, in-memory)
//! - Unified error types and configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod generation;
pub mod host;
pub mod http;
pub mod lifecycle;
pub mod manifest;
pub mod strategy;
pub mod transport;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheHandle, CacheStorage, MemoryStorage, SqliteStorage};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use events::{FetchEvent, HostControl};
pub use generation::{GenerationId, VersionRegistry};
pub use host::{Dispatcher, WorkerState};
pub use http::{Request, RequestKey, Response, ResponseType};
pub use lifecycle::{ActivateReport, InstallReport, LifecycleController, TakeoverPolicy};
pub use manifest::Manifest;
pub use strategy::{ResolutionPolicy, Resolved, ResponseSource, Strategy};
pub use transport::Transport;
pub use worker::{CacheWorker, Worker, WorkerOptions};
