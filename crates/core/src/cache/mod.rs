//! Named, versioned cache stores.
//!
//! The engine talks to stores only through [`CacheStorage`] and
//! [`CacheHandle`]. Two adapters ship with the crate:
//!
//! - [`SqliteStorage`]: persistent, via tokio-rusqlite, WAL mode, schema
//!   migrations, entries cascade-deleted with their store
//! - [`MemoryStorage`]: process-local, for ephemeral hosts and tests

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::SqliteStorage;
pub use entries::SqliteCache;
pub use memory::{MemoryCache, MemoryStorage};
pub use store::{CacheHandle, CacheStorage};
