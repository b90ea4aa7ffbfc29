//! relaystore-storage: pluggable storage backends for the relay event store.
//!
//! Backends:
//! - [`memory`]: in-memory (dev/testing, no persistence)
//! - [`sqlite`]: SQLite via `sqlx` (embedded, single-file persistence)
//! - [`postgres`]: PostgreSQL via `sqlx` (feature `postgres`)
//!
//! [`StoreConfig`] picks one at runtime.

pub mod config;
pub mod memory;

#[cfg(any(feature = "sqlite", feature = "postgres"))]
mod sql;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use config::{BackendKind, PoolOptions, StoreConfig};
pub use memory::InMemoryBackend;
