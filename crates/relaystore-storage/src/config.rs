//! Storage configuration and backend construction.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use relaystore_core::backend::StorageBackend;
use relaystore_core::error::StoreError;
use relaystore_core::reconcile::PolicyTable;
use relaystore_core::store::RecordStore;

use crate::memory::InMemoryBackend;

/// Which storage engine to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Sqlite,
    Postgres,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Sqlite => write!(f, "sqlite"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

/// Connection pool sizing shared by the SQL backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds to wait for a free connection before failing with
    /// `StorageUnavailable`.
    pub acquire_timeout_secs: u64,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 30,
        }
    }
}

/// Everything needed to open a [`RecordStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendKind,
    /// Path or URL; required for `sqlite` and `postgres`.
    pub database_url: Option<String>,
    /// Prepended to every table name (e.g. `"lpr_"`).
    pub table_prefix: String,
    pub pool: PoolOptions,
    pub fork_policy: PolicyTable,
}

impl StoreConfig {
    /// Check the config without touching the database.
    pub fn validate(&self) -> Result<(), StoreError> {
        let prefix_ok = self
            .table_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !prefix_ok {
            return Err(StoreError::Config(format!(
                "table_prefix '{}' may only contain letters, digits and '_'",
                self.table_prefix
            )));
        }
        if self.backend != BackendKind::Memory && self.database_url.is_none() {
            return Err(StoreError::Config(format!(
                "backend '{}' requires database_url",
                self.backend
            )));
        }
        if self.pool.max_connections == 0 {
            return Err(StoreError::Config("pool.max_connections must be at least 1".into()));
        }
        Ok(())
    }

    /// Build the configured backend.
    pub async fn connect(&self) -> Result<Arc<dyn StorageBackend>, StoreError> {
        self.validate()?;
        let url = self.database_url.as_deref().unwrap_or_default();

        let backend: Arc<dyn StorageBackend> = match self.backend {
            BackendKind::Memory => Arc::new(InMemoryBackend::new()),
            #[cfg(feature = "sqlite")]
            BackendKind::Sqlite if url == ":memory:" || url == "sqlite::memory:" => {
                Arc::new(crate::sqlite::SqliteBackend::in_memory().await?)
            }
            #[cfg(feature = "sqlite")]
            BackendKind::Sqlite => Arc::new(crate::sqlite::SqliteBackend::open_with(url, &self.pool).await?),
            #[cfg(feature = "postgres")]
            BackendKind::Postgres => {
                let opts = crate::postgres::PostgresOptions {
                    pool: self.pool.clone(),
                    ..Default::default()
                };
                Arc::new(crate::postgres::PostgresBackend::connect_with_options(url, opts).await?)
            }
            #[allow(unreachable_patterns)]
            other => {
                return Err(StoreError::Config(format!(
                    "backend '{other}' is not compiled in (enable the '{other}' feature)"
                )))
            }
        };
        info!(backend = backend.name(), prefix = %self.table_prefix, "storage backend ready");
        Ok(backend)
    }

    /// Connect and wrap the backend in a [`RecordStore`].
    pub async fn open(&self) -> Result<RecordStore, StoreError> {
        let backend = self.connect().await?;
        Ok(RecordStore::new(backend, self.table_prefix.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaystore_core::reconcile::ForkPolicy;

    #[test]
    fn defaults_to_memory() {
        let cfg = StoreConfig::default();
        assert_eq!(cfg.backend, BackendKind::Memory);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.fork_policy, PolicyTable::default());
    }

    #[test]
    fn sql_backends_need_a_url() {
        let cfg = StoreConfig {
            backend: BackendKind::Sqlite,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(StoreError::Config(_))));
    }

    #[test]
    fn prefix_must_be_an_identifier_fragment() {
        let cfg = StoreConfig {
            table_prefix: "lpr; drop".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn policy_override_from_json() {
        let cfg: StoreConfig = serde_json::from_str(
            r#"{"backend":"sqlite","database_url":":memory:","fork_policy":{"cancel":"hard_delete"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.fork_policy.cancel, ForkPolicy::HardDelete);
        assert_eq!(cfg.fork_policy.fill, ForkPolicy::HardDelete);
        assert_eq!(cfg.pool, PoolOptions::default());
    }

    #[tokio::test]
    async fn memory_store_opens() {
        let store = StoreConfig::default().open().await.unwrap();
        assert_eq!(store.backend_name(), "memory");
        store.create_schema().await.unwrap();
    }
}
