//! Application config: a YAML file plus environment overrides.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use relaystore_storage::{BackendKind, StoreConfig};

use crate::logging::LogConfig;

pub const ENV_DATABASE_URL: &str = "RELAYSTORE_DATABASE_URL";
pub const ENV_TABLE_PREFIX: &str = "RELAYSTORE_TABLE_PREFIX";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log: LogConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("invalid config YAML")
    }

    /// Read `path` if given (defaults otherwise), then apply process env
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .with_context(|| format!("reading config {}", p.display()))?;
                Self::from_yaml(&text).with_context(|| format!("parsing {}", p.display()))?
            }
            None => Self::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Apply `RELAYSTORE_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_DATABASE_URL).filter(|u| !u.is_empty()) {
            self.set_database_url(url);
        }
        if let Some(prefix) = lookup(ENV_TABLE_PREFIX) {
            self.store.table_prefix = prefix;
        }
    }

    /// Point the store at `url`, switching away from the in-memory backend
    /// when the URL names a database.
    pub fn set_database_url(&mut self, url: String) {
        if self.store.backend == BackendKind::Memory {
            self.store.backend = infer_backend(&url);
        }
        self.store.database_url = Some(url);
    }
}

pub fn infer_backend(url: &str) -> BackendKind {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        BackendKind::Postgres
    } else {
        BackendKind::Sqlite
    }
}
