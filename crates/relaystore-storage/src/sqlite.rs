//! SQLite storage backend.
//!
//! Persists every record kind to a single SQLite file through `sqlx`, with
//! WAL mode for concurrent readers.
//!
//! # Usage
//! ```rust,no_run
//! use relaystore_storage::sqlite::SqliteBackend;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let backend = SqliteBackend::open("./relay.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let backend = SqliteBackend::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqlitePoolOptions, SqliteRow};
use sqlx::query::Query;
use sqlx::{Row as _, Sqlite, SqlitePool};
use tracing::{debug, info};

use relaystore_core::backend::StorageBackend;
use relaystore_core::error::StoreError;
use relaystore_core::query::{Filter, Selection};
use relaystore_core::schema::{Row, StoredRow, TableRef, Value, ID_COLUMN};

use crate::config::PoolOptions;
use crate::sql::{self, Dialect, Statement};

const DIALECT: Dialect = Dialect::Sqlite;

/// SQLite-backed record storage.
#[derive(Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./relay.db"`) or a full
    /// SQLite URL (`"sqlite:./relay.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        Self::open_with(path, &PoolOptions::default()).await
    }

    pub async fn open_with(path: &str, opts: &PoolOptions) -> Result<Self, StoreError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(opts.max_connections)
            .min_connections(opts.min_connections)
            .acquire_timeout(Duration::from_secs(opts.acquire_timeout_secs))
            .connect(&url)
            .await
            .map_err(sql::map_connect_err)?;

        // WAL mode: readers don't block the single writer
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&pool)
            .await
            .map_err(sql::map_connect_err)?;

        debug!(%url, "sqlite pool open");
        Ok(Self { pool })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Every pooled connection would see its own empty database, so the pool
    /// holds exactly one connection and never recycles it.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(sql::map_connect_err)?;
        Ok(Self { pool })
    }

    fn query<'q>(stmt: &'q Statement) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        let mut q = sqlx::query(&stmt.sql);
        for value in &stmt.binds {
            q = match value {
                Value::Int(v) => q.bind(*v),
                Value::Bool(v) => q.bind(*v),
                Value::Text(v) => q.bind(v.as_str()),
            };
        }
        q
    }

    async fn fetch_all(&self, table: &TableRef, stmt: &Statement) -> Result<Vec<SqliteRow>, StoreError> {
        Self::query(stmt)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| sql::map_err(table.schema.kind, e))
    }

    async fn execute(&self, table: &TableRef, stmt: &Statement) -> Result<u64, StoreError> {
        let done = Self::query(stmt)
            .execute(&self.pool)
            .await
            .map_err(|e| sql::map_err(table.schema.kind, e))?;
        Ok(done.rows_affected())
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn create_tables(&self, tables: &[TableRef]) -> Result<(), StoreError> {
        for table in tables {
            for ddl in sql::create_table(DIALECT, table)? {
                sqlx::query(&ddl)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| sql::map_err(table.schema.kind, e))?;
            }
        }
        info!(tables = tables.len(), "sqlite schema initialized");
        Ok(())
    }

    async fn insert(&self, table: &TableRef, row: &Row) -> Result<i64, StoreError> {
        let stmt = sql::insert(DIALECT, table, row)?;
        let inserted = Self::query(&stmt)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| sql::map_err(table.schema.kind, e))?;
        inserted
            .try_get::<i64, _>(ID_COLUMN)
            .map_err(|e| sql::map_err(table.schema.kind, e))
    }

    async fn upsert(&self, table: &TableRef, id: i64, row: &Row) -> Result<(), StoreError> {
        let stmt = sql::upsert(DIALECT, table, id, row)?;
        self.execute(table, &stmt).await?;
        Ok(())
    }

    async fn select(&self, table: &TableRef, selection: &Selection) -> Result<Vec<StoredRow>, StoreError> {
        let stmt = sql::select(DIALECT, table, selection)?;
        self.fetch_all(table, &stmt)
            .await?
            .iter()
            .map(|r| sql::decode_row(table.schema, r))
            .collect()
    }

    async fn count(&self, table: &TableRef, filter: &Filter) -> Result<u64, StoreError> {
        let stmt = sql::count(DIALECT, table, filter)?;
        let row = Self::query(&stmt)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| sql::map_err(table.schema.kind, e))?;
        let cnt: i64 = row.try_get("cnt").map_err(|e| sql::map_err(table.schema.kind, e))?;
        Ok(cnt.max(0) as u64)
    }

    async fn update_where(&self, table: &TableRef, filter: &Filter, set: &Row) -> Result<u64, StoreError> {
        let stmt = sql::update(DIALECT, table, filter, set)?;
        self.execute(table, &stmt).await
    }

    async fn delete_where(&self, table: &TableRef, filter: &Filter) -> Result<u64, StoreError> {
        let stmt = sql::delete(DIALECT, table, filter)?;
        self.execute(table, &stmt).await
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
