//! The storage engine seam.
//!
//! A backend is a dumb column store: it knows tables, rows and structured
//! filters, but nothing about record kinds or fork policy.
//! Implementations live in `relaystore-storage` (memory, SQLite, Postgres).

use async_trait::async_trait;

use crate::error::StoreError;
use crate::query::{Filter, Selection};
use crate::schema::{Row, StoredRow, TableRef};

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend name for logs (e.g. `"sqlite"`).
    fn name(&self) -> &'static str;

    /// Create each table and its indexes if absent.
    async fn create_tables(&self, tables: &[TableRef]) -> Result<(), StoreError>;

    /// Append a row and return its assigned primary key.
    ///
    /// Fails with `DuplicateKind` when the table's unique key collides with a
    /// non-forked row.
    async fn insert(&self, table: &TableRef, row: &Row) -> Result<i64, StoreError>;

    /// Insert or fully overwrite the row with primary key `id`.
    async fn upsert(&self, table: &TableRef, id: i64, row: &Row) -> Result<(), StoreError>;

    async fn select(&self, table: &TableRef, selection: &Selection) -> Result<Vec<StoredRow>, StoreError>;

    async fn count(&self, table: &TableRef, filter: &Filter) -> Result<u64, StoreError>;

    /// Overwrite `set` columns on every matching row; returns rows affected.
    async fn update_where(
        &self,
        table: &TableRef,
        filter: &Filter,
        set: &Row,
    ) -> Result<u64, StoreError>;

    /// Delete every matching row; returns rows affected.
    async fn delete_where(&self, table: &TableRef, filter: &Filter) -> Result<u64, StoreError>;
}
