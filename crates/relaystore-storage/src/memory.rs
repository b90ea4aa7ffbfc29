//! In-memory storage backend.
//!
//! Keeps every table in RAM behind a mutex. Enforces the same uniqueness
//! rule as the SQL backends (unique key among non-forked rows) so tests
//! written against it hold on a real database.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use relaystore_core::backend::StorageBackend;
use relaystore_core::error::StoreError;
use relaystore_core::model::col;
use relaystore_core::query::{CmpOp, Filter, Order, Selection};
use relaystore_core::schema::{Row, StoredRow, TableRef, Value};

#[derive(Default)]
struct MemTable {
    last_id: i64,
    rows: BTreeMap<i64, Row>,
}

/// In-memory record storage.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryBackend {
    tables: Mutex<HashMap<String, MemTable>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, MemTable>>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::StorageUnavailable("in-memory store lock poisoned".into()))
    }
}

fn table_mut<'a>(
    tables: &'a mut HashMap<String, MemTable>,
    table: &TableRef,
) -> Result<&'a mut MemTable, StoreError> {
    tables
        .get_mut(&table.name)
        .ok_or_else(|| StoreError::Storage(format!("no such table: {}", table.name)))
}

fn is_live(row: &Row) -> bool {
    row.get(col::FORK)
        .map(|v| CmpOp::Eq.eval(v, &Value::Bool(false)))
        .unwrap_or(true)
}

/// Reject `row` if a different live row shares its unique key.
fn check_unique(table: &TableRef, t: &MemTable, id: Option<i64>, row: &Row) -> Result<(), StoreError> {
    let key = table.schema.unique_key;
    if key.is_empty() || !is_live(row) {
        return Ok(());
    }
    let clash = t.rows.iter().any(|(other_id, other)| {
        Some(*other_id) != id && is_live(other) && key.iter().all(|c| other.get(c) == row.get(c))
    });
    if clash {
        return Err(StoreError::DuplicateKind {
            kind: table.schema.kind,
            detail: format!("{} on {}", key.join("/"), table.name),
        });
    }
    Ok(())
}

fn create_time(row: &Row) -> i64 {
    match row.get(col::CREATE_TIME) {
        Some(Value::Int(t)) => *t,
        _ => 0,
    }
}

fn matching<'a>(t: &'a MemTable, filter: &'a Filter) -> impl Iterator<Item = (&'a i64, &'a Row)> + 'a {
    t.rows.iter().filter(move |(id, row)| filter.matches(**id, row))
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create_tables(&self, tables: &[TableRef]) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        for table in tables {
            guard.entry(table.name.clone()).or_default();
        }
        Ok(())
    }

    async fn insert(&self, table: &TableRef, row: &Row) -> Result<i64, StoreError> {
        let mut guard = self.lock()?;
        let t = table_mut(&mut guard, table)?;
        check_unique(table, t, None, row)?;
        t.last_id += 1;
        t.rows.insert(t.last_id, row.clone());
        Ok(t.last_id)
    }

    async fn upsert(&self, table: &TableRef, id: i64, row: &Row) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let t = table_mut(&mut guard, table)?;
        check_unique(table, t, Some(id), row)?;
        t.rows.insert(id, row.clone());
        t.last_id = t.last_id.max(id);
        Ok(())
    }

    async fn select(&self, table: &TableRef, selection: &Selection) -> Result<Vec<StoredRow>, StoreError> {
        let mut guard = self.lock()?;
        let t = table_mut(&mut guard, table)?;

        let mut hits: Vec<(i64, &Row)> = matching(t, &selection.filter)
            .map(|(id, row)| (*id, row))
            .collect();
        match selection.order {
            Order::IdAsc => {}
            Order::IdDesc => hits.reverse(),
            Order::CreateTimeDesc => {
                hits.sort_by(|a, b| create_time(b.1).cmp(&create_time(a.1)).then(b.0.cmp(&a.0)))
            }
        }

        let offset = usize::try_from(selection.offset).unwrap_or(usize::MAX);
        let limit = selection
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(hits
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(id, row)| StoredRow { id, row: row.clone() })
            .collect())
    }

    async fn count(&self, table: &TableRef, filter: &Filter) -> Result<u64, StoreError> {
        let mut guard = self.lock()?;
        let t = table_mut(&mut guard, table)?;
        Ok(matching(t, filter).count() as u64)
    }

    async fn update_where(&self, table: &TableRef, filter: &Filter, set: &Row) -> Result<u64, StoreError> {
        let mut guard = self.lock()?;
        let t = table_mut(&mut guard, table)?;
        let mut affected = 0;
        for (id, row) in t.rows.iter_mut() {
            if filter.matches(*id, row) {
                for (column, value) in set.iter() {
                    row.set(column, value.clone());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn delete_where(&self, table: &TableRef, filter: &Filter) -> Result<u64, StoreError> {
        let mut guard = self.lock()?;
        let t = table_mut(&mut guard, table)?;
        let before = t.rows.len();
        t.rows.retain(|id, row| !filter.matches(*id, row));
        Ok((before - t.rows.len()) as u64)
    }
}
