//! Record store: typed create/read/update over any [`StorageBackend`].
//!
//! The store owns the table lifecycle and the table-name prefix; every
//! operation is generic over the record kind and forwards kind-erased rows
//! to the backend.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::StorageBackend;
use crate::error::StoreError;
use crate::model::{col, schema_for, ALL_SCHEMAS};
use crate::query::{BlockRange, Filter, Order, Selection};
use crate::schema::{ColumnType, Record, RecordKind, Row, TableRef, TableSchema, Value, ID_COLUMN};

/// Returned once the physical tables exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaReady {
    pub backend: &'static str,
    pub tables: Vec<String>,
}

/// Typed access to persisted records.
///
/// Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn StorageBackend>,
    prefix: String,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn StorageBackend>, table_prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: table_prefix.into(),
        }
    }

    pub fn table_prefix(&self) -> &str {
        &self.prefix
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn table_for(&self, kind: RecordKind) -> TableRef {
        TableRef::new(&self.prefix, schema_for(kind))
    }

    fn table<R: Record>(&self) -> TableRef {
        TableRef::new(&self.prefix, R::SCHEMA)
    }

    /// Create every record kind's table if absent. Safe to call on each start.
    pub async fn create_schema(&self) -> Result<SchemaReady, StoreError> {
        let tables: Vec<TableRef> = ALL_SCHEMAS
            .into_iter()
            .map(|s| TableRef::new(&self.prefix, s))
            .collect();
        self.backend.create_tables(&tables).await?;

        let ready = SchemaReady {
            backend: self.backend.name(),
            tables: tables.into_iter().map(|t| t.name).collect(),
        };
        info!(backend = ready.backend, tables = ?ready.tables, "schema ready");
        Ok(ready)
    }

    /// Append one record; returns it with its assigned id.
    pub async fn insert<R: Record>(&self, record: &R) -> Result<R, StoreError> {
        let table = self.table::<R>();
        let id = match self.backend.insert(&table, &record.to_row()).await {
            Ok(id) => id,
            Err(err @ StoreError::DuplicateKind { .. }) => {
                warn!(
                    table = %table.name,
                    block = record.block_number(),
                    error = %err,
                    "duplicate record rejected"
                );
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let mut stored = record.clone();
        stored.set_id(id);
        debug!(table = %table.name, id, block = record.block_number(), "record stored");
        Ok(stored)
    }

    /// Lowest-id record matching the template's non-zero fields.
    pub async fn find_first<R: Record>(&self, template: &R) -> Result<R, StoreError> {
        self.find_one(template, Order::IdAsc).await
    }

    /// Highest-id record matching the template's non-zero fields.
    pub async fn find_last<R: Record>(&self, template: &R) -> Result<R, StoreError> {
        self.find_one(template, Order::IdDesc).await
    }

    async fn find_one<R: Record>(&self, template: &R, order: Order) -> Result<R, StoreError> {
        let filter = template_filter(template);
        let selection = Selection::new(filter).order(order).limit(1);
        self.select::<R>(&selection)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                kind: R::kind(),
                key: describe(&selection.filter),
            })
    }

    /// Every record (`id > 0`) matching the template's non-zero fields.
    pub async fn find_all<R: Record>(&self, template: &R) -> Result<Vec<R>, StoreError> {
        self.select(&Selection::new(template_filter(template))).await
    }

    /// Full-record upsert by primary key. A zero id inserts a new record.
    pub async fn update<R: Record>(&self, record: &R) -> Result<R, StoreError> {
        if record.id() == 0 {
            return self.insert(record).await;
        }
        let table = self.table::<R>();
        self.backend.upsert(&table, record.id(), &record.to_row()).await?;
        debug!(table = %table.name, id = record.id(), "record saved");
        Ok(record.clone())
    }

    pub async fn select<R: Record>(&self, selection: &Selection) -> Result<Vec<R>, StoreError> {
        validate(R::SCHEMA, &selection.filter)?;
        let table = self.table::<R>();
        self.backend
            .select(&table, selection)
            .await?
            .iter()
            .map(R::from_stored)
            .collect()
    }

    pub async fn count<R: Record>(&self, filter: &Filter) -> Result<u64, StoreError> {
        validate(R::SCHEMA, filter)?;
        self.backend.count(&self.table::<R>(), filter).await
    }

    /// Flag every non-forked `kind` record in `range` as forked.
    pub async fn mark_forked(&self, kind: RecordKind, range: BlockRange) -> Result<u64, StoreError> {
        let filter = Filter::new().block_range(range).not_forked();
        let set = Row::new().with(col::FORK, true);
        self.backend
            .update_where(&self.table_for(kind), &filter, &set)
            .await
    }

    /// Physically remove every `kind` record in `range`.
    pub async fn delete_range(&self, kind: RecordKind, range: BlockRange) -> Result<u64, StoreError> {
        let filter = Filter::new().block_range(range);
        self.backend.delete_where(&self.table_for(kind), &filter).await
    }
}

fn template_filter<R: Record>(template: &R) -> Filter {
    let filter = Filter::from_template(&template.to_row());
    if template.id() != 0 {
        filter.eq(ID_COLUMN, template.id())
    } else {
        filter
    }
}

/// Reject predicates on unknown columns or with values of the wrong type.
pub(crate) fn validate(schema: &TableSchema, filter: &Filter) -> Result<(), StoreError> {
    for p in filter.predicates() {
        let column = schema.resolve(&p.column)?;
        let ty = schema
            .column(column)
            .map(|c| c.ty)
            .unwrap_or(ColumnType::Integer);
        let ok = matches!(
            (ty, &p.value),
            (ColumnType::Integer, Value::Int(_))
                | (ColumnType::Text, Value::Text(_))
                | (ColumnType::Bool, Value::Bool(_))
        );
        if !ok {
            return Err(StoreError::malformed(
                column,
                format!("expected {ty:?} value, got {:?}", p.value),
            ));
        }
    }
    Ok(())
}

fn describe(filter: &Filter) -> String {
    let parts: Vec<String> = filter
        .predicates()
        .iter()
        .filter(|p| p.column != ID_COLUMN || p.op == crate::query::CmpOp::Eq)
        .map(|p| match &p.value {
            Value::Int(v) => format!("{}{}{v}", p.column, p.op.sql()),
            Value::Bool(v) => format!("{}{}{v}", p.column, p.op.sql()),
            Value::Text(v) => format!("{}{}{v}", p.column, p.op.sql()),
        })
        .collect();
    if parts.is_empty() {
        "any".to_string()
    } else {
        parts.join(",")
    }
}
