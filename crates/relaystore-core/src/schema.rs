//! Kind-erased table description shared by the record model and the
//! storage backends.
//!
//! Every record kind describes its physical table with a static
//! [`TableSchema`]. Backends only ever see [`Row`]s keyed by the schema's
//! column names, so they stay ignorant of the concrete record types.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Column holding the store-assigned surrogate key. Never part of a [`Row`].
pub const ID_COLUMN: &str = "id";

// ─── RecordKind ───────────────────────────────────────────────────────────────

/// The closed set of persisted event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Fill,
    Cancel,
    Cutoff,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [Self::Fill, Self::Cancel, Self::Cutoff];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fill => "fill",
            Self::Cancel => "cancel",
            Self::Cutoff => "cutoff",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fill" | "fills" => Ok(Self::Fill),
            "cancel" | "cancels" => Ok(Self::Cancel),
            "cutoff" | "cutoffs" => Ok(Self::Cutoff),
            other => Err(StoreError::malformed("kind", format!("unknown record kind '{other}'"))),
        }
    }
}

// ─── Columns ──────────────────────────────────────────────────────────────────

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 64-bit signed integer.
    Integer,
    /// Unbounded text. Used for hex identifiers and decimal amounts.
    Text,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
}

impl ColumnDef {
    pub const fn int(name: &'static str) -> Self {
        Self { name, ty: ColumnType::Integer }
    }

    pub const fn text(name: &'static str) -> Self {
        Self { name, ty: ColumnType::Text }
    }

    pub const fn bool(name: &'static str) -> Self {
        Self { name, ty: ColumnType::Bool }
    }
}

/// Static description of one record kind's table.
#[derive(Debug)]
pub struct TableSchema {
    pub kind: RecordKind,
    /// Unprefixed table name.
    pub table: &'static str,
    /// All columns except [`ID_COLUMN`], in insert order.
    pub columns: &'static [ColumnDef],
    /// Columns that must be unique among non-forked rows.
    pub unique_key: &'static [&'static str],
}

impl TableSchema {
    /// Look up a column definition by name.
    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        name == ID_COLUMN || self.column(name).is_some()
    }

    /// Resolve a caller-supplied column name to the schema's static name.
    ///
    /// Backends only interpolate names returned from here into SQL.
    pub fn resolve(&self, name: &str) -> Result<&'static str, StoreError> {
        if name == ID_COLUMN {
            return Ok(ID_COLUMN);
        }
        self.column(name).map(|c| c.name).ok_or_else(|| {
            StoreError::malformed(
                name,
                format!("no such column on {} records", self.kind),
            )
        })
    }

    /// Parse a textual filter value (e.g. from the CLI) using the column's type.
    pub fn parse_value(&self, column: &str, raw: &str) -> Result<Value, StoreError> {
        let ty = if column == ID_COLUMN {
            ColumnType::Integer
        } else {
            self.resolve(column)?;
            self.column(column).map(|c| c.ty).unwrap_or(ColumnType::Text)
        };
        match ty {
            ColumnType::Text => Ok(Value::Text(raw.to_string())),
            ColumnType::Integer => raw
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| StoreError::malformed(column, e.to_string())),
            ColumnType::Bool => raw
                .parse::<bool>()
                .map(Value::Bool)
                .map_err(|e| StoreError::malformed(column, e.to_string())),
        }
    }

    /// Physical table name for this schema under `prefix`.
    pub fn table_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.table)
    }
}

/// A schema bound to its physical (prefixed) table name.
#[derive(Debug, Clone)]
pub struct TableRef {
    pub name: String,
    pub schema: &'static TableSchema,
}

impl TableRef {
    pub fn new(prefix: &str, schema: &'static TableSchema) -> Self {
        Self {
            name: schema.table_name(prefix),
            schema,
        }
    }
}

// ─── Values and rows ──────────────────────────────────────────────────────────

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Text(String),
}

impl Value {
    /// Zero values are ignored when a record is used as a lookup template.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Int(v) => *v == 0,
            Self::Bool(v) => !*v,
            Self::Text(v) => v.is_empty(),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Int(_) => ColumnType::Integer,
            Self::Bool(_) => ColumnType::Bool,
            Self::Text(_) => ColumnType::Text,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// Column values of one record, keyed by static column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: Vec<(&'static str, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Row::set`].
    pub fn with(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a column, replacing any previous value.
    pub fn set(&mut self, column: &'static str, value: impl Into<Value>) {
        let value = value.into();
        match self.values.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.values.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.iter().find(|(c, _)| *c == column).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.values.iter().map(|(c, v)| (*c, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn int(&self, column: &str) -> Result<i64, StoreError> {
        match self.get(column) {
            Some(Value::Int(v)) => Ok(*v),
            other => Err(type_mismatch(column, "integer", other)),
        }
    }

    pub fn text(&self, column: &str) -> Result<String, StoreError> {
        match self.get(column) {
            Some(Value::Text(v)) => Ok(v.clone()),
            other => Err(type_mismatch(column, "text", other)),
        }
    }

    pub fn bool(&self, column: &str) -> Result<bool, StoreError> {
        match self.get(column) {
            Some(Value::Bool(v)) => Ok(*v),
            // SQLite has no native boolean; tolerate 0/1.
            Some(Value::Int(v)) => Ok(*v != 0),
            other => Err(type_mismatch(column, "bool", other)),
        }
    }
}

fn type_mismatch(column: &str, expected: &str, got: Option<&Value>) -> StoreError {
    match got {
        None => StoreError::Storage(format!("column '{column}' missing from row")),
        Some(v) => StoreError::Storage(format!(
            "column '{column}' expected {expected}, got {:?}",
            v.column_type()
        )),
    }
}

/// A row as read back from a backend, together with its primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    pub id: i64,
    pub row: Row,
}

// ─── Record ───────────────────────────────────────────────────────────────────

/// A persisted event record of one [`RecordKind`].
pub trait Record: Clone + Send + Sync + Sized + 'static {
    const SCHEMA: &'static TableSchema;

    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);

    fn block_number(&self) -> i64;

    fn create_time(&self) -> i64;

    fn is_forked(&self) -> bool;

    /// Column values, excluding the primary key.
    fn to_row(&self) -> Row;

    fn from_row(id: i64, row: &Row) -> Result<Self, StoreError>;

    fn kind() -> RecordKind {
        Self::SCHEMA.kind
    }

    fn from_stored(stored: &StoredRow) -> Result<Self, StoreError> {
        Self::from_row(stored.id, &stored.row)
    }
}
