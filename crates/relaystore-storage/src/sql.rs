//! SQL text shared by the SQLite and Postgres backends.
//!
//! Identifiers come only from the static table schemas (or a validated
//! table prefix); every value travels as a bound parameter.

use relaystore_core::error::StoreError;
use relaystore_core::model::col;
use relaystore_core::query::{Filter, Order, Selection};
use relaystore_core::schema::{ColumnType, Row, StoredRow, TableRef, TableSchema, Value, ID_COLUMN};
use relaystore_core::RecordKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    fn placeholder(&self, n: usize) -> String {
        match self {
            Self::Sqlite => "?".to_string(),
            Self::Postgres => format!("${n}"),
        }
    }

    fn column_type(&self, ty: ColumnType) -> &'static str {
        match (self, ty) {
            (Self::Sqlite, ColumnType::Integer) => "INTEGER",
            (Self::Postgres, ColumnType::Integer) => "BIGINT",
            (_, ColumnType::Text) => "TEXT",
            (_, ColumnType::Bool) => "BOOLEAN",
        }
    }

    fn id_column(&self) -> &'static str {
        match self {
            Self::Sqlite => "id INTEGER PRIMARY KEY AUTOINCREMENT",
            Self::Postgres => "id BIGSERIAL PRIMARY KEY",
        }
    }
}

/// A statement plus its parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Statement {
    pub sql: String,
    pub binds: Vec<Value>,
}

struct Builder {
    dialect: Dialect,
    sql: String,
    binds: Vec<Value>,
}

impl Builder {
    fn new(dialect: Dialect, sql: impl Into<String>) -> Self {
        Self {
            dialect,
            sql: sql.into(),
            binds: Vec::new(),
        }
    }

    fn push(&mut self, s: &str) -> &mut Self {
        self.sql.push_str(s);
        self
    }

    fn bind(&mut self, value: Value) -> &mut Self {
        self.binds.push(value);
        let p = self.dialect.placeholder(self.binds.len());
        self.sql.push_str(&p);
        self
    }

    fn where_clause(&mut self, schema: &TableSchema, filter: &Filter) -> Result<(), StoreError> {
        for (i, p) in filter.predicates().iter().enumerate() {
            let column = schema.resolve(&p.column)?;
            self.push(if i == 0 { " WHERE " } else { " AND " })
                .push(column)
                .push(" ")
                .push(p.op.sql())
                .push(" ")
                .bind(p.value.clone());
        }
        Ok(())
    }

    fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            binds: self.binds,
        }
    }
}

/// Table names are interpolated into SQL, so only `[A-Za-z0-9_]` is allowed.
pub(crate) fn check_ident(name: &str) -> Result<&str, StoreError> {
    let ok = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(name)
    } else {
        Err(StoreError::Config(format!("invalid table name '{name}'")))
    }
}

/// `CREATE TABLE` plus its indexes, all `IF NOT EXISTS`.
pub(crate) fn create_table(dialect: Dialect, table: &TableRef) -> Result<Vec<String>, StoreError> {
    let name = check_ident(&table.name)?;
    let mut columns = vec![dialect.id_column().to_string()];
    for c in table.schema.columns {
        let default = if c.name == col::FORK { " DEFAULT FALSE" } else { "" };
        columns.push(format!(
            "{} {} NOT NULL{default}",
            c.name,
            dialect.column_type(c.ty)
        ));
    }

    let mut stmts = vec![
        format!("CREATE TABLE IF NOT EXISTS {name} (\n    {}\n)", columns.join(",\n    ")),
        format!("CREATE INDEX IF NOT EXISTS idx_{name}_block ON {name} ({})", col::BLOCK_NUMBER),
        format!("CREATE INDEX IF NOT EXISTS idx_{name}_time ON {name} ({})", col::CREATE_TIME),
    ];
    if !table.schema.unique_key.is_empty() {
        stmts.push(format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_{name}_live ON {name} ({}) WHERE {} = FALSE",
            table.schema.unique_key.join(", "),
            col::FORK
        ));
    }
    Ok(stmts)
}

pub(crate) fn insert(dialect: Dialect, table: &TableRef, row: &Row) -> Result<Statement, StoreError> {
    let name = check_ident(&table.name)?;
    let mut columns = Vec::with_capacity(row.len());
    let mut b = Builder::new(dialect, "");
    for (i, (column, value)) in row.iter().enumerate() {
        columns.push(table.schema.resolve(column)?);
        if i > 0 {
            b.push(", ");
        }
        b.bind(value.clone());
    }
    let values = std::mem::take(&mut b.sql);
    b.push(&format!(
        "INSERT INTO {name} ({}) VALUES ({values}) RETURNING {ID_COLUMN}",
        columns.join(", ")
    ));
    Ok(b.finish())
}

/// Insert-or-overwrite by primary key.
pub(crate) fn upsert(dialect: Dialect, table: &TableRef, id: i64, row: &Row) -> Result<Statement, StoreError> {
    let name = check_ident(&table.name)?;
    let mut columns = vec![ID_COLUMN];
    let mut b = Builder::new(dialect, "");
    b.bind(Value::Int(id));
    for (column, value) in row.iter() {
        columns.push(table.schema.resolve(column)?);
        b.push(", ").bind(value.clone());
    }
    let values = std::mem::take(&mut b.sql);
    let updates: Vec<String> = columns[1..]
        .iter()
        .map(|c| format!("{c} = excluded.{c}"))
        .collect();
    b.push(&format!(
        "INSERT INTO {name} ({}) VALUES ({values}) ON CONFLICT ({ID_COLUMN}) DO UPDATE SET {}",
        columns.join(", "),
        updates.join(", ")
    ));
    Ok(b.finish())
}

pub(crate) fn select(dialect: Dialect, table: &TableRef, selection: &Selection) -> Result<Statement, StoreError> {
    let name = check_ident(&table.name)?;
    let columns: Vec<&str> = std::iter::once(ID_COLUMN)
        .chain(table.schema.columns.iter().map(|c| c.name))
        .collect();
    let mut b = Builder::new(dialect, format!("SELECT {} FROM {name}", columns.join(", ")));
    b.where_clause(table.schema, &selection.filter)?;
    b.push(match selection.order {
        Order::IdAsc => " ORDER BY id ASC",
        Order::IdDesc => " ORDER BY id DESC",
        Order::CreateTimeDesc => " ORDER BY create_time DESC, id DESC",
    });

    match (selection.limit, dialect) {
        (Some(limit), _) => {
            b.push(" LIMIT ").bind(Value::Int(to_i64("limit", limit)?));
        }
        (None, Dialect::Sqlite) if selection.offset > 0 => {
            b.push(" LIMIT -1");
        }
        (None, _) => {}
    }
    if selection.offset > 0 {
        b.push(" OFFSET ").bind(Value::Int(to_i64("offset", selection.offset)?));
    }
    Ok(b.finish())
}

pub(crate) fn count(dialect: Dialect, table: &TableRef, filter: &Filter) -> Result<Statement, StoreError> {
    let name = check_ident(&table.name)?;
    let mut b = Builder::new(dialect, format!("SELECT COUNT(*) AS cnt FROM {name}"));
    b.where_clause(table.schema, filter)?;
    Ok(b.finish())
}

pub(crate) fn update(dialect: Dialect, table: &TableRef, filter: &Filter, set: &Row) -> Result<Statement, StoreError> {
    let name = check_ident(&table.name)?;
    if set.is_empty() {
        return Err(StoreError::malformed("set", "no columns to update"));
    }
    let mut b = Builder::new(dialect, format!("UPDATE {name} SET "));
    for (i, (column, value)) in set.iter().enumerate() {
        let column = table.schema.resolve(column)?;
        if i > 0 {
            b.push(", ");
        }
        b.push(column).push(" = ").bind(value.clone());
    }
    b.where_clause(table.schema, filter)?;
    Ok(b.finish())
}

pub(crate) fn delete(dialect: Dialect, table: &TableRef, filter: &Filter) -> Result<Statement, StoreError> {
    let name = check_ident(&table.name)?;
    let mut b = Builder::new(dialect, format!("DELETE FROM {name}"));
    b.where_clause(table.schema, filter)?;
    Ok(b.finish())
}

fn to_i64(field: &str, v: u64) -> Result<i64, StoreError> {
    i64::try_from(v).map_err(|_| StoreError::malformed(field, format!("{v} is too large")))
}

/// Decode one result row into a kind-erased [`StoredRow`].
pub(crate) fn decode_row<R>(schema: &TableSchema, row: &R) -> Result<StoredRow, StoreError>
where
    R: sqlx::Row,
    for<'a> &'a str: sqlx::ColumnIndex<R>,
    for<'r> i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> bool: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    let kind = schema.kind;
    let id: i64 = row.try_get(ID_COLUMN).map_err(|e| map_err(kind, e))?;
    let mut out = Row::new();
    for c in schema.columns {
        let value = match c.ty {
            ColumnType::Integer => Value::Int(row.try_get::<i64, _>(c.name).map_err(|e| map_err(kind, e))?),
            ColumnType::Bool => Value::Bool(row.try_get::<bool, _>(c.name).map_err(|e| map_err(kind, e))?),
            ColumnType::Text => Value::Text(row.try_get::<String, _>(c.name).map_err(|e| map_err(kind, e))?),
        };
        out.set(c.name, value);
    }
    Ok(StoredRow { id, row: out })
}

/// Map a driver error onto the store's error taxonomy.
pub(crate) fn map_err(kind: RecordKind, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound {
            kind,
            key: "row".into(),
        },
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateKind {
            kind,
            detail: db.message().to_string(),
        },
        e @ (sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)) => StoreError::StorageUnavailable(e.to_string()),
        e => StoreError::Storage(e.to_string()),
    }
}

/// Connection-level failures have no record kind attached.
pub(crate) fn map_connect_err(err: sqlx::Error) -> StoreError {
    match err {
        e @ (sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Tls(_)) => {
            StoreError::StorageUnavailable(e.to_string())
        }
        e => StoreError::Storage(e.to_string()),
    }
}
