//! relaystore-core: the reorg-aware event store for relay exchange events.
//!
//! # Architecture
//!
//! ```text
//! ChainEvent feed → StoreSink
//!                      ├── convert        (decoded event → FillEvent / CancelEvent / CutoffEvent)
//!                      ├── RecordStore    (typed insert / find / update over a StorageBackend)
//!                      └── Reconciler     (per-kind fork policy over (from, to])
//!
//! QueryService → RecordStore → StorageBackend (memory / SQLite / Postgres)
//! ```

pub mod backend;
pub mod chain;
pub mod convert;
pub mod error;
pub mod model;
pub mod query;
pub mod reconcile;
pub mod schema;
pub mod service;
pub mod sink;
pub mod store;

pub use backend::StorageBackend;
pub use chain::{ChainEvent, CutoffChangedEvent, ForkNotice, OrderCancelledEvent, OrderFilledEvent};
pub use error::StoreError;
pub use model::{CancelEvent, CutoffEvent, FillEvent};
pub use query::{BlockRange, FieldFilter, Filter, Order, PageResult, RecentFilter, Selection, TimeWindow};
pub use reconcile::{ForkPolicy, PolicyTable, ReconcileReport, Reconciler};
pub use schema::{Record, RecordKind, Row, StoredRow, TableRef, Value};
pub use service::{QueryService, UniqueLookup};
pub use sink::{EventSink, IngestOutcome, StoreSink};
pub use store::{RecordStore, SchemaReady};
