//! Ingestion sink: applies the decoded chain-event feed to the store.
//!
//! Events must be handed over in feed order. A fork notice is applied
//! before any later event is accepted, so records written for the repaired
//! window after the notice are never invalidated by it.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::chain::ChainEvent;
use crate::convert::narrow_u64;
use crate::error::StoreError;
use crate::model::{CancelEvent, CutoffEvent, FillEvent};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::schema::{Record, RecordKind};
use crate::store::RecordStore;

/// What applying one feed item did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum IngestOutcome {
    Stored {
        kind: RecordKind,
        id: i64,
        block_number: i64,
    },
    Reconciled(ReconcileReport),
}

/// Consumer of the chain-event feed.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn handle(&self, event: &ChainEvent) -> Result<IngestOutcome, StoreError>;
}

/// Converts feed events into records and routes fork notices to the
/// [`Reconciler`].
#[derive(Clone)]
pub struct StoreSink {
    store: RecordStore,
    reconciler: Reconciler,
}

impl StoreSink {
    pub fn new(store: RecordStore, reconciler: Reconciler) -> Self {
        Self { store, reconciler }
    }

    async fn persist<R: Record>(&self, record: R) -> Result<IngestOutcome, StoreError> {
        let stored = self.store.insert(&record).await?;
        Ok(IngestOutcome::Stored {
            kind: R::kind(),
            id: stored.id(),
            block_number: stored.block_number(),
        })
    }
}

#[async_trait]
impl EventSink for StoreSink {
    async fn handle(&self, event: &ChainEvent) -> Result<IngestOutcome, StoreError> {
        debug!(event = event.name(), block = %event.block_number(), "ingesting");
        match event {
            ChainEvent::OrderFilled(e) => self.persist(FillEvent::try_from(e)?).await,
            ChainEvent::OrderCancelled(e) => self.persist(CancelEvent::try_from(e)?).await,
            ChainEvent::Cutoff(e) => self.persist(CutoffEvent::try_from(e)?).await,
            ChainEvent::Fork(notice) => {
                let from = narrow_u64("forkBlock", notice.fork_block)?;
                let to = narrow_u64("detectedBlock", notice.detected_block)?;
                self.reconciler
                    .reconcile(from, to)
                    .await
                    .map(IngestOutcome::Reconciled)
            }
        }
    }
}
