//! Query service: kind-specific lookups and listings for downstream
//! consumers.
//!
//! Every read path except [`QueryService::page_query`] with an explicit
//! `fork` filter hides records whose block has been superseded.

use tracing::debug;

use crate::convert::canonical_key;
use crate::error::StoreError;
use crate::model::{col, CancelEvent, CutoffEvent, FillEvent};
use crate::query::{
    BlockRange, FieldFilter, Filter, Order, PageResult, RecentFilter, Selection, RECENT_LIMIT,
};
use crate::schema::{Record, Value};
use crate::store::RecordStore;

/// A record kind with a two-column natural key for point lookups.
pub trait UniqueLookup: Record {
    const LOOKUP_KEY: (&'static str, &'static str);
}

impl UniqueLookup for FillEvent {
    const LOOKUP_KEY: (&'static str, &'static str) = (col::RING_HASH, col::ORDER_HASH);
}

impl UniqueLookup for CancelEvent {
    const LOOKUP_KEY: (&'static str, &'static str) = (col::TX_HASH, col::ORDER_HASH);
}

impl UniqueLookup for CutoffEvent {
    const LOOKUP_KEY: (&'static str, &'static str) = (col::TX_HASH, col::OWNER);
}

#[derive(Clone)]
pub struct QueryService {
    store: RecordStore,
}

impl QueryService {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Point lookup by the kind's natural key; forked rows are invisible.
    pub async fn find_by_unique_hash<R: UniqueLookup>(
        &self,
        key1: &str,
        key2: &str,
    ) -> Result<R, StoreError> {
        let (c1, c2) = R::LOOKUP_KEY;
        let (k1, k2) = (canonical_key(key1), canonical_key(key2));
        let filter = Filter::new()
            .eq(c1, k1.as_str())
            .eq(c2, k2.as_str())
            .not_forked();
        let selection = Selection::new(filter).order(Order::IdAsc).limit(1);

        self.store
            .select::<R>(&selection)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                kind: R::kind(),
                key: format!("{c1}={k1},{c2}={k2}"),
            })
    }

    pub async fn fill_by_ring_and_order(
        &self,
        ring_hash: &str,
        order_hash: &str,
    ) -> Result<FillEvent, StoreError> {
        self.find_by_unique_hash(ring_hash, order_hash).await
    }

    pub async fn cancel_by_tx_and_order(
        &self,
        tx_hash: &str,
        order_hash: &str,
    ) -> Result<CancelEvent, StoreError> {
        self.find_by_unique_hash(tx_hash, order_hash).await
    }

    pub async fn cutoff_by_tx_and_owner(
        &self,
        tx_hash: &str,
        owner: &str,
    ) -> Result<CutoffEvent, StoreError> {
        self.find_by_unique_hash(tx_hash, owner).await
    }

    /// Every live cancellation of one order, oldest first.
    pub async fn cancels_by_order(&self, order_hash: &str) -> Result<Vec<CancelEvent>, StoreError> {
        let filter = Filter::new()
            .eq(col::ORDER_HASH, canonical_key(order_hash))
            .not_forked();
        self.store.select(&Selection::new(filter)).await
    }

    /// The owner's most recent live cutoff.
    pub async fn latest_cutoff(&self, owner: &str) -> Result<CutoffEvent, StoreError> {
        let owner = canonical_key(owner);
        let filter = Filter::new().eq(col::OWNER, owner.as_str()).not_forked();
        let selection = Selection::new(filter).order(Order::CreateTimeDesc).limit(1);
        self.store
            .select::<CutoffEvent>(&selection)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                kind: CutoffEvent::kind(),
                key: format!("{}={owner}", col::OWNER),
            })
    }

    /// Live records with `block_number ∈ (range.from, range.to]`.
    pub async fn find_forked_in_range<R: Record>(&self, range: BlockRange) -> Result<Vec<R>, StoreError> {
        let filter = Filter::new().block_range(range).not_forked();
        self.store.select(&Selection::new(filter)).await
    }

    /// One page of records, newest first, plus the total match count.
    ///
    /// `page_index` is 1-based. Forked records are excluded unless `fields`
    /// filters on `fork` explicitly. Hash and address values are matched
    /// case-insensitively.
    pub async fn page_query<R: Record>(
        &self,
        fields: &FieldFilter,
        page_index: u64,
        page_size: u64,
    ) -> Result<PageResult<R>, StoreError> {
        if page_index < 1 {
            return Err(StoreError::malformed("pageIndex", "must be at least 1"));
        }
        if page_size < 1 {
            return Err(StoreError::malformed("pageSize", "must be at least 1"));
        }
        let offset = (page_index - 1)
            .checked_mul(page_size)
            .ok_or_else(|| StoreError::malformed("pageIndex", "offset overflows"))?;

        let fields: FieldFilter = fields
            .iter()
            .map(|(column, value)| {
                let value = match value {
                    Value::Text(text) => Value::Text(canonical_key(text)),
                    other => other.clone(),
                };
                (column.clone(), value)
            })
            .collect();
        let mut filter = Filter::from_fields(&fields);
        if !fields.contains_key(col::FORK) {
            filter = filter.not_forked();
        }

        let selection = Selection::new(filter)
            .order(Order::CreateTimeDesc)
            .limit(page_size)
            .offset(offset);
        let data = self.store.select::<R>(&selection).await?;
        let total = self.store.count::<R>(&selection.filter).await?;

        debug!(kind = %R::kind(), page_index, page_size, total, "page query");
        Ok(PageResult {
            data,
            page_index,
            page_size,
            total,
        })
    }

    /// Up to [`RECENT_LIMIT`] live records, newest first.
    ///
    /// Filtering on market or owner for a kind without that column fails
    /// with `MalformedInput`.
    pub async fn query_recent<R: Record>(&self, recent: &RecentFilter) -> Result<Vec<R>, StoreError> {
        let mut filter = Filter::new();
        if let Some(market) = recent.market.as_deref().filter(|m| !m.is_empty()) {
            filter = filter.eq(col::MARKET, market);
        }
        if let Some(owner) = recent.owner.as_deref().filter(|o| !o.is_empty()) {
            filter = filter.eq(col::OWNER, canonical_key(owner));
        }
        let filter = filter.time_window(recent.window).not_forked();

        let selection = Selection::new(filter)
            .order(Order::CreateTimeDesc)
            .limit(RECENT_LIMIT);
        self.store.select(&selection).await
    }
}
