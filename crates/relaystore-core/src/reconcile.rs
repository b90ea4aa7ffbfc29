//! Reorg reconciliation.
//!
//! Given the half-open block window `(from, to]` abandoned by a fork, every
//! record kind is repaired according to its [`ForkPolicy`]:
//!
//! | Kind   | Default policy   | Effect                                   |
//! |--------|------------------|------------------------------------------|
//! | fill   | `HardDelete`     | rows in the window are removed           |
//! | cancel | `SoftInvalidate` | rows stay, flagged `fork = true`         |
//! | cutoff | `SoftInvalidate` | rows stay, flagged `fork = true`         |
//!
//! Both policies are idempotent, so a failed or interrupted repair can be
//! re-run over the same window.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::query::BlockRange;
use crate::schema::RecordKind;
use crate::service::QueryService;

/// How records from abandoned blocks are repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForkPolicy {
    /// Keep the row, set `fork = true`.
    SoftInvalidate,
    /// Physically delete the row.
    HardDelete,
}

impl std::fmt::Display for ForkPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SoftInvalidate => write!(f, "soft_invalidate"),
            Self::HardDelete => write!(f, "hard_delete"),
        }
    }
}

/// Per-kind fork policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyTable {
    pub fill: ForkPolicy,
    pub cancel: ForkPolicy,
    pub cutoff: ForkPolicy,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            fill: ForkPolicy::HardDelete,
            cancel: ForkPolicy::SoftInvalidate,
            cutoff: ForkPolicy::SoftInvalidate,
        }
    }
}

impl PolicyTable {
    pub fn policy(&self, kind: RecordKind) -> ForkPolicy {
        match kind {
            RecordKind::Fill => self.fill,
            RecordKind::Cancel => self.cancel,
            RecordKind::Cutoff => self.cutoff,
        }
    }

    pub fn with(mut self, kind: RecordKind, policy: ForkPolicy) -> Self {
        match kind {
            RecordKind::Fill => self.fill = policy,
            RecordKind::Cancel => self.cancel = policy,
            RecordKind::Cutoff => self.cutoff = policy,
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindOutcome {
    pub kind: RecordKind,
    pub policy: ForkPolicy,
    /// Rows flagged or deleted by this run.
    pub affected: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub range: BlockRange,
    pub outcomes: Vec<KindOutcome>,
}

impl ReconcileReport {
    pub fn affected(&self, kind: RecordKind) -> u64 {
        self.outcomes
            .iter()
            .filter(|o| o.kind == kind)
            .map(|o| o.affected)
            .sum()
    }

    pub fn total_affected(&self) -> u64 {
        self.outcomes.iter().map(|o| o.affected).sum()
    }
}

/// Repairs the store after a chain reorganization.
#[derive(Clone)]
pub struct Reconciler {
    queries: QueryService,
    policies: PolicyTable,
}

impl Reconciler {
    pub fn new(queries: QueryService, policies: PolicyTable) -> Self {
        Self { queries, policies }
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Repair every record kind over `(from, to]`.
    ///
    /// `from > to` is rejected; `from == to` is an empty window and touches
    /// nothing. Kinds are repaired in [`RecordKind::ALL`] order and the first
    /// failure stops the run; kinds already repaired stay repaired.
    pub async fn reconcile(&self, from: i64, to: i64) -> Result<ReconcileReport, StoreError> {
        if from > to {
            return Err(StoreError::malformed(
                "range",
                format!("from ({from}) is above to ({to})"),
            ));
        }
        let range = BlockRange::new(from, to);
        let mut outcomes = Vec::with_capacity(RecordKind::ALL.len());

        if range.is_empty() {
            debug!(%range, "empty reorg window, nothing to repair");
            return Ok(ReconcileReport { range, outcomes });
        }

        warn!(%range, depth = to - from, "repairing records from abandoned blocks");
        for kind in RecordKind::ALL {
            let policy = self.policies.policy(kind);
            let affected = self.repair(kind, policy, range).await.map_err(|source| {
                error!(%kind, %policy, %range, error = %source, "reorg repair failed");
                StoreError::Reconcile {
                    kind,
                    source: Box::new(source),
                }
            })?;
            outcomes.push(KindOutcome {
                kind,
                policy,
                affected,
            });
        }

        let report = ReconcileReport { range, outcomes };
        info!(%range, affected = report.total_affected(), "reorg repair complete");
        Ok(report)
    }

    async fn repair(&self, kind: RecordKind, policy: ForkPolicy, range: BlockRange) -> Result<u64, StoreError> {
        let store = self.queries.store();
        match policy {
            ForkPolicy::HardDelete => {
                let deleted = store.delete_range(kind, range).await?;
                debug!(%kind, %range, deleted, "hard-deleted forked records");
                Ok(deleted)
            }
            ForkPolicy::SoftInvalidate => {
                let flagged = store.mark_forked(kind, range).await?;
                debug!(%kind, %range, flagged, "flagged forked records");
                Ok(flagged)
            }
        }
    }
}
