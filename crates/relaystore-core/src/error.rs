//! Error types for the relay event store.

use thiserror::Error;

use crate::schema::RecordKind;

/// Errors returned by conversion, storage, query and reconciliation calls.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A point lookup matched zero rows.
    #[error("{kind} not found: {key}")]
    NotFound { kind: RecordKind, key: String },

    /// An insert violated a uniqueness constraint.
    #[error("duplicate {kind} record: {detail}")]
    DuplicateKind { kind: RecordKind, detail: String },

    /// The storage engine is unreachable or timed out.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// An event or query argument was incomplete or out of range.
    #[error("malformed input in '{field}': {reason}")]
    MalformedInput { field: String, reason: String },

    /// The storage engine rejected a statement.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Repairing one record kind failed; that kind's repair was not applied.
    #[error("reconciling {kind} records failed: {source}")]
    Reconcile {
        kind: RecordKind,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for a lookup that matched nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if retrying the whole operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StorageUnavailable(_) => true,
            Self::Reconcile { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinct_from_unavailable() {
        let nf = StoreError::NotFound {
            kind: RecordKind::Fill,
            key: "0xaa/0xbb".into(),
        };
        assert!(nf.is_not_found());
        assert!(!nf.is_retryable());

        let down = StoreError::StorageUnavailable("pool timed out".into());
        assert!(!down.is_not_found());
        assert!(down.is_retryable());
    }

    #[test]
    fn display_names_the_kind() {
        let err = StoreError::DuplicateKind {
            kind: RecordKind::Cancel,
            detail: "tx_hash/order_hash/log_index".into(),
        };
        assert_eq!(
            err.to_string(),
            "duplicate cancel record: tx_hash/order_hash/log_index"
        );
    }

    #[test]
    fn reconcile_failure_inherits_retryability() {
        let err = StoreError::Reconcile {
            kind: RecordKind::Cutoff,
            source: Box::new(StoreError::StorageUnavailable("connection reset".into())),
        };
        assert!(err.is_retryable());
        assert!(err.to_string().starts_with("reconciling cutoff records failed"));
    }
}
