//! Error taxonomy for the sync pipeline.
//!
//! Run-level failures (`SyncError`) abort the current run and leave the
//! checkpoint untouched. Store-level failures (`StoreError`) are scoped to a
//! product by the reconciler's fault isolation. Item-level problems are not
//! errors at all: they become `SkipReason` counts.

use thiserror::Error;

/// Fatal-to-the-run failures. Anything that surfaces as `SyncError` means the
/// checkpoint is not advanced and the next run repeats the same window.
///
/// `Display`/`Error`/`From` are implemented by hand because the
/// `SyncInProgress` variant has a `String` field named `source`, which the
/// `thiserror` derive would insist on treating as the error source.
#[derive(Debug)]
pub enum SyncError {
    /// vendor unavailable (status {status:?}): {detail}
    VendorUnavailable {
        /// HTTP status when the vendor answered, `None` for network-level
        /// failures (timeout, DNS, connection reset).
        status: Option<u16>,
        /// Raw response body or transport error text, kept for diagnostics.
        detail: String,
    },

    /// sync already in progress for source '{source}'
    SyncInProgress { source: String },

    /// checkpoint write failed: {0}
    Checkpoint(StoreError),

    /// store error: {0}
    Store(StoreError),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VendorUnavailable { status, detail } => {
                write!(f, "vendor unavailable (status {status:?}): {detail}")
            }
            Self::SyncInProgress { source } => {
                write!(f, "sync already in progress for source '{source}'")
            }
            Self::Checkpoint(err) => write!(f, "checkpoint write failed: {err}"),
            Self::Store(err) => write!(f, "store error: {err}"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl SyncError {
    pub fn vendor_status(status: u16, body: impl Into<String>) -> Self {
        Self::VendorUnavailable {
            status: Some(status),
            detail: body.into(),
        }
    }

    pub fn vendor_transport(detail: impl Into<String>) -> Self {
        Self::VendorUnavailable {
            status: None,
            detail: detail.into(),
        }
    }

    /// True when retrying the same window later could succeed (the vendor was
    /// down or another run held the lock), as opposed to a store fault that
    /// needs operator attention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::VendorUnavailable { .. } | Self::SyncInProgress { .. }
        )
    }
}

/// Persistence failures, split so the reconciler can retry constraint
/// conflicts once before marking a product failed.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("constraint conflict on {entity}: {detail}")]
    Conflict { entity: String, detail: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Why a raw vendor item was skipped instead of normalized. Counted per run,
/// never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The payload entry was not a JSON object.
    NotAnObject,
    /// No parsable external vendor id, so the item has no durable identity.
    MissingExternalId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_errors_are_retryable() {
        assert!(SyncError::vendor_status(503, "down").is_retryable());
        assert!(SyncError::vendor_transport("timeout").is_retryable());
        assert!(
            SyncError::SyncInProgress {
                source: "vendor".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn store_errors_are_not_retryable() {
        let err = SyncError::Store(StoreError::Conflict {
            entity: "products".into(),
            detail: "slug".into(),
        });
        assert!(!err.is_retryable());
    }

    #[test]
    fn conflict_predicate() {
        assert!(
            StoreError::Conflict {
                entity: "product_variants".into(),
                detail: "vendor_item_id".into()
            }
            .is_conflict()
        );
        assert!(!StoreError::Database(sqlx::Error::PoolClosed).is_conflict());
    }
}
