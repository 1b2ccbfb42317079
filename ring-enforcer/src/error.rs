//! Errors raised while priming or driving a ring.

use ring_primitives::RowId;
use ring_store::StoreError;
use thiserror::Error;

/// Errors surfaced by ring enforcers.
#[derive(Debug, Error)]
pub enum RingError {
    /// The host store failed a query or statement.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A derived identity was out of range.
    #[error(transparent)]
    Primitive(#[from] ring_primitives::Error),
    /// The ring is full but no row backs the slot due for overwrite.
    #[error("ring `{collection}` is full but slot {slot} has no row")]
    UnmappedSlot {
        /// Collection the ring governs.
        collection: String,
        /// Zero-based slot the oldest pointer selected.
        slot: u64,
    },
    /// The slot row selected for an overwrite no longer exists.
    #[error("ring `{collection}` slot row {row_id} is missing")]
    MissingSlot {
        /// Collection the ring governs.
        collection: String,
        /// Identity mapped to the slot.
        row_id: RowId,
    },
}

/// Result alias for ring operations.
pub type RingResult<T> = Result<T, RingError>;

impl From<RingError> for StoreError {
    fn from(err: RingError) -> Self {
        match err {
            RingError::Store(inner) => inner,
            other => StoreError::hook(other),
        }
    }
}
