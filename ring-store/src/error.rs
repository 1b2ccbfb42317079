//! Error types for record store operations.

use ring_primitives::RowId;
use thiserror::Error;

/// Errors emitted by record stores and their request pipelines.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No collection matched the supplied name or id.
    #[error("collection `{name}` does not exist")]
    CollectionNotFound {
        /// Name or id that was looked up.
        name: String,
    },
    /// A collection with the same name already exists.
    #[error("collection `{name}` already exists")]
    DuplicateCollection {
        /// Name that was requested.
        name: String,
    },
    /// No row with the supplied identity exists.
    #[error("row {row_id} not found in `{collection}`")]
    RecordNotFound {
        /// Collection that was searched.
        collection: String,
        /// Identity that was requested.
        row_id: RowId,
    },
    /// A before-hook refused the write.
    #[error("write to `{collection}` rejected: {reason}")]
    Rejected {
        /// Collection the write targeted.
        collection: String,
        /// Reason supplied by the hook.
        reason: String,
    },
    /// A hook failed while handling an event.
    #[error("hook failed: {source}")]
    Hook {
        /// Error raised by the hook implementation.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Storage backend failure.
    #[error("store backend error: {reason}")]
    Backend {
        /// Human-readable context provided by the backend.
        reason: String,
    },
}

impl StoreError {
    /// Convenience helper to construct backend errors.
    #[must_use]
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }

    /// Wraps an arbitrary hook failure.
    #[must_use]
    pub fn hook(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Hook {
            source: Box::new(source),
        }
    }

    /// Returns `true` when the error is a hook rejection.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
