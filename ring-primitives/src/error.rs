//! Shared error definitions for ring primitives.

use std::num::ParseIntError;

use thiserror::Error;

/// Result alias used throughout the ring runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating ring primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided row identity could not be parsed.
    #[error("invalid row id: {source}")]
    InvalidRowId {
        /// Source parsing error.
        #[from]
        source: ParseIntError,
    },

    /// Row identities start at one.
    #[error("row id must be greater than zero")]
    ZeroRowId,

    /// Ring specification failed validation.
    #[error("invalid ring spec `{spec_id}`: {reason}")]
    InvalidSpec {
        /// Identifier of the offending specification.
        spec_id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
}

impl Error {
    /// Convenience helper to construct spec validation errors.
    #[must_use]
    pub fn invalid_spec(spec_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSpec {
            spec_id: spec_id.into(),
            reason: reason.into(),
        }
    }
}
