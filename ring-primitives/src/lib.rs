//! Core shared types for ring-bounded record collections.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod snapshot;
mod spec;
mod values;

/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Physical row identities and ring specification identifiers.
pub use ids::{RowId, SpecId};
/// Serializable view of an enforcer's ring state.
pub use snapshot::RingSnapshot;
/// Validated ring configuration entries.
pub use spec::RingSpec;
/// Column-value maps exposed by records and pending writes.
pub use values::{ColumnValueMapper, ColumnValues};
