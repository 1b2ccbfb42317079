//! Mutation hooks dispatched by a store's request pipeline.

use std::fmt::{self, Display, Formatter};

use async_trait::async_trait;
use ring_primitives::{ColumnValueMapper, ColumnValues};

use crate::record::Record;
use crate::store::RowPredicate;
use crate::StoreResult;

/// Handle returned by [`RecordStore::subscribe`](crate::RecordStore::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Wraps a store-allocated subscription number.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}

impl Display for SubscriptionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A pending insert, before the store has allocated a row identity.
#[derive(Debug, Clone)]
pub struct CreateEvent {
    collection: String,
    values: ColumnValues,
}

impl CreateEvent {
    /// Creates an event for a proposed insert into `collection`.
    #[must_use]
    pub fn new(collection: impl Into<String>, values: ColumnValues) -> Self {
        Self {
            collection: collection.into(),
            values,
        }
    }

    /// Returns the target collection name.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl ColumnValueMapper for CreateEvent {
    fn column_values(&self) -> &ColumnValues {
        &self.values
    }
}

/// An event about an existing row: a proposed update or delete, or any
/// completed write.
#[derive(Debug, Clone)]
pub struct RecordEvent {
    collection: String,
    record: Record,
}

impl RecordEvent {
    /// Creates an event for `record` in `collection`.
    #[must_use]
    pub fn new(collection: impl Into<String>, record: Record) -> Self {
        Self {
            collection: collection.into(),
            record,
        }
    }

    /// Returns the collection name.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the record. For before-update events this is the proposed state.
    #[must_use]
    pub fn record(&self) -> &Record {
        &self.record
    }
}

/// Replacement write substituted for a suppressed insert.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    /// Rows the replacement write targeted.
    pub predicate: RowPredicate,
    /// Content those rows now hold, identity field excluded.
    pub values: ColumnValues,
}

/// Outcome of a before-hook.
#[derive(Debug, Clone, PartialEq)]
pub enum HookDecision {
    /// Proceed with the original write.
    Allow,
    /// The original write is suppressed; the hook already applied the
    /// carried update in its place.
    Rewrite(Rewrite),
    /// Abort the request with the supplied reason.
    Reject(String),
}

impl HookDecision {
    /// Returns a rejection with the supplied reason.
    #[must_use]
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Reject(reason.into())
    }
}

/// Callbacks a store invokes around request-level writes to a collection.
///
/// Every method defaults to a no-op so implementations only override the
/// events they care about. Before-hooks run in subscription order and the first
/// non-[`HookDecision::Allow`] result ends dispatch; an `Err` aborts the
/// request and is returned to the caller.
#[async_trait]
pub trait RecordHook: Send + Sync {
    /// Invoked before a row is inserted.
    async fn before_create(&self, _event: &CreateEvent) -> StoreResult<HookDecision> {
        Ok(HookDecision::Allow)
    }

    /// Invoked before a row is updated.
    async fn before_update(&self, _event: &RecordEvent) -> StoreResult<HookDecision> {
        Ok(HookDecision::Allow)
    }

    /// Invoked before a row is deleted.
    async fn before_delete(&self, _event: &RecordEvent) -> StoreResult<HookDecision> {
        Ok(HookDecision::Allow)
    }

    /// Invoked after a row was inserted.
    async fn after_create(&self, _event: &RecordEvent) -> StoreResult<()> {
        Ok(())
    }

    /// Invoked after a row was updated.
    async fn after_update(&self, _event: &RecordEvent) -> StoreResult<()> {
        Ok(())
    }

    /// Invoked after a row was deleted.
    async fn after_delete(&self, _event: &RecordEvent) -> StoreResult<()> {
        Ok(())
    }
}
