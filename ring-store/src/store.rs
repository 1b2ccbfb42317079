//! The store operations ring enforcement consumes.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use ring_primitives::{ColumnValues, RowId};
use serde::{Deserialize, Serialize};

use crate::hooks::{RecordHook, SubscriptionId};
use crate::record::{CollectionInfo, Record};
use crate::StoreResult;

/// Filter over physical row identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "row_id", rename_all = "snake_case")]
pub enum RowPredicate {
    /// Every row.
    All,
    /// Exactly one identity.
    Is(RowId),
    /// Identities less than or equal to the bound.
    AtMost(RowId),
}

impl RowPredicate {
    /// Returns `true` when `row_id` satisfies the predicate.
    #[must_use]
    pub fn matches(self, row_id: RowId) -> bool {
        match self {
            Self::All => true,
            Self::Is(target) => row_id == target,
            Self::AtMost(bound) => row_id <= bound,
        }
    }
}

impl Display for RowPredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("rowid = *"),
            Self::Is(row_id) => write!(f, "rowid = {row_id}"),
            Self::AtMost(row_id) => write!(f, "rowid <= {row_id}"),
        }
    }
}

/// Aggregate over the identities of the rows matching a predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowStats {
    /// Smallest matching identity, `None` when nothing matched.
    pub min: Option<RowId>,
    /// Largest matching identity, `None` when nothing matched.
    pub max: Option<RowId>,
    /// Number of matching rows.
    pub count: u64,
}

impl RowStats {
    /// Folds one more identity into the aggregate.
    pub fn observe(&mut self, row_id: RowId) {
        self.min = Some(self.min.map_or(row_id, |min| min.min(row_id)));
        self.max = Some(self.max.map_or(row_id, |max| max.max(row_id)));
        self.count += 1;
    }
}

/// Host store capabilities required by ring enforcement.
///
/// `replace_rows` and `delete_rows` are raw statements: they do not dispatch
/// mutation hooks, which is what lets an enforcer rewrite rows of a
/// collection whose request-level writes it rejects.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Name of the column holding each record's own identity, never rewritten
    /// by an overwrite.
    fn identity_field(&self) -> &str;

    /// Looks up a collection by name, falling back to its id.
    async fn find_collection(&self, name_or_id: &str) -> StoreResult<CollectionInfo>;

    /// Returns every record of the collection ordered by identity.
    async fn records(&self, collection: &str) -> StoreResult<Vec<Record>>;

    /// Computes min/max identity and row count over matching rows.
    async fn row_stats(&self, collection: &str, predicate: RowPredicate) -> StoreResult<RowStats>;

    /// Replaces the content of every matching row with `values`, returning
    /// how many rows changed.
    ///
    /// Each row keeps its physical identity and its
    /// [`identity_field`](Self::identity_field) value; every other column
    /// it held and `values` lacks is dropped.
    async fn replace_rows(
        &self,
        collection: &str,
        predicate: RowPredicate,
        values: ColumnValues,
    ) -> StoreResult<u64>;

    /// Deletes every matching row, returning how many rows were removed.
    async fn delete_rows(&self, collection: &str, predicate: RowPredicate) -> StoreResult<u64>;

    /// Attaches a hook to mutation events of the collection.
    async fn subscribe(
        &self,
        collection: &str,
        hook: Arc<dyn RecordHook>,
    ) -> StoreResult<SubscriptionId>;

    /// Detaches a hook; returns `false` when it was not attached.
    async fn unsubscribe(&self, collection: &str, subscription: SubscriptionId) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(value: u64) -> RowId {
        RowId::new(value).unwrap()
    }

    #[test]
    fn predicates_match_identity_ranges() {
        assert!(RowPredicate::All.matches(row(9)));
        assert!(RowPredicate::Is(row(3)).matches(row(3)));
        assert!(!RowPredicate::Is(row(3)).matches(row(4)));
        assert!(RowPredicate::AtMost(row(3)).matches(row(3)));
        assert!(!RowPredicate::AtMost(row(3)).matches(row(4)));
        assert_eq!(RowPredicate::AtMost(row(7)).to_string(), "rowid <= 7");
    }

    #[test]
    fn stats_fold_unordered_identities() {
        let mut stats = RowStats::default();
        assert_eq!((stats.min, stats.max, stats.count), (None, None, 0));

        for id in [6, 4, 9, 5] {
            stats.observe(row(id));
        }
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, Some(row(4)));
        assert_eq!(stats.max, Some(row(9)));
    }
}
