//! In-process record store with a hook-dispatching request pipeline.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use ring_primitives::{ColumnValueMapper, ColumnValues, RowId};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::hooks::{CreateEvent, HookDecision, RecordEvent, RecordHook, SubscriptionId};
use crate::record::{CollectionInfo, Record};
use crate::store::{RecordStore, RowPredicate, RowStats};
use crate::{StoreError, StoreResult};

const DEFAULT_IDENTITY_FIELD: &str = "id";

/// Result of a request-level create.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// A new row was inserted.
    Inserted(Record),
    /// A hook suppressed the insert and rewrote an existing row instead.
    Rewritten(Record),
}

impl CreateOutcome {
    /// Returns the row that now holds the created values.
    #[must_use]
    pub fn record(&self) -> &Record {
        match self {
            Self::Inserted(record) | Self::Rewritten(record) => record,
        }
    }

    /// Returns `true` when the create produced a new row.
    #[must_use]
    pub fn is_insert(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

#[derive(Debug)]
struct Table {
    info: CollectionInfo,
    rows: BTreeMap<RowId, Record>,
}

impl Table {
    fn next_row_id(&self) -> RowId {
        self.rows
            .last_key_value()
            .map_or(RowId::FIRST, |(row_id, _)| row_id.next())
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Update,
    Delete,
}

#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    hook: Arc<dyn RecordHook>,
}

/// Record store holding every collection in memory.
///
/// Row identities are allocated as one past the current maximum (or one for an
/// empty collection), and request-level writes ([`create`](Self::create),
/// [`update`](Self::update), [`delete`](Self::delete)) dispatch the
/// collection's hooks. Request-level writes are serialized store-wide, as a
/// single-writer database would; table locks are never held while a hook
/// runs, so hooks may issue raw statements but must not re-enter the request
/// pipeline.
pub struct MemoryStore {
    identity_field: String,
    writer: Mutex<()>,
    tables: RwLock<HashMap<String, Table>>,
    hooks: RwLock<HashMap<String, Vec<Subscription>>>,
    next_subscription: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store using `id` as the record identity field.
    #[must_use]
    pub fn new() -> Self {
        Self::with_identity_field(DEFAULT_IDENTITY_FIELD)
    }

    /// Creates an empty store using a custom record identity field.
    #[must_use]
    pub fn with_identity_field(identity_field: impl Into<String>) -> Self {
        Self {
            identity_field: identity_field.into(),
            writer: Mutex::new(()),
            tables: RwLock::new(HashMap::new()),
            hooks: RwLock::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Creates a new, empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateCollection`] when the name is taken and
    /// [`StoreError::Backend`] when it is blank.
    pub async fn create_collection(&self, name: &str) -> StoreResult<CollectionInfo> {
        if name.trim().is_empty() {
            return Err(StoreError::backend("collection name cannot be empty"));
        }

        let mut guard = self.tables.write().await;
        if guard.contains_key(name) {
            return Err(StoreError::DuplicateCollection {
                name: name.to_owned(),
            });
        }

        let info = CollectionInfo::new(format!("col_{}", Uuid::new_v4().simple()), name);
        guard.insert(
            name.to_owned(),
            Table {
                info: info.clone(),
                rows: BTreeMap::new(),
            },
        );
        Ok(info)
    }

    /// Returns one row by identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CollectionNotFound`] or
    /// [`StoreError::RecordNotFound`] when the lookup misses.
    pub async fn get(&self, collection: &str, row_id: RowId) -> StoreResult<Record> {
        let guard = self.tables.read().await;
        let table = lookup(&guard, collection)?;
        table
            .rows
            .get(&row_id)
            .cloned()
            .ok_or_else(|| StoreError::RecordNotFound {
                collection: table.info.name().to_owned(),
                row_id,
            })
    }

    /// Inserts a record, giving before-create hooks the chance to rewrite or
    /// reject it.
    ///
    /// A missing identity field is filled with a fresh UUID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Rejected`] when a hook refuses the write, and
    /// propagates any hook or lookup failure.
    pub async fn create(
        &self,
        collection: &str,
        mut values: ColumnValues,
    ) -> StoreResult<CreateOutcome> {
        let _writer = self.writer.lock().await;
        let name = self.find_collection(collection).await?.name().to_owned();
        values
            .entry(self.identity_field.clone())
            .or_insert_with(|| Value::String(Uuid::new_v4().simple().to_string()));

        let event = CreateEvent::new(name.clone(), values);
        for subscription in self.subscriptions(&name).await {
            match subscription.hook.before_create(&event).await? {
                HookDecision::Allow => {}
                HookDecision::Rewrite(rewrite) => {
                    debug!(collection = %name, predicate = %rewrite.predicate, "create rewritten by hook");
                    let record = self.first_matching(&name, rewrite.predicate).await?;
                    return Ok(CreateOutcome::Rewritten(record));
                }
                HookDecision::Reject(reason) => {
                    return Err(StoreError::Rejected {
                        collection: name,
                        reason,
                    });
                }
            }
        }

        let record = {
            let mut guard = self.tables.write().await;
            let table = lookup_mut(&mut guard, &name)?;
            let row_id = table.next_row_id();
            let record = Record::new(row_id, event.column_values().clone());
            table.rows.insert(row_id, record.clone());
            record
        };

        let event = RecordEvent::new(name.clone(), record.clone());
        for subscription in self.subscriptions(&name).await {
            subscription.hook.after_create(&event).await?;
        }

        Ok(CreateOutcome::Inserted(record))
    }

    /// Updates one row through the hook pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Rejected`] when a hook refuses the write,
    /// [`StoreError::RecordNotFound`] when the row is missing, and propagates
    /// hook failures.
    pub async fn update(
        &self,
        collection: &str,
        row_id: RowId,
        values: ColumnValues,
    ) -> StoreResult<Record> {
        let _writer = self.writer.lock().await;
        let name = self.find_collection(collection).await?.name().to_owned();
        let mut proposed = self.get(&name, row_id).await?;
        proposed.merge(values);

        let event = RecordEvent::new(name.clone(), proposed.clone());
        if !self.run_before(Phase::Update, &event).await? {
            return self.get(&name, row_id).await;
        }

        {
            let mut guard = self.tables.write().await;
            let table = lookup_mut(&mut guard, &name)?;
            let slot = table
                .rows
                .get_mut(&row_id)
                .ok_or_else(|| StoreError::RecordNotFound {
                    collection: name.clone(),
                    row_id,
                })?;
            *slot = proposed.clone();
        }

        for subscription in self.subscriptions(&name).await {
            subscription.hook.after_update(&event).await?;
        }
        Ok(proposed)
    }

    /// Deletes one row through the hook pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Rejected`] when a hook refuses the delete,
    /// [`StoreError::RecordNotFound`] when the row is missing, and propagates
    /// hook failures.
    pub async fn delete(&self, collection: &str, row_id: RowId) -> StoreResult<Record> {
        let _writer = self.writer.lock().await;
        let name = self.find_collection(collection).await?.name().to_owned();
        let current = self.get(&name, row_id).await?;

        let event = RecordEvent::new(name.clone(), current.clone());
        if !self.run_before(Phase::Delete, &event).await? {
            return Ok(current);
        }

        {
            let mut guard = self.tables.write().await;
            lookup_mut(&mut guard, &name)?.rows.remove(&row_id);
        }

        for subscription in self.subscriptions(&name).await {
            subscription.hook.after_delete(&event).await?;
        }
        Ok(current)
    }

    /// Returns how many hooks are attached to the collection.
    pub async fn subscription_count(&self, collection: &str) -> usize {
        self.hooks
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    async fn subscriptions(&self, collection: &str) -> Vec<Subscription> {
        self.hooks
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Runs before-update or before-delete hooks; `Ok(false)` means a hook
    /// suppressed the write.
    async fn run_before(&self, phase: Phase, event: &RecordEvent) -> StoreResult<bool> {
        for subscription in self.subscriptions(event.collection()).await {
            let decision = match phase {
                Phase::Update => subscription.hook.before_update(event).await?,
                Phase::Delete => subscription.hook.before_delete(event).await?,
            };
            match decision {
                HookDecision::Allow => {}
                HookDecision::Rewrite(_) => return Ok(false),
                HookDecision::Reject(reason) => {
                    return Err(StoreError::Rejected {
                        collection: event.collection().to_owned(),
                        reason,
                    });
                }
            }
        }
        Ok(true)
    }

    async fn first_matching(&self, collection: &str, predicate: RowPredicate) -> StoreResult<Record> {
        let guard = self.tables.read().await;
        let table = lookup(&guard, collection)?;
        table
            .rows
            .values()
            .find(|record| predicate.matches(record.row_id()))
            .cloned()
            .ok_or_else(|| {
                StoreError::backend(format!(
                    "rewrite of `{collection}` matched no row ({predicate})"
                ))
            })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<'a>(tables: &'a HashMap<String, Table>, name_or_id: &str) -> StoreResult<&'a Table> {
    tables
        .get(name_or_id)
        .or_else(|| tables.values().find(|table| table.info.id() == name_or_id))
        .ok_or_else(|| StoreError::CollectionNotFound {
            name: name_or_id.to_owned(),
        })
}

fn lookup_mut<'a>(
    tables: &'a mut HashMap<String, Table>,
    name: &str,
) -> StoreResult<&'a mut Table> {
    tables
        .get_mut(name)
        .ok_or_else(|| StoreError::CollectionNotFound {
            name: name.to_owned(),
        })
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn identity_field(&self) -> &str {
        &self.identity_field
    }

    async fn find_collection(&self, name_or_id: &str) -> StoreResult<CollectionInfo> {
        let guard = self.tables.read().await;
        lookup(&guard, name_or_id).map(|table| table.info.clone())
    }

    async fn records(&self, collection: &str) -> StoreResult<Vec<Record>> {
        let guard = self.tables.read().await;
        Ok(lookup(&guard, collection)?.rows.values().cloned().collect())
    }

    async fn row_stats(&self, collection: &str, predicate: RowPredicate) -> StoreResult<RowStats> {
        let guard = self.tables.read().await;
        let mut stats = RowStats::default();
        for row_id in lookup(&guard, collection)?.rows.keys() {
            if predicate.matches(*row_id) {
                stats.observe(*row_id);
            }
        }
        Ok(stats)
    }

    async fn replace_rows(
        &self,
        collection: &str,
        predicate: RowPredicate,
        values: ColumnValues,
    ) -> StoreResult<u64> {
        let mut guard = self.tables.write().await;
        let name = lookup(&guard, collection)?.info.name().to_owned();
        let table = lookup_mut(&mut guard, &name)?;
        let mut changed = 0;
        for record in table.rows.values_mut() {
            if predicate.matches(record.row_id()) {
                record.replace_keeping(values.clone(), &self.identity_field);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete_rows(&self, collection: &str, predicate: RowPredicate) -> StoreResult<u64> {
        let mut guard = self.tables.write().await;
        let name = lookup(&guard, collection)?.info.name().to_owned();
        let table = lookup_mut(&mut guard, &name)?;
        let before = table.rows.len();
        table.rows.retain(|row_id, _| !predicate.matches(*row_id));
        Ok((before - table.rows.len()) as u64)
    }

    async fn subscribe(
        &self,
        collection: &str,
        hook: Arc<dyn RecordHook>,
    ) -> StoreResult<SubscriptionId> {
        let name = self.find_collection(collection).await?.name().to_owned();
        let id = SubscriptionId::new(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.hooks
            .write()
            .await
            .entry(name)
            .or_default()
            .push(Subscription { id, hook });
        Ok(id)
    }

    async fn unsubscribe(&self, collection: &str, subscription: SubscriptionId) -> bool {
        let mut guard = self.hooks.write().await;
        let Some(subscriptions) = guard.get_mut(collection) else {
            return false;
        };
        let before = subscriptions.len();
        subscriptions.retain(|candidate| candidate.id != subscription);
        subscriptions.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::Rewrite;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn values(value: Value) -> ColumnValues {
        let Value::Object(map) = value else {
            unreachable!("test values must be objects")
        };
        map
    }

    fn row(value: u64) -> RowId {
        RowId::new(value).unwrap()
    }

    struct DenyWrites;

    #[async_trait]
    impl RecordHook for DenyWrites {
        async fn before_update(&self, _event: &RecordEvent) -> StoreResult<HookDecision> {
            Ok(HookDecision::reject("read only"))
        }

        async fn before_delete(&self, _event: &RecordEvent) -> StoreResult<HookDecision> {
            Ok(HookDecision::reject("read only"))
        }
    }

    struct RedirectToFirst {
        store: Arc<MemoryStore>,
    }

    #[async_trait]
    impl RecordHook for RedirectToFirst {
        async fn before_create(&self, event: &CreateEvent) -> StoreResult<HookDecision> {
            let predicate = RowPredicate::Is(RowId::FIRST);
            let values = event.column_values_without("id");
            self.store
                .replace_rows(event.collection(), predicate, values.clone())
                .await?;
            Ok(HookDecision::Rewrite(Rewrite { predicate, values }))
        }
    }

    #[derive(Default)]
    struct CountAfter {
        created: AtomicUsize,
        deleted: AtomicUsize,
    }

    #[async_trait]
    impl RecordHook for CountAfter {
        async fn after_create(&self, _event: &RecordEvent) -> StoreResult<()> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn after_delete(&self, _event: &RecordEvent) -> StoreResult<()> {
            self.deleted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn allocates_sequential_row_ids_and_identity() {
        let store = MemoryStore::new();
        let info = store.create_collection("events").await.unwrap();

        let first = store.create("events", values(json!({"v": 1}))).await.unwrap();
        let second = store.create(info.id(), values(json!({"v": 2}))).await.unwrap();

        assert!(first.is_insert());
        assert_eq!(first.record().row_id(), row(1));
        assert_eq!(second.record().row_id(), row(2));
        assert!(first.record().get_str("id").is_some());
        assert_ne!(first.record().get_str("id"), second.record().get_str("id"));

        store.delete_rows("events", RowPredicate::All).await.unwrap();
        let third = store.create("events", values(json!({"v": 3}))).await.unwrap();
        assert_eq!(third.record().row_id(), row(1));
    }

    #[tokio::test]
    async fn duplicate_and_missing_collections() {
        let store = MemoryStore::new();
        store.create_collection("events").await.unwrap();

        let err = store.create_collection("events").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCollection { .. }));

        let err = store.find_collection("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::CollectionNotFound { .. }));
    }

    #[tokio::test]
    async fn rejecting_hook_blocks_request_writes_but_not_raw_statements() {
        let store = MemoryStore::new();
        store.create_collection("events").await.unwrap();
        store.create("events", values(json!({"v": 1}))).await.unwrap();
        store
            .subscribe("events", Arc::new(DenyWrites))
            .await
            .unwrap();

        let err = store
            .update("events", row(1), values(json!({"v": 9})))
            .await
            .unwrap_err();
        assert!(err.is_rejection());
        let err = store.delete("events", row(1)).await.unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(store.get("events", row(1)).await.unwrap().get("v"), Some(&json!(1)));

        let changed = store
            .replace_rows("events", RowPredicate::Is(row(1)), values(json!({"v": 5})))
            .await
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(store.get("events", row(1)).await.unwrap().get("v"), Some(&json!(5)));
    }

    #[tokio::test]
    async fn raw_replace_keeps_only_the_custom_identity_field() {
        let store = MemoryStore::with_identity_field("uid");
        store.create_collection("events").await.unwrap();
        let created = store
            .create("events", values(json!({"name": "r1", "secret": "r1-only"})))
            .await
            .unwrap();
        let uid = created.record().get_str("uid").map(str::to_owned);
        assert!(uid.is_some());
        assert_eq!(created.record().get("id"), None);

        store
            .replace_rows(
                "events",
                RowPredicate::All,
                values(json!({"uid": "forged", "name": "r2"})),
            )
            .await
            .unwrap();

        let record = store.get("events", row(1)).await.unwrap();
        assert_eq!(record.get_str("uid"), uid.as_deref());
        assert_eq!(record.get_str("name"), Some("r2"));
        assert_eq!(record.get("secret"), None);
    }

    #[tokio::test]
    async fn rewrite_suppresses_insert() {
        let store = Arc::new(MemoryStore::new());
        store.create_collection("events").await.unwrap();
        let original = store.create("events", values(json!({"v": 1}))).await.unwrap();

        store
            .subscribe(
                "events",
                Arc::new(RedirectToFirst {
                    store: Arc::clone(&store),
                }),
            )
            .await
            .unwrap();

        let outcome = store.create("events", values(json!({"v": 2}))).await.unwrap();
        assert!(!outcome.is_insert());
        assert_eq!(outcome.record().row_id(), row(1));
        assert_eq!(outcome.record().get("v"), Some(&json!(2)));
        assert_eq!(
            outcome.record().get_str("id"),
            original.record().get_str("id")
        );
        assert_eq!(store.records("events").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn after_hooks_fire_until_unsubscribed() {
        let store = MemoryStore::new();
        store.create_collection("events").await.unwrap();
        let counter = Arc::new(CountAfter::default());
        let subscription = store
            .subscribe("events", Arc::clone(&counter) as Arc<dyn RecordHook>)
            .await
            .unwrap();

        store.create("events", values(json!({"v": 1}))).await.unwrap();
        store.delete("events", row(1)).await.unwrap();
        assert_eq!(counter.created.load(Ordering::SeqCst), 1);
        assert_eq!(counter.deleted.load(Ordering::SeqCst), 1);

        assert!(store.unsubscribe("events", subscription).await);
        assert!(!store.unsubscribe("events", subscription).await);
        assert_eq!(store.subscription_count("events").await, 0);

        store.create("events", values(json!({"v": 2}))).await.unwrap();
        assert_eq!(counter.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn row_stats_respect_predicates() {
        let store = MemoryStore::new();
        store.create_collection("events").await.unwrap();
        for v in 0..5 {
            store.create("events", values(json!({"v": v}))).await.unwrap();
        }

        let all = store.row_stats("events", RowPredicate::All).await.unwrap();
        assert_eq!((all.min, all.max, all.count), (Some(row(1)), Some(row(5)), 5));

        let head = store
            .row_stats("events", RowPredicate::AtMost(row(3)))
            .await
            .unwrap();
        assert_eq!((head.max, head.count), (Some(row(3)), 3));

        let removed = store
            .delete_rows("events", RowPredicate::AtMost(row(2)))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        let all = store.row_stats("events", RowPredicate::All).await.unwrap();
        assert_eq!(all.min, Some(row(3)));
    }
}
