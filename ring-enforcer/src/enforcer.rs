//! Per-collection enforcer: priming, interception, and teardown.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use ring_primitives::{ColumnValueMapper, RingSnapshot, RowId};
use ring_store::{
    CreateEvent, HookDecision, Record, RecordEvent, RecordHook, RecordStore, Rewrite,
    RowPredicate, StoreResult, SubscriptionId,
};
use ring_telemetry::{MutationKind, RingEvent, SharedObserver};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::slot::SlotMap;
use crate::state::{Admission, RingState};
use crate::{RingError, RingResult};

/// Reason attached to refused updates and deletes.
pub const READ_ONLY_REASON: &str = "ring collection is insert-and-read-only only";

const RETIRED_REASON: &str = "ring enforcer is being torn down; retry the write";

#[derive(Debug)]
struct EnforcerInner {
    state: RingState,
    slots: SlotMap,
}

/// Outcome of reconciling a collection against its capacity.
#[derive(Debug, Clone)]
struct Priming {
    state: RingState,
    slots: SlotMap,
    pruned: u64,
}

/// Ring state machine bound to one collection.
pub struct RingEnforcer {
    collection: String,
    store: Arc<dyn RecordStore>,
    observer: SharedObserver,
    inner: Mutex<EnforcerInner>,
    retired: AtomicBool,
}

impl fmt::Debug for RingEnforcer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingEnforcer")
            .field("collection", &self.collection)
            .field("store", &"dyn RecordStore")
            .field("retired", &self.retired.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl RingEnforcer {
    /// Attaches an enforcer to `collection` and primes it.
    ///
    /// Hooks are attached first and priming runs while the enforcer's state
    /// lock is held, so a create arriving mid-install waits for the primed
    /// state instead of landing uncounted. Priming reads the collection's
    /// identity range, deletes every row at or below `max - capacity`, and
    /// maps the survivors onto slots in identity order.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::Store`] when an aggregate, prune, or subscription
    /// fails. Nothing stays attached in that case.
    pub async fn install(
        store: Arc<dyn RecordStore>,
        collection: impl Into<String>,
        capacity: NonZeroU64,
        observer: SharedObserver,
    ) -> RingResult<EnforcerHandle> {
        Self::install_replacing(store, collection, capacity, observer, None).await
    }

    /// Like [`install`](Self::install), but keeps `previous` on hold until
    /// the new enforcer is primed.
    ///
    /// Creates reaching `previous` in the meantime wait on its state lock. If
    /// priming fails, `previous` resumes untouched and stays responsible for
    /// its collection. On success it is retired: the writes it was holding
    /// are rejected with a retry hint, and the caller should tear it down.
    ///
    /// # Errors
    ///
    /// Same as [`install`](Self::install).
    pub async fn install_replacing(
        store: Arc<dyn RecordStore>,
        collection: impl Into<String>,
        capacity: NonZeroU64,
        observer: SharedObserver,
        previous: Option<&EnforcerHandle>,
    ) -> RingResult<EnforcerHandle> {
        let held = match previous {
            Some(handle) => Some(handle.enforcer.inner.lock().await),
            None => None,
        };

        let handle = Self::attach(store, collection.into(), capacity, observer).await?;

        if let Some(previous) = previous {
            previous.enforcer.retired.store(true, Ordering::Release);
        }
        drop(held);
        Ok(handle)
    }

    async fn attach(
        store: Arc<dyn RecordStore>,
        collection: String,
        capacity: NonZeroU64,
        observer: SharedObserver,
    ) -> RingResult<EnforcerHandle> {
        let enforcer = Arc::new(Self {
            collection: collection.clone(),
            store: Arc::clone(&store),
            observer: Arc::clone(&observer),
            inner: Mutex::new(EnforcerInner {
                state: RingState::new(capacity),
                slots: SlotMap::new(capacity),
            }),
            retired: AtomicBool::new(false),
        });

        // Hooks queue on this guard until the state below is primed.
        let mut inner = enforcer.inner.lock().await;
        let subscription = store
            .subscribe(&collection, Arc::clone(&enforcer) as Arc<dyn RecordHook>)
            .await?;

        let priming = match reconcile(store.as_ref(), &collection, capacity).await {
            Ok(priming) => priming,
            Err(err) => {
                enforcer.retired.store(true, Ordering::Release);
                store.unsubscribe(&collection, subscription).await;
                return Err(err);
            }
        };
        let snapshot = priming.state.snapshot(&collection);
        inner.state = priming.state;
        inner.slots = priming.slots;
        drop(inner);

        observer.observe(&RingEvent::Installed {
            snapshot,
            pruned: priming.pruned,
        });

        Ok(EnforcerHandle {
            collection,
            subscription,
            pruned: priming.pruned,
            enforcer,
            store,
        })
    }

    /// Returns the governed collection name.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns a snapshot of the current pointers and occupancy.
    pub async fn snapshot(&self) -> RingSnapshot {
        self.inner.lock().await.state.snapshot(&self.collection)
    }

    /// Returns `true` once the enforcer has been torn down or replaced.
    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Refuses further decisions and waits for an in-flight one to finish.
    async fn retire(&self) {
        self.retired.store(true, Ordering::Release);
        drop(self.inner.lock().await);
    }

    async fn admit_create(&self, event: &CreateEvent) -> RingResult<HookDecision> {
        let mut inner = self.inner.lock().await;
        if self.is_retired() {
            return Ok(HookDecision::reject(RETIRED_REASON));
        }

        let admission = inner.state.admit();
        let Admission::Overwrite { slot } = admission else {
            inner.state.commit(admission);
            debug!(collection = %self.collection, count = inner.state.count(), "ring admitted insert");
            return Ok(HookDecision::Allow);
        };

        let row_id = self.slot_row(&mut inner.slots, slot).await?;
        let predicate = RowPredicate::Is(row_id);
        let values = event.column_values_without(self.store.identity_field());

        let changed = self
            .store
            .replace_rows(&self.collection, predicate, values.clone())
            .await?;
        if changed == 0 {
            return Err(RingError::MissingSlot {
                collection: self.collection.clone(),
                row_id,
            });
        }

        inner.state.commit(admission);
        self.observer.observe(&RingEvent::Overwritten {
            collection: self.collection.clone(),
            row_id,
        });
        Ok(HookDecision::Rewrite(Rewrite { predicate, values }))
    }

    /// Returns the row backing `slot`, mapping rows inserted since priming
    /// the first time a slot past them is needed.
    async fn slot_row(&self, slots: &mut SlotMap, slot: u64) -> RingResult<RowId> {
        if let Some(row_id) = slots.row(slot) {
            return Ok(row_id);
        }
        let records = self.store.records(&self.collection).await?;
        slots.extend(records.iter().map(Record::row_id));
        slots.row(slot).ok_or_else(|| RingError::UnmappedSlot {
            collection: self.collection.clone(),
            slot,
        })
    }

    fn refuse(&self, mutation: MutationKind) -> HookDecision {
        self.observer.observe(&RingEvent::Rejected {
            collection: self.collection.clone(),
            mutation,
        });
        HookDecision::reject(READ_ONLY_REASON)
    }
}

#[async_trait]
impl RecordHook for RingEnforcer {
    async fn before_create(&self, event: &CreateEvent) -> StoreResult<HookDecision> {
        Ok(self.admit_create(event).await?)
    }

    async fn before_update(&self, _event: &RecordEvent) -> StoreResult<HookDecision> {
        Ok(self.refuse(MutationKind::Update))
    }

    async fn before_delete(&self, _event: &RecordEvent) -> StoreResult<HookDecision> {
        Ok(self.refuse(MutationKind::Delete))
    }
}

/// Live enforcer plus what is needed to detach it.
pub struct EnforcerHandle {
    collection: String,
    subscription: SubscriptionId,
    pruned: u64,
    enforcer: Arc<RingEnforcer>,
    store: Arc<dyn RecordStore>,
}

impl fmt::Debug for EnforcerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnforcerHandle")
            .field("collection", &self.collection)
            .field("subscription", &self.subscription)
            .field("pruned", &self.pruned)
            .finish_non_exhaustive()
    }
}

impl EnforcerHandle {
    /// Returns the governed collection name.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns how many rows installation deleted.
    #[must_use]
    pub const fn pruned(&self) -> u64 {
        self.pruned
    }

    /// Returns the underlying enforcer.
    #[must_use]
    pub fn enforcer(&self) -> &Arc<RingEnforcer> {
        &self.enforcer
    }

    /// Detaches the enforcer's hooks and waits for any in-flight decision.
    ///
    /// Events that were already dispatched to the enforcer and arrive after
    /// this call are rejected rather than half-applied. Returns `false` when
    /// the store no longer knew the subscription.
    pub async fn teardown(self) -> bool {
        let detached = self
            .store
            .unsubscribe(&self.collection, self.subscription)
            .await;
        self.enforcer.retire().await;
        info!(collection = %self.collection, detached, "ring hooks detached");
        detached
    }
}

/// Trims `collection` to `capacity` and derives the starting ring state.
async fn reconcile(
    store: &dyn RecordStore,
    collection: &str,
    capacity: NonZeroU64,
) -> RingResult<Priming> {
    let stats = store.row_stats(collection, RowPredicate::All).await?;
    let mut pruned = 0;

    if let Some(max) = stats.max {
        if stats.count > capacity.get() {
            let bound = RowId::new(max.get() - capacity.get())?;
            pruned = store
                .delete_rows(collection, RowPredicate::AtMost(bound))
                .await?;
        }
    }

    let survivors = store.records(collection).await?;
    let mut slots = SlotMap::new(capacity);
    slots.extend(survivors.iter().map(Record::row_id));
    let count = survivors.len() as u64;

    debug!(collection, count, pruned, "ring reconciled");
    Ok(Priming {
        state: RingState::primed(capacity, count),
        slots,
        pruned,
    })
}
