//! Enforcer ownership and reactions to configuration changes.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use ring_config::RingConfig;
use ring_enforcer::{EnforcerHandle, RingEnforcer};
use ring_primitives::{RingSnapshot, RingSpec, SpecId};
use ring_store::{Record, RecordEvent, RecordHook, RecordStore, StoreResult, SubscriptionId};
use ring_telemetry::{RingEvent, SharedObserver};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::resolve::{Unresolved, resolve_spec, spec_id};
use crate::RegistryResult;

#[derive(Default)]
struct RingTable {
    rings: HashMap<String, EnforcerHandle>,
    specs: HashMap<SpecId, String>,
    watcher: Option<Watcher>,
}

struct Watcher {
    collection: String,
    subscription: SubscriptionId,
}

/// Owns one enforcer per governed collection.
///
/// Install, replace, and teardown are serialized by a registry-wide lock that
/// is distinct from each enforcer's own state lock.
pub struct RingRegistry {
    store: Arc<dyn RecordStore>,
    config: RingConfig,
    observer: SharedObserver,
    table: Mutex<RingTable>,
}

impl fmt::Debug for RingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingRegistry")
            .field("store", &"dyn RecordStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RingRegistry {
    /// Reads every ring spec, installs an enforcer for each resolvable one,
    /// and starts following changes to the configuration collection.
    ///
    /// A missing configuration collection is not an error: the registry then
    /// manages no rings. Specs naming a missing collection or a non-positive
    /// capacity are reported to `observer` and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidConfig`](crate::RegistryError::InvalidConfig)
    /// for unusable settings, and a ring or store error when reading specs or
    /// priming any enforcer fails. Enforcers installed before the failure are
    /// torn down again.
    pub async fn start(
        store: Arc<dyn RecordStore>,
        config: RingConfig,
        observer: SharedObserver,
    ) -> RegistryResult<Arc<Self>> {
        config.validate()?;

        let registry = Arc::new(Self {
            store,
            config,
            observer,
            table: Mutex::new(RingTable::default()),
        });

        let info = match registry
            .store
            .find_collection(registry.config.config_collection())
            .await
        {
            Ok(info) => info,
            Err(err) => {
                warn!(
                    collection = %registry.config.config_collection(),
                    ?err,
                    "ring config collection unavailable; managing no rings"
                );
                return Ok(registry);
            }
        };

        let mut table = registry.table.lock().await;
        if let Err(err) = registry.attach(&mut table, info.name()).await {
            registry.release_all(&mut table).await;
            return Err(err);
        }
        info!(
            collection = %info.name(),
            rings = table.rings.len(),
            "ring registry started"
        );
        drop(table);

        Ok(registry)
    }

    /// Like [`start`](Self::start), for hosts where a ring that cannot be
    /// primed must stop the process.
    ///
    /// # Panics
    ///
    /// Panics with the startup error when [`start`](Self::start) fails.
    pub async fn must_start(
        store: Arc<dyn RecordStore>,
        config: RingConfig,
        observer: SharedObserver,
    ) -> Arc<Self> {
        match Self::start(store, config, observer).await {
            Ok(registry) => registry,
            Err(err) => panic!("ring registry failed to start: {err}"),
        }
    }

    /// Returns the registration settings.
    #[must_use]
    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    /// Returns the governed collection names in sorted order.
    pub async fn active_rings(&self) -> Vec<String> {
        let mut names: Vec<String> = self.table.lock().await.rings.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Returns the current state of the ring governing `collection`.
    pub async fn snapshot(&self, collection: &str) -> Option<RingSnapshot> {
        let table = self.table.lock().await;
        let handle = table.rings.get(collection)?;
        Some(handle.enforcer().snapshot().await)
    }

    /// Stops following configuration changes and tears down every enforcer.
    pub async fn shutdown(&self) {
        let mut table = self.table.lock().await;
        if let Some(watcher) = table.watcher.take() {
            self.store
                .unsubscribe(&watcher.collection, watcher.subscription)
                .await;
        }
        self.release_all(&mut table).await;
        info!("ring registry shut down");
    }

    async fn attach(
        self: &Arc<Self>,
        table: &mut RingTable,
        collection: &str,
    ) -> RegistryResult<()> {
        for record in self.store.records(collection).await? {
            match resolve_spec(self.store.as_ref(), &self.config, &record).await {
                Ok(spec) => self.install(table, spec).await?,
                Err(unresolved) => self.skip(unresolved),
            }
        }

        let watcher: Arc<dyn RecordHook> = Arc::new(ConfigWatcher {
            registry: Arc::downgrade(self),
        });
        let subscription = self.store.subscribe(collection, watcher).await?;
        table.watcher = Some(Watcher {
            collection: collection.to_owned(),
            subscription,
        });
        Ok(())
    }

    /// Primes an enforcer for `spec`, replacing the target's current one.
    ///
    /// The current enforcer keeps the target's writes on hold while its
    /// successor primes, and stays in charge if priming fails.
    async fn install(&self, table: &mut RingTable, spec: RingSpec) -> RegistryResult<()> {
        let handle = RingEnforcer::install_replacing(
            Arc::clone(&self.store),
            spec.target(),
            spec.capacity(),
            Arc::clone(&self.observer),
            table.rings.get(spec.target()),
        )
        .await?;

        if let Some(replaced) = table.rings.insert(spec.target().to_owned(), handle) {
            replaced.teardown().await;
            self.observer.observe(&RingEvent::Replaced {
                collection: spec.target().to_owned(),
            });
        }
        table.specs.retain(|_, target| target != spec.target());
        table.specs.insert(spec.id().clone(), spec.target().to_owned());
        Ok(())
    }

    async fn release(&self, table: &mut RingTable, collection: &str) -> bool {
        let Some(handle) = table.rings.remove(collection) else {
            return false;
        };
        handle.teardown().await;
        table.specs.retain(|_, target| target != collection);
        self.observer.observe(&RingEvent::TornDown {
            collection: collection.to_owned(),
        });
        true
    }

    async fn release_all(&self, table: &mut RingTable) {
        let mut names: Vec<String> = table.rings.keys().cloned().collect();
        names.sort_unstable();
        for name in names {
            self.release(table, &name).await;
        }
    }

    fn skip(&self, unresolved: Unresolved) {
        self.observer.observe(&RingEvent::Skipped {
            target: unresolved.target,
            reason: unresolved.reason,
        });
    }

    async fn on_spec_created(&self, record: &Record) {
        let mut table = self.table.lock().await;
        if table.watcher.is_none() {
            return;
        }
        match resolve_spec(self.store.as_ref(), &self.config, record).await {
            Ok(spec) => {
                self.install_reporting(&mut table, spec).await;
            }
            Err(unresolved) => self.skip(unresolved),
        }
    }

    async fn on_spec_updated(&self, record: &Record) {
        let mut table = self.table.lock().await;
        if table.watcher.is_none() {
            return;
        }
        let id = spec_id(record, self.store.identity_field());
        let previous = table.specs.get(&id).cloned();

        match resolve_spec(self.store.as_ref(), &self.config, record).await {
            Ok(spec) => {
                let target = spec.target().to_owned();
                if self.install_reporting(&mut table, spec).await {
                    if let Some(previous) = previous.filter(|previous| *previous != target) {
                        self.release(&mut table, &previous).await;
                    }
                }
            }
            Err(unresolved) => {
                if let Some(previous) = previous {
                    self.release(&mut table, &previous).await;
                }
                self.skip(unresolved);
            }
        }
    }

    async fn on_spec_deleted(&self, record: &Record) {
        let mut table = self.table.lock().await;
        let id = spec_id(record, self.store.identity_field());
        let Some(target) = table.specs.remove(&id) else {
            debug!(spec_id = %id, "deleted ring spec had no enforcer");
            return;
        };
        self.release(&mut table, &target).await;
    }

    /// Installs outside startup, where a priming failure skips the spec
    /// instead of failing the process. Any enforcer already governing the
    /// target stays in place on failure.
    async fn install_reporting(&self, table: &mut RingTable, spec: RingSpec) -> bool {
        let target = spec.target().to_owned();
        match self.install(table, spec).await {
            Ok(()) => true,
            Err(err) => {
                warn!(collection = %target, ?err, "ring enforcer install failed");
                self.skip(Unresolved {
                    target,
                    reason: err.to_string(),
                });
                false
            }
        }
    }
}

/// Follows the configuration collection and forwards spec changes.
struct ConfigWatcher {
    registry: Weak<RingRegistry>,
}

#[async_trait]
impl RecordHook for ConfigWatcher {
    async fn after_create(&self, event: &RecordEvent) -> StoreResult<()> {
        if let Some(registry) = self.registry.upgrade() {
            registry.on_spec_created(event.record()).await;
        }
        Ok(())
    }

    async fn after_update(&self, event: &RecordEvent) -> StoreResult<()> {
        if let Some(registry) = self.registry.upgrade() {
            registry.on_spec_updated(event.record()).await;
        }
        Ok(())
    }

    async fn after_delete(&self, event: &RecordEvent) -> StoreResult<()> {
        if let Some(registry) = self.registry.upgrade() {
            registry.on_spec_deleted(event.record()).await;
        }
        Ok(())
    }
}
