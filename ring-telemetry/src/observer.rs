//! Ring lifecycle events and the sinks that receive them.

use std::fmt::{self, Display, Formatter};
use std::sync::{Arc, Mutex};

use ring_primitives::{RingSnapshot, RowId};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Direct mutation kinds a ring refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// Request-level update of an existing row.
    Update,
    /// Request-level delete of an existing row.
    Delete,
}

impl Display for MutationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update => f.write_str("update"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// Something worth reporting about a ring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RingEvent {
    /// An enforcer was primed and its hooks attached.
    Installed {
        /// State the enforcer starts from.
        snapshot: RingSnapshot,
        /// Rows deleted while reconciling the collection to capacity.
        pruned: u64,
    },
    /// A ring specification could not be enforced.
    Skipped {
        /// Collection the specification named.
        target: String,
        /// Why the specification was skipped.
        reason: String,
    },
    /// A changed specification replaced a live enforcer.
    Replaced {
        /// Collection whose enforcer was swapped.
        collection: String,
    },
    /// An enforcer's hooks were detached.
    TornDown {
        /// Collection released from ring semantics.
        collection: String,
    },
    /// A direct mutation of a ring collection was refused.
    Rejected {
        /// Collection the mutation targeted.
        collection: String,
        /// Kind of mutation that was refused.
        mutation: MutationKind,
    },
    /// A create on a full ring overwrote its oldest row.
    Overwritten {
        /// Collection that was written.
        collection: String,
        /// Row that received the new values.
        row_id: RowId,
    },
}

impl RingEvent {
    /// Returns the collection the event concerns.
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::Installed { snapshot, .. } => &snapshot.collection,
            Self::Skipped { target, .. } => target,
            Self::Replaced { collection }
            | Self::TornDown { collection }
            | Self::Rejected { collection, .. }
            | Self::Overwritten { collection, .. } => collection,
        }
    }
}

/// Receives ring events.
pub trait RingObserver: Send + Sync {
    /// Handles one event. Must not block.
    fn observe(&self, event: &RingEvent);
}

/// Shared handle to an observer.
pub type SharedObserver = Arc<dyn RingObserver>;

/// Observer that turns events into `tracing` records.
///
/// Installation events carry the primed state rendered as a JSON status line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RingObserver for TracingObserver {
    fn observe(&self, event: &RingEvent) {
        match event {
            RingEvent::Installed { snapshot, pruned } => {
                let status = serde_json::to_string(snapshot).unwrap_or_default();
                info!(collection = %snapshot.collection, pruned = *pruned, %status, "ring installed");
            }
            RingEvent::Skipped { target, reason } => {
                warn!(collection = %target, reason = %reason, "ring spec skipped");
            }
            RingEvent::Replaced { collection } => {
                info!(collection = %collection, "ring spec changed; enforcer replaced");
            }
            RingEvent::TornDown { collection } => {
                info!(collection = %collection, "ring spec removed; enforcer torn down");
            }
            RingEvent::Rejected {
                collection,
                mutation,
            } => {
                warn!(collection = %collection, %mutation, "ring collection is insert-and-read-only only");
            }
            RingEvent::Overwritten { collection, row_id } => {
                debug!(collection = %collection, %row_id, "ring overwrote oldest row");
            }
        }
    }
}

/// Observer retaining every event in memory.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<RingEvent>>,
}

impl CollectingObserver {
    /// Creates a new collecting observer.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Removes and returns the events observed so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned by a previous panic.
    #[must_use]
    pub fn drain(&self) -> Vec<RingEvent> {
        let mut lock = self.events.lock().expect("collecting observer poisoned");
        lock.drain(..).collect()
    }
}

impl RingObserver for CollectingObserver {
    fn observe(&self, event: &RingEvent) {
        self.events
            .lock()
            .expect("collecting observer poisoned")
            .push(event.clone());
    }
}
