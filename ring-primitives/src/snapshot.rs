//! Point-in-time view of a ring's bookkeeping.

use serde::{Deserialize, Serialize};

/// Serializable snapshot of an enforcer's pointers and occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingSnapshot {
    /// Collection the ring governs.
    pub collection: String,
    /// Maximum number of rows retained.
    pub capacity: u64,
    /// Logical index of the oldest surviving row.
    pub oldest: u64,
    /// Logical index of the most recently admitted row.
    pub newest: u64,
    /// Rows currently held, never above `capacity`.
    pub count: u64,
}

impl RingSnapshot {
    /// Returns `true` once the ring holds `capacity` rows.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.count == self.capacity
    }
}
