//! Ring bookkeeping: capacity, logical pointers, and occupancy.

use std::num::NonZeroU64;

use ring_primitives::RingSnapshot;
use tracing::debug;

use crate::slot::slot_index;

/// Coarse occupancy of a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingPhase {
    /// No rows admitted.
    Empty,
    /// Some rows admitted, capacity not reached.
    Filling,
    /// Capacity reached; creates overwrite the oldest slot.
    Full,
}

/// What admitting the next create requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Let the store insert a new row.
    Insert,
    /// Suppress the insert and overwrite the row in this zero-based slot.
    Overwrite {
        /// Slot index derived from the oldest pointer.
        slot: u64,
    },
}

/// In-memory state of one ring.
///
/// Deciding ([`admit`](Self::admit)) and advancing ([`commit`](Self::commit))
/// are separate so a caller can apply the store write in between and leave
/// the state untouched when that write fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingState {
    capacity: NonZeroU64,
    oldest: u64,
    newest: u64,
    count: u64,
}

impl RingState {
    /// Creates the state of an empty ring.
    #[must_use]
    pub const fn new(capacity: NonZeroU64) -> Self {
        Self {
            capacity,
            oldest: 0,
            newest: 0,
            count: 0,
        }
    }

    /// Creates the state of a ring that already holds `count` rows, clamped to
    /// capacity. The oldest row sits in slot zero.
    #[must_use]
    pub fn primed(capacity: NonZeroU64, count: u64) -> Self {
        let count = count.min(capacity.get());
        if count == 0 {
            return Self::new(capacity);
        }
        Self {
            capacity,
            oldest: 1,
            newest: count,
            count,
        }
    }

    /// Returns the configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> NonZeroU64 {
        self.capacity
    }

    /// Returns the logical position of the oldest surviving row.
    #[must_use]
    pub const fn oldest(&self) -> u64 {
        self.oldest
    }

    /// Returns the logical position of the most recently admitted row.
    #[must_use]
    pub const fn newest(&self) -> u64 {
        self.newest
    }

    /// Returns the number of rows the ring holds.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn phase(&self) -> RingPhase {
        if self.count == 0 {
            RingPhase::Empty
        } else if self.count < self.capacity.get() {
            RingPhase::Filling
        } else {
            RingPhase::Full
        }
    }

    /// Decides how the next create is admitted without changing state.
    #[must_use]
    pub const fn admit(&self) -> Admission {
        match self.phase() {
            RingPhase::Empty | RingPhase::Filling => Admission::Insert,
            RingPhase::Full => Admission::Overwrite {
                slot: slot_index(self.oldest, self.capacity),
            },
        }
    }

    /// Advances the state after `admission` was carried out.
    pub fn commit(&mut self, admission: Admission) {
        let before = self.phase();
        match admission {
            Admission::Insert if self.count == 0 => {
                self.count = 1;
                self.oldest = 1;
                self.newest = 1;
            }
            Admission::Insert => {
                self.count = (self.count + 1).min(self.capacity.get());
                self.newest += 1;
            }
            Admission::Overwrite { .. } => {
                self.oldest += 1;
                self.newest += 1;
            }
        }

        let after = self.phase();
        if before != after {
            debug!(?before, ?after, count = self.count, "ring phase transition");
        }
    }

    /// Returns a serializable view of the state for `collection`.
    #[must_use]
    pub fn snapshot(&self, collection: &str) -> RingSnapshot {
        RingSnapshot {
            collection: collection.to_owned(),
            capacity: self.capacity.get(),
            oldest: self.oldest,
            newest: self.newest,
            count: self.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capacity(value: u64) -> NonZeroU64 {
        NonZeroU64::new(value).unwrap()
    }

    fn admit_and_commit(state: &mut RingState) -> Admission {
        let admission = state.admit();
        state.commit(admission);
        admission
    }

    #[test]
    fn fills_then_overwrites_oldest_first() {
        let mut state = RingState::new(capacity(3));
        assert_eq!(state.phase(), RingPhase::Empty);

        for expected in 1..=3 {
            assert_eq!(admit_and_commit(&mut state), Admission::Insert);
            assert_eq!(state.count(), expected);
        }
        assert_eq!(state.phase(), RingPhase::Full);
        assert_eq!((state.oldest(), state.newest()), (1, 3));

        let slots: Vec<Admission> = (0..4).map(|_| admit_and_commit(&mut state)).collect();
        assert_eq!(
            slots,
            [
                Admission::Overwrite { slot: 0 },
                Admission::Overwrite { slot: 1 },
                Admission::Overwrite { slot: 2 },
                Admission::Overwrite { slot: 0 },
            ]
        );
        assert_eq!(state.count(), 3);
        assert_eq!((state.oldest(), state.newest()), (5, 7));
    }

    #[test]
    fn oldest_pointer_only_moves_on_eviction() {
        let mut state = RingState::new(capacity(4));
        for _ in 0..4 {
            admit_and_commit(&mut state);
            assert_eq!(state.oldest(), 1);
        }
        admit_and_commit(&mut state);
        assert_eq!(state.oldest(), 2);
    }

    #[test]
    fn count_never_exceeds_capacity() {
        for cap in 1..6 {
            let mut state = RingState::new(capacity(cap));
            let mut previous = 0;
            for _ in 0..(cap * 3) {
                admit_and_commit(&mut state);
                assert!(state.count() <= cap);
                assert!(state.count() >= previous);
                previous = state.count();
            }
            assert_eq!(state.count(), cap);
        }
    }

    #[test]
    fn capacity_one_is_full_after_first_insert() {
        let mut state = RingState::new(capacity(1));
        assert_eq!(admit_and_commit(&mut state), Admission::Insert);
        assert_eq!(state.phase(), RingPhase::Full);
        assert_eq!(state.admit(), Admission::Overwrite { slot: 0 });
    }

    #[test]
    fn primed_state_clamps_and_starts_at_slot_zero() {
        let state = RingState::primed(capacity(2), 5);
        assert_eq!(state.count(), 2);
        assert_eq!(state.admit(), Admission::Overwrite { slot: 0 });

        let state = RingState::primed(capacity(4), 2);
        assert_eq!(state.phase(), RingPhase::Filling);
        assert_eq!((state.oldest(), state.newest()), (1, 2));

        assert_eq!(RingState::primed(capacity(4), 0), RingState::new(capacity(4)));
    }

    #[test]
    fn uncommitted_admission_leaves_state_unchanged() {
        let state = RingState::primed(capacity(3), 3);
        let before = state;
        let _ = state.admit();
        assert_eq!(state, before);
        assert_eq!(state.snapshot("events").count, 3);
    }
}
