//! Mapping from logical ring positions onto physical row identities.
//!
//! Logical pointers are 1-based clocks that only ever grow. The modulo is
//! applied here, at the boundary, never to the stored pointer.

use std::num::NonZeroU64;

use ring_primitives::RowId;

/// Returns the zero-based slot the logical position `oldest` occupies.
#[must_use]
pub const fn slot_index(oldest: u64, capacity: NonZeroU64) -> u64 {
    oldest.saturating_sub(1) % capacity.get()
}

/// Physical rows backing each slot of a ring, in slot order.
///
/// Surviving rows need not be adjacent: a collection primed over
/// `{1, 3}` maps slot 0 to row 1 and slot 1 to row 3, and later inserts
/// take the slots after them. Once every slot is mapped the table never
/// changes, since overwrites keep their row's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotMap {
    capacity: NonZeroU64,
    rows: Vec<RowId>,
}

impl SlotMap {
    /// Creates a map with no slot assigned yet.
    #[must_use]
    pub const fn new(capacity: NonZeroU64) -> Self {
        Self {
            capacity,
            rows: Vec::new(),
        }
    }

    /// Assigns the next free slots to identities above the last mapped one.
    ///
    /// `row_ids` must be ascending; identities at or below the last mapped
    /// row are ignored, as is anything past capacity.
    pub fn extend(&mut self, row_ids: impl IntoIterator<Item = RowId>) {
        for row_id in row_ids {
            if self.is_complete() {
                break;
            }
            if self.rows.last().is_none_or(|last| row_id > *last) {
                self.rows.push(row_id);
            }
        }
    }

    /// Returns the row backing `slot`, if one has been mapped.
    #[must_use]
    pub fn row(&self, slot: u64) -> Option<RowId> {
        usize::try_from(slot)
            .ok()
            .and_then(|index| self.rows.get(index).copied())
    }

    /// Returns `true` once every slot has a row.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.row(self.capacity.get() - 1).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capacity(value: u64) -> NonZeroU64 {
        NonZeroU64::new(value).unwrap()
    }

    fn row(value: u64) -> RowId {
        RowId::new(value).unwrap()
    }

    #[test]
    fn wraps_around_capacity() {
        let slots: Vec<u64> = (1..=7).map(|oldest| slot_index(oldest, capacity(3))).collect();
        assert_eq!(slots, [0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn gaps_between_rows_are_skipped() {
        let mut slots = SlotMap::new(capacity(4));
        slots.extend([row(1), row(3)]);
        assert_eq!(slots.row(1), Some(row(3)));
        assert_eq!(slots.row(2), None);
        assert!(!slots.is_complete());

        slots.extend([row(1), row(3), row(4), row(9), row(10)]);
        assert!(slots.is_complete());
        let mapped: Vec<Option<RowId>> = (0..4).map(|slot| slots.row(slot)).collect();
        assert_eq!(mapped, [Some(row(1)), Some(row(3)), Some(row(4)), Some(row(9))]);
    }

    #[test]
    fn complete_map_ignores_further_rows() {
        let mut slots = SlotMap::new(capacity(1));
        slots.extend([row(12)]);
        slots.extend([row(13)]);
        for oldest in 1..5 {
            assert_eq!(slots.row(slot_index(oldest, capacity(1))), Some(row(12)));
        }
    }
}
