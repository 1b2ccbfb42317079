//! Ring enforcement for a single collection.
//!
//! A [`RingEnforcer`] primes its state from the rows a collection already
//! holds, trims overflow, then intercepts request-level writes: creates are
//! admitted until the ring is full and afterwards rewritten onto the oldest
//! slot, while direct updates and deletes are refused.

#![warn(missing_docs, clippy::pedantic)]

pub mod enforcer;
pub mod error;
pub mod slot;
pub mod state;

pub use enforcer::{EnforcerHandle, READ_ONLY_REASON, RingEnforcer};
pub use error::{RingError, RingResult};
pub use slot::{SlotMap, slot_index};
pub use state::{Admission, RingPhase, RingState};
