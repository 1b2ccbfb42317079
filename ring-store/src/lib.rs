//! Record store interface consumed by ring enforcement.
//!
//! The real host database is an external collaborator; this crate describes
//! what ring enforcement needs from it (collection lookup, identity-range
//! aggregates, predicate updates and deletes, and mutation hooks) and ships
//! [`MemoryStore`], an in-process host used by tests and the demo binary.

#![warn(missing_docs, clippy::pedantic)]

pub mod error;
pub mod hooks;
pub mod memory;
pub mod record;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use hooks::{CreateEvent, HookDecision, RecordEvent, RecordHook, Rewrite, SubscriptionId};
pub use memory::{CreateOutcome, MemoryStore};
pub use record::{CollectionInfo, Record};
pub use store::{RecordStore, RowPredicate, RowStats};
