//! Observability for ring enforcement.
//!
//! Enforcers and the registry report what they do through a [`RingObserver`]
//! instead of writing to the console, so embedders pick the sink and tests can
//! assert on the emitted events.

#![warn(missing_docs, clippy::pedantic)]

mod observer;

pub use observer::{
    CollectingObserver, MutationKind, RingEvent, RingObserver, SharedObserver, TracingObserver,
};
