//! Bounded, append-only ring collections on top of a record store.
//!
//! Depend on this crate via `cargo add ringstore`. It bundles the workspace
//! crates behind feature flags; the `registry` feature pulls in everything a
//! host needs to call [`registry::RingRegistry::start`] once before serving.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use ring_primitives as primitives;

/// Consumed store interface and the in-memory reference host.
pub use ring_store as store;

/// Ring event observers (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use ring_telemetry as telemetry;

/// Per-collection ring enforcement (enabled by `enforcer` feature).
#[cfg(feature = "enforcer")]
pub use ring_enforcer as enforcer;

/// Configuration-driven enforcer registry (enabled by `registry` feature).
#[cfg(feature = "registry")]
pub use ring_registry as registry;

/// Registration settings (enabled by `config` feature).
#[cfg(feature = "config")]
pub use ring_config as config;
