//! Ring registry: one enforcer per configured target collection.
//!
//! [`RingRegistry::start`] reads every spec from the configuration
//! collection, primes and installs an enforcer for each resolvable one, and
//! subscribes to the configuration collection so later spec creates, updates,
//! and deletes install, replace, or tear down the matching enforcer.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod registry;
mod resolve;

pub use error::{RegistryError, RegistryResult};
pub use registry::RingRegistry;
