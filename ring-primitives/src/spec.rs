//! Ring specifications read from the configuration collection.

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::{Error, SpecId};

/// One configured ring: a target collection and the maximum rows it may hold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingSpec {
    id: SpecId,
    target: String,
    capacity: NonZeroU64,
}

impl RingSpec {
    /// Creates a validated ring specification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSpec`] when the target collection name is empty
    /// or the capacity is zero.
    pub fn new(id: SpecId, target: impl Into<String>, capacity: u64) -> crate::Result<Self> {
        let target = target.into();
        if target.trim().is_empty() {
            return Err(Error::invalid_spec(
                id.as_str(),
                "target collection name cannot be empty",
            ));
        }

        let Some(capacity) = NonZeroU64::new(capacity) else {
            return Err(Error::invalid_spec(
                id.as_str(),
                "capacity must be a positive integer",
            ));
        };

        Ok(Self {
            id,
            target,
            capacity,
        })
    }

    /// Returns the identifier of the configuration record.
    #[must_use]
    pub fn id(&self) -> &SpecId {
        &self.id
    }

    /// Returns the name of the collection the ring governs.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the maximum number of rows the ring retains.
    #[must_use]
    pub const fn capacity(&self) -> NonZeroU64 {
        self.capacity
    }

    /// Returns a copy of the spec pointing at the resolved collection name.
    ///
    /// Stores may accept a collection id where a name is expected; the registry
    /// keys enforcers by canonical name, so it rewrites the target after lookup.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_capacity_and_blank_target() {
        let err = RingSpec::new(SpecId::from("a"), "events", 0).expect_err("zero capacity");
        assert!(matches!(err, Error::InvalidSpec { .. }));

        let err = RingSpec::new(SpecId::from("b"), "  ", 4).expect_err("blank target");
        assert!(err.to_string().contains("target collection name"));

        let spec = RingSpec::new(SpecId::from("c"), "events", 4).unwrap();
        assert_eq!(spec.capacity().get(), 4);
        assert_eq!(spec.with_target("metrics").target(), "metrics");
    }
}
