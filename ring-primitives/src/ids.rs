//! Row and specification identifier types.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Physical identity of a row inside a collection.
///
/// Row ids are allocated by the store, start at one, and are what slot
/// arithmetic and every row predicate address.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(u64);

impl RowId {
    /// The first identity a store hands out for an empty collection.
    pub const FIRST: Self = Self(1);

    /// Creates a row id, rejecting zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroRowId`] when `value` is zero.
    pub fn new(value: u64) -> Result<Self, Error> {
        if value == 0 {
            return Err(Error::ZeroRowId);
        }
        Ok(Self(value))
    }

    /// Returns the raw integer identity.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the identity immediately after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for RowId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl TryFrom<u64> for RowId {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RowId> for u64 {
    fn from(value: RowId) -> Self {
        value.0
    }
}

impl FromStr for RowId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().parse::<u64>()?;
        Self::new(value)
    }
}

/// Identifier of a ring specification record in the configuration collection.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecId(String);

impl SpecId {
    /// Wraps the identity of a configuration record.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SpecId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpecId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_id_parses_and_rejects_zero() {
        let id = "42".parse::<RowId>().expect("parse");
        assert_eq!(id.get(), 42);
        assert_eq!(id.next().get(), 43);

        assert!(matches!("0".parse::<RowId>(), Err(Error::ZeroRowId)));
        assert!(matches!(
            "abc".parse::<RowId>(),
            Err(Error::InvalidRowId { .. })
        ));
    }
}
