//! Stored rows and collection descriptors.

use ring_primitives::{ColumnValueMapper, ColumnValues, RowId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Descriptor of a collection known to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    id: String,
    name: String,
}

impl CollectionInfo {
    /// Creates a descriptor from the store-assigned id and the collection name.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Returns the store-assigned collection id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A persisted row: its physical identity and its column values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    row_id: RowId,
    #[serde(default)]
    values: ColumnValues,
}

impl Record {
    /// Creates a record from its identity and values.
    #[must_use]
    pub fn new(row_id: RowId, values: ColumnValues) -> Self {
        Self { row_id, values }
    }

    /// Returns the physical row identity.
    #[must_use]
    pub const fn row_id(&self) -> RowId {
        self.row_id
    }

    /// Returns the raw value stored for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Returns `field` as a string slice, if it holds one.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Returns `field` as an unsigned integer.
    ///
    /// Accepts JSON integers and numeric strings, since configuration rows are
    /// often edited by hand.
    #[must_use]
    pub fn get_u64(&self, field: &str) -> Option<u64> {
        match self.get(field)? {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Overwrites the columns present in `values`, leaving others untouched.
    pub fn merge(&mut self, values: ColumnValues) {
        self.values.extend(values);
    }

    /// Replaces every column with `values`, except `keep`, which retains its
    /// current value (or stays absent).
    pub fn replace_keeping(&mut self, mut values: ColumnValues, keep: &str) {
        match self.values.remove(keep) {
            Some(kept) => {
                values.insert(keep.to_owned(), kept);
            }
            None => {
                values.remove(keep);
            }
        }
        self.values = values;
    }
}

impl ColumnValueMapper for Record {
    fn column_values(&self) -> &ColumnValues {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(value: Value) -> ColumnValues {
        let Value::Object(map) = value else {
            unreachable!("test values must be objects")
        };
        map
    }

    #[test]
    fn typed_accessors() {
        let record = Record::new(
            RowId::FIRST,
            values(json!({"collection": "events", "size": "12", "count": 3})),
        );

        assert_eq!(record.get_str("collection"), Some("events"));
        assert_eq!(record.get_u64("size"), Some(12));
        assert_eq!(record.get_u64("count"), Some(3));
        assert_eq!(record.get_u64("collection"), None);
    }

    #[test]
    fn merge_overwrites_only_given_columns() {
        let mut record = Record::new(RowId::FIRST, values(json!({"id": "a", "v": 1, "w": 2})));
        record.merge(values(json!({"v": 10})));

        assert_eq!(record.get("v"), Some(&json!(10)));
        assert_eq!(record.get("w"), Some(&json!(2)));
        assert_eq!(record.get_str("id"), Some("a"));
    }

    #[test]
    fn replace_drops_missing_columns_but_keeps_identity() {
        let mut record = Record::new(
            RowId::FIRST,
            values(json!({"id": "a", "name": "r1", "secret": "r1-only"})),
        );
        record.replace_keeping(values(json!({"id": "b", "name": "r4"})), "id");

        assert_eq!(record.get_str("id"), Some("a"));
        assert_eq!(record.get_str("name"), Some("r4"));
        assert_eq!(record.get("secret"), None);

        let mut anonymous = Record::new(RowId::FIRST, values(json!({"v": 1})));
        anonymous.replace_keeping(values(json!({"id": "x", "v": 2})), "id");
        assert_eq!(anonymous.get("id"), None);
        assert_eq!(anonymous.get("v"), Some(&json!(2)));
    }
}
