//! Column-value maps carried by records and pending writes.

use serde_json::{Map, Value};

/// Mapping from column name to the value stored (or proposed) for it.
pub type ColumnValues = Map<String, Value>;

/// Exposes the column-value mapping of a record or a proposed write.
///
/// Enforcers only need read access to the mapping; they copy it and strip the
/// identity field before replaying it as an in-place update.
pub trait ColumnValueMapper {
    /// Returns the column values.
    fn column_values(&self) -> &ColumnValues;

    /// Returns an owned copy of the column values without `identity_field`.
    fn column_values_without(&self, identity_field: &str) -> ColumnValues {
        let mut values = self.column_values().clone();
        values.remove(identity_field);
        values
    }
}

impl ColumnValueMapper for ColumnValues {
    fn column_values(&self) -> &ColumnValues {
        self
    }
}
