//! Row records.
//!
//! A [`Record`] is one fetched row with named fields. Column names come from the
//! result-set description of the statement that produced the row and are shared
//! between all rows of that result set.

use crate::error::{DbError, DbResult};
use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value as JsonValue;
use std::ops::Index;
use std::sync::Arc;

static NULL: JsonValue = JsonValue::Null;

/// One fetched row: column names mapped to dynamically typed values.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<JsonValue>,
}

impl Record {
    /// Pair a row's values with the result-set column names.
    ///
    /// Extra values beyond the number of columns are dropped; missing values are NULL.
    pub fn new(columns: Arc<[String]>, mut values: Vec<JsonValue>) -> Self {
        values.resize(columns.len(), JsonValue::Null);
        Self { columns, values }
    }

    /// Column names in result-set order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in result-set order.
    pub fn values(&self) -> &[JsonValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a field by its exact (case-sensitive) column name.
    ///
    /// When the name occurs more than once, the last column wins.
    pub fn get(&self, column: &str) -> Option<&JsonValue> {
        self.columns
            .iter()
            .rposition(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    /// Check whether the record has a field with this name.
    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Decode one field into a concrete type.
    pub fn get_as<T: DeserializeOwned>(&self, column: &str) -> DbResult<T> {
        let value = self
            .get(column)
            .ok_or_else(|| DbError::schema(format!("Column not found: {}", column), column))?;
        T::deserialize(value).map_err(|e| {
            DbError::decode(format!("Column '{}' has an incompatible value: {}", column, e))
        })
    }

    /// Iterate over `(column, value)` pairs in result-set order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Render the record as a JSON object.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    /// Deserialize the whole record into a caller-supplied type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> DbResult<T> {
        serde_json::from_value(self.to_json()).map_err(DbError::from)
    }
}

/// Missing columns index to `Null`, mirroring `serde_json::Value`.
impl Index<&str> for Record {
    type Output = JsonValue;

    fn index(&self, column: &str) -> &JsonValue {
        self.get(column).unwrap_or(&NULL)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
