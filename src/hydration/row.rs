use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::utils::Value;

/// One result row: emitted column alias -> value, in select order.
/// Lookups by alias go through a position index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<(String, Value)>", into = "Vec<(String, Value)>")]
pub struct ResultRow {
    values: Vec<(String, Value)>,
    positions: HashMap<String, usize>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a column, replacing an existing value of the same name
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.positions.get(&column) {
            Some(&at) => self.values[at].1 = value,
            None => {
                self.positions.insert(column.clone(), self.values.len());
                self.values.push((column, value));
            }
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.positions.get(column).map(|&at| &self.values[at].1)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ResultRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = ResultRow::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

impl From<Vec<(String, Value)>> for ResultRow {
    fn from(values: Vec<(String, Value)>) -> Self {
        values.into_iter().collect()
    }
}

impl From<ResultRow> for Vec<(String, Value)> {
    fn from(row: ResultRow) -> Self {
        row.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order_and_replaces() {
        let row = ResultRow::new()
            .with("c0_0", 1)
            .with("c0_1", "a")
            .with("c0_0", 2);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["c0_0", "c0_1"]);
        assert_eq!(row.get("c0_0"), Some(&Value::Int(2)));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_serializes_as_alias_value_pairs() {
        let row = ResultRow::new().with("c0_0", 1).with("c0_1", "a");
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json, serde_json::json!([["c0_0", 1], ["c0_1", "a"]]));
        let back: ResultRow = serde_json::from_value(json).unwrap();
        assert_eq!(back.get("c0_1"), Some(&Value::from("a")));
        assert_eq!(back, row);
    }
}
