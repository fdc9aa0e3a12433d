//! Table metadata consumed by the catalog
//!
//! The catalog never introspects a database itself. It asks a
//! [`SchemaProvider`] for column metadata; [`StaticSchemaProvider`] serves
//! tables declared in the YAML mapping (or registered in code).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type", default = "default_data_type")]
    pub data_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
}

fn default_data_type() -> String {
    "String".to_string()
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        ColumnSchema {
            name: name.into(),
            data_type: data_type.into(),
            nullable: false,
            primary_key: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        TableSchema {
            name: name.into(),
            columns,
        }
    }

    /// Primary-key column names in declaration order
    pub fn primary_key(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// Source of table metadata.
///
/// Returning `None` means "unknown table"; the catalog turns that into a
/// configuration error naming the entity.
pub trait SchemaProvider: Send + Sync {
    fn table_schema(&self, table: &str) -> Option<TableSchema>;
}

/// In-memory schema provider
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaProvider {
    tables: HashMap<String, TableSchema>,
}

impl StaticSchemaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: TableSchema) -> Self {
        self.insert(table);
        self
    }

    pub fn insert(&mut self, table: TableSchema) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<TableSchema> for StaticSchemaProvider {
    fn from_iter<I: IntoIterator<Item = TableSchema>>(iter: I) -> Self {
        let mut provider = StaticSchemaProvider::new();
        for table in iter {
            provider.insert(table);
        }
        provider
    }
}

impl SchemaProvider for StaticSchemaProvider {
    fn table_schema(&self, table: &str) -> Option<TableSchema> {
        self.tables.get(table).cloned()
    }
}
