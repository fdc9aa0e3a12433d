use super::relation::RelationDefinition;
use super::schema::{ColumnSchema, TableSchema};

/// Resolved, immutable description of one entity type.
///
/// Shared through `Arc` by the registry; a join node that needs a different
/// relation shape clones the [`RelationDefinition`] instead of touching the
/// descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    pub name: String,
    pub table: TableSchema,
    pub primary_key: Vec<String>,
    relations: Vec<RelationDefinition>,
}

impl EntityDescriptor {
    pub fn new(
        name: impl Into<String>,
        table: TableSchema,
        relations: Vec<RelationDefinition>,
    ) -> Self {
        let primary_key = table.primary_key();
        EntityDescriptor {
            name: name.into(),
            table,
            primary_key,
            relations,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table.name
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.table.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.table.has_column(column)
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|pk| pk == column)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDefinition> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Relations in declaration order
    pub fn relations(&self) -> &[RelationDefinition] {
        &self.relations
    }
}
