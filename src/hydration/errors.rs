use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum HydrationError {
    #[error("Index column `{column}` of `{entity}` is not selected by the query")]
    UnknownIndexColumn { entity: String, column: String },

    #[error("Count query returned no `{column}` column")]
    MissingCountColumn { column: String },

    #[error("Record of `{entity}` has no attribute `{attribute}`")]
    MissingAttribute { entity: String, attribute: String },

    #[error("Attribute `{attribute}` of `{entity}` holds a {found} value, expected {expected}")]
    InvalidAttribute {
        entity: String,
        attribute: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Relation `{relation}` of `{entity}` was not loaded")]
    RelationNotLoaded { entity: String, relation: String },
}

pub type Result<T> = std::result::Result<T, HydrationError>;
