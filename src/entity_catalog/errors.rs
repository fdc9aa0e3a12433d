//! # Entity Catalog Error Types
//!
//! Errors raised while turning entity declarations into resolved descriptors.
//! Every variant is a mapping defect, not a transient condition: they are
//! raised once during resolution and abort the finder call that triggered it.
//!
//! ## Usage Patterns
//!
//! Messages always carry the entity name, and the relation name where one is
//! involved, because those are the only actionable pieces of information for
//! someone debugging a mapping:
//!
//! ```ignore
//! CatalogError::UnknownTargetEntity {
//!     entity: "Order".into(),
//!     relation: "customer".into(),
//!     target: "Custmer".into(),
//! }
//! // Relation `customer` on entity `Order` targets unknown entity `Custmer`
//! ```

use thiserror::Error;

use super::fragment::FragmentError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("Entity `{entity}` is not declared in the mapping")]
    UnknownEntity { entity: String },

    #[error("Entity `{entity}` maps to table `{table}`, which the schema provider does not know")]
    MissingTable { entity: String, table: String },

    #[error("Entity `{entity}` (table `{table}`) has no primary key")]
    MissingPrimaryKey { entity: String, table: String },

    #[error("Malformed relation declaration `{declaration}` on entity `{entity}`: {reason}. Expected `<name> -> <Target>` or `<name> -> <Target>[]`")]
    MalformedDeclaration {
        entity: String,
        declaration: String,
        reason: String,
    },

    #[error("Relation `{relation}` is declared twice on entity `{entity}`")]
    DuplicateRelation { entity: String, relation: String },

    #[error("Relation `{relation}` on entity `{entity}` targets unknown entity `{target}`")]
    UnknownTargetEntity {
        entity: String,
        relation: String,
        target: String,
    },

    #[error("Relation `{relation}` on entity `{entity}` goes via `{via}`, which is not a relation of `{entity}`")]
    UnknownViaRelation {
        entity: String,
        relation: String,
        via: String,
    },

    #[error("Relation `{relation}` on entity `{entity}` has an invalid join table `{expression}`: {reason}")]
    InvalidJoinTable {
        entity: String,
        relation: String,
        expression: String,
        reason: String,
    },

    #[error("Relation `{relation}` on entity `{entity}` goes via itself")]
    SelfReferencingVia { entity: String, relation: String },

    #[error("Relation `{relation}` on entity `{entity}` declares both `via` and `via_table`")]
    ConflictingIndirection { entity: String, relation: String },

    #[error("Relation `{relation}` on entity `{entity}` needs a join condition (`on`) unless it goes through `via_table`")]
    MissingJoinCondition { entity: String, relation: String },

    #[error("Invalid `{option}` fragment on relation `{relation}` of entity `{entity}`: {source}")]
    InvalidFragment {
        entity: String,
        relation: String,
        option: String,
        #[source]
        source: FragmentError,
    },

    #[error("Failed to read mapping file: {error}")]
    ConfigReadError { error: String },

    #[error("Failed to parse mapping: {error}")]
    ConfigParseError { error: String },

    #[error("Descriptor cache lock poisoned: {0}")]
    LockPoisoned(String),
}

impl<T> From<std::sync::PoisonError<T>> for CatalogError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        CatalogError::LockPoisoned(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
