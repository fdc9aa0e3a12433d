use thiserror::Error;

use crate::entity_catalog::{CatalogError, FragmentError};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlannerError {
    #[error("Entity `{entity}` has no relation named `{relation}`")]
    UnknownRelation { entity: String, relation: String },

    #[error("Relation path `{path}` is deeper than the configured maximum of {max_depth} (via chains count)")]
    RelationPathTooDeep { path: String, max_depth: usize },

    #[error("Relation path `{path}` contains an empty segment")]
    EmptyRelationPath { path: String },

    #[error("Invalid `{option}` override for relation path `{path}`: {source}")]
    InvalidOverride {
        path: String,
        option: String,
        #[source]
        source: FragmentError,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
