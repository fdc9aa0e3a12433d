use thiserror::Error;

use crate::entity_catalog::FragmentError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RenderBuildError {
    #[error("Cannot select `{expression}` from `{entity}` (alias `{alias}`): not a column of the table and no `AS <alias>` given")]
    InvalidSelect {
        entity: String,
        alias: String,
        expression: String,
    },

    #[error("Index column `{column}` of `{entity}` (alias `{alias}`) is not among the selected columns")]
    IndexColumnNotSelected {
        entity: String,
        alias: String,
        column: String,
    },

    #[error("Parameter `{name}` is bound twice with different values")]
    ConflictingParameter { name: String },

    #[error("Cannot render fragment for `{entity}` (alias `{alias}`): {source}")]
    InvalidFragment {
        entity: String,
        alias: String,
        #[source]
        source: FragmentError,
    },
}

pub type Result<T> = std::result::Result<T, RenderBuildError>;
