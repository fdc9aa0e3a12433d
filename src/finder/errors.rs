use thiserror::Error;

use super::executor::ExecutionError;
use crate::entity_catalog::CatalogError;
use crate::hydration::HydrationError;
use crate::query_planner::PlannerError;
use crate::render_plan::RenderBuildError;

#[derive(Debug, Error)]
pub enum FinderError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Render(#[from] RenderBuildError),

    #[error(transparent)]
    Hydration(#[from] HydrationError),

    #[error("Query execution failed: {0}")]
    Execution(#[source] ExecutionError),
}

pub type Result<T> = std::result::Result<T, FinderError>;
