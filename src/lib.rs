//! RelGraph - eager-loading joins for entity relation graphs over SQL tables
//!
//! This crate turns "load these entities together with these relation paths"
//! into one SQL statement and folds the joined rows back into a
//! deduplicated object graph:
//! - Entity and relation declarations (YAML or builder API)
//! - Join tree planning with via/junction-table bridges
//! - Alias assignment and query flattening
//! - SQL generation
//! - Row hydration

pub mod utils;

pub mod config;
pub mod entity_catalog;
pub mod finder;
pub mod hydration;
pub mod query_planner;
pub mod render_plan;
pub mod sql_generator;

pub use config::FinderConfig;
pub use entity_catalog::{EntityRegistry, RelationOptions, RelationOverrides};
pub use finder::{ActiveFinder, FindQuery, FinderError, FinderPlan, FoundRecords, RowExecutor};
pub use hydration::{FromRecord, ObjectGraph, Record, RecordId, ResultRow};
pub use utils::Value;
