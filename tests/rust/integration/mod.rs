//! Integration tests - the finder end to end over an in-memory mapping
//!
//! Rows are built the way a database would return them for the planned
//! statement, keyed by the generated column aliases.

mod common;
mod eager_loading_tests;
mod finder_property_tests;
mod mapping_error_tests;
