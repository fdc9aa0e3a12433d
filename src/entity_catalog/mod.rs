pub mod config;
pub mod descriptor;
pub mod errors;
pub mod fragment;
pub mod registry;
pub mod relation;
pub mod schema;

// Re-export commonly used types
pub use config::{
    EntityDeclaration, MappingConfig, RelationDeclaration, RelationOptions, RelationOverrides,
};
pub use descriptor::EntityDescriptor;
pub use errors::CatalogError;
pub use fragment::{AliasScope, Fragment, FragmentError, Placeholder};
pub use registry::EntityRegistry;
pub use relation::{
    Cardinality, Indirection, JoinTable, JoinType, QueryOptions, RelationDefinition, SelectSpec,
};
pub use schema::{ColumnSchema, SchemaProvider, StaticSchemaProvider, TableSchema};
