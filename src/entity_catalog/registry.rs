//! Entity registry and descriptor cache
//!
//! Declarations are registered up front; descriptors are resolved lazily on
//! first use and cached per entity name. Concurrent first resolutions may
//! build the same descriptor twice, but only the first one published is ever
//! handed out.

use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, RwLock};

use super::config::{EntityDeclaration, MappingConfig, RelationDeclaration};
use super::descriptor::EntityDescriptor;
use super::errors::{CatalogError, Result};
use super::fragment::Fragment;
use super::relation::{parse_declaration, parse_join_table, Indirection, RelationDefinition};
use super::schema::{SchemaProvider, StaticSchemaProvider, TableSchema};

pub struct EntityRegistry {
    declarations: HashMap<String, EntityDeclaration>,
    schema: Arc<dyn SchemaProvider>,
    cache: RwLock<HashMap<String, Arc<EntityDescriptor>>>,
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.declarations.keys().collect();
        names.sort();
        f.debug_struct("EntityRegistry")
            .field("entities", &names)
            .finish_non_exhaustive()
    }
}

impl EntityRegistry {
    pub fn new(schema: Arc<dyn SchemaProvider>) -> Self {
        EntityRegistry {
            declarations: HashMap::new(),
            schema,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Registry whose tables come from the mapping's `tables` section
    pub fn from_config(config: MappingConfig) -> Self {
        let provider: StaticSchemaProvider = config.tables.into_iter().collect();
        let mut registry = EntityRegistry::new(Arc::new(provider));
        for entity in config.entities {
            registry.register(entity);
        }
        registry
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_config(MappingConfig::from_yaml_file(path)?))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(Self::from_config(MappingConfig::from_yaml_str(yaml)?))
    }

    /// Add or replace a declaration. A replaced entity's cached descriptor is
    /// dropped.
    pub fn register(&mut self, declaration: EntityDeclaration) {
        let name = declaration.name.clone();
        if self.declarations.insert(name.clone(), declaration).is_some() {
            if let Ok(mut cache) = self.cache.write() {
                cache.remove(&name);
            }
        }
    }

    pub fn is_declared(&self, entity: &str) -> bool {
        self.declarations.contains_key(entity)
    }

    /// Declared entity names, sorted
    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.declarations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Cached descriptor for `entity`, built on first request
    pub fn resolve(&self, entity: &str) -> Result<Arc<EntityDescriptor>> {
        if let Some(descriptor) = self.cache.read()?.get(entity) {
            return Ok(Arc::clone(descriptor));
        }

        let built = Arc::new(self.build_descriptor(entity)?);
        let mut cache = self.cache.write()?;
        let published = cache
            .entry(entity.to_string())
            .or_insert_with(|| Arc::clone(&built));
        debug!(
            "Resolved entity `{}` -> table `{}` ({} relations)",
            entity,
            published.table_name(),
            published.relations().len()
        );
        Ok(Arc::clone(published))
    }

    /// Drop the cached descriptor of one entity; returns whether one was cached
    pub fn refresh(&self, entity: &str) -> Result<bool> {
        let removed = self.cache.write()?.remove(entity).is_some();
        if removed {
            warn!("Dropped cached descriptor for entity `{}`", entity);
        }
        Ok(removed)
    }

    pub fn refresh_all(&self) -> Result<()> {
        let mut cache = self.cache.write()?;
        if !cache.is_empty() {
            warn!("Dropping {} cached entity descriptors", cache.len());
        }
        cache.clear();
        Ok(())
    }

    fn declaration(&self, entity: &str) -> Result<&EntityDeclaration> {
        self.declarations
            .get(entity)
            .ok_or_else(|| CatalogError::UnknownEntity {
                entity: entity.to_string(),
            })
    }

    fn table_for(&self, declaration: &EntityDeclaration) -> Result<TableSchema> {
        let table = self.schema.table_schema(&declaration.table).ok_or_else(|| {
            CatalogError::MissingTable {
                entity: declaration.name.clone(),
                table: declaration.table.clone(),
            }
        })?;
        if table.primary_key().is_empty() {
            return Err(CatalogError::MissingPrimaryKey {
                entity: declaration.name.clone(),
                table: declaration.table.clone(),
            });
        }
        Ok(table)
    }

    fn build_descriptor(&self, entity: &str) -> Result<EntityDescriptor> {
        let declaration = self.declaration(entity)?;
        let table = self.table_for(declaration)?;
        let owner_key_width = table.primary_key().len();

        let mut seen = HashSet::new();
        let mut relations = Vec::with_capacity(declaration.relations.len());
        for relation in &declaration.relations {
            let definition = self.build_relation(entity, owner_key_width, relation)?;
            if !seen.insert(definition.name.clone()) {
                return Err(CatalogError::DuplicateRelation {
                    entity: entity.to_string(),
                    relation: definition.name,
                });
            }
            relations.push(definition);
        }

        // via targets can only be checked once every relation name is known
        for relation in &relations {
            if let Some(via) = relation.via_relation() {
                if via == relation.name {
                    return Err(CatalogError::SelfReferencingVia {
                        entity: entity.to_string(),
                        relation: relation.name.clone(),
                    });
                }
                if !seen.contains(via) {
                    return Err(CatalogError::UnknownViaRelation {
                        entity: entity.to_string(),
                        relation: relation.name.clone(),
                        via: via.to_string(),
                    });
                }
            }
        }

        Ok(EntityDescriptor::new(entity, table, relations))
    }

    fn build_relation(
        &self,
        entity: &str,
        owner_key_width: usize,
        declaration: &RelationDeclaration,
    ) -> Result<RelationDefinition> {
        let parsed = parse_declaration(&declaration.relation).map_err(|reason| {
            CatalogError::MalformedDeclaration {
                entity: entity.to_string(),
                declaration: declaration.relation.clone(),
                reason,
            }
        })?;
        let relation_name = parsed.name.clone();

        let target = self
            .declarations
            .get(&parsed.target)
            .ok_or_else(|| CatalogError::UnknownTargetEntity {
                entity: entity.to_string(),
                relation: relation_name.clone(),
                target: parsed.target.clone(),
            })?;

        let indirection = match (&declaration.via, &declaration.via_table) {
            (Some(_), Some(_)) => {
                return Err(CatalogError::ConflictingIndirection {
                    entity: entity.to_string(),
                    relation: relation_name,
                })
            }
            (Some(via), None) => Indirection::ViaRelation(via.trim().to_string()),
            (None, Some(expression)) => {
                let target_key_width = self.table_for(target)?.primary_key().len();
                let invalid = |reason: String| CatalogError::InvalidJoinTable {
                    entity: entity.to_string(),
                    relation: relation_name.clone(),
                    expression: expression.clone(),
                    reason,
                };
                let join_table = parse_join_table(expression, owner_key_width).map_err(invalid)?;
                if join_table.target_columns.len() != target_key_width {
                    return Err(invalid(format!(
                        "expected {} target column(s) for `{}`, found {}",
                        target_key_width,
                        target.name,
                        join_table.target_columns.len()
                    )));
                }
                Indirection::ViaTable(join_table)
            }
            (None, None) => Indirection::None,
        };

        let condition = match declaration.on.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                Some(Fragment::parse(text).map_err(|source| CatalogError::InvalidFragment {
                    entity: entity.to_string(),
                    relation: relation_name.clone(),
                    option: "on".to_string(),
                    source,
                })?)
            }
            _ => None,
        };
        if condition.is_none() && !matches!(indirection, Indirection::ViaTable(_)) {
            return Err(CatalogError::MissingJoinCondition {
                entity: entity.to_string(),
                relation: relation_name,
            });
        }

        let options = declaration.options.to_query_options().map_err(|e| {
            CatalogError::InvalidFragment {
                entity: entity.to_string(),
                relation: relation_name.clone(),
                option: e.option.to_string(),
                source: e.source,
            }
        })?;

        Ok(RelationDefinition {
            name: parsed.name,
            target: parsed.target,
            cardinality: parsed.cardinality,
            condition,
            indirection,
            options,
        })
    }
}
