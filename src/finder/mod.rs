//! Finder facade: one eager-loading query, end to end
//!
//! ```text
//! FindQuery ─► JoinTreeBuilder ─► AliasAssigner ─► QueryFlattener ─► SqlCompiler
//!                                                                       │
//!                            FoundRecords ◄─ Hydrator ◄─ RowExecutor ◄──┘
//! ```
//!
//! Every call builds its own join tree and hydration caches; the only state
//! shared between calls is the registry's descriptor cache.

use log::{debug, info};
use std::sync::Arc;

pub mod errors;
pub mod executor;
pub mod query;

pub use errors::FinderError;
pub use executor::{CannedExecutor, ExecutionError, RowExecutor};
pub use query::FindQuery;

use crate::config::FinderConfig;
use crate::entity_catalog::EntityRegistry;
use crate::hydration::{
    FromRecord, Hydrated, HydrationError, Hydrator, ObjectGraph, Record, RecordId, RelatedRecords,
    ResultRow,
};
use crate::query_planner::{AliasAssigner, JoinTree, JoinTreeBuilder, PlannerError};
use crate::render_plan::{FlatQuery, QueryFlattener};
use crate::sql_generator::{AnsiSqlCompiler, CompiledQuery, SqlCompiler, COUNT_COLUMN};
use crate::utils::Value;
use errors::Result;

pub struct ActiveFinder {
    registry: Arc<EntityRegistry>,
    config: FinderConfig,
    compiler: Arc<dyn SqlCompiler>,
}

impl ActiveFinder {
    pub fn new(registry: Arc<EntityRegistry>) -> Self {
        ActiveFinder {
            registry,
            config: FinderConfig::default(),
            compiler: Arc::new(AnsiSqlCompiler),
        }
    }

    pub fn with_config(mut self, config: FinderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn SqlCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Build, alias, flatten and compile without touching the database
    pub fn plan(&self, query: &FindQuery) -> Result<FinderPlan> {
        let builder = JoinTreeBuilder::new(&self.registry, self.config.max_relation_depth);
        let mut tree = builder
            .build(query.root(), query.options(), query.paths())
            .map_err(|e| match e {
                PlannerError::Catalog(mapping) => FinderError::Catalog(mapping),
                other => FinderError::Planner(other),
            })?;
        AliasAssigner::new().assign(&mut tree, &self.config.root_alias);
        let flat = QueryFlattener::new(&self.config.column_alias_prefix).flatten(&mut tree)?;
        let compiled = self.compiler.compile(&flat);
        debug!(
            "Planned `{}` with {} relation path(s): {} join node(s)",
            query.root(),
            query.paths().len(),
            tree.len()
        );
        Ok(FinderPlan {
            tree,
            flat,
            compiled,
            log_sql: self.config.log_sql,
        })
    }

    /// Plan, run one query and hydrate every row
    pub fn find_with_relations(
        &self,
        executor: &dyn RowExecutor,
        query: &FindQuery,
    ) -> Result<FoundRecords> {
        self.plan(query)?.execute(executor)
    }

    /// Number of distinct root records the query matches
    pub fn count(&self, executor: &dyn RowExecutor, query: &FindQuery) -> Result<u64> {
        let plan = self.plan(query)?;
        let root = plan.tree.root();
        let keys: Vec<String> = root
            .entity
            .primary_key
            .iter()
            .map(|pk| format!("{}.{}", root.alias, pk))
            .collect();
        let compiled = self.compiler.compile_count(&plan.flat, &keys);
        log_statement(self.config.log_sql, &compiled);

        let rows = executor
            .query_all(&compiled.sql, &compiled.params)
            .map_err(FinderError::Execution)?;
        let Some(first) = rows.first() else {
            return Ok(0);
        };
        first
            .get(COUNT_COLUMN)
            .and_then(Value::as_i64)
            .map(|n| n.max(0) as u64)
            .ok_or_else(|| {
                HydrationError::MissingCountColumn {
                    column: COUNT_COLUMN.to_string(),
                }
                .into()
            })
    }
}

fn log_statement(log_sql: bool, compiled: &CompiledQuery) {
    if log_sql {
        info!("{}\n-- params: {:?}", compiled.sql, compiled.params);
    } else {
        debug!("{}", compiled.sql);
    }
}

/// A planned query: join tree with its alias maps plus the compiled statement
#[derive(Debug, Clone)]
pub struct FinderPlan {
    tree: JoinTree,
    flat: FlatQuery,
    compiled: CompiledQuery,
    log_sql: bool,
}

impl FinderPlan {
    pub fn sql(&self) -> &str {
        &self.compiled.sql
    }

    pub fn params(&self) -> &[(String, Value)] {
        &self.compiled.params
    }

    pub fn compiled(&self) -> &CompiledQuery {
        &self.compiled
    }

    pub fn flat_query(&self) -> &FlatQuery {
        &self.flat
    }

    pub fn tree(&self) -> &JoinTree {
        &self.tree
    }

    /// Generated alias of `column` at a relation path (`""` is the root)
    pub fn column_alias_for(&self, path: &str, column: &str) -> Option<&str> {
        let node = self.tree.find_path(path)?;
        self.tree.node(node).column_alias(column)
    }

    /// Run the statement once and hydrate the rows
    pub fn execute(&self, executor: &dyn RowExecutor) -> Result<FoundRecords> {
        log_statement(self.log_sql, &self.compiled);
        let rows = executor
            .query_all(&self.compiled.sql, &self.compiled.params)
            .map_err(FinderError::Execution)?;
        self.hydrate(&rows)
    }

    /// Hydrate rows that were fetched elsewhere
    pub fn hydrate(&self, rows: &[ResultRow]) -> Result<FoundRecords> {
        let Hydrated { graph, roots } = Hydrator::new(&self.tree).hydrate_all(rows)?;
        debug!(
            "Hydrated {} row(s) into {} root record(s), {} record(s) total",
            rows.len(),
            roots.len(),
            graph.len()
        );
        Ok(FoundRecords { graph, roots })
    }
}

/// Root records of one find, in first-seen order, with the graph they live in
#[derive(Debug, Clone, Default)]
pub struct FoundRecords {
    graph: ObjectGraph,
    roots: RelatedRecords,
}

impl FoundRecords {
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.roots.ids().collect()
    }

    pub fn records(&self) -> Vec<&Record> {
        self.roots.ids().map(|id| self.graph.get(id)).collect()
    }

    /// Root with the given index value, when the query used `index_by`
    pub fn by_key(&self, key: &Value) -> Option<&Record> {
        self.roots.get(key).map(|id| self.graph.get(id))
    }

    /// Index values in result order, when the query used `index_by`
    pub fn keys(&self) -> Vec<&Value> {
        self.roots
            .entries()
            .iter()
            .filter_map(|e| e.key.as_ref())
            .collect()
    }

    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    pub fn typed<T: FromRecord>(&self) -> Result<Vec<T>> {
        self.roots
            .ids()
            .map(|id| T::from_record(&self.graph, id).map_err(FinderError::from))
            .collect()
    }

    /// JSON array, or an object keyed by index value when `index_by` was used
    pub fn to_json(&self) -> serde_json::Value {
        let keyed = self.roots.entries().iter().all(|e| e.key.is_some()) && !self.is_empty();
        if keyed {
            let object = self
                .roots
                .entries()
                .iter()
                .map(|e| {
                    let key = e.key.as_ref().map(|k| k.to_string()).unwrap_or_default();
                    (key, self.graph.to_json(e.record))
                })
                .collect();
            serde_json::Value::Object(object)
        } else {
            serde_json::Value::Array(self.roots.ids().map(|id| self.graph.to_json(id)).collect())
        }
    }
}
