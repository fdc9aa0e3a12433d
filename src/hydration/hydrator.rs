//! Rows -> deduplicated object graph
//!
//! Every row holds one combination of the root and each matched
//! descendant, so the same record shows up in many rows. Per join node the
//! hydrator keeps
//!
//! - `materialized`: dedup key -> record, so a key is built once and its
//!   attributes are never overwritten by later rows;
//! - `attached`: (parent key, attachment key) pairs already linked, so a
//!   to-many child is attached once per parent no matter how many rows
//!   repeat it. The attachment key is the index column value when the
//!   relation declares one, the child's dedup key otherwise; the first child
//!   attached under a key wins.

use log::trace;
use std::collections::{HashMap, HashSet};

use super::dedup_key::DedupKey;
use super::errors::{HydrationError, Result};
use super::record::{ObjectGraph, Record, RecordId, RelatedRecords};
use super::row::ResultRow;
use crate::entity_catalog::Cardinality;
use crate::query_planner::{JoinTree, NodeId, ROOT};

#[derive(Debug, Default)]
struct NodeCache {
    materialized: HashMap<DedupKey, RecordId>,
    attached: HashSet<(DedupKey, DedupKey)>,
}

/// Result of hydrating every row of one query
#[derive(Debug, Clone, Default)]
pub struct Hydrated {
    pub graph: ObjectGraph,
    /// Root records in first-seen order, keyed when an index column was requested
    pub roots: RelatedRecords,
}

pub struct Hydrator<'t> {
    tree: &'t JoinTree,
    caches: Vec<NodeCache>,
    graph: ObjectGraph,
    roots: RelatedRecords,
    seen_roots: HashSet<RecordId>,
}

impl<'t> Hydrator<'t> {
    pub fn new(tree: &'t JoinTree) -> Self {
        Hydrator {
            tree,
            caches: (0..tree.len()).map(|_| NodeCache::default()).collect(),
            graph: ObjectGraph::new(),
            roots: RelatedRecords::default(),
            seen_roots: HashSet::new(),
        }
    }

    /// Hydrate every row and collect the roots
    pub fn hydrate_all<'r>(
        mut self,
        rows: impl IntoIterator<Item = &'r ResultRow>,
    ) -> Result<Hydrated> {
        for row in rows {
            self.hydrate_row(row)?;
        }
        Ok(self.finish())
    }

    /// Hydrate one row; returns the root record it matched
    pub fn hydrate_row(&mut self, row: &ResultRow) -> Result<Option<RecordId>> {
        let Some((root, _)) = self.hydrate_node(ROOT, row) else {
            trace!("Row without root primary key skipped");
            return Ok(None);
        };

        if self.seen_roots.insert(root) {
            let root_node = self.tree.root();
            match &root_node.options.index {
                Some(column) => {
                    let key = self.graph.get(root).get(column).cloned().ok_or_else(|| {
                        HydrationError::UnknownIndexColumn {
                            entity: root_node.entity.name.clone(),
                            column: column.clone(),
                        }
                    })?;
                    self.roots.insert_keyed(key, root);
                }
                None => self.roots.push(root),
            }
        }
        Ok(Some(root))
    }

    pub fn finish(self) -> Hydrated {
        Hydrated {
            graph: self.graph,
            roots: self.roots,
        }
    }

    fn hydrate_node(&mut self, id: NodeId, row: &ResultRow) -> Option<(RecordId, DedupKey)> {
        let tree = self.tree;
        let node = tree.node(id);
        if !node.is_hydrated() || node.pk_aliases.is_empty() {
            return None;
        }

        let mut key_values = Vec::with_capacity(node.pk_aliases.len());
        for (_, alias) in &node.pk_aliases {
            match row.get(alias) {
                Some(value) if !value.is_null() => key_values.push(value),
                _ => return None,
            }
        }
        let key = DedupKey::from_values(key_values);

        let cached = self.caches[id].materialized.get(&key).copied();
        let record = match cached {
            Some(existing) => existing,
            None => {
                let attributes = node
                    .column_aliases
                    .iter()
                    .filter_map(|(generated, real)| {
                        row.get(generated).map(|v| (real.clone(), v.clone()))
                    })
                    .collect();
                let mut record = Record::from_row(node.entity.name.clone(), attributes);
                for (name, child) in &node.relations {
                    let child = tree.node(*child);
                    if let (true, Some(relation)) = (child.is_hydrated(), &child.relation) {
                        record.init_relation_slot(name, relation.cardinality);
                    }
                }
                let record_id = self.graph.insert(record);
                self.caches[id].materialized.insert(key.clone(), record_id);
                trace!("Node {} materialized {} as {:?}", id, key, record_id);
                record_id
            }
        };

        for (name, child_id) in &node.relations {
            let child = tree.node(*child_id);
            let Some(relation) = child.relation.as_ref().filter(|_| child.is_hydrated()) else {
                continue;
            };
            let Some((child_record, child_key)) = self.hydrate_node(*child_id, row) else {
                continue;
            };

            match relation.cardinality {
                Cardinality::Multiple => {
                    let index = child
                        .options
                        .index
                        .as_ref()
                        .and_then(|column| self.graph.get(child_record).get(column).cloned());
                    // an index column replaces the pk tuple as attachment key
                    let attach_key = match &index {
                        Some(value) => DedupKey::from_values([value]),
                        None => child_key,
                    };
                    if self.caches[*child_id]
                        .attached
                        .insert((key.clone(), attach_key))
                    {
                        self.graph.get_mut(record).attach_related(
                            name,
                            Cardinality::Multiple,
                            child_record,
                            index,
                        );
                    }
                }
                Cardinality::Single => {
                    self.graph.get_mut(record).attach_related(
                        name,
                        Cardinality::Single,
                        child_record,
                        None,
                    );
                }
            }
        }

        Some((record, key))
    }
}
