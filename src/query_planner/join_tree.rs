//! Join tree: one node per distinct relation path of a finder call
//!
//! Nodes live in an arena indexed by [`NodeId`]; the root is always node 0.
//! Each node records two kinds of edges:
//!
//! - `children`: structural edges, used to emit JOINs. A via relation hangs
//!   below its bridge node.
//! - `relations`: logical edges, used to hydrate records. A via relation is
//!   a logical relation of the node that declared it, so the bridge stays
//!   invisible unless it was requested on its own.

use log::debug;
use std::sync::Arc;

use super::errors::{PlannerError, Result};
use crate::entity_catalog::{
    EntityDescriptor, EntityRegistry, QueryOptions, RelationDefinition, RelationOverrides,
};

pub type NodeId = usize;

pub const ROOT: NodeId = 0;

/// A requested relation path with optional per-call overrides
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WithSpec {
    pub path: String,
    pub overrides: Option<RelationOverrides>,
}

impl WithSpec {
    pub fn new(path: impl Into<String>) -> Self {
        WithSpec {
            path: path.into(),
            overrides: None,
        }
    }

    pub fn with_overrides(path: impl Into<String>, overrides: RelationOverrides) -> Self {
        WithSpec {
            path: path.into(),
            overrides: Some(overrides),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinNode {
    pub id: NodeId,
    pub entity: Arc<EntityDescriptor>,
    /// Specialized copy of the relation that produced this node (none for the root)
    pub relation: Option<RelationDefinition>,
    /// Effective options: relation defaults merged with every override
    pub options: QueryOptions,
    pub parent: Option<NodeId>,
    /// Structural children, insertion ordered
    pub children: Vec<(String, NodeId)>,
    /// Logical relations used for hydration, insertion ordered
    pub relations: Vec<(String, NodeId)>,
    /// Joined only so a via relation can reach its target
    pub join_only: bool,
    /// Number of structural edges from the root
    pub depth: usize,
    pub alias: String,
    /// Alias of the junction table of a via-table relation
    pub via_alias: Option<String>,
    /// generated column alias -> real column
    pub column_aliases: Vec<(String, String)>,
    /// real primary-key column -> generated column alias
    pub pk_aliases: Vec<(String, String)>,
}

impl JoinNode {
    fn new(
        id: NodeId,
        entity: Arc<EntityDescriptor>,
        relation: Option<RelationDefinition>,
        options: QueryOptions,
        parent: Option<NodeId>,
        depth: usize,
    ) -> Self {
        JoinNode {
            id,
            entity,
            relation,
            options,
            parent,
            children: Vec::new(),
            relations: Vec::new(),
            join_only: false,
            depth,
            alias: String::new(),
            via_alias: None,
            column_aliases: Vec::new(),
            pk_aliases: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Whether rows produce records for this node
    pub fn is_hydrated(&self) -> bool {
        !self.join_only && !self.options.is_select_suppressed()
    }

    pub fn relation_name(&self) -> Option<&str> {
        self.relation.as_ref().map(|r| r.name.as_str())
    }

    pub fn logical_relation(&self, name: &str) -> Option<NodeId> {
        self.relations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }

    /// Generated alias of a real column, if selected
    pub fn column_alias(&self, column: &str) -> Option<&str> {
        self.column_aliases
            .iter()
            .find(|(_, real)| real == column)
            .map(|(generated, _)| generated.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct JoinTree {
    nodes: Vec<JoinNode>,
}

impl JoinTree {
    pub fn new(root: Arc<EntityDescriptor>, options: QueryOptions) -> Self {
        JoinTree {
            nodes: vec![JoinNode::new(ROOT, root, None, options, None, 0)],
        }
    }

    pub fn root(&self) -> &JoinNode {
        &self.nodes[ROOT]
    }

    pub fn node(&self, id: NodeId) -> &JoinNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut JoinNode {
        &mut self.nodes[id]
    }

    pub fn nodes(&self) -> &[JoinNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node reached by following logical relations along a dotted path
    pub fn find_path(&self, path: &str) -> Option<NodeId> {
        if path.is_empty() {
            return Some(ROOT);
        }
        path.split('.').try_fold(ROOT, |current, segment| {
            self.nodes[current].logical_relation(segment)
        })
    }

    /// Depth-first, parent before children, children in insertion order
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            for (_, child) in self.nodes[id].children.iter().rev() {
                stack.push(*child);
            }
        }
        order
    }

    fn push(&mut self, mut node: JoinNode) -> NodeId {
        let id = self.nodes.len();
        node.id = id;
        self.nodes.push(node);
        id
    }
}

pub struct JoinTreeBuilder<'r> {
    registry: &'r EntityRegistry,
    max_depth: usize,
}

impl<'r> JoinTreeBuilder<'r> {
    pub fn new(registry: &'r EntityRegistry, max_depth: usize) -> Self {
        JoinTreeBuilder {
            registry,
            max_depth,
        }
    }

    pub fn build(
        &self,
        root_entity: &str,
        root_options: &RelationOverrides,
        paths: &[WithSpec],
    ) -> Result<JoinTree> {
        let root = self.registry.resolve(root_entity)?;
        let options = root_options
            .to_query_options()
            .map_err(|e| PlannerError::InvalidOverride {
                path: root_entity.to_string(),
                option: e.option.to_string(),
                source: e.source,
            })?;
        let mut tree = JoinTree::new(root, options);

        for spec in paths {
            self.add_path(&mut tree, spec)?;
        }

        debug!(
            "Built join tree for `{}`: {} node(s) from {} path(s)",
            root_entity,
            tree.len(),
            paths.len()
        );
        Ok(tree)
    }

    /// Add one relation path, reusing nodes already in the tree
    pub fn add_path(&self, tree: &mut JoinTree, spec: &WithSpec) -> Result<NodeId> {
        let path = spec.path.trim();
        if path.is_empty() || path.split('.').any(|s| s.trim().is_empty()) {
            return Err(PlannerError::EmptyRelationPath {
                path: spec.path.clone(),
            });
        }
        let overrides = match &spec.overrides {
            Some(o) => Some(o.to_query_options().map_err(|e| {
                PlannerError::InvalidOverride {
                    path: path.to_string(),
                    option: e.option.to_string(),
                    source: e.source,
                }
            })?),
            None => None,
        };
        self.ensure_path(tree, path, overrides.as_ref(), path)
    }

    fn ensure_path(
        &self,
        tree: &mut JoinTree,
        path: &str,
        overrides: Option<&QueryOptions>,
        full_path: &str,
    ) -> Result<NodeId> {
        let (parent, name) = match path.rfind('.') {
            Some(i) => (
                self.ensure_path(tree, &path[..i], None, full_path)?,
                path[i + 1..].trim(),
            ),
            None => (ROOT, path.trim()),
        };
        self.ensure_relation(tree, parent, name, overrides, false, full_path, 0)
    }

    /// Find or create the logical relation `name` of `parent`.
    ///
    /// `hops` counts via indirections followed so far; a via cycle keeps
    /// increasing it until the depth limit stops the recursion.
    #[allow(clippy::too_many_arguments)]
    fn ensure_relation(
        &self,
        tree: &mut JoinTree,
        parent: NodeId,
        name: &str,
        overrides: Option<&QueryOptions>,
        join_only: bool,
        full_path: &str,
        hops: usize,
    ) -> Result<NodeId> {
        if hops > self.max_depth {
            return Err(self.too_deep(full_path));
        }

        if let Some(existing) = tree.node(parent).logical_relation(name) {
            let node = tree.node_mut(existing);
            if !join_only {
                node.join_only = false;
            }
            if let Some(extra) = overrides {
                node.options.merge(extra);
            }
            return Ok(existing);
        }

        let owner = Arc::clone(&tree.node(parent).entity);
        let relation = owner
            .relation(name)
            .ok_or_else(|| PlannerError::UnknownRelation {
                entity: owner.name.clone(),
                relation: name.to_string(),
            })?
            .clone();

        let structural_parent = match relation.via_relation() {
            Some(through) => {
                self.ensure_relation(tree, parent, through, None, true, full_path, hops + 1)?
            }
            None => parent,
        };

        let depth = tree.node(structural_parent).depth + 1;
        if depth > self.max_depth {
            return Err(self.too_deep(full_path));
        }

        let target = self.registry.resolve(&relation.target)?;
        let mut options = relation.options.clone();
        if let Some(extra) = overrides {
            options.merge(extra);
        }

        let mut node = JoinNode::new(
            0,
            target,
            Some(relation),
            options,
            Some(structural_parent),
            depth,
        );
        node.join_only = join_only;
        let id = tree.push(node);
        tree.node_mut(structural_parent)
            .children
            .push((name.to_string(), id));
        tree.node_mut(parent).relations.push((name.to_string(), id));

        debug!(
            "Join node {} `{}` -> `{}` (parent {}, structural parent {}, join_only={})",
            id,
            name,
            tree.node(id).entity.name,
            parent,
            structural_parent,
            join_only
        );
        Ok(id)
    }

    fn too_deep(&self, path: &str) -> PlannerError {
        PlannerError::RelationPathTooDeep {
            path: path.to_string(),
            max_depth: self.max_depth,
        }
    }
}
