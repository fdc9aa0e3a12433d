//! Join tree -> [`FlatQuery`]
//!
//! Nodes are visited depth-first so a child's JOIN always follows the JOIN
//! that brings its parent alias into scope. Relation-local fragments are
//! rendered against `{self -> own alias, parent -> structural parent alias}`.

use log::debug;

use super::errors::{RenderBuildError, Result};
use super::select_builder::{build_select, index_column};
use super::{
    FilterItems, FlatQuery, FromTableItem, GroupByExpressions, Join, JoinItems, JoinType,
    OrderByItems, SelectItems,
};
use crate::entity_catalog::{AliasScope, Fragment, JoinTable};
use crate::query_planner::{JoinNode, JoinTree};
use crate::utils::Value;

pub struct QueryFlattener<'a> {
    column_alias_prefix: &'a str,
}

#[derive(Default)]
struct Clauses {
    select: Vec<super::SelectItem>,
    joins: Vec<Join>,
    filters: Vec<String>,
    having: Vec<String>,
    order_by: Vec<String>,
    group_by: Vec<String>,
    params: Vec<(String, Value)>,
}

impl<'a> QueryFlattener<'a> {
    pub fn new(column_alias_prefix: &'a str) -> Self {
        QueryFlattener {
            column_alias_prefix,
        }
    }

    /// Flatten `tree`, recording column and primary-key alias maps on its
    /// nodes. Aliases must already be assigned.
    pub fn flatten(&self, tree: &mut JoinTree) -> Result<FlatQuery> {
        let mut clauses = Clauses::default();

        for id in tree.depth_first() {
            let parent_alias = tree.node(id).parent.map(|p| tree.node(p).alias.clone());
            let parent_key = tree
                .node(id)
                .parent
                .map(|p| tree.node(p).entity.primary_key.clone())
                .unwrap_or_default();

            let node = tree.node_mut(id);
            let items = build_select(node, parent_alias.as_deref(), self.column_alias_prefix)?;
            clauses.select.extend(items);
            normalize_index(node)?;

            if let Some(parent_alias) = parent_alias.as_deref() {
                self.emit_joins(node, parent_alias, &parent_key, &mut clauses)?;
            }
            self.emit_options(node, parent_alias.as_deref(), &mut clauses)?;
        }

        let root = tree.root();
        let query = FlatQuery {
            select: SelectItems {
                items: clauses.select,
                distinct: false,
            },
            from: FromTableItem {
                table_name: root.entity.table_name().to_string(),
                table_alias: root.alias.clone(),
            },
            joins: JoinItems(clauses.joins),
            filters: FilterItems(clauses.filters),
            group_by: GroupByExpressions(clauses.group_by),
            having_clause: super::and_combine(&clauses.having),
            order_by: OrderByItems(clauses.order_by),
            params: clauses.params,
        };
        debug!(
            "Flattened {} node(s): {} select item(s), {} join(s)",
            tree.len(),
            query.select.items.len(),
            query.joins.0.len()
        );
        Ok(query)
    }

    fn emit_joins(
        &self,
        node: &JoinNode,
        parent_alias: &str,
        parent_key: &[String],
        clauses: &mut Clauses,
    ) -> Result<()> {
        let join_type = node.options.join_type.unwrap_or_else(|| {
            if node.options.is_select_suppressed() {
                JoinType::Inner
            } else {
                JoinType::Left
            }
        });

        let relation = node.relation.as_ref();
        let mut joining_on = Vec::new();

        if let (Some(junction), Some(via_alias)) =
            (relation.and_then(|r| r.join_table()), &node.via_alias)
        {
            clauses.joins.push(junction_join(
                junction,
                via_alias,
                parent_alias,
                parent_key,
                join_type,
            ));
            for (pk, column) in node.entity.primary_key.iter().zip(&junction.target_columns) {
                joining_on.push(format!("{}.{} = {}.{}", node.alias, pk, via_alias, column));
            }
        }

        // `parent.` still means the owning table for junction relations
        let scope = AliasScope::child(&node.alias, parent_alias);
        let condition = Fragment::and_all(
            relation
                .and_then(|r| r.condition.as_ref())
                .into_iter()
                .chain(node.options.on.as_ref()),
        );
        if let Some(condition) = condition {
            joining_on.push(render(node, &condition, &scope)?);
        }

        clauses.joins.push(Join {
            table_name: node.entity.table_name().to_string(),
            table_alias: node.alias.clone(),
            joining_on,
            join_type,
        });
        Ok(())
    }

    fn emit_options(
        &self,
        node: &JoinNode,
        parent_alias: Option<&str>,
        clauses: &mut Clauses,
    ) -> Result<()> {
        let scope = AliasScope {
            own: &node.alias,
            parent: parent_alias,
        };
        let options = &node.options;
        if let Some(filter) = &options.where_clause {
            clauses.filters.push(render(node, filter, &scope)?);
        }
        if let Some(having) = &options.having {
            clauses.having.push(render(node, having, &scope)?);
        }
        if let Some(order) = &options.order {
            clauses.order_by.push(render(node, order, &scope)?);
        }
        if let Some(group) = &options.group {
            clauses.group_by.push(render(node, group, &scope)?);
        }
        bind_params(&mut clauses.params, &options.params)
    }
}

fn junction_join(
    junction: &JoinTable,
    via_alias: &str,
    parent_alias: &str,
    parent_key: &[String],
    join_type: JoinType,
) -> Join {
    let joining_on = junction
        .owner_columns
        .iter()
        .zip(parent_key)
        .map(|(column, pk)| format!("{}.{} = {}.{}", via_alias, column, parent_alias, pk))
        .collect();
    Join {
        table_name: junction.table.clone(),
        table_alias: via_alias.to_string(),
        joining_on,
        join_type,
    }
}

fn render(node: &JoinNode, fragment: &Fragment, scope: &AliasScope<'_>) -> Result<String> {
    fragment
        .render(scope)
        .map_err(|source| RenderBuildError::InvalidFragment {
            entity: node.entity.name.clone(),
            alias: node.alias.clone(),
            source,
        })
}

/// Rewrite an explicit index expression to a bare column and check that it
/// is selected
fn normalize_index(node: &mut JoinNode) -> Result<()> {
    if !node.is_hydrated() {
        return Ok(());
    }
    let Some(expression) = node.options.index.clone() else {
        return Ok(());
    };
    let column = index_column(&expression, &node.alias).to_string();
    if node.column_alias(&column).is_none() {
        return Err(RenderBuildError::IndexColumnNotSelected {
            entity: node.entity.name.clone(),
            alias: node.alias.clone(),
            column,
        });
    }
    node.options.index = Some(column);
    Ok(())
}

fn bind_params(bound: &mut Vec<(String, Value)>, params: &[(String, Value)]) -> Result<()> {
    for (name, value) in params {
        match bound.iter().find(|(n, _)| n == name) {
            Some((_, existing)) if existing == value => {}
            Some(_) => {
                return Err(RenderBuildError::ConflictingParameter { name: name.clone() });
            }
            None => bound.push((name.clone(), value.clone())),
        }
    }
    Ok(())
}
