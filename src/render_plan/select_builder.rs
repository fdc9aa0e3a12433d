//! Column selection for one join node
//!
//! Every selected column gets a generated alias `<prefix><node id>_<n>` so
//! equal column names from different tables never collide in a result row.
//! The node keeps both directions of the mapping: generated alias -> real
//! column (to build attributes) and primary-key column -> generated alias
//! (to build dedup keys).

use lazy_static::lazy_static;
use regex::Regex;

use super::errors::{RenderBuildError, Result};
use super::SelectItem;
use crate::entity_catalog::{AliasScope, Fragment, SelectSpec};
use crate::query_planner::JoinNode;

lazy_static! {
    // `<expr> AS <alias>`, case-insensitive, alias must be a plain identifier
    static ref ALIASED_EXPRESSION: Regex =
        Regex::new(r"(?is)^(.+?)\s+AS\s+([A-Za-z_][A-Za-z0-9_]*)$").unwrap();
}

/// Compute the select list of `node` and record its alias maps.
///
/// Join-only and select-suppressed nodes contribute nothing and keep empty
/// maps. Primary-key columns are always selected, even when an explicit list
/// leaves them out.
pub fn build_select(
    node: &mut JoinNode,
    parent_alias: Option<&str>,
    prefix: &str,
) -> Result<Vec<SelectItem>> {
    node.column_aliases.clear();
    node.pk_aliases.clear();
    if !node.is_hydrated() {
        return Ok(Vec::new());
    }

    let own = node.alias.clone();
    let scope = AliasScope {
        own: &own,
        parent: parent_alias,
    };
    let entity = std::sync::Arc::clone(&node.entity);
    let mut builder = Selection {
        node,
        prefix,
        items: Vec::new(),
    };

    match builder.node.options.effective_select() {
        SelectSpec::Columns(expressions) => {
            for pk in &entity.primary_key {
                builder.column(&own, pk, true);
            }
            for expression in &expressions {
                builder.expression(&scope, expression)?;
            }
        }
        _ => {
            for column in entity.columns() {
                builder.column(&own, &column.name, column.primary_key);
            }
        }
    }

    Ok(builder.items)
}

struct Selection<'n> {
    node: &'n mut JoinNode,
    prefix: &'n str,
    items: Vec<SelectItem>,
}

impl Selection<'_> {
    fn next_alias(&self) -> String {
        format!("{}{}_{}", self.prefix, self.node.id, self.items.len())
    }

    fn column(&mut self, table_alias: &str, column: &str, primary_key: bool) {
        let alias = self.next_alias();
        self.items.push(SelectItem::aliased(
            format!("{}.{}", table_alias, column),
            alias.clone(),
        ));
        if primary_key {
            self.node.pk_aliases.push((column.to_string(), alias.clone()));
        }
        self.node.column_aliases.push((alias, column.to_string()));
    }

    fn expression(&mut self, scope: &AliasScope<'_>, expression: &Fragment) -> Result<()> {
        if let Some(captures) = ALIASED_EXPRESSION.captures(expression.raw()) {
            let alias = captures[2].to_string();
            let inner = Fragment::parse(&captures[1]).map_err(|e| self.fragment_error(e))?;
            let rendered = inner.render(scope).map_err(|e| self.fragment_error(e))?;
            self.items.push(SelectItem::aliased(rendered, alias.clone()));
            self.node.column_aliases.push((alias.clone(), alias));
            return Ok(());
        }

        match expression.bare_column() {
            Some(column) if self.node.column_alias(column).is_some() => Ok(()),
            Some(column) if self.node.entity.has_column(column) => {
                let column = column.to_string();
                self.column(scope.own, &column, false);
                Ok(())
            }
            _ => Err(RenderBuildError::InvalidSelect {
                entity: self.node.entity.name.clone(),
                alias: self.node.alias.clone(),
                expression: expression.raw().to_string(),
            }),
        }
    }

    fn fragment_error(&self, source: crate::entity_catalog::FragmentError) -> RenderBuildError {
        RenderBuildError::InvalidFragment {
            entity: self.node.entity.name.clone(),
            alias: self.node.alias.clone(),
            source,
        }
    }
}

/// Strip `<alias>.`, `self.` or `@.` from an index expression
pub fn index_column<'e>(expression: &'e str, table_alias: &str) -> &'e str {
    let expression = expression.trim();
    expression
        .strip_prefix(table_alias)
        .and_then(|rest| rest.strip_prefix('.'))
        .or_else(|| expression.strip_prefix("self."))
        .or_else(|| expression.strip_prefix("@."))
        .unwrap_or(expression)
}
