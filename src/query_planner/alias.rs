//! Table alias assignment
//!
//! Aliases are handed out in depth-first order (parent before children,
//! children in insertion order), so the same relation paths always produce
//! the same aliases. Candidates are the explicit `alias` option, then the
//! relation name, then the root alias. A taken candidate gets the first free
//! numeric suffix: `items`, `items0`, `items1`, ...

use log::debug;
use std::collections::HashSet;

use super::join_tree::JoinTree;

#[derive(Debug, Default)]
pub struct AliasAssigner {
    used: HashSet<String>,
}

impl AliasAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a unique alias derived from `candidate`
    pub fn reserve(&mut self, candidate: &str) -> String {
        if self.used.insert(candidate.to_string()) {
            return candidate.to_string();
        }
        let mut suffix = 0usize;
        loop {
            let alias = format!("{}{}", candidate, suffix);
            if self.used.insert(alias.clone()) {
                return alias;
            }
            suffix += 1;
        }
    }

    pub fn is_used(&self, alias: &str) -> bool {
        self.used.contains(alias)
    }

    /// Assign table and junction aliases to every node of `tree`
    pub fn assign(&mut self, tree: &mut JoinTree, root_alias: &str) {
        for id in tree.depth_first() {
            let node = tree.node(id);
            let candidate = node
                .options
                .alias
                .clone()
                .or_else(|| node.relation_name().map(str::to_string))
                .unwrap_or_else(|| root_alias.to_string());
            let junction = node
                .relation
                .as_ref()
                .and_then(|r| r.join_table())
                .map(|jt| jt.table.replace('.', "_"));

            let alias = self.reserve(&candidate);
            let via_alias = junction.map(|table| self.reserve(&format!("{}_{}", alias, table)));

            debug!("Node {} aliased `{}` (junction {:?})", id, alias, via_alias);
            let node = tree.node_mut(id);
            node.alias = alias;
            node.via_alias = via_alias;
        }
    }
}
