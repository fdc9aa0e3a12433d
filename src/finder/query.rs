use crate::entity_catalog::{RelationOptions, RelationOverrides};
use crate::query_planner::WithSpec;
use crate::utils::Value;

/// Builder for one eager-loading find.
///
/// ```ignore
/// let query = FindQuery::new("Order")
///     .with("customer")
///     .with("items.product")
///     .with_options("items", RelationOverrides::new().order("self.position DESC"))
///     .filter("self.status = :status")
///     .param(":status", "paid");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FindQuery {
    root: String,
    paths: Vec<WithSpec>,
    options: RelationOptions,
}

impl FindQuery {
    pub fn new(root: impl Into<String>) -> Self {
        FindQuery {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Eager-load a dotted relation path; repeated and prefix paths share nodes
    pub fn with(mut self, path: impl Into<String>) -> Self {
        self.paths.push(WithSpec::new(path));
        self
    }

    pub fn with_all<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths.extend(paths.into_iter().map(WithSpec::new));
        self
    }

    pub fn with_options(mut self, path: impl Into<String>, overrides: RelationOverrides) -> Self {
        self.paths.push(WithSpec::with_overrides(path, overrides));
        self
    }

    /// Root condition; repeated calls are AND-combined
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        let condition = condition.into();
        self.options.where_clause = Some(match self.options.where_clause.take() {
            Some(previous) => format!("({}) AND ({})", previous, condition),
            None => condition,
        });
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.params.insert(name.into(), value.into());
        self
    }

    /// Root ordering; repeated calls append
    pub fn order(mut self, order: impl Into<String>) -> Self {
        let order = order.into();
        self.options.order = Some(match self.options.order.take() {
            Some(previous) => format!("{}, {}", previous, order),
            None => order,
        });
        self
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = self.options.select(columns);
        self
    }

    /// Table alias of the root entity
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.options.alias = Some(alias.into());
        self
    }

    /// Key the result by a root column (`t.code`, `self.code` or `code`)
    pub fn index_by(mut self, column: impl Into<String>) -> Self {
        self.options.index = Some(column.into());
        self
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn paths(&self) -> &[WithSpec] {
        &self.paths
    }

    pub fn options(&self) -> &RelationOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_accumulates() {
        let query = FindQuery::new("Order")
            .with("items")
            .with_all(["customer", "items.product"])
            .filter("self.status = :status")
            .filter("self.total > 0")
            .order("self.id")
            .order("self.total DESC")
            .param(":status", "paid")
            .index_by("t.code");

        assert_eq!(query.root(), "Order");
        let paths: Vec<&str> = query.paths().iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["items", "customer", "items.product"]);
        assert_eq!(
            query.options().where_clause.as_deref(),
            Some("(self.status = :status) AND (self.total > 0)")
        );
        assert_eq!(query.options().order.as_deref(), Some("self.id, self.total DESC"));
        assert_eq!(query.options().index.as_deref(), Some("t.code"));
    }
}
