pub mod errors;
pub mod flattener;
pub mod select_builder;

use serde::Serialize;

pub use crate::entity_catalog::JoinType;
pub use errors::RenderBuildError;
pub use flattener::QueryFlattener;

use crate::utils::Value;

pub trait ToSql {
    fn to_sql(&self) -> String;
}

/// One flat SELECT statement produced from a join tree
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct FlatQuery {
    pub select: SelectItems,
    pub from: FromTableItem,
    pub joins: JoinItems,
    pub filters: FilterItems,
    pub group_by: GroupByExpressions,
    pub having_clause: Option<String>,
    pub order_by: OrderByItems,
    pub params: Vec<(String, Value)>,
}

#[derive(Debug, PartialEq, Clone, Default, Serialize)]
pub struct SelectItems {
    pub items: Vec<SelectItem>,
    pub distinct: bool,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct SelectItem {
    pub expression: String,
    pub col_alias: Option<String>,
}

impl SelectItem {
    pub fn aliased(expression: impl Into<String>, alias: impl Into<String>) -> Self {
        SelectItem {
            expression: expression.into(),
            col_alias: Some(alias.into()),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct FromTableItem {
    pub table_name: String,
    pub table_alias: String,
}

#[derive(Debug, PartialEq, Clone, Default, Serialize)]
pub struct JoinItems(pub Vec<Join>);

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Join {
    pub table_name: String,
    pub table_alias: String,
    /// Rendered ON terms, AND-combined on output
    pub joining_on: Vec<String>,
    pub join_type: JoinType,
}

/// Rendered WHERE terms, AND-combined on output
#[derive(Debug, PartialEq, Clone, Default, Serialize)]
pub struct FilterItems(pub Vec<String>);

#[derive(Debug, PartialEq, Clone, Default, Serialize)]
pub struct GroupByExpressions(pub Vec<String>);

#[derive(Debug, PartialEq, Clone, Default, Serialize)]
pub struct OrderByItems(pub Vec<String>);

/// `a` or `(a) AND (b) AND ...`
pub fn and_combine(terms: &[String]) -> Option<String> {
    match terms {
        [] => None,
        [single] => Some(single.clone()),
        many => Some(
            many.iter()
                .map(|t| format!("({})", t))
                .collect::<Vec<_>>()
                .join(" AND "),
        ),
    }
}
