use serde::Serialize;

use crate::render_plan::{FlatQuery, OrderByItems, SelectItem, SelectItems, ToSql};
use crate::utils::Value;

mod to_sql_query;

/// Column alias of the single value returned by a count query
pub const COUNT_COLUMN: &str = "count";

/// SQL text plus the parameters it binds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<(String, Value)>,
}

/// Turns a flat query into dialect-specific SQL
pub trait SqlCompiler: Send + Sync {
    fn compile(&self, query: &FlatQuery) -> CompiledQuery;

    /// `SELECT COUNT(*)` over the distinct values of `key_expressions`,
    /// keeping every join and filter of `query`
    fn compile_count(&self, query: &FlatQuery, key_expressions: &[String]) -> CompiledQuery {
        let keys = FlatQuery {
            select: SelectItems {
                items: key_expressions
                    .iter()
                    .map(|expression| SelectItem {
                        expression: expression.clone(),
                        col_alias: None,
                    })
                    .collect(),
                distinct: true,
            },
            order_by: OrderByItems::default(),
            ..query.clone()
        };
        let inner = self.compile(&keys);
        CompiledQuery {
            sql: format!(
                "SELECT COUNT(*) AS \"{}\" FROM (\n{}\n) AS counted",
                COUNT_COLUMN, inner.sql
            ),
            params: inner.params,
        }
    }
}

/// Plain ANSI SQL rendering through the [`ToSql`] impls
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiSqlCompiler;

impl SqlCompiler for AnsiSqlCompiler {
    fn compile(&self, query: &FlatQuery) -> CompiledQuery {
        CompiledQuery {
            sql: query.to_sql(),
            params: query.params.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_plan::{
        FilterItems, FromTableItem, GroupByExpressions, Join, JoinItems, JoinType,
    };

    fn sample() -> FlatQuery {
        FlatQuery {
            select: SelectItems {
                items: vec![
                    SelectItem::aliased("t.id", "c0_0"),
                    SelectItem::aliased("items.id", "c1_0"),
                ],
                distinct: false,
            },
            from: FromTableItem {
                table_name: "orders".to_string(),
                table_alias: "t".to_string(),
            },
            joins: JoinItems(vec![Join {
                table_name: "items".to_string(),
                table_alias: "items".to_string(),
                joining_on: vec![
                    "items.order_id = t.id".to_string(),
                    "items.qty > 0".to_string(),
                ],
                join_type: JoinType::Left,
            }]),
            filters: FilterItems(vec!["t.status = :status".to_string()]),
            group_by: GroupByExpressions::default(),
            having_clause: None,
            order_by: OrderByItems(vec!["t.id DESC".to_string(), "items.position".to_string()]),
            params: vec![(":status".to_string(), Value::from("paid"))],
        }
    }

    #[test]
    fn test_compile_full_query() {
        let compiled = AnsiSqlCompiler.compile(&sample());
        assert_eq!(
            compiled.sql,
            "SELECT\n      t.id AS \"c0_0\",\n      items.id AS \"c1_0\"\n\
             FROM orders AS t\n\
             LEFT JOIN items AS items ON (items.order_id = t.id) AND (items.qty > 0)\n\
             WHERE t.status = :status\n\
             ORDER BY t.id DESC, items.position"
        );
        assert_eq!(compiled.params.len(), 1);
    }

    #[test]
    fn test_group_and_having() {
        let mut query = sample();
        query.joins = JoinItems::default();
        query.filters = FilterItems(vec!["a = 1".to_string(), "b = 2 OR c = 3".to_string()]);
        query.group_by = GroupByExpressions(vec!["t.id".to_string()]);
        query.having_clause = Some("COUNT(*) > 1".to_string());
        query.order_by = OrderByItems::default();
        let sql = AnsiSqlCompiler.compile(&query).sql;
        assert!(sql.contains(
            "WHERE (a = 1) AND (b = 2 OR c = 3)\nGROUP BY t.id\nHAVING COUNT(*) > 1"
        ));
    }

    #[test]
    fn test_count_query_keeps_joins_and_drops_order() {
        let compiled = AnsiSqlCompiler.compile_count(&sample(), &["t.id".to_string()]);
        assert!(compiled
            .sql
            .starts_with("SELECT COUNT(*) AS \"count\" FROM (\nSELECT DISTINCT\n      t.id\n"));
        assert!(compiled.sql.contains("LEFT JOIN items AS items"));
        assert!(!compiled.sql.contains("ORDER BY"));
        assert!(compiled.sql.ends_with(") AS counted"));
        assert_eq!(compiled.params, sample().params);
    }
}
