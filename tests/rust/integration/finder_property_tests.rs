//! Whole-finder properties over the shop mapping

use std::collections::HashSet;

use relgraph::finder::CannedExecutor;
use relgraph::sql_generator::COUNT_COLUMN;
use relgraph::{FindQuery, FinderConfig, RelationOverrides, ResultRow, Value};

use super::common::{row, shop_finder};

fn order_rows(plan: &relgraph::FinderPlan) -> Vec<ResultRow> {
    let line = |item: i64, name: &str| {
        row(
            plan,
            &[
                ("", "id", 1.into()),
                ("items", "id", item.into()),
                ("items", "name", name.into()),
            ],
        )
    };
    vec![
        line(10, "pen"),
        line(11, "ink"),
        line(10, "pen"),
        row(plan, &[("", "id", 2.into())]),
    ]
}

#[test]
fn test_planning_and_hydration_are_deterministic() {
    let finder = shop_finder();
    let query = FindQuery::new("Order")
        .with_all(["customer", "items", "order_items.item"])
        .filter("self.status = :status")
        .param(":status", "paid");

    let first = finder.plan(&query).unwrap();
    let second = finder.plan(&query).unwrap();
    assert_eq!(first.sql(), second.sql());
    assert_eq!(first.params(), second.params());

    let rows = order_rows(&first);
    assert_eq!(
        first.hydrate(&rows).unwrap().to_json(),
        second.hydrate(&rows).unwrap().to_json()
    );
}

#[test]
fn test_repeated_child_keys_are_attached_once() {
    let finder = shop_finder();
    let plan = finder.plan(&FindQuery::new("Order").with("items")).unwrap();
    let found = plan.hydrate(&order_rows(&plan)).unwrap();

    let graph = found.graph();
    let ids = found.ids();
    let items = graph.many(ids[0], "items").unwrap();
    assert_eq!(items.len(), 2);
    let distinct: HashSet<*const relgraph::Record> =
        items.iter().map(|r| *r as *const relgraph::Record).collect();
    assert_eq!(distinct.len(), 2);
    // the second order matched nothing: loaded and empty
    assert!(graph.get(ids[1]).is_relation_loaded("items"));
    assert!(graph.many(ids[1], "items").unwrap().is_empty());
}

#[test]
fn test_item_shared_by_two_orders_is_one_instance() {
    let finder = shop_finder();
    let plan = finder.plan(&FindQuery::new("Order").with("items")).unwrap();
    let line = |order: i64, item: i64| {
        row(
            &plan,
            &[
                ("", "id", order.into()),
                ("items", "id", item.into()),
                ("items", "name", format!("item {}", item).into()),
            ],
        )
    };
    let rows = vec![line(1, 10), line(1, 11), line(2, 10), line(2, 10)];
    let found = plan.hydrate(&rows).unwrap();

    let graph = found.graph();
    let ids = found.ids();
    let first = graph.many(ids[0], "items").unwrap();
    let second = graph.many(ids[1], "items").unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].get("id"), Some(&Value::Int(10)));
    assert!(std::ptr::eq(first[0], second[0]));
    // two orders, items 10 and 11
    assert_eq!(graph.len(), 4);
}

#[test]
fn test_bridge_is_not_a_loaded_relation() {
    let finder = shop_finder();
    let plan = finder.plan(&FindQuery::new("Order").with("items")).unwrap();
    assert!(plan.column_alias_for("order_items", "position").is_none());
    assert!(!plan.sql().contains("AS \"c1_"), "bridge columns are never selected");

    let found = plan.hydrate(&order_rows(&plan)).unwrap();
    let order = found.graph().get(found.ids()[0]);
    assert!(!order.is_relation_loaded("order_items"));
    assert!(found.graph().many(found.ids()[0], "order_items").is_err());

    let json = found.to_json();
    assert!(json[0].get("items").is_some());
    assert!(json[0].get("order_items").is_none());
}

#[test]
fn test_aliases_are_pairwise_distinct() {
    let finder = shop_finder();
    let plan = finder
        .plan(&FindQuery::new("Post").with_all(["author", "comments.author", "tags"]))
        .unwrap();

    let tree = plan.tree();
    let mut aliases: HashSet<&str> = HashSet::new();
    for node in tree.nodes() {
        assert!(aliases.insert(node.alias.as_str()), "duplicate alias {}", node.alias);
        if let Some(via) = &node.via_alias {
            assert!(aliases.insert(via.as_str()), "duplicate alias {}", via);
        }
    }
    assert!(aliases.contains("author"));
    assert!(aliases.contains("author0"));
    assert!(aliases.contains("tags_post_tags"));
}

#[test]
fn test_via_table_statement_shape() {
    let finder = shop_finder();
    let plan = finder.plan(&FindQuery::new("Post").with("tags")).unwrap();
    assert!(plan
        .sql()
        .contains("LEFT JOIN post_tags AS tags_post_tags ON tags_post_tags.post_id = t.id"));
    assert!(plan
        .sql()
        .contains("LEFT JOIN tags AS tags ON tags.id = tags_post_tags.tag_id"));
}

#[test]
fn test_relation_filter_and_index() {
    let finder = shop_finder();
    let query = FindQuery::new("Order").with_options(
        "order_items",
        RelationOverrides::new()
            .filter("self.position < :max")
            .param(":max", 5)
            .index("self.item_id"),
    );
    let plan = finder.plan(&query).unwrap();
    assert!(plan.sql().contains("WHERE order_items.position < :max"));
    assert_eq!(plan.params(), &[(":max".to_string(), Value::Int(5))]);

    let line = |item: i64, position: i64| {
        row(
            &plan,
            &[
                ("", "id", 1.into()),
                ("order_items", "order_id", 1.into()),
                ("order_items", "item_id", item.into()),
                ("order_items", "position", position.into()),
            ],
        )
    };
    let found = plan.hydrate(&[line(10, 1), line(11, 2)]).unwrap();
    let json = found.to_json();
    assert_eq!(json[0]["order_items"][1]["item_id"], serde_json::json!(11));
}

#[test]
fn test_root_alias_from_config() {
    let finder = shop_finder().with_config(FinderConfig {
        root_alias: "o".to_string(),
        column_alias_prefix: "col".to_string(),
        ..Default::default()
    });
    let plan = finder.plan(&FindQuery::new("Order").with("customer")).unwrap();
    assert!(plan.sql().contains("FROM orders AS o"));
    assert!(plan.sql().contains("LEFT JOIN customers AS customer ON customer.id = o.customer_id"));
    assert_eq!(plan.column_alias_for("", "id"), Some("col0_0"));
}

#[test]
fn test_count_runs_one_distinct_statement() {
    let finder = shop_finder();
    let executor = CannedExecutor::new(vec![ResultRow::new().with(COUNT_COLUMN, 2)]);
    let count = finder
        .count(&executor, &FindQuery::new("Order").with("items").order("self.id"))
        .unwrap();
    assert_eq!(count, 2);

    let executed = executor.executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0]
        .sql
        .starts_with("SELECT COUNT(*) AS \"count\" FROM (\nSELECT DISTINCT\n      t.id\n"));
    assert!(!executed[0].sql.contains("ORDER BY"));

    let empty = CannedExecutor::new(Vec::new());
    assert_eq!(finder.count(&empty, &FindQuery::new("Order")).unwrap(), 0);
}
