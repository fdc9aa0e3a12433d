//! Eager-loading scenarios: one statement per find, rows folded back into
//! one instance per primary key.

use relgraph::{FindQuery, RelationOverrides, Value};

use super::common::{row, shop_finder};
use relgraph::finder::CannedExecutor;

#[test]
fn test_to_many_via_bridge_keeps_per_parent_counts() {
    let finder = shop_finder();
    let plan = finder
        .plan(&FindQuery::new("Order").with("items").order("self.id"))
        .unwrap();

    let line = |order: i64, status: &str, item: Option<(i64, &str)>| {
        row(
            &plan,
            &[
                ("", "id", order.into()),
                ("", "status", status.into()),
                ("items", "id", item.map(|(id, _)| id).into()),
                ("items", "name", item.map(|(_, name)| name).into()),
            ],
        )
    };
    let rows = vec![
        line(1, "paid", Some((10, "pen"))),
        line(1, "paid", Some((11, "ink"))),
        line(2, "open", None),
        line(3, "paid", Some((12, "pad"))),
    ];
    let executor = CannedExecutor::new(rows);
    let found = plan.execute(&executor).unwrap();

    assert_eq!(executor.executed().len(), 1, "exactly one statement per find");
    let orders = found.ids();
    assert_eq!(orders.len(), 3);

    let graph = found.graph();
    let counts: Vec<usize> = orders
        .iter()
        .map(|o| graph.many(*o, "items").unwrap().len())
        .collect();
    assert_eq!(counts, vec![2, 0, 1]);

    let first_items: Vec<&Value> = graph
        .many(orders[0], "items")
        .unwrap()
        .iter()
        .filter_map(|item| item.get("id"))
        .collect();
    assert_eq!(first_items, vec![&Value::Int(10), &Value::Int(11)]);
    assert_eq!(
        graph.many(orders[2], "items").unwrap()[0].get("name"),
        Some(&Value::from("pad"))
    );
}

#[test]
fn test_to_one_and_to_many_siblings_fan_out() {
    let finder = shop_finder();
    let plan = finder
        .plan(&FindQuery::new("Post").with_all(["author", "comments", "tags"]))
        .unwrap();

    let mut rows = Vec::new();
    for comment in [21, 22, 23] {
        for tag in [1, 2] {
            rows.push(row(
                &plan,
                &[
                    ("", "id", 1.into()),
                    ("", "author_id", 7.into()),
                    ("", "title", "hello".into()),
                    ("author", "id", 7.into()),
                    ("author", "name", "ann".into()),
                    ("comments", "id", comment.into()),
                    ("comments", "post_id", 1.into()),
                    ("comments", "title", format!("re {}", comment).into()),
                    ("tags", "id", tag.into()),
                    ("tags", "label", format!("tag {}", tag).into()),
                ],
            ));
        }
    }
    let found = plan.hydrate(&rows).unwrap();

    assert_eq!(found.len(), 1);
    let post = found.ids()[0];
    let graph = found.graph();
    assert_eq!(graph.many(post, "comments").unwrap().len(), 3);
    assert_eq!(graph.many(post, "tags").unwrap().len(), 2);
    assert_eq!(
        graph.one(post, "author").unwrap().and_then(|a| a.get("name")),
        Some(&Value::from("ann"))
    );
    // post, one author, three comments, two tags
    assert_eq!(graph.len(), 7);
}

#[test]
fn test_narrowed_select_still_deduplicates() {
    let finder = shop_finder();
    let plan = finder
        .plan(
            &FindQuery::new("Post")
                .with_options("comments", RelationOverrides::new().select(["title"])),
        )
        .unwrap();

    assert!(plan.column_alias_for("comments", "id").is_some());
    assert!(plan.column_alias_for("comments", "title").is_some());
    assert!(plan.column_alias_for("comments", "body").is_none());

    let comment = |id: i64, title: &str| {
        row(
            &plan,
            &[
                ("", "id", 1.into()),
                ("comments", "id", id.into()),
                ("comments", "title", title.into()),
            ],
        )
    };
    let rows = vec![comment(21, "a"), comment(21, "a"), comment(22, "b"), comment(21, "a")];
    let found = plan.hydrate(&rows).unwrap();

    let comments = found.graph().many(found.ids()[0], "comments").unwrap();
    assert_eq!(comments.len(), 2);
    let names: Vec<&str> = comments[0].attributes().iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["id", "title"]);
}

#[test]
fn test_sibling_id_columns_do_not_collide() {
    let finder = shop_finder();
    let plan = finder
        .plan(&FindQuery::new("Post").with("author").with("comments"))
        .unwrap();

    let aliases = [
        plan.column_alias_for("", "id").unwrap(),
        plan.column_alias_for("author", "id").unwrap(),
        plan.column_alias_for("comments", "id").unwrap(),
    ];
    assert_ne!(aliases[0], aliases[1]);
    assert_ne!(aliases[1], aliases[2]);
    assert_ne!(aliases[0], aliases[2]);

    let rows = vec![row(
        &plan,
        &[
            ("", "id", 1.into()),
            ("author", "id", 7.into()),
            ("comments", "id", 21.into()),
        ],
    )];
    let found = plan.hydrate(&rows).unwrap();
    let post = found.ids()[0];
    let graph = found.graph();
    assert_eq!(graph.get(post).get("id"), Some(&Value::Int(1)));
    assert_eq!(
        graph.one(post, "author").unwrap().and_then(|a| a.get("id")),
        Some(&Value::Int(7))
    );
    assert_eq!(
        graph.many(post, "comments").unwrap()[0].get("id"),
        Some(&Value::Int(21))
    );
}

#[test]
fn test_chained_paths_merge_into_one_node() {
    let finder = shop_finder();
    let plan = finder
        .plan(
            &FindQuery::new("Order")
                .with("order_items")
                .with("order_items.item")
                .with("order_items"),
        )
        .unwrap();

    let tree = plan.tree();
    assert_eq!(tree.len(), 3);
    assert_eq!(tree.root().children.len(), 1);
    let (name, order_items) = &tree.root().children[0];
    assert_eq!(name, "order_items");
    assert_eq!(tree.node(*order_items).children.len(), 1);
    assert_eq!(plan.flat_query().joins.0.len(), 2);
}

#[test]
fn test_requesting_the_bridge_reuses_it() {
    let finder = shop_finder();
    let plan = finder
        .plan(&FindQuery::new("Order").with("items").with("order_items"))
        .unwrap();

    // root, order_items, items: the bridge becomes a loaded relation
    assert_eq!(plan.tree().len(), 3);
    assert!(plan.column_alias_for("order_items", "position").is_some());
    assert_eq!(plan.flat_query().joins.0.len(), 2);
}
