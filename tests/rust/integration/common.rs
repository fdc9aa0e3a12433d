use std::sync::Arc;

use relgraph::entity_catalog::EntityRegistry;
use relgraph::{ActiveFinder, FinderPlan, ResultRow, Value};

pub const SHOP_MAPPING: &str = r#"
tables:
  - name: customers
    columns:
      - { name: id, type: Int64, primary_key: true }
      - { name: name }
  - name: orders
    columns:
      - { name: id, type: Int64, primary_key: true }
      - { name: customer_id, type: Int64 }
      - { name: status }
  - name: order_items
    columns:
      - { name: order_id, type: Int64, primary_key: true }
      - { name: item_id, type: Int64, primary_key: true }
      - { name: position, type: Int64 }
  - name: items
    columns:
      - { name: id, type: Int64, primary_key: true }
      - { name: name }
  - name: posts
    columns:
      - { name: id, type: Int64, primary_key: true }
      - { name: author_id, type: Int64 }
      - { name: title }
  - name: users
    columns:
      - { name: id, type: Int64, primary_key: true }
      - { name: name }
  - name: comments
    columns:
      - { name: id, type: Int64, primary_key: true }
      - { name: post_id, type: Int64 }
      - { name: author_id, type: Int64 }
      - { name: title }
      - { name: body }
  - name: post_tags
    columns:
      - { name: post_id, type: Int64, primary_key: true }
      - { name: tag_id, type: Int64, primary_key: true }
  - name: tags
    columns:
      - { name: id, type: Int64, primary_key: true }
      - { name: label }
entities:
  - name: Customer
    table: customers
    relations:
      - relation: "orders -> Order[]"
        on: "self.customer_id = parent.id"
  - name: Order
    table: orders
    relations:
      - relation: "customer -> Customer"
        on: "self.id = parent.customer_id"
      - relation: "order_items -> OrderItem[]"
        on: "self.order_id = parent.id"
        order: "self.position"
      - relation: "items -> Item[]"
        via: order_items
        on: "self.id = parent.item_id"
  - name: OrderItem
    table: order_items
    relations:
      - relation: "item -> Item"
        on: "self.id = parent.item_id"
  - name: Item
    table: items
  - name: Post
    table: posts
    relations:
      - relation: "author -> User"
        on: "self.id = parent.author_id"
      - relation: "comments -> Comment[]"
        on: "self.post_id = parent.id"
      - relation: "tags -> Tag[]"
        via_table: "post_tags(post_id, tag_id)"
  - name: Comment
    table: comments
    relations:
      - relation: "author -> User"
        on: "self.id = parent.author_id"
  - name: User
    table: users
  - name: Tag
    table: tags
"#;

pub fn shop_registry() -> Arc<EntityRegistry> {
    Arc::new(EntityRegistry::from_yaml_str(SHOP_MAPPING).expect("shop mapping should load"))
}

pub fn shop_finder() -> ActiveFinder {
    ActiveFinder::new(shop_registry())
}

/// Build a result row the way the database would return it: every value
/// under the generated alias of `(relation path, column)`.
pub fn row(plan: &FinderPlan, values: &[(&str, &str, Value)]) -> ResultRow {
    values
        .iter()
        .fold(ResultRow::new(), |row, (path, column, value)| {
            let alias = plan
                .column_alias_for(path, column)
                .unwrap_or_else(|| panic!("no alias for `{}` at path `{}`", column, path));
            row.with(alias, value.clone())
        })
}
