//! Mapping defects and bad relation paths surface with the entity and
//! relation names in the message; driver failures pass through untouched.

use std::sync::Arc;

use relgraph::entity_catalog::{CatalogError, EntityRegistry};
use relgraph::finder::ExecutionError;
use relgraph::query_planner::PlannerError;
use relgraph::render_plan::RenderBuildError;
use relgraph::{
    ActiveFinder, FindQuery, FinderConfig, FinderError, RelationOverrides, ResultRow, RowExecutor,
    Value,
};

use super::common::{shop_finder, SHOP_MAPPING};

struct UnreachableDatabase;

impl RowExecutor for UnreachableDatabase {
    fn query_all(
        &self,
        _sql: &str,
        _params: &[(String, Value)],
    ) -> Result<Vec<ResultRow>, ExecutionError> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }
}

#[test]
fn test_unknown_relation_names_entity_and_relation() {
    let err = shop_finder()
        .plan(&FindQuery::new("Order").with("items.suppliers"))
        .unwrap_err();
    match &err {
        FinderError::Planner(PlannerError::UnknownRelation { entity, relation }) => {
            assert_eq!(entity, "Item");
            assert_eq!(relation, "suppliers");
        }
        other => panic!("unexpected error {:?}", other),
    }
    let message = err.to_string();
    assert!(message.contains("`Item`") && message.contains("`suppliers`"), "{}", message);
}

#[test]
fn test_unknown_target_entity_is_a_mapping_error() {
    let mapping = SHOP_MAPPING.replace("\"customer -> Customer\"", "\"customer -> Custmer\"");
    let finder = ActiveFinder::new(Arc::new(EntityRegistry::from_yaml_str(&mapping).unwrap()));
    let err = finder.plan(&FindQuery::new("Order")).unwrap_err();
    assert!(matches!(
        err,
        FinderError::Catalog(CatalogError::UnknownTargetEntity { .. })
    ));
    let message = err.to_string();
    assert!(message.contains("`customer`"), "{}", message);
    assert!(message.contains("`Order`"), "{}", message);
    assert!(message.contains("`Custmer`"), "{}", message);
}

#[test]
fn test_malformed_declaration() {
    let mapping = SHOP_MAPPING.replace("\"item -> Item\"", "\"item => Item\"");
    let registry = EntityRegistry::from_yaml_str(&mapping).unwrap();
    let err = registry.resolve("OrderItem").unwrap_err();
    assert!(matches!(err, CatalogError::MalformedDeclaration { .. }));
    assert!(err.to_string().contains("`OrderItem`"));
    // other entities still resolve
    assert!(registry.resolve("Order").is_ok());
}

#[test]
fn test_via_bridges_count_towards_depth() {
    let finder = shop_finder().with_config(FinderConfig {
        max_relation_depth: 1,
        ..Default::default()
    });
    assert!(finder.plan(&FindQuery::new("Order").with("order_items")).is_ok());
    let err = finder
        .plan(&FindQuery::new("Order").with("items"))
        .unwrap_err();
    assert!(matches!(
        err,
        FinderError::Planner(PlannerError::RelationPathTooDeep { max_depth: 1, .. })
    ));
}

#[test]
fn test_empty_path_segment() {
    let err = shop_finder()
        .plan(&FindQuery::new("Order").with("order_items..item"))
        .unwrap_err();
    assert!(matches!(
        err,
        FinderError::Planner(PlannerError::EmptyRelationPath { .. })
    ));
}

#[test]
fn test_conflicting_parameter_values() {
    let query = FindQuery::new("Order")
        .filter("self.status = :status")
        .param(":status", "paid")
        .with_options(
            "order_items",
            RelationOverrides::new()
                .filter("self.position > :status")
                .param(":status", 3),
        );
    let err = shop_finder().plan(&query).unwrap_err();
    assert!(matches!(
        err,
        FinderError::Render(RenderBuildError::ConflictingParameter { ref name })
            if name == ":status"
    ));
}

#[test]
fn test_execution_errors_pass_through() {
    let err = shop_finder()
        .find_with_relations(&UnreachableDatabase, &FindQuery::new("Order").with("items"))
        .unwrap_err();
    let FinderError::Execution(source) = err else {
        panic!("expected an execution error");
    };
    let io = source
        .downcast_ref::<std::io::Error>()
        .expect("driver error is passed through unchanged");
    assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
}
