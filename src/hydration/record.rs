//! Hydrated records and the arena that owns them
//!
//! Records reference each other by [`RecordId`]; the [`ObjectGraph`] owns
//! every record of one finder call. A relation slot is tri-state: absent
//! (never loaded), loaded and empty, or loaded with records.

use serde_json::{Map as JsonMap, Value as JsonValue};

use super::errors::{HydrationError, Result};
use crate::entity_catalog::Cardinality;
use crate::utils::{FromValue, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(usize);

impl RecordId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelatedEntry {
    /// Index value when the relation declares one
    pub key: Option<Value>,
    pub record: RecordId,
}

/// Ordered to-many collection, optionally keyed by an index column
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelatedRecords {
    entries: Vec<RelatedEntry>,
}

impl RelatedRecords {
    pub fn push(&mut self, record: RecordId) {
        self.entries.push(RelatedEntry { key: None, record });
    }

    /// Insert under `key`; an existing entry with the same key is replaced
    /// in place
    pub fn insert_keyed(&mut self, key: Value, record: RecordId) {
        match self.entries.iter_mut().find(|e| e.key.as_ref() == Some(&key)) {
            Some(entry) => entry.record = record,
            None => self.entries.push(RelatedEntry {
                key: Some(key),
                record,
            }),
        }
    }

    pub fn get(&self, key: &Value) -> Option<RecordId> {
        self.entries
            .iter()
            .find(|e| e.key.as_ref() == Some(key))
            .map(|e| e.record)
    }

    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.entries.iter().map(|e| e.record)
    }

    pub fn entries(&self) -> &[RelatedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelationSlot {
    One(Option<RecordId>),
    Many(RelatedRecords),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entity: String,
    attributes: Vec<(String, Value)>,
    relations: Vec<(String, RelationSlot)>,
}

impl Record {
    /// New record from the attribute values decoded out of one row
    pub fn from_row(entity: impl Into<String>, attributes: Vec<(String, Value)>) -> Self {
        Record {
            entity: entity.into(),
            attributes,
            relations: Vec::new(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn attributes(&self) -> &[(String, Value)] {
        &self.attributes
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, v)| v)
    }

    pub fn get_as<T: FromValue>(&self, attribute: &str) -> Result<T> {
        let value = self
            .get(attribute)
            .ok_or_else(|| HydrationError::MissingAttribute {
                entity: self.entity.clone(),
                attribute: attribute.to_string(),
            })?;
        T::from_value(value).ok_or_else(|| HydrationError::InvalidAttribute {
            entity: self.entity.clone(),
            attribute: attribute.to_string(),
            expected: std::any::type_name::<T>(),
            found: value.type_name(),
        })
    }

    /// Mark a relation as loaded (empty) unless it already is
    pub fn init_relation_slot(&mut self, relation: &str, cardinality: Cardinality) {
        if self.relation(relation).is_none() {
            let slot = match cardinality {
                Cardinality::Single => RelationSlot::One(None),
                Cardinality::Multiple => RelationSlot::Many(RelatedRecords::default()),
            };
            self.relations.push((relation.to_string(), slot));
        }
    }

    /// Link a related record. To-one slots are overwritten; to-many slots
    /// append, or replace the entry with the same `key`.
    pub fn attach_related(
        &mut self,
        relation: &str,
        cardinality: Cardinality,
        child: RecordId,
        key: Option<Value>,
    ) {
        self.init_relation_slot(relation, cardinality);
        if let Some((_, slot)) = self.relations.iter_mut().find(|(name, _)| name == relation) {
            match slot {
                RelationSlot::One(current) => *current = Some(child),
                RelationSlot::Many(records) => match key {
                    Some(key) => records.insert_keyed(key, child),
                    None => records.push(child),
                },
            }
        }
    }

    pub fn relation(&self, relation: &str) -> Option<&RelationSlot> {
        self.relations
            .iter()
            .find(|(name, _)| name == relation)
            .map(|(_, slot)| slot)
    }

    pub fn is_relation_loaded(&self, relation: &str) -> bool {
        self.relation(relation).is_some()
    }

    pub fn relations(&self) -> &[(String, RelationSlot)] {
        &self.relations
    }
}

/// Arena of every record hydrated by one finder call
#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    records: Vec<Record>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: Record) -> RecordId {
        self.records.push(record);
        RecordId(self.records.len() - 1)
    }

    pub fn get(&self, id: RecordId) -> &Record {
        &self.records[id.0]
    }

    pub fn get_mut(&mut self, id: RecordId) -> &mut Record {
        &mut self.records[id.0]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Target of a loaded to-one relation
    pub fn one(&self, id: RecordId, relation: &str) -> Result<Option<&Record>> {
        match self.loaded(id, relation)? {
            RelationSlot::One(target) => Ok(target.map(|t| self.get(t))),
            RelationSlot::Many(records) => Ok(records.ids().next().map(|t| self.get(t))),
        }
    }

    /// Records of a loaded to-many relation, in attachment order
    pub fn many(&self, id: RecordId, relation: &str) -> Result<Vec<&Record>> {
        match self.loaded(id, relation)? {
            RelationSlot::One(target) => Ok(target.iter().map(|t| self.get(*t)).collect()),
            RelationSlot::Many(records) => Ok(records.ids().map(|t| self.get(t)).collect()),
        }
    }

    fn loaded(&self, id: RecordId, relation: &str) -> Result<&RelationSlot> {
        let record = self.get(id);
        record
            .relation(relation)
            .ok_or_else(|| HydrationError::RelationNotLoaded {
                entity: record.entity.clone(),
                relation: relation.to_string(),
            })
    }

    /// Nested JSON view: attributes first, then every loaded relation
    pub fn to_json(&self, id: RecordId) -> JsonValue {
        let record = self.get(id);
        let mut object = JsonMap::new();
        for (name, value) in &record.attributes {
            object.insert(name.clone(), serde_json::to_value(value).unwrap_or(JsonValue::Null));
        }
        for (name, slot) in &record.relations {
            let related = match slot {
                RelationSlot::One(None) => JsonValue::Null,
                RelationSlot::One(Some(target)) => self.to_json(*target),
                RelationSlot::Many(records) => {
                    JsonValue::Array(records.ids().map(|t| self.to_json(t)).collect())
                }
            };
            object.insert(name.clone(), related);
        }
        JsonValue::Object(object)
    }
}

/// Typed view of a hydrated record
pub trait FromRecord: Sized {
    fn from_record(graph: &ObjectGraph, id: RecordId) -> Result<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(entity: &str, id: i64) -> Record {
        Record::from_row(entity, vec![("id".to_string(), Value::Int(id))])
    }

    #[test]
    fn test_slots_are_tri_state() {
        let mut graph = ObjectGraph::new();
        let order = graph.insert(record("Order", 1));
        assert!(matches!(
            graph.many(order, "items"),
            Err(HydrationError::RelationNotLoaded { .. })
        ));

        graph
            .get_mut(order)
            .init_relation_slot("items", Cardinality::Multiple);
        graph
            .get_mut(order)
            .init_relation_slot("customer", Cardinality::Single);
        assert!(graph.many(order, "items").unwrap().is_empty());
        assert!(graph.one(order, "customer").unwrap().is_none());
    }

    #[test]
    fn test_keyed_insert_replaces_in_place() {
        let mut records = RelatedRecords::default();
        records.insert_keyed(Value::from("a"), RecordId(1));
        records.insert_keyed(Value::from("b"), RecordId(2));
        records.insert_keyed(Value::from("a"), RecordId(3));
        assert_eq!(records.ids().collect::<Vec<_>>(), vec![RecordId(3), RecordId(2)]);
        assert_eq!(records.get(&Value::from("b")), Some(RecordId(2)));
    }

    #[test]
    fn test_attach_and_json_view() {
        let mut graph = ObjectGraph::new();
        let order = graph.insert(record("Order", 1));
        let item = graph.insert(record("Item", 10));
        let customer = graph.insert(record("Customer", 5));
        graph
            .get_mut(order)
            .attach_related("items", Cardinality::Multiple, item, None);
        graph
            .get_mut(order)
            .attach_related("customer", Cardinality::Single, customer, None);

        assert_eq!(
            graph.to_json(order),
            serde_json::json!({
                "id": 1,
                "items": [{"id": 10}],
                "customer": {"id": 5}
            })
        );
    }

    #[test]
    fn test_get_as() {
        let r = Record::from_row(
            "User",
            vec![
                ("id".to_string(), Value::Int(3)),
                ("name".to_string(), Value::Null),
            ],
        );
        assert_eq!(r.get_as::<i64>("id").unwrap(), 3);
        assert_eq!(r.get_as::<Option<String>>("name").unwrap(), None);
        assert!(matches!(
            r.get_as::<String>("name"),
            Err(HydrationError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            r.get_as::<i64>("email"),
            Err(HydrationError::MissingAttribute { .. })
        ));
    }
}
