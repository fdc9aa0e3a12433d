use super::errors::CatalogError;
use super::fragment::{Fragment, FragmentError};
use super::relation::{JoinType, QueryOptions, SelectSpec};
use super::schema::TableSchema;
use crate::utils::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Entity mappings are declared in YAML:
///
/// ```yaml
/// tables:
///   - name: orders
///     columns:
///       - { name: id, type: Int64, primary_key: true }
///       - { name: customer_id, type: Int64 }
/// entities:
///   - name: Order
///     table: orders
///     relations:
///       - relation: "customer -> Customer"
///         on: "self.id = parent.customer_id"
///       - relation: "order_items -> OrderItem[]"
///         on: "self.order_id = parent.id"
///         order: "self.position"
///       - relation: "items -> Item[]"
///         via: order_items
///         on: "self.id = parent.item_id"
///       - relation: "tags -> Tag[]"
///         via_table: "order_tag(order_id, tag_id)"
///         select: [name]
/// ```
///
/// `tables` feeds the in-crate schema provider; a mapping used with an
/// external [`SchemaProvider`](super::schema::SchemaProvider) may leave it
/// empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub tables: Vec<TableSchema>,
    #[serde(default)]
    pub entities: Vec<EntityDeclaration>,
}

impl MappingConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|e| CatalogError::ConfigReadError {
            error: e.to_string(),
        })?;

        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        serde_yaml::from_str(yaml).map_err(|e| CatalogError::ConfigParseError {
            error: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDeclaration {
    pub name: String,
    pub table: String,
    #[serde(default)]
    pub relations: Vec<RelationDeclaration>,
}

impl EntityDeclaration {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        EntityDeclaration {
            name: name.into(),
            table: table.into(),
            relations: Vec::new(),
        }
    }

    pub fn with_relation(mut self, relation: RelationDeclaration) -> Self {
        self.relations.push(relation);
        self
    }
}

/// Unparsed relation declaration, as written in the mapping
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelationDeclaration {
    /// `<name> -> <Target>` or `<name> -> <Target>[]`
    pub relation: String,
    /// Join condition between the target (`self.`) and the owner (`parent.`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via_table: Option<String>,
    #[serde(flatten)]
    pub options: RelationOptions,
}

impl RelationDeclaration {
    pub fn new(relation: impl Into<String>) -> Self {
        RelationDeclaration {
            relation: relation.into(),
            ..Default::default()
        }
    }

    pub fn on(mut self, condition: impl Into<String>) -> Self {
        self.on = Some(condition.into());
        self
    }

    pub fn via(mut self, relation: impl Into<String>) -> Self {
        self.via = Some(relation.into());
        self
    }

    pub fn via_table(mut self, expression: impl Into<String>) -> Self {
        self.via_table = Some(expression.into());
        self
    }

    pub fn options(mut self, options: RelationOptions) -> Self {
        self.options = options;
        self
    }
}

/// `select` as written: `false`, `"*"`, one expression or a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectDeclaration {
    Flag(bool),
    Single(String),
    List(Vec<String>),
}

/// Query options of a relation, either declared defaults or per-call
/// overrides. Strings are parsed into fragments when converted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<SelectDeclaration>,
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    /// Extra ON terms, AND-ed to the join condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub having: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_type: Option<JoinType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

/// Options passed with `FindQuery::with_options`
pub type RelationOverrides = RelationOptions;

/// Which option failed to parse
#[derive(Debug, Clone, PartialEq)]
pub struct OptionError {
    pub option: &'static str,
    pub source: FragmentError,
}

impl RelationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(SelectDeclaration::List(
            columns.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Join for filtering only; nothing from the relation is loaded
    pub fn join_only(mut self) -> Self {
        self.select = Some(SelectDeclaration::Flag(false));
        self
    }

    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.where_clause = Some(condition.into());
        self
    }

    pub fn on(mut self, condition: impl Into<String>) -> Self {
        self.extra_on = Some(condition.into());
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn having(mut self, having: impl Into<String>) -> Self {
        self.having = Some(having.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = Some(join_type);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn index(mut self, column: impl Into<String>) -> Self {
        self.index = Some(column.into());
        self
    }

    pub fn to_query_options(&self) -> Result<QueryOptions, OptionError> {
        Ok(QueryOptions {
            select: self.select_spec()?,
            where_clause: parse_option("where", &self.where_clause)?,
            on: parse_option("extra_on", &self.extra_on)?,
            order: parse_option("order", &self.order)?,
            group: parse_option("group", &self.group)?,
            having: parse_option("having", &self.having)?,
            params: self
                .params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            join_type: self.join_type,
            alias: self.alias.clone(),
            index: self.index.clone(),
        })
    }

    fn select_spec(&self) -> Result<Option<SelectSpec>, OptionError> {
        let fragment = |s: &str| {
            Fragment::parse(s).map_err(|source| OptionError {
                option: "select",
                source,
            })
        };
        let spec = match &self.select {
            None => return Ok(None),
            Some(SelectDeclaration::Flag(false)) => SelectSpec::Suppressed,
            Some(SelectDeclaration::Flag(true)) => SelectSpec::All,
            Some(SelectDeclaration::Single(s)) if s.trim() == "*" || s.trim().is_empty() => {
                SelectSpec::All
            }
            Some(SelectDeclaration::Single(s)) => SelectSpec::Columns(vec![fragment(s)?]),
            Some(SelectDeclaration::List(items)) if items.is_empty() => SelectSpec::All,
            Some(SelectDeclaration::List(items)) => {
                if items.iter().any(|s| s.trim() == "*") {
                    SelectSpec::All
                } else {
                    SelectSpec::Columns(
                        items
                            .iter()
                            .map(|s| fragment(s))
                            .collect::<Result<Vec<_>, _>>()?,
                    )
                }
            }
        };
        Ok(Some(spec))
    }
}

fn parse_option(
    option: &'static str,
    raw: &Option<String>,
) -> Result<Option<Fragment>, OptionError> {
    match raw {
        None => Ok(None),
        Some(text) => {
            let fragment = Fragment::parse(text).map_err(|source| OptionError { option, source })?;
            Ok(if fragment.is_empty() { None } else { Some(fragment) })
        }
    }
}
