//! Relation definitions
//!
//! A relation is one value type carrying a [`Cardinality`] tag and an
//! [`Indirection`] tag; behaviour is selected by matching on the tags.
//! Definitions live inside cached descriptors and are cloned before a query
//! specializes them, so merging per-call options never touches the shared
//! copy.

use nom::{
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{opt, recognize},
    multi::separated_list1,
    sequence::{delimited, pair},
    IResult, Parser,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::fragment::Fragment;
use crate::utils::Value;

/// Whether a relation yields one record or a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    Single,
    Multiple,
}

impl Cardinality {
    pub fn is_multiple(&self) -> bool {
        matches!(self, Cardinality::Multiple)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

impl JoinType {
    /// Accepts `left`, `LEFT JOIN`, `inner`, `INNER JOIN`, `right`, ...
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = input.trim().to_ascii_uppercase();
        let keyword = normalized
            .strip_suffix("JOIN")
            .unwrap_or(&normalized)
            .trim()
            .trim_end_matches(" OUTER");
        match keyword {
            "INNER" | "" => Some(JoinType::Inner),
            "LEFT" => Some(JoinType::Left),
            "RIGHT" => Some(JoinType::Right),
            _ => None,
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER JOIN"),
            JoinType::Left => write!(f, "LEFT JOIN"),
            JoinType::Right => write!(f, "RIGHT JOIN"),
        }
    }
}

/// Junction table for an indirect relation declared as
/// `order_tag(order_id, tag_id)`: the leading columns match the owner's
/// primary key, the trailing ones the target's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTable {
    pub table: String,
    pub owner_columns: Vec<String>,
    pub target_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Indirection {
    None,
    /// Chain through another relation of the same owner
    ViaRelation(String),
    /// Chain through a junction table
    ViaTable(JoinTable),
}

/// Requested select list of one node
#[derive(Debug, Clone, PartialEq)]
pub enum SelectSpec {
    /// Every column of the table
    All,
    /// Explicit expressions; primary keys are always added
    Columns(Vec<Fragment>),
    /// Join for filtering only, nothing is selected or hydrated
    Suppressed,
}

/// Per-relation query options (defaults from the declaration, merged with
/// per-call overrides)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryOptions {
    /// `None` means "not specified", which behaves as [`SelectSpec::All`]
    pub select: Option<SelectSpec>,
    pub where_clause: Option<Fragment>,
    pub on: Option<Fragment>,
    pub order: Option<Fragment>,
    pub group: Option<Fragment>,
    pub having: Option<Fragment>,
    pub params: Vec<(String, Value)>,
    pub join_type: Option<JoinType>,
    pub alias: Option<String>,
    pub index: Option<String>,
}

impl QueryOptions {
    pub fn effective_select(&self) -> SelectSpec {
        self.select.clone().unwrap_or(SelectSpec::All)
    }

    pub fn is_select_suppressed(&self) -> bool {
        matches!(self.select, Some(SelectSpec::Suppressed))
    }

    /// Merge `other` (the more specific options) into `self`.
    ///
    /// - select: `*` is replaced, two lists are unioned, `false` suppresses
    /// - where / on / having: `(self) AND (other)`
    /// - order: `other, self`; group: `self, other`
    /// - params: union, `other` wins on equal names
    /// - join type, alias, index: `other` replaces
    pub fn merge(&mut self, other: &QueryOptions) {
        if let Some(select) = &other.select {
            self.select = Some(match (self.select.take(), select) {
                (_, SelectSpec::Suppressed) => SelectSpec::Suppressed,
                (Some(SelectSpec::Columns(base)), SelectSpec::All) => SelectSpec::Columns(base),
                (Some(SelectSpec::Columns(mut base)), SelectSpec::Columns(extra)) => {
                    for item in extra {
                        if !base.iter().any(|b| b.raw() == item.raw()) {
                            base.push(item.clone());
                        }
                    }
                    SelectSpec::Columns(base)
                }
                (_, replacement) => replacement.clone(),
            });
        }

        self.where_clause = and_options(&self.where_clause, &other.where_clause);
        self.on = and_options(&self.on, &other.on);
        self.having = and_options(&self.having, &other.having);
        self.order = Fragment::comma_join(other.order.iter().chain(self.order.iter()));
        self.group = Fragment::comma_join(self.group.iter().chain(other.group.iter()));

        for (name, value) in &other.params {
            match self.params.iter_mut().find(|(n, _)| n == name) {
                Some(slot) => slot.1 = value.clone(),
                None => self.params.push((name.clone(), value.clone())),
            }
        }

        if other.join_type.is_some() {
            self.join_type = other.join_type;
        }
        if other.alias.is_some() {
            self.alias = other.alias.clone();
        }
        if other.index.is_some() {
            self.index = other.index.clone();
        }
    }
}

fn and_options(base: &Option<Fragment>, extra: &Option<Fragment>) -> Option<Fragment> {
    Fragment::and_all(base.iter().chain(extra.iter()))
}

/// A named association from one entity type to another
#[derive(Debug, Clone, PartialEq)]
pub struct RelationDefinition {
    pub name: String,
    pub target: String,
    pub cardinality: Cardinality,
    /// Join condition authored against `self.` (target) and `parent.`
    pub condition: Option<Fragment>,
    pub indirection: Indirection,
    pub options: QueryOptions,
}

impl RelationDefinition {
    pub fn new(
        name: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        RelationDefinition {
            name: name.into(),
            target: target.into(),
            cardinality,
            condition: None,
            indirection: Indirection::None,
            options: QueryOptions::default(),
        }
    }

    pub fn via_relation(&self) -> Option<&str> {
        match &self.indirection {
            Indirection::ViaRelation(name) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn join_table(&self) -> Option<&JoinTable> {
        match &self.indirection {
            Indirection::ViaTable(table) => Some(table),
            _ => None,
        }
    }
}

/// Parsed `<name> -> <Target>[]` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDeclaration {
    pub name: String,
    pub target: String,
    pub cardinality: Cardinality,
}

fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn table_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.').parse(input)
}

fn declaration(input: &str) -> IResult<&str, (&str, &str, Option<&str>)> {
    let (input, name) = ws(identifier).parse(input)?;
    let (input, _) = ws(tag("->")).parse(input)?;
    let (input, target) = ws(identifier).parse(input)?;
    let (input, many) = opt(ws(tag("[]"))).parse(input)?;
    Ok((input, (name, target, many)))
}

/// Parse a relation declaration such as `items -> Item[]` or
/// `customer -> Customer`.
pub fn parse_declaration(input: &str) -> Result<RelationDeclaration, String> {
    match declaration(input) {
        Ok(("", (name, target, many))) => Ok(RelationDeclaration {
            name: name.to_string(),
            target: target.to_string(),
            cardinality: if many.is_some() {
                Cardinality::Multiple
            } else {
                Cardinality::Single
            },
        }),
        Ok((rest, _)) => Err(format!("unexpected trailing input `{}`", rest)),
        Err(e) => Err(format!("{}", e)),
    }
}

fn join_table(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
    let (input, table) = ws(table_name).parse(input)?;
    let (input, columns) = delimited(
        char('('),
        separated_list1(char(','), ws(identifier)),
        char(')'),
    )
    .parse(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, (table, columns)))
}

/// Parse `table(owner_col, ..., target_col, ...)` and split the columns by
/// the owner's primary-key width.
pub fn parse_join_table(input: &str, owner_key_width: usize) -> Result<JoinTable, String> {
    let (table, columns) = match join_table(input) {
        Ok(("", parsed)) => parsed,
        Ok((rest, _)) => return Err(format!("unexpected trailing input `{}`", rest)),
        Err(e) => return Err(format!("{}", e)),
    };
    if columns.len() <= owner_key_width {
        return Err(format!(
            "expected {} owner column(s) followed by target column(s), found {}",
            owner_key_width,
            columns.len()
        ));
    }
    let (owner, target) = columns.split_at(owner_key_width);
    Ok(JoinTable {
        table: table.to_string(),
        owner_columns: owner.iter().map(|c| c.to_string()).collect(),
        target_columns: target.iter().map(|c| c.to_string()).collect(),
    })
}
