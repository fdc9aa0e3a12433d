//! SQL fragment parser for relation-local expressions
//!
//! Relation declarations carry small pieces of SQL (join conditions, extra
//! `ON` terms, filters, ordering, grouping, select expressions) that refer to
//! the joined tables through symbolic prefixes instead of real aliases:
//!
//! - `self.col` / `@.col` - a column of the table the relation points at
//! - `parent.col` / `?.col` - a column of the table it is joined from
//!
//! Fragments are tokenized once. Placeholders become structured column
//! references, so substitution never touches text inside quoted literals or
//! quoted identifiers.
//!
//! Examples:
//! - `self.order_id = parent.id`
//! - `@.status = 'paid' AND ?.archived = 0`
//! - `self.title LIKE 'self.%'` (the quoted `self.` is left alone)

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, tag_no_case, take_while1},
    character::complete::char,
    combinator::{recognize, value},
    multi::many0,
    IResult, Parser,
};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FragmentError {
    #[error("Unterminated quoted section starting at offset {offset} in `{fragment}`")]
    UnterminatedQuote { fragment: String, offset: usize },
    #[error("Placeholder `{prefix}` is not followed by a column name in `{fragment}`")]
    MissingPlaceholderColumn { fragment: String, prefix: String },
    #[error("`{fragment}` refers to a parent table but is rendered without one")]
    NoParentScope { fragment: String },
}

/// Which joined table a placeholder column belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// The table of the node that owns the fragment
    Owner,
    /// The table of the node's structural parent
    Parent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FragmentToken {
    /// Raw SQL text, emitted verbatim
    Sql(String),
    /// Quoted string literal or quoted identifier, emitted verbatim
    Quoted(String),
    /// Column reference through a placeholder prefix
    Column { scope: Placeholder, column: String },
}

/// Real table aliases a fragment is rendered against
#[derive(Debug, Clone, Copy)]
pub struct AliasScope<'a> {
    pub own: &'a str,
    pub parent: Option<&'a str>,
}

impl<'a> AliasScope<'a> {
    pub fn root(own: &'a str) -> Self {
        AliasScope { own, parent: None }
    }

    pub fn child(own: &'a str, parent: &'a str) -> Self {
        AliasScope {
            own,
            parent: Some(parent),
        }
    }
}

/// Parsed fragment
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    raw: String,
    tokens: Vec<FragmentToken>,
}

impl Fragment {
    /// Tokenize a fragment string
    pub fn parse(input: &str) -> Result<Self, FragmentError> {
        let raw = input.trim().to_string();
        let tokens = tokenize(&raw)?;
        Ok(Fragment { raw, tokens })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn tokens(&self) -> &[FragmentToken] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Render with placeholders replaced by the aliases in `scope`
    pub fn render(&self, scope: &AliasScope<'_>) -> Result<String, FragmentError> {
        let mut sql = String::with_capacity(self.raw.len() + 16);
        for token in &self.tokens {
            match token {
                FragmentToken::Sql(text) | FragmentToken::Quoted(text) => sql.push_str(text),
                FragmentToken::Column { scope: which, column } => {
                    let alias = match which {
                        Placeholder::Owner => scope.own,
                        Placeholder::Parent => {
                            scope.parent.ok_or_else(|| FragmentError::NoParentScope {
                                fragment: self.raw.clone(),
                            })?
                        }
                    };
                    sql.push_str(alias);
                    sql.push('.');
                    sql.push_str(column);
                }
            }
        }
        Ok(sql)
    }

    /// Whether any column reference uses the given placeholder
    pub fn references(&self, placeholder: Placeholder) -> bool {
        self.tokens.iter().any(|t| {
            matches!(t, FragmentToken::Column { scope, .. } if *scope == placeholder)
        })
    }

    /// If the fragment is a single column of the owner table (`title` or
    /// `self.title`), return the column name.
    pub fn bare_column(&self) -> Option<&str> {
        match self.tokens.as_slice() {
            [FragmentToken::Column {
                scope: Placeholder::Owner,
                column,
            }] => Some(column.as_str()),
            [FragmentToken::Sql(text)]
                if !text.is_empty()
                    && text.chars().all(|c| c.is_alphanumeric() || c == '_') =>
            {
                Some(text.as_str())
            }
            _ => None,
        }
    }

    /// AND-combine fragments as `(a) AND (b)`. Empty fragments are skipped.
    pub fn and_all<'f>(parts: impl IntoIterator<Item = &'f Fragment>) -> Option<Fragment> {
        Self::join_all(parts, " AND ", true)
    }

    /// Comma-join fragments (ORDER BY / GROUP BY lists)
    pub fn comma_join<'f>(parts: impl IntoIterator<Item = &'f Fragment>) -> Option<Fragment> {
        Self::join_all(parts, ", ", false)
    }

    fn join_all<'f>(
        parts: impl IntoIterator<Item = &'f Fragment>,
        separator: &str,
        parenthesize: bool,
    ) -> Option<Fragment> {
        let parts: Vec<&Fragment> = parts.into_iter().filter(|f| !f.is_empty()).collect();
        match parts.len() {
            0 => None,
            1 => Some(parts[0].clone()),
            _ => {
                let mut raw = Vec::with_capacity(parts.len());
                let mut tokens = Vec::new();
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        push_sql(&mut tokens, separator);
                    }
                    if parenthesize {
                        push_sql(&mut tokens, "(");
                        raw.push(format!("({})", part.raw));
                    } else {
                        raw.push(part.raw.clone());
                    }
                    for token in &part.tokens {
                        match token {
                            FragmentToken::Sql(text) => push_sql(&mut tokens, text),
                            other => tokens.push(other.clone()),
                        }
                    }
                    if parenthesize {
                        push_sql(&mut tokens, ")");
                    }
                }
                Some(Fragment {
                    raw: raw.join(separator),
                    tokens,
                })
            }
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn push_sql(tokens: &mut Vec<FragmentToken>, text: &str) {
    if let Some(FragmentToken::Sql(last)) = tokens.last_mut() {
        last.push_str(text);
    } else {
        tokens.push(FragmentToken::Sql(text.to_string()));
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

// 'it''s' style string literal
fn single_quoted(input: &str) -> IResult<&str, &str> {
    recognize((
        char('\''),
        many0(alt((tag("''"), is_not("'")))),
        char('\''),
    ))
    .parse(input)
}

fn double_quoted(input: &str) -> IResult<&str, &str> {
    recognize((
        char('"'),
        many0(alt((tag("\"\""), is_not("\"")))),
        char('"'),
    ))
    .parse(input)
}

fn backtick_quoted(input: &str) -> IResult<&str, &str> {
    recognize((char('`'), many0(is_not("`")), char('`'))).parse(input)
}

fn placeholder_prefix(input: &str) -> IResult<&str, Placeholder> {
    alt((
        value(Placeholder::Owner, alt((tag_no_case("self."), tag("@.")))),
        value(Placeholder::Parent, alt((tag_no_case("parent."), tag("?.")))),
    ))
    .parse(input)
}

fn column_name(input: &str) -> IResult<&str, &str> {
    alt((
        take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        double_quoted,
        backtick_quoted,
    ))
    .parse(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    take_while1(is_word_char).parse(input)
}

fn tokenize(fragment: &str) -> Result<Vec<FragmentToken>, FragmentError> {
    let mut tokens = Vec::new();
    let mut rest = fragment;
    let mut prev: Option<char> = None;

    while let Some(first) = rest.chars().next() {
        let offset = fragment.len() - rest.len();

        if matches!(first, '\'' | '"' | '`') {
            let parsed = match first {
                '\'' => single_quoted(rest),
                '"' => double_quoted(rest),
                _ => backtick_quoted(rest),
            };
            let (remaining, quoted) = parsed.map_err(|_| FragmentError::UnterminatedQuote {
                fragment: fragment.to_string(),
                offset,
            })?;
            tokens.push(FragmentToken::Quoted(quoted.to_string()));
            prev = quoted.chars().last();
            rest = remaining;
            continue;
        }

        // `x.self.id` is a qualified name, not a placeholder
        let at_boundary = !matches!(prev, Some(c) if is_word_char(c) || c == '.');
        if at_boundary {
            if let Ok((after_prefix, scope)) = placeholder_prefix(rest) {
                let prefix = &rest[..rest.len() - after_prefix.len()];
                let (remaining, column) = column_name(after_prefix).map_err(|_| {
                    FragmentError::MissingPlaceholderColumn {
                        fragment: fragment.to_string(),
                        prefix: prefix.to_string(),
                    }
                })?;
                tokens.push(FragmentToken::Column {
                    scope,
                    column: column.to_string(),
                });
                prev = column.chars().last();
                rest = remaining;
                continue;
            }
        }

        let (remaining, text) = match word(rest) {
            Ok(parsed) => parsed,
            Err(_) => {
                let (head, tail) = rest.split_at(first.len_utf8());
                (tail, head)
            }
        };
        push_sql(&mut tokens, text);
        prev = text.chars().last();
        rest = remaining;
    }

    Ok(tokens)
}
