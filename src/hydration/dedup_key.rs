//! Deterministic identity keys for hydrated records
//!
//! A dedup key is the ordered tuple of a record's primary-key values,
//! encoded so that two tuples produce the same key if and only if they hold
//! the same values of the same types in the same order.
//!
//! # Encoding
//!
//! Each value becomes `<tag><byte length>:<payload>`:
//!
//! | value         | tag | payload                      |
//! |---------------|-----|------------------------------|
//! | `Null`        | `n` | empty                        |
//! | `Bool(b)`     | `b` | `0` or `1`                   |
//! | `Int(i)`      | `i` | decimal                      |
//! | `Float(f)`    | `f` | hex of the IEEE-754 bits     |
//! | `Text(s)`     | `s` | the string                   |
//!
//! The length prefix makes the concatenation unambiguous, so `("a:b", "c")`
//! and `("a", "b:c")` never collide.
//!
//! ```ignore
//! let key = DedupKey::from_values(&[Value::Int(7), Value::from("x")]);
//! assert_eq!(key.as_str(), "i1:7s1:x");
//! ```

use std::fmt;
use std::fmt::Write;

use crate::utils::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn from_values<'v>(values: impl IntoIterator<Item = &'v Value>) -> Self {
        let mut encoded = String::new();
        for value in values {
            encode_value(&mut encoded, value);
        }
        DedupKey(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn encode_value(out: &mut String, value: &Value) {
    let (tag, payload) = match value {
        Value::Null => ('n', String::new()),
        Value::Bool(b) => ('b', if *b { "1" } else { "0" }.to_string()),
        Value::Int(i) => ('i', i.to_string()),
        Value::Float(f) => ('f', format!("{:016x}", f.to_bits())),
        Value::Text(s) => ('s', s.clone()),
    };
    // writing into a String cannot fail
    let _ = write!(out, "{}{}:{}", tag, payload.len(), payload);
}
