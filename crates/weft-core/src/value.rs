//! Typed results of interpolation evaluation.
//!
//! `Value` is what `evaluate` returns: a primitive, a container literal, or
//! a reference to a node of the configuration tree. Its `Display` impl is
//! the canonical rendering used when a value is concatenated into a string;
//! the canonical form of a primitive re-parses to the same value (`null`,
//! `true`, `42`, `1.5`, `inf`, ...).

use crate::errors::{InterpolationError, Result};
use crate::tree::NodeId;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use std::fmt;

/// Result of evaluating an interpolated configuration string.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Dict(IndexMap<DictKey, Value>),
    /// Reference to a configuration node. Borrow-like: the id is only
    /// meaningful for the container the value was evaluated against, and the
    /// container must outlive the value.
    Node(NodeId),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Node(_) => "node",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// The hashable-primitive subset of `Value`, usable as a dictionary key.
///
/// `NaN` is rejected before a key is ever constructed, so `Float` keys can
/// carry `Eq` and `Ord` through `OrderedFloat`. The variant order gives a
/// total order across key types, used to canonicalize cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DictKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    String(String),
}

impl DictKey {
    /// The key as a plain value again.
    pub fn to_value(&self) -> Value {
        match self {
            DictKey::Null => Value::Null,
            DictKey::Bool(b) => Value::Bool(*b),
            DictKey::Int(i) => Value::Int(*i),
            DictKey::Float(f) => Value::Float(f.0),
            DictKey::String(s) => Value::String(s.clone()),
        }
    }

    /// Converts an evaluated value into a key, rejecting `NaN` and
    /// non-hashable (container) values.
    pub fn from_value(value: &Value) -> Result<DictKey> {
        match value {
            Value::Null => Ok(DictKey::Null),
            Value::Bool(b) => Ok(DictKey::Bool(*b)),
            Value::Int(i) => Ok(DictKey::Int(*i)),
            Value::Float(f) => {
                if f.is_nan() {
                    Err(InterpolationError::type_error(
                        "cannot use `NaN` as dictionary key",
                    ))
                } else {
                    Ok(DictKey::Float(OrderedFloat(*f)))
                }
            }
            Value::String(s) => Ok(DictKey::String(s.clone())),
            other => Err(InterpolationError::type_error(format!(
                "dictionary keys must be hashable primitives, but got a value of type `{}`",
                other.type_name()
            ))),
        }
    }
}

impl From<&str> for DictKey {
    fn from(s: &str) -> Self {
        DictKey::String(s.to_owned())
    }
}

impl From<i64> for DictKey {
    fn from(i: i64) -> Self {
        DictKey::Int(i)
    }
}

impl From<bool> for DictKey {
    fn from(b: bool) -> Self {
        DictKey::Bool(b)
    }
}

/// Canonical float rendering: decodes back to the same float.
pub(crate) fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_owned()
    } else if f.is_infinite() {
        if f > 0.0 { "inf".to_owned() } else { "-inf".to_owned() }
    } else {
        // Debug keeps a `.0` or exponent, so the result lexes as a float
        // rather than an int.
        format!("{f:?}")
    }
}

fn is_bare_key(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_string(s: &str, out: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(out, "'")?;
    for c in s.chars() {
        match c {
            '\\' => write!(out, "\\\\")?,
            '\'' => write!(out, "\\'")?,
            _ => write!(out, "{c}")?,
        }
    }
    write!(out, "'")
}

impl fmt::Display for DictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictKey::Null => write!(f, "null"),
            DictKey::Bool(b) => write!(f, "{b}"),
            DictKey::Int(i) => write!(f, "{i}"),
            DictKey::Float(x) => write!(f, "{}", format_float(x.0)),
            DictKey::String(s) => {
                if is_bare_key(s) {
                    write!(f, "{s}")
                } else {
                    quote_string(s, f)
                }
            }
        }
    }
}

impl Value {
    /// Nested rendering: like `Display`, except strings are quoted so that
    /// list and dict renderings re-parse to the same structure.
    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => quote_string(s, f),
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::String(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                write!(f, "]")
            }
            Value::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: ")?;
                    value.fmt_nested(f)?;
                }
                write!(f, "}}")
            }
            // Node references are materialized by the evaluator before any
            // stringification; this arm only shows up in debug contexts.
            Value::Node(id) => write!(f, "<node {}>", id.index()),
        }
    }
}
