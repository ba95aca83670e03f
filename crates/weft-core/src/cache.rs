//! Per-container memoization of resolver results.
//!
//! Cache identity is structural: two argument lists with equal structural
//! contents hash equal, dict arguments hash order-insensitively (entries are
//! sorted by key in the canonical form) while lists stay order-sensitive.

use crate::errors::{InterpolationError, Result};
use crate::value::{DictKey, Value};
use ordered_float::OrderedFloat;
use std::collections::HashMap;

/// Canonical, hashable form of an argument value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Canonical {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    List(Vec<Canonical>),
    /// Entries sorted by key, so `{a: 1, b: 2}` and `{b: 2, a: 1}` share a
    /// cache slot.
    Dict(Vec<(DictKey, Canonical)>),
}

fn canonicalize(value: &Value) -> Result<Canonical> {
    match value {
        Value::Null => Ok(Canonical::Null),
        Value::Bool(b) => Ok(Canonical::Bool(*b)),
        Value::Int(i) => Ok(Canonical::Int(*i)),
        Value::Float(f) => Ok(Canonical::Float(OrderedFloat(*f))),
        Value::String(s) => Ok(Canonical::Str(s.clone())),
        Value::List(items) => Ok(Canonical::List(
            items.iter().map(canonicalize).collect::<Result<_>>()?,
        )),
        Value::Dict(entries) => {
            let mut canonical: Vec<(DictKey, Canonical)> = entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), canonicalize(v)?)))
                .collect::<Result<_>>()?;
            canonical.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(Canonical::Dict(canonical))
        }
        Value::Node(_) => Err(InterpolationError::type_error(
            "node references cannot participate in a resolver cache key",
        )),
    }
}

/// Memoization key: `(resolver_name, canonical argument list)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    resolver: String,
    args: Vec<Canonical>,
}

impl CacheKey {
    pub fn new(resolver: &str, args: &[Value]) -> Result<CacheKey> {
        Ok(CacheKey {
            resolver: resolver.to_owned(),
            args: args.iter().map(canonicalize).collect::<Result<_>>()?,
        })
    }
}

/// Memoization table for one container.
#[derive(Debug, Clone, Default)]
pub struct ResolverCache {
    entries: HashMap<CacheKey, Value>,
}

impl ResolverCache {
    pub fn get(&self, key: &CacheKey) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: CacheKey, value: Value) {
        self.entries.insert(key, value);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
