//! The configuration container: an arena of typed nodes with parent
//! back-references and dot-path selection.
//!
//! A `ConfigValue` literal tree is interned into `Node` rows addressed by
//! `NodeId`, so nodes can point back at their parents without reference
//! cycles. A string leaf equal to `"???"` becomes the *missing* marker.
//!
//! Selection is deliberately minimal: descend dictionary keys and list
//! indices along a dotted path, climb one level per extra leading dot.
//! Anything richer belongs to the collaborator that owns the tree.

use crate::cache::ResolverCache;
use crate::errors::{InterpolationError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// The `???` missing-mandatory-value marker.
pub const MISSING_MARKER: &str = "???";

/// Index of a node in its container's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// A configuration value literal, used to build containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ConfigValue>),
    Dict(IndexMap<String, ConfigValue>),
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_owned())
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Int(i)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

/// Stored payload of an interned node.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A `???` leaf.
    Missing,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// A string leaf; may contain `${...}` interpolations, which are only
    /// resolved on access.
    Str(String),
    List(Vec<NodeId>),
    Dict(IndexMap<String, NodeId>),
}

/// One node of the container tree.
#[derive(Debug)]
pub struct Node {
    parent: Option<NodeId>,
    /// Key under the parent (`"a"` for dict entries, `"0"` for list items).
    /// `None` only for the root.
    key: Option<String>,
    payload: Payload,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.payload, Payload::Missing)
    }
}

/// Read-only view the evaluator needs from a configuration tree.
///
/// Everything is borrow-only: the evaluator owns nothing persistent, and
/// `Value::Node` ids it hands back are only valid against the same view.
pub trait ContainerView {
    /// Process-unique identity of the container, used for cycle-detection
    /// frames and cache bookkeeping.
    fn container_id(&self) -> u64;

    fn root(&self) -> NodeId;

    fn node(&self, id: NodeId) -> &Node;

    /// Selects the node at `path`. Leading dots make the path relative:
    /// `.a` looks up `a` in `from`, each extra dot climbs one more level.
    /// Absolute paths start at the root; `from` is only consulted for
    /// relative ones.
    fn select_from(&self, from: Option<NodeId>, path: &str) -> Result<NodeId>;

    /// Full dotted key path of a node, e.g. `a.b.0`.
    fn path_of(&self, id: NodeId) -> String;

    /// The container's resolver memoization table.
    fn cache(&self) -> &Mutex<ResolverCache>;
}

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

/// An interned configuration tree.
pub struct Config {
    container_id: u64,
    nodes: Vec<Node>,
    root: NodeId,
    cache: Mutex<ResolverCache>,
}

impl Config {
    pub fn from_value(value: ConfigValue) -> Config {
        let mut nodes = Vec::new();
        let root = intern(&mut nodes, None, None, value);
        Config {
            container_id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
            nodes,
            root,
            cache: Mutex::new(ResolverCache::default()),
        }
    }

    /// Builds a container from a JSON document.
    pub fn from_json(source: &str) -> std::result::Result<Config, serde_json::Error> {
        let value: ConfigValue = serde_json::from_str(source)?;
        Ok(Config::from_value(value))
    }

    fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }
}

fn intern(
    nodes: &mut Vec<Node>,
    parent: Option<NodeId>,
    key: Option<String>,
    value: ConfigValue,
) -> NodeId {
    let id = NodeId(nodes.len() as u32);
    // Reserve the slot first so children can point back at it.
    nodes.push(Node {
        parent,
        key,
        payload: Payload::Null,
    });
    let payload = match value {
        ConfigValue::Null => Payload::Null,
        ConfigValue::Bool(b) => Payload::Bool(b),
        ConfigValue::Int(i) => Payload::Int(i),
        ConfigValue::Float(f) => Payload::Float(f),
        ConfigValue::String(s) => {
            if s == MISSING_MARKER {
                Payload::Missing
            } else {
                Payload::Str(s)
            }
        }
        ConfigValue::List(items) => {
            let children = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| intern(nodes, Some(id), Some(i.to_string()), item))
                .collect();
            Payload::List(children)
        }
        ConfigValue::Dict(entries) => {
            let children = entries
                .into_iter()
                .map(|(k, v)| {
                    let child = intern(nodes, Some(id), Some(k.clone()), v);
                    (k, child)
                })
                .collect();
            Payload::Dict(children)
        }
    };
    nodes[id.0 as usize].payload = payload;
    id
}

impl ContainerView for Config {
    fn container_id(&self) -> u64 {
        self.container_id
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> &Node {
        self.get(id)
    }

    fn select_from(&self, from: Option<NodeId>, path: &str) -> Result<NodeId> {
        let dots = path.chars().take_while(|&c| c == '.').count();
        let rest = &path[dots..];

        let mut current = if dots == 0 {
            self.root
        } else {
            // `.a` starts at `from` itself (the parent of the value being
            // resolved); each extra dot climbs one level further.
            let mut base = from.unwrap_or(self.root);
            for _ in 1..dots {
                base = self.get(base).parent().ok_or_else(|| {
                    InterpolationError::key_not_found(format!(
                        "relative path '{path}' climbs above the configuration root"
                    ))
                })?;
            }
            base
        };

        if rest.is_empty() {
            return Ok(current);
        }

        let mut walked = String::new();
        for segment in rest.split('.') {
            if !walked.is_empty() {
                walked.push('.');
            }
            walked.push_str(segment);
            current = self.child(current, segment, path, &walked)?;
        }
        Ok(current)
    }

    fn path_of(&self, id: NodeId) -> String {
        let mut segments: Vec<&str> = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.get(node_id);
            if let Some(key) = node.key() {
                segments.push(key);
            }
            current = node.parent();
        }
        segments.reverse();
        segments.join(".")
    }

    fn cache(&self) -> &Mutex<ResolverCache> {
        &self.cache
    }
}

impl Config {
    fn child(&self, base: NodeId, segment: &str, path: &str, walked: &str) -> Result<NodeId> {
        match &self.get(base).payload {
            Payload::Dict(entries) => entries.get(segment).copied().ok_or_else(|| {
                InterpolationError::key_not_found(format!(
                    "'{segment}' (full key: '{walked}') while resolving '{path}'"
                ))
            }),
            Payload::List(items) => {
                let index: usize = segment.parse().map_err(|_| {
                    InterpolationError::key_not_found(format!(
                        "'{segment}' is not a list index (full key: '{walked}')"
                    ))
                })?;
                items.get(index).copied().ok_or_else(|| {
                    InterpolationError::key_not_found(format!(
                        "list index {index} out of range (full key: '{walked}')"
                    ))
                })
            }
            _ => Err(InterpolationError::key_not_found(format!(
                "cannot select '{segment}' inside a leaf value (full key: '{walked}')"
            ))),
        }
    }
}

/// Replaces `to`'s resolver cache with a copy of `from`'s.
pub fn copy_cache(from: &dyn ContainerView, to: &dyn ContainerView) {
    let snapshot = from.cache().lock().expect("cache mutex poisoned").clone();
    *to.cache().lock().expect("cache mutex poisoned") = snapshot;
}

/// Empties the container's resolver cache.
pub fn clear_cache(container: &dyn ContainerView) {
    container
        .cache()
        .lock()
        .expect("cache mutex poisoned")
        .clear();
}
