//! Core data model for Weft: typed configuration values, the arena-backed
//! container with dot-path selection, the resolver memoization cache, the
//! injected environment interface, and the error taxonomy.
//!
//! The language half (lexer, parser, evaluator, resolver registry) lives in
//! `weft-lib`; this crate is what both the engine and embedding hosts share.

pub mod cache;
pub mod env;
pub mod errors;
pub mod tree;
pub mod value;

pub use cache::{CacheKey, ResolverCache};
pub use env::{Env, ProcessEnv, StaticEnv};
pub use errors::{InterpolationError, Result};
pub use tree::{
    Config, ConfigValue, ContainerView, MISSING_MARKER, Node, NodeId, Payload, clear_cache,
    copy_cache,
};
pub use value::{DictKey, Value};
