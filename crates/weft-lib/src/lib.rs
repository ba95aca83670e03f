//! Weft: string interpolation for hierarchical configuration values.
//!
//! Any string leaf of a configuration tree may embed `${...}` expressions:
//! dotted-path references to other nodes, or calls to named resolvers. This
//! crate parses those expressions with a two-mode grammar, evaluates them
//! against the tree, and returns typed values.
//!
//! # Example
//!
//! ```
//! use weft_lib::{Config, Value, select};
//!
//! let cfg = Config::from_json(
//!     r#"{
//!         "host": "localhost",
//!         "port": 8080,
//!         "url": "http://${host}:${port}/"
//!     }"#,
//! )
//! .expect("valid json");
//!
//! // Concatenation renders every part to a string...
//! assert_eq!(select(&cfg, "url").unwrap(), Value::from("http://localhost:8080/"));
//! // ...but a value that *is* a single interpolation keeps its type.
//! assert_eq!(select(&cfg, "port").unwrap(), Value::Int(8080));
//! ```
//!
//! Resolvers are registered on a [`ResolverRegistry`]; the process-wide
//! default registry ships with `env`, `oc.env`, `oc.decode`, `oc.dict.keys`
//! and `oc.dict.values`.

pub mod diagnostics;
pub mod eval;
pub mod parser;
pub mod resolver;

pub use weft_core::{
    Config, ConfigValue, ContainerView, DictKey, Env, InterpolationError, NodeId, Payload,
    ProcessEnv, Result, StaticEnv, Value, clear_cache, copy_cache,
};

pub use eval::ResolveContext;
pub use parser::{Ast, LexerMode, ParseOutcome, ParserRule, parse, parse_to_diagnostics};
pub use resolver::{RegisterOptions, ResolverArgs, ResolverCtx, ResolverRegistry, builtins};

use eval::Evaluator;

static PROCESS_ENV: ProcessEnv = ProcessEnv;

/// An evaluation engine: a resolver registry plus an environment source.
///
/// [`Engine::global`] is the default pairing (global registry, process
/// environment); embedding hosts in multi-tenant contexts construct scoped
/// engines instead.
#[derive(Clone, Copy)]
pub struct Engine<'e> {
    registry: &'e ResolverRegistry,
    env: &'e dyn Env,
}

impl<'e> Engine<'e> {
    pub fn new(registry: &'e ResolverRegistry, env: &'e dyn Env) -> Engine<'e> {
        Engine { registry, env }
    }

    pub fn global() -> Engine<'static> {
        Engine {
            registry: ResolverRegistry::global(),
            env: &PROCESS_ENV,
        }
    }

    /// Evaluates a parsed expression against a container.
    ///
    /// The result of a single-interpolation expression may be a
    /// [`Value::Node`] reference; keep the container alive to dereference
    /// it.
    pub fn evaluate(
        &self,
        ast: &Ast,
        container: &dyn ContainerView,
        ctx: &ResolveContext,
    ) -> Result<Value> {
        Evaluator::new(container, self.registry, self.env).eval(ast, ctx)
    }

    /// Resolves the value at a dotted path, fully materialized.
    pub fn select(&self, container: &dyn ContainerView, path: &str) -> Result<Value> {
        let evaluator = Evaluator::new(container, self.registry, self.env);
        let id = container.select_from(None, path)?;
        let ctx = ResolveContext::default();
        let value = evaluator.resolve_node(id, &ctx)?;
        evaluator.materialize(value, &ctx)
    }

    /// Whether resolving `path` runs into a `???` marker.
    pub fn is_missing(&self, container: &dyn ContainerView, path: &str) -> Result<bool> {
        match self.select(container, path) {
            Err(InterpolationError::MissingValue { .. }) => Ok(true),
            Err(other) => Err(other),
            Ok(_) => Ok(false),
        }
    }

    /// Whether the raw value at `path` is an interpolated string.
    pub fn is_interpolation(&self, container: &dyn ContainerView, path: &str) -> Result<bool> {
        let id = container.select_from(None, path)?;
        match container.node(id).payload() {
            Payload::Str(s) if s.contains("${") => {
                match parse(s, ParserRule::ConfigValue, LexerMode::Toplevel) {
                    Ok(ast) => Ok(ast.has_interpolation()),
                    Err(_) => Ok(false),
                }
            }
            _ => Ok(false),
        }
    }
}

/// Evaluates `ast` with the global registry and process environment.
pub fn evaluate(ast: &Ast, container: &dyn ContainerView, ctx: &ResolveContext) -> Result<Value> {
    Engine::global().evaluate(ast, container, ctx)
}

/// Resolves the value at a dotted path with the global registry.
pub fn select(container: &dyn ContainerView, path: &str) -> Result<Value> {
    Engine::global().select(container, path)
}

/// Whether resolving `path` runs into a `???` marker.
pub fn is_missing(container: &dyn ContainerView, path: &str) -> Result<bool> {
    Engine::global().is_missing(container, path)
}

/// Whether the raw value at `path` is an interpolated string.
pub fn is_interpolation(container: &dyn ContainerView, path: &str) -> Result<bool> {
    Engine::global().is_interpolation(container, path)
}
