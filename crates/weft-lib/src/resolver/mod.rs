//! Resolver registry and dispatch.
//!
//! Resolvers are named functions invoked by `${name:args}` interpolations.
//! A registry maps names to resolvers; the process-wide default registry
//! comes pre-loaded with the builtins, and embedding hosts that need
//! isolation construct scoped registries instead.
//!
//! Dispatch memoizes through the *container's* cache, keyed by
//! `(resolver_name, canonical args)`, so two containers never share results
//! and structurally equal argument lists hit the same slot.

pub mod builtins;


use std::collections::HashMap;
use std::sync::{Arc, Once, RwLock};

use once_cell::sync::Lazy;

use weft_core::{
    CacheKey, ContainerView, Env, InterpolationError, ProcessEnv, Result, Value,
};

use crate::eval::{Evaluator, ResolveContext};
use crate::parser::{LexerMode, ParserRule, parse};

/// What a resolver function receives per invocation.
pub struct ResolverArgs<'a> {
    /// Parsed argument values, left to right. For resolvers registered with
    /// `args_as_strings` these are the raw texts wrapped as strings.
    pub values: &'a [Value],
    /// Verbatim source text of each argument.
    pub raw: &'a [String],
    pub ctx: &'a ResolverCtx<'a>,
}

/// Engine handles available to a resolver while it runs.
pub struct ResolverCtx<'a> {
    pub container: &'a dyn ContainerView,
    pub registry: &'a ResolverRegistry,
    pub env: &'a dyn Env,
    pub resolve: &'a ResolveContext,
}

impl ResolverCtx<'_> {
    /// Parses and evaluates `expr` as one value (the `singleElement` rule),
    /// against the same container and registry.
    pub fn decode(&self, expr: &str) -> Result<Value> {
        let ast = parse(expr, ParserRule::SingleElement, LexerMode::Value)?;
        let evaluator = Evaluator::new(self.container, self.registry, self.env);
        let ctx = ResolveContext {
            key: None,
            parent: None,
            ..self.resolve.clone()
        };
        evaluator.eval(&ast, &ctx)
    }

    /// Resolves the node at an absolute dotted path.
    pub fn select(&self, path: &str) -> Result<Value> {
        let id = self.container.select_from(None, path)?;
        let evaluator = Evaluator::new(self.container, self.registry, self.env);
        evaluator.resolve_node(id, self.resolve)
    }
}

type ResolverFn = Arc<dyn Fn(&ResolverArgs<'_>) -> Result<Value> + Send + Sync>;

/// Flags accepted at registration time.
#[derive(Debug, Clone, Copy)]
pub struct RegisterOptions {
    /// Memoize results in the per-container cache.
    pub use_cache: bool,
    /// Legacy: pass arguments as their raw source strings. Deprecated; a
    /// warning is emitted on the resolver's first dispatch.
    pub args_as_strings: bool,
}

impl Default for RegisterOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            args_as_strings: false,
        }
    }
}

/// A named resolver and its dispatch flags.
pub struct Resolver {
    name: String,
    func: ResolverFn,
    use_cache: bool,
    args_as_strings: bool,
    legacy_warning: Once,
}

impl Resolver {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn use_cache(&self) -> bool {
        self.use_cache
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("name", &self.name)
            .field("use_cache", &self.use_cache)
            .field("args_as_strings", &self.args_as_strings)
            .finish_non_exhaustive()
    }
}

/// A mapping from resolver names to resolvers.
///
/// Registration and clearing take the write lock; evaluation only ever
/// takes the read lock, and never holds it across a resolver call.
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: RwLock<HashMap<String, Arc<Resolver>>>,
}

impl ResolverRegistry {
    /// An empty registry (no builtins). Most hosts want
    /// [`ResolverRegistry::global`] or [`builtins::install`].
    pub fn new() -> ResolverRegistry {
        ResolverRegistry::default()
    }

    /// The process-wide default registry, pre-loaded with the builtins over
    /// the process environment.
    pub fn global() -> &'static ResolverRegistry {
        static GLOBAL: Lazy<ResolverRegistry> = Lazy::new(|| {
            let registry = ResolverRegistry::new();
            builtins::install(&registry, Arc::new(ProcessEnv))
                .expect("builtin resolver names are unique");
            registry
        });
        &GLOBAL
    }

    pub fn register(
        &self,
        name: &str,
        func: impl Fn(&ResolverArgs<'_>) -> Result<Value> + Send + Sync + 'static,
    ) -> Result<()> {
        self.register_with(name, func, RegisterOptions::default())
    }

    /// Registers a resolver. Duplicate names are rejected.
    pub fn register_with(
        &self,
        name: &str,
        func: impl Fn(&ResolverArgs<'_>) -> Result<Value> + Send + Sync + 'static,
        options: RegisterOptions,
    ) -> Result<()> {
        let mut resolvers = self.resolvers.write().expect("registry lock poisoned");
        if resolvers.contains_key(name) {
            return Err(InterpolationError::validation(format!(
                "resolver '{name}' is already registered"
            )));
        }
        resolvers.insert(
            name.to_owned(),
            Arc::new(Resolver {
                name: name.to_owned(),
                func: Arc::new(func),
                use_cache: options.use_cache,
                args_as_strings: options.args_as_strings,
                legacy_warning: Once::new(),
            }),
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Resolver>> {
        self.resolvers
            .read()
            .expect("registry lock poisoned")
            .get(name)
            .cloned()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.resolvers
            .read()
            .expect("registry lock poisoned")
            .contains_key(name)
    }

    /// Empties the registry, builtins included. [`builtins::install`] puts
    /// them back.
    pub fn clear(&self) {
        self.resolvers
            .write()
            .expect("registry lock poisoned")
            .clear();
    }

    /// Invokes `name` with the given arguments, memoizing through the
    /// container's cache unless the resolver opted out.
    pub(crate) fn dispatch(
        &self,
        name: &str,
        values: &[Value],
        raw: &[String],
        ctx: &ResolverCtx<'_>,
    ) -> Result<Value> {
        let resolver = self
            .get(name)
            .ok_or_else(|| InterpolationError::UnsupportedResolver {
                name: name.to_owned(),
            })?;

        let legacy_values;
        let call_values: &[Value] = if resolver.args_as_strings {
            resolver.legacy_warning.call_once(|| {
                eprintln!(
                    "warning: resolver '{name}' is registered with `args_as_strings`, which is \
                     deprecated; accept typed values instead"
                );
            });
            legacy_values = raw
                .iter()
                .map(|text| Value::String(text.clone()))
                .collect::<Vec<_>>();
            &legacy_values
        } else {
            values
        };

        let args = ResolverArgs {
            values: call_values,
            raw,
            ctx,
        };

        if !resolver.use_cache {
            return (resolver.func)(&args);
        }

        let key = CacheKey::new(name, call_values)?;
        if let Some(hit) = ctx
            .container
            .cache()
            .lock()
            .expect("cache mutex poisoned")
            .get(&key)
        {
            return Ok(hit.clone());
        }
        let value = (resolver.func)(&args)?;
        ctx.container
            .cache()
            .lock()
            .expect("cache mutex poisoned")
            .insert(key, value.clone());
        Ok(value)
    }
}
