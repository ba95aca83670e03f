//! Built-in resolvers: `env`/`oc.env`, `oc.decode`, `oc.dict.keys`,
//! `oc.dict.values`.
//!
//! All builtins opt out of caching: they read the environment or the
//! container, so memoizing them would pin stale state.

use std::sync::Arc;

use weft_core::{Env, InterpolationError, Payload, Result, Value};

use super::{RegisterOptions, ResolverArgs, ResolverRegistry};

/// Registers the builtins into `registry`, reading environment variables
/// through `env`.
pub fn install(registry: &ResolverRegistry, env: Arc<dyn Env>) -> Result<()> {
    let no_cache = RegisterOptions {
        use_cache: false,
        ..RegisterOptions::default()
    };
    registry.register_with("env", env_reader(env.clone()), no_cache)?;
    registry.register_with("oc.env", env_reader(env), no_cache)?;
    registry.register_with("oc.decode", decode, no_cache)?;
    registry.register_with("oc.dict.keys", dict_keys, no_cache)?;
    registry.register_with("oc.dict.values", dict_values, no_cache)?;
    Ok(())
}

/// `${env:KEY}` / `${env:KEY,default}`.
///
/// Returns the variable's raw string value, no type coercion: feed the
/// result through `oc.decode` for typed reads. A `null` default passes
/// through; other primitive defaults are rendered canonically.
fn env_reader(env: Arc<dyn Env>) -> impl Fn(&ResolverArgs<'_>) -> Result<Value> + Send + Sync {
    move |args| {
        if args.values.is_empty() || args.values.len() > 2 {
            return Err(InterpolationError::validation(
                "`env` takes a variable name and an optional default",
            ));
        }
        let key = match &args.values[0] {
            Value::String(name) => name.clone(),
            primitive @ (Value::Int(_) | Value::Float(_) | Value::Bool(_)) => {
                primitive.to_string()
            }
            other => {
                return Err(InterpolationError::type_error(format!(
                    "the name of an environment variable must be a string, but got a value of \
                     type `{}`",
                    other.type_name()
                )));
            }
        };
        match env.var(&key) {
            Some(value) => Ok(Value::String(value)),
            None => match args.values.get(1) {
                None => Err(InterpolationError::key_not_found(format!(
                    "environment variable '{key}' not found"
                ))),
                Some(Value::Null) => Ok(Value::Null),
                Some(Value::String(default)) => Ok(Value::String(default.clone())),
                Some(primitive @ (Value::Bool(_) | Value::Int(_) | Value::Float(_))) => {
                    Ok(Value::String(primitive.to_string()))
                }
                Some(other) => Err(InterpolationError::validation(format!(
                    "the default value of the `env` resolver must be a string or null, but got \
                     a value of type `{}`",
                    other.type_name()
                ))),
            },
        }
    }
}

/// `${oc.decode:expr}`: parse and evaluate `expr` as one typed value.
/// `null` passes through.
fn decode(args: &ResolverArgs<'_>) -> Result<Value> {
    match args.values {
        [Value::Null] => Ok(Value::Null),
        [Value::String(expr)] => args.ctx.decode(expr),
        [other] => Err(InterpolationError::type_error(format!(
            "`oc.decode` can only take strings or null, but got a value of type `{}`",
            other.type_name()
        ))),
        _ => Err(InterpolationError::validation(
            "`oc.decode` takes exactly one argument",
        )),
    }
}

/// Selects the mapping a dict helper operates on.
fn dict_target(args: &ResolverArgs<'_>, name: &str) -> Result<Value> {
    match args.values {
        [Value::String(path)] => args.ctx.select(path),
        [other] => Err(InterpolationError::type_error(format!(
            "`{name}` requires a dotted path to a mapping, but got a value of type `{}`",
            other.type_name()
        ))),
        _ => Err(InterpolationError::validation(format!(
            "`{name}` takes exactly one argument"
        ))),
    }
}

/// `${oc.dict.keys:path}`: the keys of the mapping at `path`.
fn dict_keys(args: &ResolverArgs<'_>) -> Result<Value> {
    let target = dict_target(args, "oc.dict.keys")?;
    match &target {
        Value::Node(id) => match args.ctx.container.node(*id).payload() {
            Payload::Dict(entries) => Ok(Value::List(
                entries.keys().map(|key| Value::String(key.clone())).collect(),
            )),
            _ => Err(not_a_mapping("oc.dict.keys", &target, args)),
        },
        Value::Dict(entries) => Ok(Value::List(
            entries.keys().map(|key| key.to_value()).collect(),
        )),
        _ => Err(not_a_mapping("oc.dict.keys", &target, args)),
    }
}

/// `${oc.dict.values:path}`: the values of the mapping at `path`, as node
/// references parented to the mapping.
fn dict_values(args: &ResolverArgs<'_>) -> Result<Value> {
    let target = dict_target(args, "oc.dict.values")?;
    match &target {
        Value::Node(id) => match args.ctx.container.node(*id).payload() {
            Payload::Dict(entries) => Ok(Value::List(
                entries.values().map(|&child| Value::Node(child)).collect(),
            )),
            _ => Err(not_a_mapping("oc.dict.values", &target, args)),
        },
        Value::Dict(entries) => Ok(Value::List(entries.values().cloned().collect())),
        _ => Err(not_a_mapping("oc.dict.values", &target, args)),
    }
}

fn not_a_mapping(name: &str, target: &Value, args: &ResolverArgs<'_>) -> InterpolationError {
    let type_name = match target {
        Value::Node(id) => {
            let payload = args.ctx.container.node(*id).payload();
            match payload {
                Payload::List(_) => "list",
                Payload::Missing => "missing",
                Payload::Null => "null",
                Payload::Bool(_) => "bool",
                Payload::Int(_) => "int",
                Payload::Float(_) => "float",
                Payload::Str(_) => "str",
                Payload::Dict(_) => "dict",
            }
        }
        other => other.type_name(),
    };
    InterpolationError::type_error(format!(
        "`{name}` can only be applied to a mapping, but the target is of type `{type_name}`"
    ))
}
