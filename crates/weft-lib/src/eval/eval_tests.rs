use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use indoc::indoc;
use pretty_assertions::assert_eq;

use weft_core::{Config, DictKey, InterpolationError, StaticEnv, Value};

use crate::parser::{LexerMode, ParserRule, parse};
use crate::resolver::{ResolverArgs, ResolverRegistry, builtins};
use crate::{Engine, ResolveContext, is_interpolation, is_missing, select};

fn cfg(json: &str) -> Config {
    Config::from_json(json).expect("valid json")
}

fn identity(args: &ResolverArgs<'_>) -> weft_core::Result<Value> {
    Ok(match args.values {
        [single] => single.clone(),
        many => Value::List(many.to_vec()),
    })
}

/// Registry with `identity`, `plus` and the builtins over `env`.
fn test_registry(env: &StaticEnv) -> ResolverRegistry {
    let registry = ResolverRegistry::new();
    builtins::install(&registry, Arc::new(env.clone())).expect("builtins install");
    registry.register("identity", identity).expect("register identity");
    registry
        .register("plus", |args: &ResolverArgs<'_>| match args.values {
            [Value::Int(a), Value::Int(b)] => Ok(Value::Int(a + b)),
            _ => Err(InterpolationError::validation("`plus` adds two ints")),
        })
        .expect("register plus");
    registry
}

fn list(items: Vec<Value>) -> Value {
    Value::List(items)
}

fn dict(entries: Vec<(DictKey, Value)>) -> Value {
    Value::Dict(entries.into_iter().collect())
}

// --- node interpolations -------------------------------------------------

#[test]
fn simple_reference() {
    let cfg = cfg(r#"{"a": "${referenced}", "referenced": "bar"}"#);
    assert_eq!(select(&cfg, "a").unwrap(), Value::from("bar"));
}

#[test]
fn repeated_references_concatenate() {
    let cfg = cfg(r#"{"ha": "HA", "a": "${ha} ${ha}, said ${ha}!"}"#);
    assert_eq!(select(&cfg, "a").unwrap(), Value::from("HA HA, said HA!"));
}

#[test]
fn nested_path_reference() {
    let cfg = cfg(r#"{"nested": {"value": 42}, "a": "x=${nested.value}"}"#);
    assert_eq!(select(&cfg, "a").unwrap(), Value::from("x=42"));
}

#[test]
fn single_interpolation_preserves_type() {
    let cfg = cfg(r#"{"answer": 42, "inter": "${answer}"}"#);
    assert_eq!(select(&cfg, "inter").unwrap(), Value::Int(42));
}

#[test]
fn concatenation_forces_string() {
    let cfg = cfg(r#"{"two": 2, "four": 4, "c": "${four}${two}"}"#);
    assert_eq!(select(&cfg, "c").unwrap(), Value::from("42"));
}

#[test]
fn two_step_interpolation() {
    let cfg = cfg(r#"{"a": 10, "b": "${a}", "c": "${b}"}"#);
    assert_eq!(select(&cfg, "c").unwrap(), Value::Int(10));
}

#[test]
fn null_reference_stays_null() {
    let cfg = cfg(r#"{"foo": null, "bar": "${foo}"}"#);
    assert_eq!(select(&cfg, "bar").unwrap(), Value::Null);
}

#[test]
fn interpolation_inside_a_list() {
    let from_dict = cfg(r#"{"bar": 10, "foo": ["${bar}"]}"#);
    assert_eq!(select(&from_dict, "foo.0").unwrap(), Value::Int(10));

    let into_list = cfg(r#"{"list": ["${ref}"], "ref": "bar"}"#);
    assert_eq!(select(&into_list, "list.0").unwrap(), Value::from("bar"));

    let out_of_list = cfg(r#"{"list": ["bar"], "foo": "${list.0}"}"#);
    assert_eq!(select(&out_of_list, "foo").unwrap(), Value::from("bar"));
}

#[test]
fn list_index_out_of_range() {
    let cfg = cfg(r#"["${10}"]"#);
    let err = select(&cfg, "0").unwrap_err();
    assert!(matches!(err, InterpolationError::KeyNotFound { .. }));
}

#[test]
fn missing_path_is_a_key_error() {
    let cfg = cfg(r#"{"a": "${not.found}"}"#);
    assert!(matches!(
        select(&cfg, "a").unwrap_err(),
        InterpolationError::KeyNotFound { .. }
    ));
}

#[test]
fn relative_paths_climb_from_the_parent() {
    let cfg = cfg(r#"{"a": {"b": "${.c}", "c": 5, "up": "${..top}"}, "top": "t"}"#);
    assert_eq!(select(&cfg, "a.b").unwrap(), Value::Int(5));
    assert_eq!(select(&cfg, "a.up").unwrap(), Value::from("t"));
}

#[test]
fn container_reference_materializes_on_select() {
    let cfg = cfg(r#"{"c": {"x": 1}, "r": "${c}", "s": "v=${c}"}"#);
    assert_eq!(
        select(&cfg, "r").unwrap(),
        dict(vec![(DictKey::from("x"), Value::Int(1))])
    );
    // Embedded in a longer string: canonical rendering.
    assert_eq!(select(&cfg, "s").unwrap(), Value::from("v={x: 1}"));
}

#[test]
fn evaluate_returns_node_references() {
    let cfg = cfg(r#"{"answer": 42, "inter": "${answer}"}"#);
    let ast = parse("${answer}", ParserRule::ConfigValue, LexerMode::Toplevel).unwrap();
    let value = crate::evaluate(&ast, &cfg, &ResolveContext::default()).unwrap();
    assert!(matches!(value, Value::Node(_)));
}

// --- nesting -------------------------------------------------------------

#[test]
fn nested_key_interpolation() {
    let cfg = cfg(r#"{"a": 1, "b": "a", "c": "${${b}}"}"#);
    assert_eq!(select(&cfg, "c").unwrap(), Value::Int(1));
}

#[test]
fn member_access_through_nested_keys() {
    let cfg = cfg(indoc! {r#"
        {
            "a": {"b": 1, "c": 2, "d": "${a.b}"},
            "b": "c",
            "c": "${a.${b}}",
            "d": "${${b}}",
            "e": ".d",
            "f": "${a${e}}"
        }
    "#});
    assert_eq!(select(&cfg, "c").unwrap(), Value::Int(2));
    assert_eq!(select(&cfg, "d").unwrap(), Value::Int(2));
    // `e` contributes its leading dot to the joined path `a.d`.
    assert_eq!(select(&cfg, "f").unwrap(), Value::Int(1));
}

#[test]
fn non_string_key_segment_is_a_type_error() {
    let cfg = cfg(r#"{"n": 1, "a": {"b": 2}, "bad": "${a.${n}}"}"#);
    assert!(matches!(
        select(&cfg, "bad").unwrap_err(),
        InterpolationError::Type { .. }
    ));
}

#[test]
fn cycles_are_detected() {
    let cfg = cfg(r#"{"a": "${b}", "b": "${a}", "x": "${x}"}"#);
    assert!(matches!(
        select(&cfg, "a").unwrap_err(),
        InterpolationError::Cycle { .. }
    ));
    assert!(matches!(
        select(&cfg, "x").unwrap_err(),
        InterpolationError::Cycle { .. }
    ));
}

// --- resolvers -----------------------------------------------------------

#[test]
fn resolver_with_interpolated_args() {
    let env = StaticEnv::new();
    let registry = test_registry(&env);
    let engine = Engine::new(&registry, &env);
    let cfg = cfg(r#"{"x": 1, "y": 2, "z": "${plus:${x},${y}}"}"#);
    assert_eq!(engine.select(&cfg, "z").unwrap(), Value::Int(3));
}

#[test]
fn resolver_name_can_come_from_an_interpolation() {
    let env = StaticEnv::new();
    let registry = test_registry(&env);
    let engine = Engine::new(&registry, &env);
    let cfg = cfg(r#"{"op": "plus", "x": 1, "y": 2, "t": "${${op}:${x},${y}}"}"#);
    assert_eq!(engine.select(&cfg, "t").unwrap(), Value::Int(3));
}

#[test]
fn non_string_resolver_name_is_a_type_error() {
    let env = StaticEnv::new();
    let registry = test_registry(&env);
    let engine = Engine::new(&registry, &env);
    let cfg = cfg(r#"{"n": 1, "bad": "${${n}:x}"}"#);
    assert!(matches!(
        engine.select(&cfg, "bad").unwrap_err(),
        InterpolationError::Type { .. }
    ));
}

#[test]
fn unsupported_resolver() {
    let cfg = cfg(r#"{"foo": "${unknown:0}"}"#);
    assert!(matches!(
        select(&cfg, "foo").unwrap_err(),
        InterpolationError::UnsupportedResolver { name } if name == "unknown"
    ));
}

#[test]
fn unclosed_interpolation_is_a_syntax_error() {
    let cfg = cfg(r#"{"c": "${env:X,"}"#);
    assert!(matches!(
        select(&cfg, "c").unwrap_err(),
        InterpolationError::Syntax { .. }
    ));
}

// --- primitives through a resolver ---------------------------------------

fn identity_select(expr: &str) -> weft_core::Result<Value> {
    let env = StaticEnv::new();
    let registry = test_registry(&env);
    let engine = Engine::new(&registry, &env);
    let json = format!(
        r#"{{"k": "{}"}}"#,
        expr.replace('\\', "\\\\").replace('"', "\\\"")
    );
    let cfg = Config::from_json(&json).expect("valid json");
    engine.select(&cfg, "k")
}

#[test]
fn typed_primitives() {
    assert_eq!(identity_select("${identity:null}").unwrap(), Value::Null);
    assert_eq!(identity_select("${identity:TrUe}").unwrap(), Value::Bool(true));
    assert_eq!(identity_select("${identity:falsE}").unwrap(), Value::Bool(false));
    assert_eq!(
        identity_select("${identity:true_false}").unwrap(),
        Value::from("true_false")
    );
    assert_eq!(identity_select("${identity:123}").unwrap(), Value::Int(123));
    assert_eq!(identity_select("${identity:+123}").unwrap(), Value::Int(123));
    assert_eq!(identity_select("${identity:-123}").unwrap(), Value::Int(-123));
    assert_eq!(identity_select("${identity:1_000}").unwrap(), Value::Int(1000));
    assert_eq!(identity_select("${identity:1.1}").unwrap(), Value::Float(1.1));
    assert_eq!(identity_select("${identity:.1}").unwrap(), Value::Float(0.1));
    assert_eq!(identity_select("${identity:1.}").unwrap(), Value::Float(1.0));
    assert_eq!(identity_select("${identity:-1e2}").unwrap(), Value::Float(-100.0));
    assert_eq!(identity_select("${identity:+1E-2}").unwrap(), Value::Float(0.01));
    assert_eq!(
        identity_select("${identity:1_0e1_0}").unwrap(),
        Value::Float(10e10)
    );
    assert_eq!(
        identity_select("${identity:inf}").unwrap(),
        Value::Float(f64::INFINITY)
    );
    assert_eq!(
        identity_select("${identity:-inf}").unwrap(),
        Value::Float(f64::NEG_INFINITY)
    );
    let nan = identity_select("${identity:nan}").unwrap();
    assert!(matches!(nan, Value::Float(f) if f.is_nan()));
}

#[test]
fn malformed_numbers_stay_strings() {
    for (expr, expected) in [
        ("${identity:1_000_}", "1_000_"),
        ("${identity:1__000}", "1__000"),
        ("${identity:_1000}", "_1000"),
        ("${identity:02}", "02"),
        ("${identity:1e-02}", "1e-02"),
        ("${identity:e-2}", "e-2"),
        ("${identity:01e2}", "01e2"),
    ] {
        assert_eq!(
            identity_select(expr).unwrap(),
            Value::from(expected),
            "input: {expr}"
        );
    }
}

#[test]
fn barewords_keep_interior_whitespace() {
    assert_eq!(
        identity_select("${identity:hello world}").unwrap(),
        Value::from("hello world")
    );
    assert_eq!(
        identity_select("${identity:a, b c}").unwrap(),
        list(vec![Value::from("a"), Value::from("b c")])
    );
}

#[test]
fn escaped_space_and_comma() {
    assert_eq!(
        identity_select(r"${identity:\ hello\ world\ }").unwrap(),
        Value::from(" hello world ")
    );
    assert_eq!(
        identity_select(r"${identity:hello\, world}").unwrap(),
        Value::from("hello, world")
    );
}

#[test]
fn bareword_special_characters() {
    assert_eq!(
        identity_select("${identity:a/-%#?&@,.b:}").unwrap(),
        list(vec![Value::from("a/-%#?&@"), Value::from(".b:")])
    );
}

#[test]
fn quoted_strings_disable_typed_parsing() {
    assert_eq!(
        identity_select("${identity:'!@#$%^&*()[]:.,'}").unwrap(),
        Value::from("!@#$%^&*()[]:.,")
    );
    assert_eq!(identity_select("${identity:'123'}").unwrap(), Value::from("123"));
    assert_eq!(identity_select("${identity:'null'}").unwrap(), Value::from("null"));
    assert_eq!(
        identity_select("${identity:'truE', \"FalSe\"}").unwrap(),
        list(vec![Value::from("truE"), Value::from("FalSe")])
    );
}

#[test]
fn quoted_string_can_embed_interpolations() {
    let env = StaticEnv::new();
    let registry = test_registry(&env);
    let engine = Engine::new(&registry, &env);
    let cfg = cfg(r#"{"a": "hi", "k": "${identity:'${a} there'}"}"#);
    assert_eq!(engine.select(&cfg, "k").unwrap(), Value::from("hi there"));
}

#[test]
fn concatenated_quotes_keep_their_delimiters() {
    let env = StaticEnv::new();
    let registry = test_registry(&env);
    let engine = Engine::new(&registry, &env);
    let cfg = cfg(r#"{"s": "hello world", "k": "${identity:'I '\"say \"${s}}"}"#);
    assert_eq!(
        engine.select(&cfg, "k").unwrap(),
        Value::from("'I '\"say \"hello world")
    );
}

#[test]
fn bareword_concatenated_with_interpolation() {
    let env = StaticEnv::new();
    let registry = test_registry(&env);
    let engine = Engine::new(&registry, &env);
    let cfg = cfg(r#"{"s": "hello world", "k": "${identity:hi_${s}}"}"#);
    assert_eq!(engine.select(&cfg, "k").unwrap(), Value::from("hi_hello world"));
}

// --- structured arguments ------------------------------------------------

#[test]
fn list_and_dict_arguments() {
    assert_eq!(
        identity_select("${identity:[0, 1]}").unwrap(),
        list(vec![Value::Int(0), Value::Int(1)])
    );
    assert_eq!(
        identity_select("${identity:[a, b], 0, [1.1]}").unwrap(),
        list(vec![
            list(vec![Value::from("a"), Value::from("b")]),
            Value::Int(0),
            list(vec![Value::Float(1.1)]),
        ])
    );
    assert_eq!(
        identity_select("${identity:{'a': 1.1, b: b}}").unwrap(),
        dict(vec![
            (DictKey::from("a"), Value::Float(1.1)),
            (DictKey::from("b"), Value::from("b")),
        ])
    );
}

#[test]
fn deep_structures_with_typed_keys() {
    assert_eq!(
        identity_select("${identity:{null: [0, 3.14, false], true: {'a': [0, 1, 2], 'b': {}}}}")
            .unwrap(),
        dict(vec![
            (
                DictKey::Null,
                list(vec![Value::Int(0), Value::Float(3.14), Value::Bool(false)]),
            ),
            (
                DictKey::Bool(true),
                dict(vec![
                    (
                        DictKey::from("a"),
                        list(vec![Value::Int(0), Value::Int(1), Value::Int(2)]),
                    ),
                    (DictKey::from("b"), dict(vec![])),
                ]),
            ),
        ])
    );
}

#[test]
fn mixed_argument_sequence() {
    assert_eq!(
        identity_select(
            "${identity:10,str,3.14,true,false,inf,[1,2,3], 'quoted', \"quoted\", 'a,b,c'}"
        )
        .unwrap(),
        list(vec![
            Value::Int(10),
            Value::from("str"),
            Value::Float(3.14),
            Value::Bool(true),
            Value::Bool(false),
            Value::Float(f64::INFINITY),
            list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            Value::from("quoted"),
            Value::from("quoted"),
            Value::from("a,b,c"),
        ])
    );
}

#[test]
fn dict_keys_can_be_interpolated() {
    let env = StaticEnv::new();
    let registry = test_registry(&env);
    let engine = Engine::new(&registry, &env);
    let cfg = cfg(r#"{"n": 1, "k": "${identity:{${n}: v}}"}"#);
    assert_eq!(
        engine.select(&cfg, "k").unwrap(),
        dict(vec![(DictKey::Int(1), Value::from("v"))])
    );
}

#[test]
fn nan_dict_keys_are_rejected() {
    assert!(matches!(
        identity_select("${identity:{nan: 1}}").unwrap_err(),
        InterpolationError::Type { .. }
    ));

    let env = StaticEnv::new();
    let registry = test_registry(&env);
    let engine = Engine::new(&registry, &env);
    let cfg = cfg(r#"{"bad": "nan", "k": "${identity:{${identity:nan}: 1}}"}"#);
    assert!(matches!(
        engine.select(&cfg, "k").unwrap_err(),
        InterpolationError::Type { .. }
    ));
}

#[test]
fn non_hashable_dict_keys_are_rejected() {
    let env = StaticEnv::new();
    let registry = test_registry(&env);
    let engine = Engine::new(&registry, &env);
    let cfg = cfg(r#"{"l": [1], "k": "${identity:{${l}: 1}}"}"#);
    assert!(matches!(
        engine.select(&cfg, "k").unwrap_err(),
        InterpolationError::Type { .. }
    ));
}

// --- escapes -------------------------------------------------------------

#[test]
fn escaped_interpolation_is_literal() {
    let cfg = cfg(r#"{"a": "\\${x}", "b": "say \\${it} twice"}"#);
    assert_eq!(select(&cfg, "a").unwrap(), Value::from("${x}"));
    assert_eq!(select(&cfg, "b").unwrap(), Value::from("say ${it} twice"));
}

#[test]
fn escaped_backslash_before_interpolation() {
    let cfg = cfg(r#"{"x": 7, "a": "\\\\${x}"}"#);
    assert_eq!(select(&cfg, "a").unwrap(), Value::from("\\7"));
}

#[test]
fn stray_backslashes_are_preserved() {
    let cfg = cfg(r#"{"x": "hi", "a": "${x} !@\\#$%^&*})][({,/?;"}"#);
    assert_eq!(select(&cfg, "a").unwrap(), Value::from("hi !@\\#$%^&*})][({,/?;"));
}

#[test]
fn toplevel_quotes_are_plain_characters() {
    let cfg = cfg(r#"{"prim": "hi", "s": "'${prim}'", "d": "\"${prim}\" ok"}"#);
    assert_eq!(select(&cfg, "s").unwrap(), Value::from("'hi'"));
    assert_eq!(select(&cfg, "d").unwrap(), Value::from("\"hi\" ok"));
}

#[test]
fn braces_in_plain_text() {
    let cfg = cfg(r#"{"a": "def", "b": "abc_{${a}}"}"#);
    assert_eq!(select(&cfg, "b").unwrap(), Value::from("abc_{def}"));
}

// --- env resolver --------------------------------------------------------

fn env_engine_select(vars: &[(&str, &str)], json: &str, key: &str) -> weft_core::Result<Value> {
    let mut env = StaticEnv::new();
    for (name, value) in vars {
        env = env.set(name, value);
    }
    let registry = test_registry(&env);
    let engine = Engine::new(&registry, &env);
    let cfg = Config::from_json(json).expect("valid json");
    engine.select(&cfg, key)
}

#[test]
fn env_embeds_verbatim() {
    assert_eq!(
        env_engine_select(
            &[("foobar", "1234")],
            r#"{"p": "/test/${env:foobar}"}"#,
            "p"
        )
        .unwrap(),
        Value::from("/test/1234")
    );
}

#[test]
fn env_returns_raw_strings() {
    // No type coercion at this level; `oc.decode` is the typed path.
    assert_eq!(
        env_engine_select(&[("NUM", "123")], r#"{"p": "${env:NUM}"}"#, "p").unwrap(),
        Value::from("123")
    );
    assert_eq!(
        env_engine_select(&[("NUM", "123")], r#"{"p": "${oc.decode:${env:NUM}}"}"#, "p").unwrap(),
        Value::Int(123)
    );
}

#[test]
fn env_defaults() {
    assert_eq!(
        env_engine_select(&[], r#"{"p": "${env:MISSING,abc}"}"#, "p").unwrap(),
        Value::from("abc")
    );
    assert_eq!(
        env_engine_select(&[], r#"{"p": "${env:MISSING,a/b}"}"#, "p").unwrap(),
        Value::from("a/b")
    );
    assert_eq!(
        env_engine_select(&[], r#"{"p": "${env:MISSING,null}"}"#, "p").unwrap(),
        Value::Null
    );
    // Primitive defaults are rendered canonically.
    assert_eq!(
        env_engine_select(&[], r#"{"p": "${env:MISSING,123}"}"#, "p").unwrap(),
        Value::from("123")
    );
    assert_eq!(
        env_engine_select(&[], r#"{"p": "${env:MISSING,'null'}"}"#, "p").unwrap(),
        Value::from("null")
    );
}

#[test]
fn env_not_found() {
    assert!(matches!(
        env_engine_select(&[], r#"{"p": "${env:DOES_NOT_EXIST}"}"#, "p").unwrap_err(),
        InterpolationError::KeyNotFound { .. }
    ));
}

#[test]
fn env_container_default_is_invalid() {
    assert!(matches!(
        env_engine_select(&[], r#"{"p": "${env:MISSING,[a]}"}"#, "p").unwrap_err(),
        InterpolationError::Validation { .. }
    ));
}

#[test]
fn env_key_built_from_interpolation() {
    assert_eq!(
        env_engine_select(
            &[("PRE_FOO", "hit")],
            r#"{"a": "FOO", "c": "${env:PRE_${a}}"}"#,
            "c"
        )
        .unwrap(),
        Value::from("hit")
    );
}

// --- decode & dict helpers -----------------------------------------------

#[test]
fn decode_parses_typed_values() {
    for (raw, expected) in [
        ("null", Value::Null),
        ("true", Value::Bool(true)),
        ("false", Value::Bool(false)),
        ("10", Value::Int(10)),
        ("1.5", Value::Float(1.5)),
        ("[1, 2]", list(vec![Value::Int(1), Value::Int(2)])),
    ] {
        let json = format!(r#"{{"s": "{raw}", "d": "${{oc.decode:${{s}}}}"}}"#);
        assert_eq!(
            env_engine_select(&[], &json, "d").unwrap(),
            expected,
            "input: {raw}"
        );
    }
}

#[test]
fn decode_round_trips_canonical_renderings() {
    // oc.decode(str(v)) == v for primitives.
    for value in [
        Value::Null,
        Value::Bool(true),
        Value::Bool(false),
        Value::Int(-3),
        Value::Float(1.5),
    ] {
        let json = format!(r#"{{"s": "{}", "d": "${{oc.decode:${{s}}}}"}}"#, value);
        assert_eq!(env_engine_select(&[], &json, "d").unwrap(), value);
    }
}

#[test]
fn decode_of_null_passes_through() {
    assert_eq!(
        env_engine_select(&[], r#"{"d": "${oc.decode:null}"}"#, "d").unwrap(),
        Value::Null
    );
}

#[test]
fn decode_rejects_non_strings() {
    assert!(matches!(
        env_engine_select(&[], r#"{"n": 1, "d": "${oc.decode:${n}}"}"#, "d").unwrap_err(),
        InterpolationError::Type { .. }
    ));
}

#[test]
fn dict_helpers() {
    let json = indoc! {r#"
        {
            "m": {"a": 1, "b": 2},
            "k": "${oc.dict.keys:m}",
            "v": "${oc.dict.values:m}"
        }
    "#};
    assert_eq!(
        env_engine_select(&[], json, "k").unwrap(),
        list(vec![Value::from("a"), Value::from("b")])
    );
    assert_eq!(
        env_engine_select(&[], json, "v").unwrap(),
        list(vec![Value::Int(1), Value::Int(2)])
    );
}

#[test]
fn dict_helpers_require_a_mapping() {
    assert!(matches!(
        env_engine_select(&[], r#"{"x": 1, "k": "${oc.dict.keys:x}"}"#, "k").unwrap_err(),
        InterpolationError::Type { .. }
    ));
    assert!(matches!(
        env_engine_select(&[], r#"{"x": [1], "k": "${oc.dict.values:x}"}"#, "k").unwrap_err(),
        InterpolationError::Type { .. }
    ));
}

// --- missing values and failure flags ------------------------------------

#[test]
fn missing_marker_propagates_through_concatenation() {
    let cfg = cfg(r#"{"out": "${x.name}.txt", "x": {"name": "???"}}"#);
    assert!(is_missing(&cfg, "out").unwrap());
    assert!(matches!(
        select(&cfg, "out").unwrap_err(),
        InterpolationError::MissingValue { .. }
    ));
}

#[test]
fn non_missing_values_report_false() {
    let cfg = cfg(r#"{"a": 1, "b": "${a}"}"#);
    assert!(!is_missing(&cfg, "b").unwrap());
}

#[test]
fn resolution_failures_can_become_sentinels() {
    let cfg = cfg(r#"{"a": 1}"#);
    let ctx = ResolveContext {
        throw_on_resolution_failure: false,
        ..ResolveContext::default()
    };

    let ast = parse("${not.there}", ParserRule::ConfigValue, LexerMode::Toplevel).unwrap();
    assert_eq!(crate::evaluate(&ast, &cfg, &ctx).unwrap(), Value::Null);

    let ast = parse("${unknown:0}", ParserRule::ConfigValue, LexerMode::Toplevel).unwrap();
    assert_eq!(crate::evaluate(&ast, &cfg, &ctx).unwrap(), Value::Null);
}

#[test]
fn missing_values_can_pass_through_as_nodes() {
    let cfg = cfg(r#"{"miss": "???"}"#);
    let ctx = ResolveContext {
        throw_on_missing: false,
        ..ResolveContext::default()
    };
    let ast = parse("${miss}", ParserRule::ConfigValue, LexerMode::Toplevel).unwrap();
    assert!(matches!(
        crate::evaluate(&ast, &cfg, &ctx).unwrap(),
        Value::Node(_)
    ));
}

#[test]
fn type_errors_are_not_suppressed() {
    let env = StaticEnv::new();
    let registry = test_registry(&env);
    let engine = Engine::new(&registry, &env);
    let cfg = cfg(r#"{"n": 1, "a": {"b": 2}}"#);
    let ctx = ResolveContext {
        throw_on_resolution_failure: false,
        ..ResolveContext::default()
    };
    let ast = parse("${a.${n}}", ParserRule::ConfigValue, LexerMode::Toplevel).unwrap();
    assert!(matches!(
        engine.evaluate(&ast, &cfg, &ctx).unwrap_err(),
        InterpolationError::Type { .. }
    ));
}

// --- invariants ----------------------------------------------------------

#[test]
fn strings_without_interpolation_are_identity() {
    for s in ["", "plain", "a.b: c", "50% off", "{not: yaml}", "''"] {
        let json = serde_json::json!({ "k": s }).to_string();
        let cfg = Config::from_json(&json).expect("valid json");
        assert_eq!(select(&cfg, "k").unwrap(), Value::from(s), "input: {s}");
    }
}

#[test]
fn is_interpolation_inspects_the_raw_value() {
    let cfg = cfg(r#"{"foo": 10, "bar": "${foo}", "esc": "\\${foo}", "txt": "x"}"#);
    assert!(is_interpolation(&cfg, "bar").unwrap());
    assert!(!is_interpolation(&cfg, "esc").unwrap());
    assert!(!is_interpolation(&cfg, "txt").unwrap());
    assert!(!is_interpolation(&cfg, "foo").unwrap());
}

#[test]
fn deterministic_resolvers_evaluate_consistently() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let env = StaticEnv::new();
    let registry = ResolverRegistry::new();
    registry
        .register("count", move |_args: &ResolverArgs<'_>| {
            Ok(Value::Int(seen.fetch_add(1, Ordering::SeqCst) as i64))
        })
        .expect("register");
    let engine = Engine::new(&registry, &env);
    let cfg = cfg(r#"{"k": "${count:_}"}"#);

    let first = engine.select(&cfg, "k").unwrap();
    let second = engine.select(&cfg, "k").unwrap();
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
