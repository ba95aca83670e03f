//! Tree-walking evaluator for parsed interpolation expressions.
//!
//! Visitor rules, per AST variant:
//!
//! - *Toplevel*: a single interpolation passes its result through unmodified
//!   (a node reference keeps its declared type); any concatenation renders
//!   every part to its canonical string.
//! - *ToplevelStr*: escape reduction, exactly once per lexeme (`\${` → `${`,
//!   `\\` → `\`, anything else verbatim).
//! - *Primitive*: single tokens evaluate typed (`null`, booleans, ints,
//!   floats, quoted strings); multi-piece barewords unescape-concatenate.
//! - *InterpolationNode*: key segments join verbatim, dots included; nested
//!   interpolations must resolve to strings. The joined path goes through
//!   the container, and interpolated target nodes resolve recursively,
//!   bottom-up, under cycle detection.
//! - *InterpolationResolver*: the name resolves first (nested interpolation
//!   allowed), then arguments left-to-right, then dispatch through the
//!   registry with both parsed values and verbatim source texts.
//! - *List/Dict literals*: values evaluate left-to-right; dict keys must be
//!   hashable primitives and never `NaN`.

use std::cell::RefCell;

use indexmap::IndexMap;

use weft_core::{
    ContainerView, DictKey, Env, InterpolationError, NodeId, Payload, Result, Value,
};

use crate::parser::ast::{
    DictKeyNode, DictValue, Element, ElementContent, Interpolation, InterpolationNode,
    InterpolationResolver, ListValue, NamePart, Part, PathPart, Primitive, PrimitivePiece,
    Toplevel, ToplevelStr,
};
use crate::parser::{Ast, LexerMode, ParserRule, SyntaxKind, SyntaxToken, parse};
use crate::resolver::{ResolverCtx, ResolverRegistry};

#[cfg(test)]
mod eval_tests;

/// Per-evaluation context: where the value being resolved sits in its
/// container, and how failures should surface.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// Key of the value being resolved, if any.
    pub key: Option<String>,
    /// Parent node of the value being resolved; the base for relative
    /// (leading-dot) paths.
    pub parent: Option<NodeId>,
    /// Raise on `???` markers instead of passing them through.
    pub throw_on_missing: bool,
    /// Raise on lookup/dispatch failures instead of returning the sentinel.
    pub throw_on_resolution_failure: bool,
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self {
            key: None,
            parent: None,
            throw_on_missing: true,
            throw_on_resolution_failure: true,
        }
    }
}

/// Walks an AST against a container view. Owns nothing persistent; the
/// cycle-frame stack lives only for the duration of one entry call.
pub(crate) struct Evaluator<'a> {
    container: &'a dyn ContainerView,
    registry: &'a ResolverRegistry,
    env: &'a dyn Env,
    frames: RefCell<Vec<(u64, String)>>,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(
        container: &'a dyn ContainerView,
        registry: &'a ResolverRegistry,
        env: &'a dyn Env,
    ) -> Self {
        Self {
            container,
            registry,
            env,
            frames: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn eval(&self, ast: &Ast, ctx: &ResolveContext) -> Result<Value> {
        match ast.rule() {
            ParserRule::ConfigValue => {
                let top = ast
                    .toplevel()
                    .expect("a config-value parse produces a Toplevel root");
                self.visit_toplevel(&top, ctx)
            }
            ParserRule::SingleElement => {
                let element = ast
                    .single_element()
                    .expect("a single-element parse produces a SingleElement root")
                    .element()
                    .expect("the parser guarantees one element");
                let value = self.visit_element(&element, ctx)?;
                self.materialize(value, ctx)
            }
        }
    }

    /// Resolves the node at `id`, following an interpolated string payload
    /// to its final value. Non-interpolated nodes come back as references.
    pub(crate) fn resolve_node(&self, id: NodeId, ctx: &ResolveContext) -> Result<Value> {
        let node = self.container.node(id);
        match node.payload() {
            Payload::Str(s) if s.contains("${") => {
                let path = self.container.path_of(id);
                let frame = (self.container.container_id(), path.clone());
                {
                    let mut frames = self.frames.borrow_mut();
                    if frames.contains(&frame) {
                        return Err(InterpolationError::Cycle { path });
                    }
                    frames.push(frame);
                }
                let result = (|| {
                    let ast = parse(s, ParserRule::ConfigValue, LexerMode::Toplevel)?;
                    let top = ast
                        .toplevel()
                        .expect("a config-value parse produces a Toplevel root");
                    let sub = ResolveContext {
                        key: node.key().map(str::to_owned),
                        parent: node.parent(),
                        ..ctx.clone()
                    };
                    self.visit_toplevel(&top, &sub)
                })();
                self.frames.borrow_mut().pop();
                result
            }
            Payload::Missing => {
                if ctx.throw_on_missing {
                    Err(InterpolationError::MissingValue {
                        key: self.container.path_of(id),
                    })
                } else {
                    Ok(Value::Node(id))
                }
            }
            _ => Ok(Value::Node(id)),
        }
    }

    /// Deeply converts a value into primitives and containers, dereferencing
    /// node references and resolving interpolated leaves on the way.
    pub(crate) fn materialize(&self, value: Value, ctx: &ResolveContext) -> Result<Value> {
        match value {
            Value::Node(id) => self.materialize_node(id, ctx),
            Value::List(items) => Ok(Value::List(
                items
                    .into_iter()
                    .map(|item| self.materialize(item, ctx))
                    .collect::<Result<_>>()?,
            )),
            Value::Dict(entries) => Ok(Value::Dict(
                entries
                    .into_iter()
                    .map(|(key, item)| Ok((key, self.materialize(item, ctx)?)))
                    .collect::<Result<IndexMap<_, _>>>()?,
            )),
            primitive => Ok(primitive),
        }
    }

    fn materialize_node(&self, id: NodeId, ctx: &ResolveContext) -> Result<Value> {
        let node = self.container.node(id);
        match node.payload() {
            Payload::Missing => {
                if ctx.throw_on_missing {
                    Err(InterpolationError::MissingValue {
                        key: self.container.path_of(id),
                    })
                } else {
                    Ok(Value::String(weft_core::MISSING_MARKER.to_owned()))
                }
            }
            Payload::Null => Ok(Value::Null),
            Payload::Bool(b) => Ok(Value::Bool(*b)),
            Payload::Int(i) => Ok(Value::Int(*i)),
            Payload::Float(f) => Ok(Value::Float(*f)),
            Payload::Str(s) => {
                if s.contains("${") {
                    let resolved = self.resolve_node(id, ctx)?;
                    self.materialize(resolved, ctx)
                } else {
                    Ok(Value::String(s.clone()))
                }
            }
            Payload::List(children) => Ok(Value::List(
                children
                    .iter()
                    .map(|&child| self.materialize_node(child, ctx))
                    .collect::<Result<_>>()?,
            )),
            Payload::Dict(children) => Ok(Value::Dict(
                children
                    .iter()
                    .map(|(key, &child)| {
                        Ok((
                            DictKey::String(key.clone()),
                            self.materialize_node(child, ctx)?,
                        ))
                    })
                    .collect::<Result<IndexMap<_, _>>>()?,
            )),
        }
    }

    fn stringify(&self, value: Value, ctx: &ResolveContext) -> Result<String> {
        Ok(self.materialize(value, ctx)?.to_string())
    }

    fn visit_toplevel(&self, toplevel: &Toplevel, ctx: &ResolveContext) -> Result<Value> {
        let parts: Vec<Part> = toplevel.parts().collect();
        if let [Part::Interpolation(single)] = parts.as_slice() {
            // Single interpolation: the result passes through as a node, so
            // the referenced type is preserved.
            return self.visit_interpolation(single, ctx);
        }
        let mut out = String::new();
        for part in &parts {
            match part {
                Part::Str(run) => out.push_str(&visit_toplevel_str(run)),
                Part::Interpolation(interpolation) => {
                    let value = self.visit_interpolation(interpolation, ctx)?;
                    out.push_str(&self.stringify(value, ctx)?);
                }
            }
        }
        Ok(Value::String(out))
    }

    fn visit_interpolation(
        &self,
        interpolation: &Interpolation,
        ctx: &ResolveContext,
    ) -> Result<Value> {
        match interpolation {
            Interpolation::Node(node) => self.visit_interpolation_node(node, ctx),
            Interpolation::Resolver(resolver) => self.visit_interpolation_resolver(resolver, ctx),
        }
    }

    fn visit_interpolation_node(
        &self,
        node: &InterpolationNode,
        ctx: &ResolveContext,
    ) -> Result<Value> {
        let mut path = String::new();
        for part in node.path_parts() {
            match part {
                PathPart::Dot(_) => path.push('.'),
                PathPart::Key(key) => {
                    if let Some(nested) = key.interpolation() {
                        let raw = nested.raw_text();
                        let value = self.visit_interpolation(&nested, ctx)?;
                        match self.materialize(value, ctx)? {
                            Value::String(segment) => path.push_str(&segment),
                            other => {
                                return Err(InterpolationError::type_error(format!(
                                    "a config key must be a string, but `{raw}` resolved to a \
                                     value of type `{}`",
                                    other.type_name()
                                )));
                            }
                        }
                    } else {
                        let token = key.token().expect("a plain key wraps one token");
                        path.push_str(token.text());
                    }
                }
            }
        }

        let result = self
            .container
            .select_from(ctx.parent, &path)
            .and_then(|id| self.resolve_node(id, ctx));
        self.suppress_if_allowed(result, ctx)
    }

    fn visit_interpolation_resolver(
        &self,
        resolver: &InterpolationResolver,
        ctx: &ResolveContext,
    ) -> Result<Value> {
        let name_node = resolver.name().expect("the parser guarantees a resolver name");
        let mut name = String::new();
        for part in name_node.parts() {
            match part {
                NamePart::Token(token) => name.push_str(token.text()),
                NamePart::Interpolation(nested) => {
                    let raw = nested.raw_text();
                    let value = self.visit_interpolation(&nested, ctx)?;
                    match self.materialize(value, ctx)? {
                        Value::String(segment) => name.push_str(&segment),
                        other => {
                            return Err(InterpolationError::type_error(format!(
                                "a resolver name must be a string, but `{raw}` resolved to a \
                                 value of type `{}`",
                                other.type_name()
                            )));
                        }
                    }
                }
            }
        }

        let mut values = Vec::new();
        let mut raw_texts = Vec::new();
        if let Some(args) = resolver.args() {
            for element in args.elements() {
                let value = self.visit_element(&element, ctx)?;
                values.push(self.materialize(value, ctx)?);
                raw_texts.push(element.raw_text());
            }
        }

        let resolver_ctx = ResolverCtx {
            container: self.container,
            registry: self.registry,
            env: self.env,
            resolve: ctx,
        };
        let result = self
            .registry
            .dispatch(&name, &values, &raw_texts, &resolver_ctx);
        self.suppress_if_allowed(result, ctx)
    }

    fn visit_element(&self, element: &Element, ctx: &ResolveContext) -> Result<Value> {
        match element
            .content()
            .expect("the parser guarantees element content")
        {
            ElementContent::Primitive(primitive) => self.visit_primitive(&primitive, ctx),
            ElementContent::List(list) => self.visit_list(&list, ctx),
            ElementContent::Dict(dict) => self.visit_dict(&dict, ctx),
        }
    }

    fn visit_list(&self, list: &ListValue, ctx: &ResolveContext) -> Result<Value> {
        let mut items = Vec::new();
        if let Some(sequence) = list.sequence() {
            for element in sequence.elements() {
                let value = self.visit_element(&element, ctx)?;
                items.push(self.materialize(value, ctx)?);
            }
        }
        Ok(Value::List(items))
    }

    fn visit_dict(&self, dict: &DictValue, ctx: &ResolveContext) -> Result<Value> {
        let mut entries = IndexMap::new();
        for entry in dict.entries() {
            let key_node = entry.key().expect("the parser guarantees a dict key");
            let key = self.visit_dict_key(&key_node, ctx)?;
            let element = entry.value().expect("the parser guarantees a dict value");
            let value = self.visit_element(&element, ctx)?;
            entries.insert(key, self.materialize(value, ctx)?);
        }
        Ok(Value::Dict(entries))
    }

    fn visit_dict_key(&self, key: &DictKeyNode, ctx: &ResolveContext) -> Result<DictKey> {
        if let Some(nested) = key.interpolation() {
            let value = self.visit_interpolation(&nested, ctx)?;
            let value = self.materialize(value, ctx)?;
            return DictKey::from_value(&value);
        }
        let token = key.token().expect("the parser guarantees a key token");
        let text = token.text();
        match token.kind() {
            SyntaxKind::Id => Ok(DictKey::String(text.to_owned())),
            SyntaxKind::QuotedValue => Ok(DictKey::String(unquote(text))),
            SyntaxKind::Null => Ok(DictKey::Null),
            SyntaxKind::Bool => Ok(DictKey::Bool(text.eq_ignore_ascii_case("true"))),
            SyntaxKind::Int => DictKey::from_value(&parse_int(text)),
            SyntaxKind::Float => DictKey::from_value(&Value::Float(parse_float(text))),
            other => unreachable!("token {other:?} cannot be a dictionary key"),
        }
    }

    fn visit_primitive(&self, primitive: &Primitive, ctx: &ResolveContext) -> Result<Value> {
        let pieces: Vec<PrimitivePiece> = primitive.pieces().collect();
        if let [piece] = pieces.as_slice() {
            return match piece {
                PrimitivePiece::Interpolation(interpolation) => {
                    self.visit_interpolation(interpolation, ctx)
                }
                PrimitivePiece::Token(token) => self.primitive_token_value(token, ctx),
            };
        }

        // Concatenation of multiple pieces: un-escape and join as a string.
        let mut out = String::new();
        for piece in &pieces {
            match piece {
                PrimitivePiece::Token(token) => out.push_str(&unescape_token(token)),
                PrimitivePiece::Interpolation(interpolation) => {
                    let value = self.visit_interpolation(interpolation, ctx)?;
                    out.push_str(&self.stringify(value, ctx)?);
                }
            }
        }
        Ok(Value::String(out))
    }

    fn primitive_token_value(&self, token: &SyntaxToken, ctx: &ResolveContext) -> Result<Value> {
        let text = token.text();
        match token.kind() {
            SyntaxKind::QuotedValue => Ok(Value::String(self.resolve_quoted(text, ctx)?)),
            SyntaxKind::Id | SyntaxKind::UnquotedChar | SyntaxKind::Colon | SyntaxKind::Dot => {
                Ok(Value::String(text.to_owned()))
            }
            SyntaxKind::Null => Ok(Value::Null),
            SyntaxKind::Int => Ok(parse_int(text)),
            SyntaxKind::Float => Ok(Value::Float(parse_float(text))),
            SyntaxKind::Bool => Ok(Value::Bool(text.eq_ignore_ascii_case("true"))),
            SyntaxKind::Esc => Ok(Value::String(unescape_pairs(text))),
            other => unreachable!("token {other:?} cannot be a whole primitive"),
        }
    }

    /// A `QUOTED_VALUE` lexeme: un-escape in two passes (so `\\'` stays an
    /// escaped quote), then re-parse the content as a toplevel string —
    /// `'${foo}'` is still an interpolation — and cast to string.
    fn resolve_quoted(&self, quoted: &str, ctx: &ResolveContext) -> Result<String> {
        let content = unquote(quoted);
        let ast = parse(&content, ParserRule::ConfigValue, LexerMode::Toplevel)?;
        let top = ast
            .toplevel()
            .expect("a config-value parse produces a Toplevel root");
        let value = self.visit_toplevel(&top, ctx)?;
        self.stringify(value, ctx)
    }

    fn suppress_if_allowed(&self, result: Result<Value>, ctx: &ResolveContext) -> Result<Value> {
        match result {
            Err(err) if !ctx.throw_on_resolution_failure && err.is_resolution_failure() => {
                Ok(Value::Null)
            }
            other => other,
        }
    }
}

fn visit_toplevel_str(run: &ToplevelStr) -> String {
    let mut out = String::new();
    for token in run.tokens() {
        out.push_str(&unescape_token(&token));
    }
    out
}

/// One-shot escape reduction for a single token.
fn unescape_token(token: &SyntaxToken) -> String {
    let text = token.text();
    match token.kind() {
        SyntaxKind::Esc => unescape_pairs(text),
        SyntaxKind::EscInter => text[1..].to_owned(),
        _ => text.to_owned(),
    }
}

/// Reduces a run of 2-character escapes to the escaped characters.
fn unescape_pairs(text: &str) -> String {
    text.chars().skip(1).step_by(2).collect()
}

/// Strips the delimiters of a quoted lexeme and un-escapes its content in
/// two passes: `\<q>` → `<q>` first, then `\\` → `\`.
fn unquote(quoted: &str) -> String {
    assert!(
        quoted.len() >= 2,
        "quoted lexeme must include its delimiters"
    );
    let quote = quoted.chars().next().expect("non-empty lexeme");
    let inner = &quoted[1..quoted.len() - 1];
    let escaped_quote = format!("\\{quote}");
    inner
        .replace(&escaped_quote, &quote.to_string())
        .replace("\\\\", "\\")
}

fn parse_int(text: &str) -> Value {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    match cleaned.parse::<i64>() {
        Ok(value) => Value::Int(value),
        // Magnitude beyond i64: degrade to float rather than fail.
        Err(_) => Value::Float(
            cleaned
                .parse::<f64>()
                .expect("the lexer only produces numeric int lexemes"),
        ),
    }
}

fn parse_float(text: &str) -> f64 {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();
    let (negative, magnitude) = match lower.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, lower.strip_prefix('+').unwrap_or(&lower)),
    };
    let value = match magnitude {
        "inf" => f64::INFINITY,
        "nan" => f64::NAN,
        _ => cleaned
            .parse::<f64>()
            .expect("the lexer only produces parseable float lexemes"),
    };
    if negative && magnitude == "inf" {
        -value
    } else {
        value
    }
}
