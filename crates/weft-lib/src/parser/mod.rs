//! Parser infrastructure for interpolated configuration strings.
//!
//! # Architecture
//!
//! A two-mode Logos lexer feeds a hand-written recursive-descent parser that
//! builds a lossless concrete syntax tree via Rowan's green tree builder:
//!
//! - Zero-copy lexing: tokens carry spans, text is sliced on demand
//! - Mode stack: `${` enters VALUE mode, `}` pops back out, dict braces
//!   nest without ending the interpolation
//! - Strict parsing: configuration strings are validated, not recovered —
//!   the first recognition failure aborts with a typed error
//! - Typed AST wrappers expose exactly the shape the evaluator consumes,
//!   including verbatim argument source texts
//!
//! The lossless tree is what makes resolver raw-argument passing and
//! escape-preserving concatenation cheap: both are plain text slices of the
//! original source.

pub mod ast;
mod core;
mod cst;
mod grammar;
mod lexer;


use weft_core::Result;

pub use cst::{SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken, TokenSet, WeftLang};
pub use lexer::{LexerMode, Token, lex, token_text};

use crate::diagnostics::Diagnostics;
use ast::{SingleElement, Toplevel};
use self::core::Parser;

/// Which grammar rule to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserRule {
    /// A whole configuration string: literal text with embedded `${...}`.
    ConfigValue,
    /// One value, as accepted inside an interpolation (used by `oc.decode`).
    SingleElement,
}

/// A parsed interpolation expression.
///
/// Owns the source and the syntax tree; evaluation borrows both.
#[derive(Debug, Clone)]
pub struct Ast {
    source: String,
    root: SyntaxNode,
    rule: ParserRule,
}

impl Ast {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn rule(&self) -> ParserRule {
        self.rule
    }

    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }

    /// Typed root for a `ConfigValue` parse.
    pub fn toplevel(&self) -> Option<Toplevel> {
        Toplevel::cast(self.root.clone())
    }

    /// Typed root for a `SingleElement` parse.
    pub fn single_element(&self) -> Option<SingleElement> {
        SingleElement::cast(self.root.clone())
    }

    /// Whether the parsed string contains any interpolation.
    pub fn has_interpolation(&self) -> bool {
        self.root
            .descendants()
            .any(|node| {
                matches!(
                    node.kind(),
                    SyntaxKind::InterpolationNode | SyntaxKind::InterpolationResolver
                )
            })
    }
}

/// Parses `expr` under the given rule and lexer mode.
///
/// The diagnostic sink translates recognition failures into the typed
/// error taxonomy; the first failure aborts the parse.
pub fn parse(expr: &str, rule: ParserRule, mode: LexerMode) -> Result<Ast> {
    match parse_to_diagnostics(expr, rule, mode) {
        ParseOutcome { ast: Some(ast), .. } => Ok(ast),
        ParseOutcome { diagnostics, .. } => Err(diagnostics.into_error(expr)),
    }
}

/// A parse attempt with its diagnostics, for tooling that wants to render
/// rich reports instead of a single typed error.
#[derive(Debug)]
pub struct ParseOutcome {
    pub ast: Option<Ast>,
    pub diagnostics: Diagnostics,
}

pub fn parse_to_diagnostics(expr: &str, rule: ParserRule, mode: LexerMode) -> ParseOutcome {
    let tokens = lex(expr, mode);
    let mut parser = Parser::new(expr, tokens);
    let step = match rule {
        ParserRule::ConfigValue => parser.parse_config_value(),
        ParserRule::SingleElement => parser.parse_single_element(),
    };
    match step {
        Ok(()) => {
            let (green, diagnostics) = parser.finish();
            ParseOutcome {
                ast: Some(Ast {
                    source: expr.to_owned(),
                    root: SyntaxNode::new_root(green),
                    rule,
                }),
                diagnostics,
            }
        }
        Err(_) => ParseOutcome {
            ast: None,
            diagnostics: parser.diagnostics,
        },
    }
}
