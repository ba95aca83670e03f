//! Parser state machine and low-level operations.
//!
//! Unlike resilient editors' parsers, this one is strict: the grammar exists
//! to validate configuration strings, so the first recognition failure
//! records a diagnostic and aborts via [`SyntaxAbort`]. There is no
//! recovery, no error nodes, and no trivia buffering (whitespace is a
//! significant token in VALUE mode).

use rowan::{GreenNode, GreenNodeBuilder, TextRange, TextSize};

use super::cst::{SyntaxKind, TokenSet};
use super::lexer::{Token, token_text};
use crate::diagnostics::{DiagnosticCategory, Diagnostics};

/// Marker that a diagnostic was recorded and parsing must stop.
///
/// Productions return `Result<(), SyntaxAbort>` and propagate with `?`; the
/// diagnostic itself lives in [`Parser::diagnostics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct SyntaxAbort;

pub(super) type ParseStep = Result<(), SyntaxAbort>;

/// Nested interpolations are bounded by input length, but a hostile input
/// like `${${${...}}}` should fail fast instead of overflowing the stack.
const DEFAULT_RECURSION_LIMIT: u32 = 500;

pub(super) struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    builder: GreenNodeBuilder<'static>,
    pub(super) diagnostics: Diagnostics,
    depth: u32,
    recursion_limit: u32,
}

impl<'src> Parser<'src> {
    pub(super) fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            builder: GreenNodeBuilder::new(),
            diagnostics: Diagnostics::new(),
            depth: 0,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Returns `Eof` at the end of input (acts as sentinel).
    pub(super) fn current(&self) -> SyntaxKind {
        self.nth(0)
    }

    pub(super) fn nth(&self, lookahead: usize) -> SyntaxKind {
        self.tokens
            .get(self.pos + lookahead)
            .map_or(SyntaxKind::Eof, |t| t.kind)
    }

    pub(super) fn at(&self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    pub(super) fn at_set(&self, set: TokenSet) -> bool {
        set.contains(self.current())
    }

    pub(super) fn eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Raw token stream position, used for arbitrary-distance lookahead.
    pub(super) fn pos(&self) -> usize {
        self.pos
    }

    pub(super) fn kind_at(&self, pos: usize) -> SyntaxKind {
        self.tokens.get(pos).map_or(SyntaxKind::Eof, |t| t.kind)
    }

    pub(super) fn current_span(&self) -> TextRange {
        self.tokens
            .get(self.pos)
            .map_or_else(|| TextRange::empty(self.eof_offset()), |t| t.span)
    }

    fn eof_offset(&self) -> TextSize {
        TextSize::from(self.source.len() as u32)
    }

    pub(super) fn bump(&mut self) {
        assert!(!self.eof(), "bump called at EOF");
        let token = self.tokens[self.pos];
        let text = token_text(self.source, &token);
        self.builder.token(token.kind.into(), text);
        self.pos += 1;
    }

    pub(super) fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consumes `kind` or aborts with "expected {what}".
    pub(super) fn expect(&mut self, kind: SyntaxKind, what: &str) -> ParseStep {
        if self.eat(kind) {
            return Ok(());
        }
        // A lexing error is always the better explanation.
        if self.at(SyntaxKind::Garbage) {
            return Err(self.error("illegal character in interpolation"));
        }
        Err(self.error(format!("expected {what}")))
    }

    /// Records a syntax diagnostic at the current token and returns the
    /// abort marker.
    pub(super) fn error(&mut self, message: impl Into<String>) -> SyntaxAbort {
        self.error_in(DiagnosticCategory::Syntax, message)
    }

    pub(super) fn error_in(
        &mut self,
        category: DiagnosticCategory,
        message: impl Into<String>,
    ) -> SyntaxAbort {
        let range = self.current_span();
        self.diagnostics
            .error(message, range)
            .category(category)
            .emit();
        SyntaxAbort
    }

    pub(super) fn start_node(&mut self, kind: SyntaxKind) {
        self.builder.start_node(kind.into());
    }

    pub(super) fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    pub(super) fn enter_recursion(&mut self) -> ParseStep {
        if self.depth >= self.recursion_limit {
            return Err(self.error("interpolation nesting too deep"));
        }
        self.depth += 1;
        Ok(())
    }

    pub(super) fn exit_recursion(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Finishes the tree. Caller contract: only on a successful parse, with
    /// every started node finished.
    pub(super) fn finish(self) -> (GreenNode, Diagnostics) {
        assert!(
            !self.diagnostics.has_errors(),
            "finish called after a parse error (caller must check the parse result)"
        );
        (self.builder.finish(), self.diagnostics)
    }
}
