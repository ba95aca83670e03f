//! Two-mode lexer for interpolated configuration strings.
//!
//! TOPLEVEL mode tokenizes plain text surrounding `${...}` interpolations;
//! VALUE mode tokenizes the inside of an interpolation. Two Logos token
//! enums implement the modes, and a driver with a frame stack switches
//! between them: `${` pushes an interpolation frame, `{` inside VALUE pushes
//! a dict frame, and `}` closes the innermost frame, deciding between
//! `BraceClose` and `InterClose` (the latter may return to TOPLEVEL).
//!
//! Tokens carry spans only; text is sliced from the source on demand.
//! Unrecognized characters coalesce into single `Garbage` tokens.

use logos::Logos;
use rowan::TextRange;
use std::ops::Range;

use super::cst::SyntaxKind;

/// Lexer entry mode, mirroring the two grammar modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerMode {
    /// A configuration string: literal text with embedded `${...}`.
    Toplevel,
    /// The inside of an interpolation; used for `singleElement` parses.
    Value,
}

/// Zero-copy token: kind + span, text retrieved via [`token_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub span: TextRange,
}

impl Token {
    #[inline]
    pub fn new(kind: SyntaxKind, span: TextRange) -> Self {
        Self { kind, span }
    }
}

/// Retrieves the text slice for a token. O(1) slice into source.
#[inline]
pub fn token_text<'s>(source: &'s str, token: &Token) -> &'s str {
    &source[Range::<usize>::from(token.span)]
}

fn range_to_text_range(range: Range<usize>) -> TextRange {
    TextRange::new((range.start as u32).into(), (range.end as u32).into())
}

/// TOPLEVEL-mode tokens. Total: every character matches something, so this
/// mode cannot produce lexing errors.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum TopToken {
    #[token("${")]
    InterOpen,

    /// `\${` escaping an interpolation opener.
    #[token(r"\${")]
    EscInter,

    /// A run of `\\` pairs.
    #[regex(r"(\\\\)+")]
    Esc,

    /// Maximal run of ordinary characters.
    #[regex(r"[^$\\]+")]
    Str,

    /// A `$` or `\` that starts no escape and no interpolation.
    #[regex(r"[$\\]")]
    Char,
}

/// VALUE-mode tokens, the inside of `${...}`.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum ValueToken {
    #[token("${")]
    InterOpen,

    #[token("{")]
    BraceOpen,

    /// Closes either a dict literal or the interpolation; the driver
    /// decides from its frame stack.
    #[token("}")]
    CloseBrace,

    #[token("[")]
    BracketOpen,

    #[token("]")]
    BracketClose,

    #[token(",")]
    Comma,

    #[token(":")]
    Colon,

    #[token(".")]
    Dot,

    #[regex(r"[ \t]+")]
    Ws,

    #[regex(r"(?i)(null)", priority = 10)]
    Null,

    #[regex(r"(?i)(true|false)", priority = 10)]
    Bool,

    /// Optional sign, no leading zero, `_` only between digits.
    #[regex(r"[+-]?(0|[1-9](_?[0-9])*)", priority = 6)]
    Int,

    /// Point and exponent forms under the same leading-zero/underscore
    /// discipline (so `01e2` and `1e-02` stay barewords), plus signed
    /// case-insensitive `inf`/`nan`.
    #[regex(
        r"[+-]?(((0|[1-9](_?[0-9])*)\.([0-9](_?[0-9])*)?|\.[0-9](_?[0-9])*)([eE][+-]?(0|[1-9](_?[0-9])*))?|(0|[1-9](_?[0-9])*)[eE][+-]?(0|[1-9](_?[0-9])*)|(?i)(inf|nan))",
        priority = 7
    )]
    Float,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", priority = 4)]
    Id,

    /// Quoted string including delimiters; `\'`/`\"`/`\\` escapes pass
    /// through, and any `${...}` inside is left for the evaluator.
    #[regex(r"'([^'\\]|\\.)*'")]
    #[regex(r#""([^"\\]|\\.)*""#)]
    QuotedValue,

    /// Escaped backslash, space or comma runs inside barewords.
    #[regex(r"(\\[\\, ])+")]
    Esc,

    /// Any other code point, Unicode included. The reserved set
    /// (structural characters, quotes, `=`, whitespace) matches nothing
    /// and surfaces as a lexing error.
    #[regex(r#"[^{}\[\](),:.=\\'" \t\r\n]"#, priority = 1)]
    UnquotedChar,
}

fn map_top(token: TopToken) -> SyntaxKind {
    match token {
        TopToken::InterOpen => SyntaxKind::InterOpen,
        TopToken::EscInter => SyntaxKind::EscInter,
        TopToken::Esc => SyntaxKind::Esc,
        TopToken::Str => SyntaxKind::TopStr,
        TopToken::Char => SyntaxKind::TopChar,
    }
}

fn map_value(token: ValueToken) -> SyntaxKind {
    match token {
        ValueToken::InterOpen => SyntaxKind::InterOpen,
        ValueToken::BraceOpen => SyntaxKind::BraceOpen,
        // CloseBrace is resolved by the driver.
        ValueToken::CloseBrace => SyntaxKind::BraceClose,
        ValueToken::BracketOpen => SyntaxKind::BracketOpen,
        ValueToken::BracketClose => SyntaxKind::BracketClose,
        ValueToken::Comma => SyntaxKind::Comma,
        ValueToken::Colon => SyntaxKind::Colon,
        ValueToken::Dot => SyntaxKind::Dot,
        ValueToken::Ws => SyntaxKind::Ws,
        ValueToken::Null => SyntaxKind::Null,
        ValueToken::Bool => SyntaxKind::Bool,
        ValueToken::Int => SyntaxKind::Int,
        ValueToken::Float => SyntaxKind::Float,
        ValueToken::Id => SyntaxKind::Id,
        ValueToken::QuotedValue => SyntaxKind::QuotedValue,
        ValueToken::Esc => SyntaxKind::Esc,
        ValueToken::UnquotedChar => SyntaxKind::UnquotedChar,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    /// Opened by `${`; its `}` is `InterClose`.
    Inter,
    /// Opened by `{` inside VALUE mode; its `}` is `BraceClose`.
    Brace,
}

enum ModeLexer<'s> {
    Top(logos::Lexer<'s, TopToken>),
    Value(logos::Lexer<'s, ValueToken>),
}

/// Tokenizes `source` starting in `mode`.
pub fn lex(source: &str, mode: LexerMode) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut frames: Vec<Frame> = Vec::new();
    let mut error_start: Option<usize> = None;

    let mut lexer = match mode {
        LexerMode::Toplevel => ModeLexer::Top(TopToken::lexer(source)),
        LexerMode::Value => ModeLexer::Value(ValueToken::lexer(source)),
    };

    loop {
        lexer = match lexer {
            ModeLexer::Top(mut top) => match top.next() {
                None => break,
                Some(Ok(token)) => {
                    let span = range_to_text_range(top.span());
                    tokens.push(Token::new(map_top(token), span));
                    if token == TopToken::InterOpen {
                        frames.push(Frame::Inter);
                        ModeLexer::Value(top.morph())
                    } else {
                        ModeLexer::Top(top)
                    }
                }
                // TOPLEVEL tokens cover every character.
                Some(Err(())) => unreachable!("toplevel lexer is total"),
            },
            ModeLexer::Value(mut value) => match value.next() {
                None => {
                    flush_garbage(&mut tokens, &mut error_start, source.len());
                    break;
                }
                Some(Ok(token)) => {
                    flush_garbage(&mut tokens, &mut error_start, value.span().start);
                    let span = range_to_text_range(value.span());
                    match token {
                        ValueToken::InterOpen => {
                            frames.push(Frame::Inter);
                            tokens.push(Token::new(SyntaxKind::InterOpen, span));
                            ModeLexer::Value(value)
                        }
                        ValueToken::BraceOpen => {
                            frames.push(Frame::Brace);
                            tokens.push(Token::new(SyntaxKind::BraceOpen, span));
                            ModeLexer::Value(value)
                        }
                        ValueToken::CloseBrace => match frames.pop() {
                            Some(Frame::Brace) => {
                                tokens.push(Token::new(SyntaxKind::BraceClose, span));
                                ModeLexer::Value(value)
                            }
                            Some(Frame::Inter) => {
                                tokens.push(Token::new(SyntaxKind::InterClose, span));
                                if frames.is_empty() && mode == LexerMode::Toplevel {
                                    ModeLexer::Top(value.morph())
                                } else {
                                    ModeLexer::Value(value)
                                }
                            }
                            // `}` in a bare VALUE-mode parse with nothing
                            // open; the parser reports it.
                            None => {
                                tokens.push(Token::new(SyntaxKind::BraceClose, span));
                                ModeLexer::Value(value)
                            }
                        },
                        other => {
                            tokens.push(Token::new(map_value(other), span));
                            ModeLexer::Value(value)
                        }
                    }
                }
                Some(Err(())) => {
                    if error_start.is_none() {
                        error_start = Some(value.span().start);
                    }
                    ModeLexer::Value(value)
                }
            },
        }
    }

    tokens
}

fn flush_garbage(tokens: &mut Vec<Token>, error_start: &mut Option<usize>, end: usize) {
    if let Some(start) = error_start.take() {
        tokens.push(Token::new(
            SyntaxKind::Garbage,
            range_to_text_range(start..end),
        ));
    }
}
