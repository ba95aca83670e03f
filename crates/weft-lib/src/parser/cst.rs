//! Syntax kinds for the interpolation grammar.
//!
//! `SyntaxKind` serves dual roles: token kinds (from the two-mode lexer) and
//! node kinds (from the parser). `WeftLang` implements Rowan's `Language`
//! trait for tree construction.

use rowan::Language;

/// All token and node kinds. Tokens first, then nodes, then `__LAST`
/// sentinel. `#[repr(u16)]` enables the safe transmute in `kind_from_raw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum SyntaxKind {
    // --- Tokens, TOPLEVEL mode ---
    /// Literal text run without `$` or `\`.
    TopStr = 0,
    /// A lone `$` or `\` that is not part of an escape or `${`.
    TopChar,
    /// Escape run: `\\` pairs at toplevel, `\\`/`\ `/`\,` pairs in VALUE
    /// mode. Unescaping keeps every second character.
    Esc,
    /// `\${`, an escaped interpolation opener.
    EscInter,
    /// `${`; switches the lexer into VALUE mode.
    InterOpen,

    // --- Tokens, VALUE mode ---
    /// `}` closing an interpolation (mode pops).
    InterClose,
    /// `{` opening a dict literal.
    BraceOpen,
    /// `}` closing a dict literal.
    BraceClose,
    BracketOpen,
    BracketClose,
    Comma,
    Colon,
    Dot,
    /// Spaces and tabs. Significant: interior whitespace belongs to
    /// barewords, edge whitespace is trimmed by the parser.
    Ws,
    /// `null` (case-insensitive).
    Null,
    /// `true` / `false` (case-insensitive).
    Bool,
    Int,
    /// Point/exponent floats plus signed `inf`/`nan`.
    Float,
    Id,
    /// Single- or double-quoted string including its delimiters.
    /// Interpolations inside are re-parsed during evaluation.
    QuotedValue,
    /// Any bareword character outside the reserved set, Unicode included.
    UnquotedChar,
    /// Coalesced unrecognized characters (`=`, parens, stray quotes...).
    Garbage,
    /// EOF sentinel, never stored in the tree.
    Eof,

    // --- Node kinds (non-terminals) ---
    /// Root of the `configValue` rule: literal runs and interpolations.
    Toplevel,
    ToplevelStr,
    InterpolationNode,
    InterpolationResolver,
    ResolverName,
    ConfigKey,
    Sequence,
    Element,
    Primitive,
    ListValue,
    DictValue,
    DictEntry,
    DictKey,
    /// Root of the `singleElement` rule (used by `oc.decode`).
    SingleElement,

    // Must be last; used for bounds checking in `kind_from_raw`.
    #[doc(hidden)]
    __LAST,
}

use SyntaxKind::*;

impl SyntaxKind {
    #[inline]
    pub fn is_token(self) -> bool {
        self < Toplevel
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    #[inline]
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

/// Language tag for Rowan's tree types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WeftLang {}

impl Language for WeftLang {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        assert!(raw.0 < __LAST as u16);
        // SAFETY: the value is in bounds and SyntaxKind is repr(u16)
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type aliases for Rowan types parameterized by our language.
pub type SyntaxNode = rowan::SyntaxNode<WeftLang>;
pub type SyntaxToken = rowan::SyntaxToken<WeftLang>;
pub type SyntaxElement = rowan::NodeOrToken<SyntaxNode, SyntaxToken>;

/// 64-bit bitset of `SyntaxKind`s for O(1) membership testing.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TokenSet(u64);

impl TokenSet {
    /// Panics at compile time if any kind's discriminant >= 64.
    #[inline]
    pub const fn new(kinds: &[SyntaxKind]) -> Self {
        let mut bits = 0u64;
        let mut i = 0;
        while i < kinds.len() {
            let kind = kinds[i] as u16;
            assert!(kind < 64, "SyntaxKind value exceeds TokenSet capacity");
            bits |= 1 << kind;
            i += 1;
        }
        TokenSet(bits)
    }

    #[inline]
    pub const fn contains(&self, kind: SyntaxKind) -> bool {
        let kind = kind as u16;
        if kind >= 64 {
            return false;
        }
        self.0 & (1 << kind) != 0
    }

    #[inline]
    pub const fn union(self, other: TokenSet) -> TokenSet {
        TokenSet(self.0 | other.0)
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_set();
        for i in 0..64u16 {
            if self.0 & (1 << i) != 0 && i < __LAST as u16 {
                let kind: SyntaxKind = unsafe { std::mem::transmute(i) };
                list.entry(&kind);
            }
        }
        list.finish()
    }
}

/// Pre-defined token sets for the parser.
pub mod token_sets {
    use super::*;

    /// Tokens that keep a TOPLEVEL literal run going.
    pub const TOPLEVEL_STR: TokenSet = TokenSet::new(&[TopStr, TopChar, Esc, EscInter]);

    /// Tokens a bareword primitive is made of (nested `${` handled apart).
    pub const PRIMITIVE_TOKEN: TokenSet = TokenSet::new(&[
        Id,
        Null,
        Int,
        Float,
        Bool,
        UnquotedChar,
        Colon,
        Dot,
        Esc,
        QuotedValue,
    ]);

    /// FIRST set of `element`.
    pub const ELEMENT_FIRST: TokenSet =
        PRIMITIVE_TOKEN.union(TokenSet::new(&[BracketOpen, BraceOpen, InterOpen]));

    /// Tokens that may appear inside a node-interpolation key path.
    pub const PATH_TOKEN: TokenSet = TokenSet::new(&[Id, Int, Float, Dot]);

    /// Single-token dictionary keys.
    pub const DICT_KEY_TOKEN: TokenSet =
        TokenSet::new(&[Id, Null, Int, Float, Bool, QuotedValue]);
}
