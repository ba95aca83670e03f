//! Typed AST wrappers over CST nodes.
//!
//! Each struct wraps a `SyntaxNode` and provides typed accessors; the
//! tagged enums (`Part`, `Interpolation`, `Element`, ...) are what the
//! evaluator pattern-matches on. Casts are infallible for the right
//! `SyntaxKind`; structural validation already happened in the parser.

use super::cst::{SyntaxKind, SyntaxNode, SyntaxToken};

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl $name {
            pub fn cast(node: SyntaxNode) -> Option<Self> {
                (node.kind() == SyntaxKind::$kind).then(|| Self(node))
            }

            pub fn as_cst(&self) -> &SyntaxNode {
                &self.0
            }

            /// Verbatim source text of this node.
            pub fn raw_text(&self) -> String {
                self.0.text().to_string()
            }
        }
    };
}

ast_node!(Toplevel, Toplevel);
ast_node!(ToplevelStr, ToplevelStr);
ast_node!(InterpolationNode, InterpolationNode);
ast_node!(InterpolationResolver, InterpolationResolver);
ast_node!(ResolverName, ResolverName);
ast_node!(ConfigKey, ConfigKey);
ast_node!(Sequence, Sequence);
ast_node!(Element, Element);
ast_node!(Primitive, Primitive);
ast_node!(ListValue, ListValue);
ast_node!(DictValue, DictValue);
ast_node!(DictEntry, DictEntry);
ast_node!(DictKeyNode, DictKey);
ast_node!(SingleElement, SingleElement);

/// One part of a toplevel string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Part {
    Str(ToplevelStr),
    Interpolation(Interpolation),
}

impl Part {
    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::ToplevelStr => ToplevelStr::cast(node).map(Part::Str),
            _ => Interpolation::cast(node).map(Part::Interpolation),
        }
    }
}

/// `${dotted.path}` or `${name:args}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Interpolation {
    Node(InterpolationNode),
    Resolver(InterpolationResolver),
}

impl Interpolation {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::InterpolationNode => {
                InterpolationNode::cast(node).map(Interpolation::Node)
            }
            SyntaxKind::InterpolationResolver => {
                InterpolationResolver::cast(node).map(Interpolation::Resolver)
            }
            _ => None,
        }
    }

    pub fn as_cst(&self) -> &SyntaxNode {
        match self {
            Interpolation::Node(n) => n.as_cst(),
            Interpolation::Resolver(n) => n.as_cst(),
        }
    }

    pub fn raw_text(&self) -> String {
        self.as_cst().text().to_string()
    }
}

impl Toplevel {
    pub fn parts(&self) -> impl Iterator<Item = Part> + '_ {
        self.0.children().filter_map(Part::cast)
    }
}

impl ToplevelStr {
    /// The literal/escape tokens making up this run.
    pub fn tokens(&self) -> impl Iterator<Item = SyntaxToken> + '_ {
        self.0
            .children_with_tokens()
            .filter_map(|child| child.into_token())
    }
}

/// One step of a node-interpolation key path, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathPart {
    /// A literal `.` separator (or leading relative dot).
    Dot(SyntaxToken),
    Key(ConfigKey),
}

impl InterpolationNode {
    pub fn path_parts(&self) -> impl Iterator<Item = PathPart> + '_ {
        self.0.children_with_tokens().filter_map(|child| match child {
            rowan::NodeOrToken::Token(token) if token.kind() == SyntaxKind::Dot => {
                Some(PathPart::Dot(token))
            }
            rowan::NodeOrToken::Node(node) => ConfigKey::cast(node).map(PathPart::Key),
            _ => None,
        })
    }
}

impl ConfigKey {
    /// The key token, for plain segments (`Id`, `Int`, `Float`).
    pub fn token(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|child| child.into_token())
            .next()
    }

    /// The nested interpolation, for computed segments.
    pub fn interpolation(&self) -> Option<Interpolation> {
        self.0.children().find_map(Interpolation::cast)
    }
}

/// One piece of a resolver name, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamePart {
    /// An `Id` or `Dot` token; its text joins the name verbatim.
    Token(SyntaxToken),
    Interpolation(Interpolation),
}

impl InterpolationResolver {
    pub fn name(&self) -> Option<ResolverName> {
        self.0.children().find_map(ResolverName::cast)
    }

    pub fn args(&self) -> Option<Sequence> {
        self.0.children().find_map(Sequence::cast)
    }
}

impl ResolverName {
    pub fn parts(&self) -> impl Iterator<Item = NamePart> + '_ {
        self.0.children_with_tokens().filter_map(|child| match child {
            rowan::NodeOrToken::Token(token)
                if matches!(token.kind(), SyntaxKind::Id | SyntaxKind::Dot) =>
            {
                Some(NamePart::Token(token))
            }
            rowan::NodeOrToken::Node(node) => {
                Interpolation::cast(node).map(NamePart::Interpolation)
            }
            _ => None,
        })
    }
}

impl Sequence {
    pub fn elements(&self) -> impl Iterator<Item = Element> + '_ {
        self.0.children().filter_map(Element::cast)
    }
}

/// The three shapes an element can take.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementContent {
    Primitive(Primitive),
    List(ListValue),
    Dict(DictValue),
}

impl Element {
    pub fn content(&self) -> Option<ElementContent> {
        self.0.children().find_map(|node| match node.kind() {
            SyntaxKind::Primitive => Primitive::cast(node).map(ElementContent::Primitive),
            SyntaxKind::ListValue => ListValue::cast(node).map(ElementContent::List),
            SyntaxKind::DictValue => DictValue::cast(node).map(ElementContent::Dict),
            _ => None,
        })
    }
}

/// One piece of a bareword primitive, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrimitivePiece {
    Token(SyntaxToken),
    Interpolation(Interpolation),
}

impl Primitive {
    pub fn pieces(&self) -> impl Iterator<Item = PrimitivePiece> + '_ {
        self.0.children_with_tokens().filter_map(|child| match child {
            rowan::NodeOrToken::Token(token) => Some(PrimitivePiece::Token(token)),
            rowan::NodeOrToken::Node(node) => {
                Interpolation::cast(node).map(PrimitivePiece::Interpolation)
            }
        })
    }
}

impl ListValue {
    pub fn sequence(&self) -> Option<Sequence> {
        self.0.children().find_map(Sequence::cast)
    }
}

impl DictValue {
    pub fn entries(&self) -> impl Iterator<Item = DictEntry> + '_ {
        self.0.children().filter_map(DictEntry::cast)
    }
}

impl DictEntry {
    pub fn key(&self) -> Option<DictKeyNode> {
        self.0.children().find_map(DictKeyNode::cast)
    }

    pub fn value(&self) -> Option<Element> {
        self.0.children().find_map(Element::cast)
    }
}

impl DictKeyNode {
    pub fn token(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|child| child.into_token())
            .next()
    }

    pub fn interpolation(&self) -> Option<Interpolation> {
        self.0.children().find_map(Interpolation::cast)
    }
}

impl SingleElement {
    pub fn element(&self) -> Option<Element> {
        self.0.children().find_map(Element::cast)
    }
}
