//! Grammar productions for interpolated configuration strings.
//!
//! All `parse_*` methods extend [`Parser`]. The entry points are
//! `parse_config_value` (a whole configuration string) and
//! `parse_single_element` (one value, used by `oc.decode`).
//!
//! Whitespace discipline: VALUE-mode whitespace is a significant token.
//! Leading and trailing whitespace around a sequence element is consumed
//! outside the `Element` node (so raw argument texts come out trimmed),
//! while whitespace between two bareword pieces stays inside the
//! `Primitive`.

use super::core::{ParseStep, Parser};
use super::cst::SyntaxKind::*;
use super::cst::token_sets::{DICT_KEY_TOKEN, PRIMITIVE_TOKEN, TOPLEVEL_STR};

impl Parser<'_> {
    /// `configValue := toplevel EOF`, where
    /// `toplevel := toplevelStr | (toplevelStr? (interpolation toplevelStr?)+)`.
    pub(super) fn parse_config_value(&mut self) -> ParseStep {
        self.start_node(Toplevel);
        while !self.eof() {
            match self.current() {
                kind if TOPLEVEL_STR.contains(kind) => self.parse_toplevel_str(),
                InterOpen => self.parse_interpolation()?,
                _ => return Err(self.error("unexpected token in configuration string")),
            }
        }
        self.finish_node();
        Ok(())
    }

    /// `singleElement := element EOF`.
    pub(super) fn parse_single_element(&mut self) -> ParseStep {
        self.start_node(SingleElement);
        self.parse_element()?;
        if !self.eof() {
            return Err(self.error("unexpected trailing input after the value"));
        }
        self.finish_node();
        Ok(())
    }

    /// A maximal run of literal text and escapes.
    fn parse_toplevel_str(&mut self) {
        self.start_node(ToplevelStr);
        while self.at_set(TOPLEVEL_STR) {
            self.bump();
        }
        self.finish_node();
    }

    /// `interpolation := interpolationNode | interpolationResolver`
    ///
    /// Disambiguated by scanning for a `:` at nesting depth zero before the
    /// closing `}`: node paths cannot contain colons, resolver names are
    /// always followed by one.
    fn parse_interpolation(&mut self) -> ParseStep {
        assert!(
            self.at(InterOpen),
            "parse_interpolation: expected `${{` but found {:?} (caller must check InterOpen)",
            self.current()
        );
        self.enter_recursion()?;
        let result = if self.at_resolver_interpolation() {
            self.parse_interpolation_resolver()
        } else {
            self.parse_interpolation_node()
        };
        self.exit_recursion();
        result
    }

    fn at_resolver_interpolation(&self) -> bool {
        let mut i = self.pos() + 1;
        let mut depth = 0usize;
        loop {
            match self.kind_at(i) {
                InterOpen => depth += 1,
                InterClose => {
                    if depth == 0 {
                        return false;
                    }
                    depth -= 1;
                }
                Colon if depth == 0 => return true,
                Eof => return false,
                _ => {}
            }
            i += 1;
        }
    }

    /// `interpolationNode := INTER_OPEN DOT* configKey (DOT configKey)* INTER_CLOSE`
    ///
    /// Numeric tokens are legal key segments (`${list.0}`); their text joins
    /// the path verbatim, dots included, and the container splits the joined
    /// path again. Keyword tokens are not keys: `${null.true}` is an error.
    fn parse_interpolation_node(&mut self) -> ParseStep {
        self.start_node(InterpolationNode);
        self.bump(); // `${`
        self.eat(Ws);
        let mut saw_key = false;
        loop {
            match self.current() {
                Dot => self.bump(),
                Id | Int | Float => {
                    self.start_node(ConfigKey);
                    self.bump();
                    self.finish_node();
                    saw_key = true;
                }
                InterOpen => {
                    self.start_node(ConfigKey);
                    self.parse_interpolation()?;
                    self.finish_node();
                    saw_key = true;
                }
                Ws => {
                    if self.nth(1) == InterClose {
                        self.bump();
                    } else {
                        return Err(self.error("whitespace is not allowed inside a key path"));
                    }
                }
                InterClose => break,
                Eof => return Err(self.error("expected `}` to close the interpolation")),
                Garbage => return Err(self.error("illegal character in interpolation")),
                _ => return Err(self.error("expected a config key or `}`")),
            }
        }
        if !saw_key {
            return Err(self.error("interpolation must select at least one config key"));
        }
        self.bump(); // `}`
        self.finish_node();
        Ok(())
    }

    /// `interpolationResolver := INTER_OPEN resolverName COLON sequence? INTER_CLOSE`
    fn parse_interpolation_resolver(&mut self) -> ParseStep {
        self.start_node(InterpolationResolver);
        self.bump(); // `${`
        self.eat(Ws);
        self.parse_resolver_name()?;
        self.expect(Colon, "`:` after the resolver name")?;
        if self.at(Ws) && self.nth(1) == InterClose {
            self.bump();
        }
        if !self.at(InterClose) {
            self.parse_sequence()?;
        }
        self.expect(InterClose, "`}` to close the interpolation")?;
        self.finish_node();
        Ok(())
    }

    /// `resolverName := (interpolation | ID) (DOT (interpolation | ID))*`
    ///
    /// Dots stay part of the name (`oc.dict.keys`).
    fn parse_resolver_name(&mut self) -> ParseStep {
        self.start_node(ResolverName);
        loop {
            match self.current() {
                Id => self.bump(),
                InterOpen => self.parse_interpolation()?,
                _ => return Err(self.error("expected a resolver name")),
            }
            if self.at(Dot) {
                self.bump();
                continue;
            }
            break;
        }
        self.finish_node();
        Ok(())
    }

    /// `sequence := element (COMMA element)*`
    fn parse_sequence(&mut self) -> ParseStep {
        self.start_node(Sequence);
        self.parse_element()?;
        while self.at(Comma) {
            self.bump();
            self.parse_element()?;
        }
        self.finish_node();
        Ok(())
    }

    /// `element := primitive | listValue | dictValue`, with edge whitespace
    /// consumed outside the node.
    fn parse_element(&mut self) -> ParseStep {
        while self.at(Ws) {
            self.bump();
        }
        self.start_node(Element);
        match self.current() {
            BracketOpen => self.parse_list_value()?,
            BraceOpen => self.parse_dict_value()?,
            Garbage => return Err(self.error("illegal character in interpolation")),
            _ => self.parse_primitive()?,
        }
        self.finish_node();
        while self.at(Ws) {
            self.bump();
        }
        Ok(())
    }

    /// `primitive := (QUOTED_VALUE | ID | NULL | INT | FLOAT | BOOL |
    /// UNQUOTED_CHAR | COLON | DOT | ESC | WS | interpolation)+`
    ///
    /// Trailing whitespace is left for the caller: it only stays inside the
    /// primitive when more bareword pieces follow.
    fn parse_primitive(&mut self) -> ParseStep {
        self.start_node(Primitive);
        let mut consumed = false;
        loop {
            match self.current() {
                kind if PRIMITIVE_TOKEN.contains(kind) => {
                    self.bump();
                    consumed = true;
                }
                InterOpen => {
                    self.parse_interpolation()?;
                    consumed = true;
                }
                Ws => {
                    if self.primitive_continues_after_ws() {
                        self.bump();
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        if !consumed {
            return Err(self.error("expected a value"));
        }
        self.finish_node();
        Ok(())
    }

    fn primitive_continues_after_ws(&self) -> bool {
        let mut i = self.pos();
        while self.kind_at(i) == Ws {
            i += 1;
        }
        let kind = self.kind_at(i);
        PRIMITIVE_TOKEN.contains(kind) || kind == InterOpen
    }

    /// `listValue := BRACKET_OPEN sequence? BRACKET_CLOSE`
    fn parse_list_value(&mut self) -> ParseStep {
        self.start_node(ListValue);
        self.bump(); // `[`
        while self.at(Ws) {
            self.bump();
        }
        if !self.at(BracketClose) {
            self.parse_sequence()?;
        }
        self.expect(BracketClose, "`]` to close the list")?;
        self.finish_node();
        Ok(())
    }

    /// `dictValue := BRACE_OPEN (dictEntry (COMMA dictEntry)*)? BRACE_CLOSE`
    fn parse_dict_value(&mut self) -> ParseStep {
        self.start_node(DictValue);
        self.bump(); // `{`
        while self.at(Ws) {
            self.bump();
        }
        if !self.at(BraceClose) {
            self.parse_dict_entry()?;
            while self.at(Comma) {
                self.bump();
                self.parse_dict_entry()?;
            }
        }
        self.expect(BraceClose, "`}` to close the dict")?;
        self.finish_node();
        Ok(())
    }

    /// `dictEntry := dictKey COLON element`
    fn parse_dict_entry(&mut self) -> ParseStep {
        self.start_node(DictEntry);
        while self.at(Ws) {
            self.bump();
        }
        self.parse_dict_key()?;
        while self.at(Ws) {
            self.bump();
        }
        self.expect(Colon, "`:` after the dictionary key")?;
        self.parse_element()?;
        self.finish_node();
        Ok(())
    }

    /// `dictKey := ID | NULL | INT | FLOAT | BOOL | QUOTED_VALUE | interpolation`
    ///
    /// Keys are typed (`{0: ...}` and `{null: ...}` are an int and a null
    /// key); hashability and the NaN ban are enforced by the evaluator.
    fn parse_dict_key(&mut self) -> ParseStep {
        self.start_node(DictKey);
        match self.current() {
            kind if DICT_KEY_TOKEN.contains(kind) => self.bump(),
            InterOpen => self.parse_interpolation()?,
            _ => return Err(self.error("expected a dictionary key")),
        }
        self.finish_node();
        Ok(())
    }
}
