//! ODIN (Object Data Instance Notation) parser.
//!
//! One parser serves every metadata-bearing section (`language`,
//! `description`, `terminology`, `annotations`) because the notation is
//! structurally identical across them, even though usage ranges from a
//! single value to a nested translation table.
//!
//! Code phrases such as `[ISO_639-1::en]` are folded into
//! [`OdinValue::String`] carrying the joined text `ISO_639-1::en`; nothing
//! downstream needs them as a distinct variant.

use crate::ast::Interval;
use crate::cursor::TokenCursor;
use crate::error::AdlResult;
use crate::lexer::{Token, TokenKind};

/// Numeric interval as written in ODIN, e.g. `|0..100|`. Integer bounds are
/// widened to `f64`.
pub type OdinInterval = Interval<f64>;

/// One parsed ODIN value.
///
/// An `OdinValue` exists only during the parse of one metadata section; the
/// archetype parser then discards it or partially copies it into typed
/// fields (e.g. [`crate::Terminology`]).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OdinValue {
    /// String literal, bare identifier, or joined code phrase.
    String(String),
    /// Integer literal.
    Integer(i64),
    /// Real literal.
    Real(f64),
    /// `True`/`False`, case-insensitive.
    Boolean(bool),
    /// Keyed block: `attribute = value` entries and `["key"] = <...>`
    /// entries, order-preserving.
    Object(Vec<(String, OdinValue)>),
    /// Comma-separated primitive list.
    List(Vec<OdinValue>),
    /// Numeric interval `|...|`.
    Interval(OdinInterval),
}

impl OdinValue {
    /// Looks up a field of an object value by name. Returns `None` for
    /// non-object values.
    pub fn get(&self, name: &str) -> Option<&OdinValue> {
        match self {
            OdinValue::Object(fields) => {
                fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// The fields of an object value, in source order.
    pub fn as_object(&self) -> Option<&[(String, OdinValue)]> {
        match self {
            OdinValue::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// The text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OdinValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value of an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            OdinValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// The value of a real, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OdinValue::Real(r) => Some(*r),
            OdinValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The value of a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OdinValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

/// Parses one ODIN value from a caller-isolated token range beginning at
/// `<` and ending at the matching top-level `>`.
///
/// Any malformed value is fatal with position info; no partial value is
/// returned.
///
/// # Examples
///
/// ```rust
/// use adl2::{parse_odin, tokenize, OdinValue};
///
/// let tokens = tokenize(r#"<name = "Test" value = 42 enabled = True>"#).unwrap();
/// let value = parse_odin(&tokens).unwrap();
/// assert_eq!(value.get("name").and_then(OdinValue::as_str), Some("Test"));
/// assert_eq!(value.get("value").and_then(OdinValue::as_i64), Some(42));
/// assert_eq!(value.get("enabled").and_then(OdinValue::as_bool), Some(true));
/// ```
pub fn parse_odin(tokens: &[Token]) -> AdlResult<OdinValue> {
    let mut cursor = TokenCursor::new(tokens);
    parse_block(&mut cursor)
}

/// `< ... >` block: empty, interval, attribute/keyed-entry sequence, or a
/// primitive list.
pub(crate) fn parse_block(cursor: &mut TokenCursor<'_>) -> AdlResult<OdinValue> {
    cursor.expect(TokenKind::LAngle)?;

    if cursor.eat(TokenKind::RAngle) {
        return Ok(OdinValue::Object(Vec::new()));
    }

    if cursor.peek_kind() == TokenKind::Pipe {
        let interval = parse_interval(cursor)?;
        cursor.expect(TokenKind::RAngle)?;
        return Ok(OdinValue::Interval(interval));
    }

    if at_attribute_entry(cursor) || at_keyed_entry(cursor) {
        let mut fields = Vec::new();
        while !cursor.eat(TokenKind::RAngle) {
            let key = if at_keyed_entry(cursor) {
                cursor.advance();
                let key = cursor.advance().text.clone();
                cursor.expect(TokenKind::RBracket)?;
                key
            } else if at_attribute_entry(cursor) {
                cursor.advance().text.clone()
            } else {
                return Err(cursor.expected("attribute name or `[\"key\"]` entry"));
            };
            cursor.expect(TokenKind::Eq)?;
            let value = parse_value(cursor)?;
            fields.push((key, value));
        }
        return Ok(OdinValue::Object(fields));
    }

    // Primitive list. A single member collapses to the bare primitive.
    let mut items = vec![parse_primitive(cursor)?];
    while cursor.eat(TokenKind::Comma) {
        // `...` continuation marker closes an open list.
        if cursor.peek_kind() == TokenKind::DotDot || cursor.peek_kind() == TokenKind::Dot {
            while cursor.eat(TokenKind::DotDot) || cursor.eat(TokenKind::Dot) {}
            break;
        }
        items.push(parse_primitive(cursor)?);
    }
    cursor.expect(TokenKind::RAngle)?;
    if items.len() == 1 {
        Ok(items.into_iter().next().unwrap_or(OdinValue::Object(Vec::new())))
    } else {
        Ok(OdinValue::List(items))
    }
}

/// True at `identifier = ...` (one-token lookahead for `=`). Section
/// keywords are accepted as attribute names here.
fn at_attribute_entry(cursor: &TokenCursor<'_>) -> bool {
    cursor.peek_kind().is_identifier_like() && cursor.peek_nth(1).kind == TokenKind::Eq
}

/// True at a keyed-list entry `["key"] = ...`. Distinguished from a code
/// phrase by the `=` after the closing bracket.
fn at_keyed_entry(cursor: &TokenCursor<'_>) -> bool {
    if cursor.peek_kind() != TokenKind::LBracket {
        return false;
    }
    let key_ok = matches!(
        cursor.peek_nth(1).kind,
        TokenKind::Str | TokenKind::IdCode | TokenKind::AtCode | TokenKind::AcCode
    ) || cursor.peek_nth(1).kind.is_identifier_like();
    key_ok
        && cursor.peek_nth(2).kind == TokenKind::RBracket
        && cursor.peek_nth(3).kind == TokenKind::Eq
}

/// Value position after `=`: nested block, interval, or primitive.
fn parse_value(cursor: &mut TokenCursor<'_>) -> AdlResult<OdinValue> {
    match cursor.peek_kind() {
        TokenKind::LAngle => parse_block(cursor),
        TokenKind::Pipe => Ok(OdinValue::Interval(parse_interval(cursor)?)),
        _ => parse_primitive(cursor),
    }
}

fn parse_primitive(cursor: &mut TokenCursor<'_>) -> AdlResult<OdinValue> {
    match cursor.peek_kind() {
        TokenKind::Str => {
            let text = cursor.advance().text.clone();
            Ok(OdinValue::String(text))
        }
        TokenKind::Integer => {
            let token = cursor.advance();
            match token.text.parse::<i64>() {
                Ok(i) => Ok(OdinValue::Integer(i)),
                Err(_) => Ok(OdinValue::String(token.text.clone())),
            }
        }
        TokenKind::Real => {
            let token = cursor.advance();
            // Version-style literals like `2.0.5` are not valid reals; keep
            // them as text.
            match token.text.parse::<f64>() {
                Ok(r) => Ok(OdinValue::Real(r)),
                Err(_) => Ok(OdinValue::String(token.text.clone())),
            }
        }
        TokenKind::LBracket => parse_code_phrase(cursor),
        kind if kind.is_identifier_like() => {
            let text = cursor.advance().text.clone();
            if text.eq_ignore_ascii_case("true") {
                Ok(OdinValue::Boolean(true))
            } else if text.eq_ignore_ascii_case("false") {
                Ok(OdinValue::Boolean(false))
            } else {
                Ok(OdinValue::String(text))
            }
        }
        _ => Err(cursor.expected("ODIN primitive value")),
    }
}

/// `[ISO_639-1::en]`: the bracketed tokens are joined into one string.
fn parse_code_phrase(cursor: &mut TokenCursor<'_>) -> AdlResult<OdinValue> {
    cursor.expect(TokenKind::LBracket)?;
    let mut text = String::new();
    while cursor.peek_kind() != TokenKind::RBracket {
        if cursor.at_end() {
            return Err(cursor.expected("`]` closing a code phrase"));
        }
        text.push_str(&cursor.advance().text);
    }
    cursor.expect(TokenKind::RBracket)?;
    Ok(OdinValue::String(text))
}

/// `|...|` interval: a leading `<` marks an exclusive lower bound, the
/// literal `undefined` marks an unbounded side, a `>` immediately before
/// the closing `|` marks an exclusive upper bound.
fn parse_interval(cursor: &mut TokenCursor<'_>) -> AdlResult<OdinInterval> {
    cursor.expect(TokenKind::Pipe)?;

    let lower_exclusive = cursor.eat(TokenKind::LAngle);
    let lower = parse_bound(cursor)?;

    let (upper, upper_exclusive) = if cursor.eat(TokenKind::DotDot) {
        let upper = parse_bound(cursor)?;
        (upper, cursor.eat(TokenKind::RAngle))
    } else {
        // Point interval |v|.
        (lower, false)
    };

    cursor.expect(TokenKind::Pipe)?;
    Ok(Interval {
        lower,
        upper,
        lower_included: !lower_exclusive,
        upper_included: !upper_exclusive,
    })
}

/// One interval bound: a number, or `undefined` for an unbounded side.
fn parse_bound(cursor: &mut TokenCursor<'_>) -> AdlResult<Option<f64>> {
    match cursor.peek_kind() {
        TokenKind::Integer | TokenKind::Real => {
            let text = cursor.advance().text.clone();
            match text.parse::<f64>() {
                Ok(bound) => Ok(Some(bound)),
                Err(_) => Err(cursor.expected("numeric interval bound")),
            }
        }
        TokenKind::Identifier if cursor.peek().text == "undefined" => {
            cursor.advance();
            Ok(None)
        }
        _ => Err(cursor.expected("numeric interval bound or `undefined`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> OdinValue {
        parse_odin(&tokenize(source).unwrap()).unwrap()
    }

    #[test]
    fn empty_block() {
        assert_eq!(parse("<>"), OdinValue::Object(Vec::new()));
    }

    #[test]
    fn attribute_sequence() {
        let value = parse(r#"<name = "Test" value = 42 enabled = True>"#);
        assert_eq!(value.get("name").and_then(OdinValue::as_str), Some("Test"));
        assert_eq!(value.get("value").and_then(OdinValue::as_i64), Some(42));
        assert_eq!(value.get("enabled").and_then(OdinValue::as_bool), Some(true));
    }

    #[test]
    fn booleans_are_case_insensitive() {
        let value = parse("<a = true b = FALSE>");
        assert_eq!(value.get("a").and_then(OdinValue::as_bool), Some(true));
        assert_eq!(value.get("b").and_then(OdinValue::as_bool), Some(false));
    }

    #[test]
    fn nested_objects() {
        let value = parse(r#"<details = <purpose = "demo" misuse = "none">>"#);
        let details = value.get("details").unwrap();
        assert_eq!(
            details.get("purpose").and_then(OdinValue::as_str),
            Some("demo")
        );
    }

    #[test]
    fn keyed_list() {
        let value = parse(
            r#"<["at0000"] = <text = "Blood pressure"> ["at0001"] = <text = "Systolic">>"#,
        );
        let first = value.get("at0000").unwrap();
        assert_eq!(
            first.get("text").and_then(OdinValue::as_str),
            Some("Blood pressure")
        );
        assert!(value.get("at0001").is_some());
    }

    #[test]
    fn section_keyword_as_attribute_name() {
        let value = parse(r#"<language = <original_language = "en">>"#);
        assert!(value.get("language").is_some());
    }

    #[test]
    fn code_phrase_joins_tokens() {
        let value = parse("<original_language = [ISO_639-1::en]>");
        assert_eq!(
            value.get("original_language").and_then(OdinValue::as_str),
            Some("ISO_639-1::en")
        );
    }

    #[test]
    fn primitive_list() {
        let value = parse(r#"<"a", "b", "c">"#);
        assert_eq!(
            value,
            OdinValue::List(vec![
                OdinValue::String("a".to_string()),
                OdinValue::String("b".to_string()),
                OdinValue::String("c".to_string()),
            ])
        );
    }

    #[test]
    fn single_primitive_collapses() {
        assert_eq!(parse(r#"<"only">"#), OdinValue::String("only".to_string()));
        assert_eq!(parse("<7>"), OdinValue::Integer(7));
        assert_eq!(parse("<-2.5>"), OdinValue::Real(-2.5));
    }

    #[test]
    fn closed_interval() {
        let value = parse("<|0..100|>");
        match value {
            OdinValue::Interval(i) => {
                assert_eq!(i.lower, Some(0.0));
                assert_eq!(i.upper, Some(100.0));
                assert!(i.lower_included);
                assert!(i.upper_included);
            }
            other => panic!("expected interval, got {:?}", other),
        }
    }

    #[test]
    fn exclusive_and_unbounded_interval() {
        let value = parse("<|<0..undefined|>");
        match value {
            OdinValue::Interval(i) => {
                assert_eq!(i.lower, Some(0.0));
                assert!(!i.lower_included);
                assert_eq!(i.upper, None);
            }
            other => panic!("expected interval, got {:?}", other),
        }
    }

    #[test]
    fn exclusive_upper_interval() {
        let value = parse("<|0..100>|>");
        match value {
            OdinValue::Interval(i) => {
                assert_eq!(i.upper, Some(100.0));
                assert!(!i.upper_included);
            }
            other => panic!("expected interval, got {:?}", other),
        }
    }

    #[test]
    fn point_interval() {
        let value = parse("<|5|>");
        match value {
            OdinValue::Interval(i) => {
                assert_eq!(i.lower, Some(5.0));
                assert_eq!(i.upper, Some(5.0));
            }
            other => panic!("expected interval, got {:?}", other),
        }
    }

    #[test]
    fn version_literal_stays_text() {
        let value = parse("<adl_version = 2.0.5>");
        assert_eq!(
            value.get("adl_version").and_then(OdinValue::as_str),
            Some("2.0.5")
        );
    }

    #[test]
    fn malformed_value_is_fatal() {
        let tokens = tokenize("<name = >").unwrap();
        assert!(parse_odin(&tokens).is_err());
        let tokens = tokenize("<|0..|>").unwrap();
        assert!(parse_odin(&tokens).is_err());
    }
}
