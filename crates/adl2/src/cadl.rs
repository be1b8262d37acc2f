//! cADL (constraint ADL) parser for the `definition` section.
//!
//! Two mutually recursive routines mirror the grammar: [`parse_object`]
//! handles `TYPE[idN] occurrences matches {..} matches { attribute* }`,
//! [`parse_attribute`] handles `name existence/cardinality? matches
//! { object* | primitive }`. A structural mismatch is fatal to this parser;
//! the archetype parser catches it and substitutes a placeholder root so one
//! malformed definition does not abort extraction of the rest of the file.

use crate::ast::{
    CArchetypeSlot, CAttribute, CBoolean, CComplexObject, CComplexObjectProxy, CInteger, CObject,
    CPrimitive, CPrimitiveObject, CReal, CString, CTemporal, CTerminologyCode, Interval,
    MultiplicityInterval,
};
use crate::cursor::TokenCursor;
use crate::error::AdlResult;
use crate::lexer::{Token, TokenKind};

/// Parses the body of a `definition` section into its root complex object.
///
/// # Examples
///
/// ```rust
/// use adl2::{parse_definition, tokenize};
///
/// let tokens = tokenize("ELEMENT[id5] occurrences matches {0..1}").unwrap();
/// let root = parse_definition(&tokens).unwrap();
/// assert_eq!(root.rm_type, "ELEMENT");
/// assert_eq!(root.node_id.as_deref(), Some("id5"));
/// ```
pub fn parse_definition(tokens: &[Token]) -> AdlResult<CComplexObject> {
    let mut cursor = TokenCursor::new(tokens);
    match parse_object(&mut cursor)? {
        CObject::Complex(root) => Ok(root),
        _ => Err(cursor.expected("complex object at definition root")),
    }
}

/// One object constraint: complex object, archetype slot (`allow_archetype`),
/// or proxy (`use_node`).
pub(crate) fn parse_object(cursor: &mut TokenCursor<'_>) -> AdlResult<CObject> {
    if cursor.peek_kind() == TokenKind::Identifier {
        match cursor.peek().text.as_str() {
            "allow_archetype" => return parse_slot(cursor),
            "use_node" => return parse_proxy(cursor),
            _ => {}
        }
    }

    let rm_type = cursor.expect(TokenKind::Identifier)?.text.clone();
    let node_id = parse_node_id(cursor)?;
    let occurrences = parse_occurrences(cursor)?;

    let mut attributes = Vec::new();
    if cursor.eat(TokenKind::Matches) {
        cursor.expect(TokenKind::LBrace)?;
        while !cursor.eat(TokenKind::RBrace) {
            attributes.push(parse_attribute(cursor)?);
        }
    }

    Ok(CObject::Complex(CComplexObject {
        rm_type,
        node_id,
        occurrences,
        attributes,
    }))
}

/// One attribute constraint. `existence`/`cardinality` clauses are consumed
/// but not modelled, and the result is always single-valued: whether
/// cardinality syntax should imply a collection node is deliberately left
/// open rather than guessed.
fn parse_attribute(cursor: &mut TokenCursor<'_>) -> AdlResult<CAttribute> {
    if !cursor.peek_kind().is_identifier_like() {
        return Err(cursor.expected("attribute name"));
    }
    let rm_attribute = cursor.advance().text.clone();

    if cursor.eat(TokenKind::Existence) {
        cursor.expect(TokenKind::Matches)?;
        skip_braced_block(cursor)?;
    }
    if cursor.eat(TokenKind::Cardinality) {
        cursor.expect(TokenKind::Matches)?;
        skip_braced_block(cursor)?;
    }

    cursor.expect(TokenKind::Matches)?;
    cursor.expect(TokenKind::LBrace)?;

    let mut children = Vec::new();
    if at_primitive(cursor) {
        let constraint = parse_primitive_constraint(cursor)?;
        children.push(CObject::Primitive(CPrimitiveObject {
            rm_type: constraint.rm_type().to_string(),
            node_id: None,
            occurrences: None,
            constraint,
        }));
        cursor.expect(TokenKind::RBrace)?;
    } else {
        while !cursor.eat(TokenKind::RBrace) {
            children.push(parse_object(cursor)?);
        }
        if children.is_empty() {
            return Err(cursor.expected("at least one child object constraint"));
        }
    }

    Ok(CAttribute::Single {
        rm_attribute,
        children,
    })
}

fn parse_slot(cursor: &mut TokenCursor<'_>) -> AdlResult<CObject> {
    cursor.advance(); // allow_archetype
    let rm_type = cursor.expect(TokenKind::Identifier)?.text.clone();
    let node_id = parse_node_id(cursor)?;
    let occurrences = parse_occurrences(cursor)?;
    // Include/exclude rules inside the trailing matches block are not
    // modelled; slots own no children.
    if cursor.eat(TokenKind::Matches) {
        skip_braced_block(cursor)?;
    }
    Ok(CObject::Slot(CArchetypeSlot {
        rm_type,
        node_id,
        occurrences,
    }))
}

fn parse_proxy(cursor: &mut TokenCursor<'_>) -> AdlResult<CObject> {
    cursor.advance(); // use_node
    let rm_type = cursor.expect(TokenKind::Identifier)?.text.clone();
    let node_id = parse_node_id(cursor)?;
    let occurrences = parse_occurrences(cursor)?;
    let target_path = parse_path(cursor)?;
    Ok(CObject::Proxy(CComplexObjectProxy {
        rm_type,
        node_id,
        occurrences,
        target_path,
    }))
}

/// `[idN]` / `[atN]` after a type name.
fn parse_node_id(cursor: &mut TokenCursor<'_>) -> AdlResult<Option<String>> {
    if !cursor.eat(TokenKind::LBracket) {
        return Ok(None);
    }
    let code = match cursor.peek_kind() {
        TokenKind::IdCode | TokenKind::AtCode => cursor.advance().text.clone(),
        _ => return Err(cursor.expected("node id code")),
    };
    cursor.expect(TokenKind::RBracket)?;
    Ok(Some(code))
}

/// `occurrences matches { multiplicity }`, if present.
fn parse_occurrences(cursor: &mut TokenCursor<'_>) -> AdlResult<Option<MultiplicityInterval>> {
    if !cursor.eat(TokenKind::Occurrences) {
        return Ok(None);
    }
    cursor.expect(TokenKind::Matches)?;
    cursor.expect(TokenKind::LBrace)?;
    let interval = parse_multiplicity(cursor)?;
    cursor.expect(TokenKind::RBrace)?;
    Ok(Some(interval))
}

/// `INTEGER`, `*`, or `INTEGER .. (INTEGER | *)`. A bare integer `n` means
/// `n..n`; bare `*` means `0..unbounded`.
fn parse_multiplicity(cursor: &mut TokenCursor<'_>) -> AdlResult<MultiplicityInterval> {
    if cursor.eat(TokenKind::Star) {
        return Ok(MultiplicityInterval::unbounded());
    }
    let lower = parse_count(cursor)?;
    let interval = if cursor.eat(TokenKind::DotDot) {
        if cursor.eat(TokenKind::Star) {
            MultiplicityInterval::new(lower, None)
        } else {
            MultiplicityInterval::new(lower, Some(parse_count(cursor)?))
        }
    } else {
        MultiplicityInterval::new(lower, Some(lower))
    };
    if !interval.is_valid() {
        return Err(cursor.expected("multiplicity with lower <= upper"));
    }
    Ok(interval)
}

fn parse_count(cursor: &mut TokenCursor<'_>) -> AdlResult<u32> {
    let text = cursor.expect(TokenKind::Integer)?.text.clone();
    text.parse::<u32>()
        .map_err(|_| cursor.expected("non-negative occurrence count"))
}

/// Reference path `/data[id2]/items[id5]`.
fn parse_path(cursor: &mut TokenCursor<'_>) -> AdlResult<String> {
    if cursor.peek_kind() != TokenKind::Slash {
        return Err(cursor.expected("reference path starting with `/`"));
    }
    let mut path = String::new();
    while cursor.eat(TokenKind::Slash) {
        path.push('/');
        if cursor.peek_kind().is_identifier_like() {
            path.push_str(&cursor.advance().text);
        }
        if cursor.eat(TokenKind::LBracket) {
            let code = match cursor.peek_kind() {
                TokenKind::IdCode | TokenKind::AtCode => cursor.advance().text.clone(),
                _ => return Err(cursor.expected("node id code in path")),
            };
            cursor.expect(TokenKind::RBracket)?;
            path.push('[');
            path.push_str(&code);
            path.push(']');
        }
    }
    Ok(path)
}

/// Consumes `{ ... }` with balanced braces, discarding the content.
fn skip_braced_block(cursor: &mut TokenCursor<'_>) -> AdlResult<()> {
    cursor.expect(TokenKind::LBrace)?;
    let mut depth = 1u32;
    while depth > 0 {
        if cursor.at_end() {
            return Err(cursor.expected("`}` closing a skipped block"));
        }
        match cursor.advance().kind {
            TokenKind::LBrace => depth += 1,
            TokenKind::RBrace => depth -= 1,
            _ => {}
        }
    }
    Ok(())
}

// =============================================================================
// Primitive constraints
// =============================================================================

/// True when the next token opens a primitive constraint rather than a child
/// object. `true`/`false` identifiers are primitives; any other identifier
/// is an object type name unless it is shaped like a temporal pattern and
/// ends the block, so a bare `DV_TEXT` child stays a complex object.
fn at_primitive(cursor: &TokenCursor<'_>) -> bool {
    match cursor.peek_kind() {
        TokenKind::Str | TokenKind::Integer | TokenKind::Real | TokenKind::Pipe => true,
        TokenKind::LBracket => true,
        TokenKind::Identifier => {
            let text = &cursor.peek().text;
            text.eq_ignore_ascii_case("true")
                || text.eq_ignore_ascii_case("false")
                || (is_pattern_shaped(text)
                    && matches!(
                        cursor.peek_nth(1).kind,
                        TokenKind::RBrace | TokenKind::Comma | TokenKind::Semicolon
                    ))
        }
        _ => false,
    }
}

/// Temporal patterns (`yyyy-mm-dd`, `hh`) are lowercase; RM type names are
/// uppercase with underscores.
fn is_pattern_shaped(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_lowercase())
}

fn parse_primitive_constraint(cursor: &mut TokenCursor<'_>) -> AdlResult<CPrimitive> {
    match cursor.peek_kind() {
        TokenKind::Str => parse_string_constraint(cursor),
        TokenKind::Integer | TokenKind::Real | TokenKind::Pipe => parse_numeric_constraint(cursor),
        TokenKind::LBracket => parse_code_constraint(cursor),
        TokenKind::Identifier => {
            let text = &cursor.peek().text;
            if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false") {
                parse_boolean_constraint(cursor)
            } else {
                parse_temporal_constraint(cursor)
            }
        }
        _ => Err(cursor.expected("primitive constraint")),
    }
}

/// `"A", "B"` list, `"/pattern/"` regex, optional `; "assumed"`.
fn parse_string_constraint(cursor: &mut TokenCursor<'_>) -> AdlResult<CPrimitive> {
    let mut values = vec![cursor.expect(TokenKind::Str)?.text.clone()];
    while cursor.eat(TokenKind::Comma) {
        values.push(cursor.expect(TokenKind::Str)?.text.clone());
    }
    let assumed = if cursor.eat(TokenKind::Semicolon) {
        Some(cursor.expect(TokenKind::Str)?.text.clone())
    } else {
        None
    };

    let mut constraint = CString {
        assumed,
        ..CString::default()
    };
    let is_pattern = values.len() == 1
        && values[0].len() >= 2
        && values[0].starts_with('/')
        && values[0].ends_with('/');
    if is_pattern {
        constraint.pattern = Some(values[0][1..values[0].len() - 1].to_string());
    } else {
        constraint.list = values;
    }
    Ok(CPrimitive::String(constraint))
}

/// One lexed numeric value, kept exact until the constraint's kind is known,
/// so integer magnitudes above 2^53 never pass through `f64`.
#[derive(Clone, Copy)]
enum Number {
    Integer(i64),
    Real(f64),
}

impl Number {
    fn widen(self) -> f64 {
        match self {
            Number::Integer(i) => i as f64,
            Number::Real(r) => r,
        }
    }

    /// Exact integer value. Callers only narrow when no real token was seen,
    /// so every value is an `Integer`.
    fn narrow(self) -> i64 {
        match self {
            Number::Integer(i) => i,
            Number::Real(r) => r as i64,
        }
    }
}

/// Integer/real list, `n..m` range, or `|...|` interval, optional assumed
/// value after `;`. The constraint is integer unless any real token appears;
/// integer literals keep their exact `i64` value.
fn parse_numeric_constraint(cursor: &mut TokenCursor<'_>) -> AdlResult<CPrimitive> {
    let mut saw_real = false;
    let mut list = Vec::new();
    let mut range: Option<Interval<Number>> = None;

    if cursor.peek_kind() == TokenKind::Pipe {
        range = Some(parse_pipe_interval(cursor, &mut saw_real)?);
    } else {
        let first = parse_number(cursor, &mut saw_real)?;
        if cursor.eat(TokenKind::DotDot) {
            let upper = if cursor.eat(TokenKind::Star) {
                None
            } else {
                Some(parse_number(cursor, &mut saw_real)?)
            };
            range = Some(Interval {
                lower: Some(first),
                upper,
                lower_included: true,
                upper_included: true,
            });
        } else {
            list.push(first);
            while cursor.eat(TokenKind::Comma) {
                list.push(parse_number(cursor, &mut saw_real)?);
            }
        }
    }

    let assumed = if cursor.eat(TokenKind::Semicolon) {
        Some(parse_number(cursor, &mut saw_real)?)
    } else {
        None
    };

    if saw_real {
        Ok(CPrimitive::Real(CReal {
            list: list.into_iter().map(Number::widen).collect(),
            range: range.map(|r| Interval {
                lower: r.lower.map(Number::widen),
                upper: r.upper.map(Number::widen),
                lower_included: r.lower_included,
                upper_included: r.upper_included,
            }),
            assumed: assumed.map(Number::widen),
        }))
    } else {
        Ok(CPrimitive::Integer(CInteger {
            list: list.into_iter().map(Number::narrow).collect(),
            range: range.map(|r| Interval {
                lower: r.lower.map(Number::narrow),
                upper: r.upper.map(Number::narrow),
                lower_included: r.lower_included,
                upper_included: r.upper_included,
            }),
            assumed: assumed.map(Number::narrow),
        }))
    }
}

fn parse_number(cursor: &mut TokenCursor<'_>, saw_real: &mut bool) -> AdlResult<Number> {
    match cursor.peek_kind() {
        TokenKind::Integer => {
            let text = cursor.advance().text.clone();
            text.parse::<i64>()
                .map(Number::Integer)
                .map_err(|_| cursor.expected("integer literal"))
        }
        TokenKind::Real => {
            *saw_real = true;
            let text = cursor.advance().text.clone();
            text.parse::<f64>()
                .map(Number::Real)
                .map_err(|_| cursor.expected("real literal"))
        }
        _ => Err(cursor.expected("numeric literal")),
    }
}

/// `|0..100|` with the same bound rules as ODIN intervals.
fn parse_pipe_interval(
    cursor: &mut TokenCursor<'_>,
    saw_real: &mut bool,
) -> AdlResult<Interval<Number>> {
    cursor.expect(TokenKind::Pipe)?;
    let lower_exclusive = cursor.eat(TokenKind::LAngle);
    let lower = parse_pipe_bound(cursor, saw_real)?;
    let (upper, upper_exclusive) = if cursor.eat(TokenKind::DotDot) {
        let upper = parse_pipe_bound(cursor, saw_real)?;
        (upper, cursor.eat(TokenKind::RAngle))
    } else {
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

fn parse_pipe_bound(
    cursor: &mut TokenCursor<'_>,
    saw_real: &mut bool,
) -> AdlResult<Option<Number>> {
    match cursor.peek_kind() {
        TokenKind::Integer | TokenKind::Real => parse_number(cursor, saw_real).map(Some),
        TokenKind::Identifier if cursor.peek().text == "undefined" => {
            cursor.advance();
            Ok(None)
        }
        _ => Err(cursor.expected("numeric interval bound or `undefined`")),
    }
}

/// `True`, `False`, or `True, False`. Only listed values stay permitted.
fn parse_boolean_constraint(cursor: &mut TokenCursor<'_>) -> AdlResult<CPrimitive> {
    let mut constraint = CBoolean {
        true_valid: false,
        false_valid: false,
    };
    loop {
        let text = cursor.expect(TokenKind::Identifier)?.text.clone();
        if text.eq_ignore_ascii_case("true") {
            constraint.true_valid = true;
        } else if text.eq_ignore_ascii_case("false") {
            constraint.false_valid = true;
        } else {
            return Err(cursor.expected("`True` or `False`"));
        }
        if !cursor.eat(TokenKind::Comma) {
            break;
        }
    }
    Ok(CPrimitive::Boolean(constraint))
}

/// ISO 8601 pattern such as `yyyy-mm-dd`, kept as text.
fn parse_temporal_constraint(cursor: &mut TokenCursor<'_>) -> AdlResult<CPrimitive> {
    let pattern = cursor.expect(TokenKind::Identifier)?.text.clone();
    Ok(CPrimitive::Temporal(CTemporal {
        pattern: Some(pattern),
        list: Vec::new(),
    }))
}

/// `[ac3]`, `[at5]`, or `[at1, at2, at3]`.
fn parse_code_constraint(cursor: &mut TokenCursor<'_>) -> AdlResult<CPrimitive> {
    cursor.expect(TokenKind::LBracket)?;
    let mut codes = Vec::new();
    loop {
        match cursor.peek_kind() {
            TokenKind::AtCode | TokenKind::AcCode | TokenKind::IdCode => {
                codes.push(cursor.advance().text.clone());
            }
            _ => return Err(cursor.expected("terminology code")),
        }
        if !cursor.eat(TokenKind::Comma) {
            break;
        }
    }
    cursor.expect(TokenKind::RBracket)?;
    Ok(CPrimitive::TerminologyCode(CTerminologyCode { codes }))
}
