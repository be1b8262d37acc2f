//! Top-level archetype parser.
//!
//! Orchestrates header, identification, specialization, and section
//! dispatch, delegating section bodies to the ODIN and cADL parsers after
//! isolating each section's token range. Sections carry no closing keyword
//! of their own, so a balanced-delimiter scan that stops at the next sibling
//! section keyword *is* the section delimiter.
//!
//! Recovery policy: a missing mandatory token in the header, identifier, or
//! `specialize` clause is fatal to the whole parse. A failure inside
//! `definition` is downgraded to a warning plus a placeholder root, and
//! unsupported sections (`rules`, `annotations`, `rm_overlay`) are skipped
//! with a warning, to maximize extraction of a usable partial model.

use crate::ast::{Archetype, ArtefactKind, CComplexObject, ParseOutcome, ParseWarning, Terminology};
use crate::cadl::parse_definition;
use crate::cursor::TokenCursor;
use crate::error::{AdlError, AdlResult};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::odin::parse_odin;

/// Parses ADL2 source text in one call: tokenize plus [`parse_archetype`].
///
/// # Examples
///
/// ```rust
/// use adl2::parse;
///
/// let source = r#"
/// archetype (adl_version=2.0.5)
///     openEHR-EHR-OBSERVATION.blood_pressure.v1
///
/// definition
///     OBSERVATION[id1]
/// "#;
/// let outcome = parse(source).unwrap();
/// assert_eq!(
///     outcome.archetype.archetype_id,
///     "openEHR-EHR-OBSERVATION.blood_pressure.v1"
/// );
/// ```
pub fn parse(source: &str) -> AdlResult<ParseOutcome> {
    let tokens = tokenize(source)?;
    parse_archetype(&tokens)
}

/// Parses one archetype from a full token stream.
pub fn parse_archetype(tokens: &[Token]) -> AdlResult<ParseOutcome> {
    let mut cursor = TokenCursor::new(tokens);
    if cursor.at_end() {
        return Err(AdlError::EmptySource);
    }

    let kind = match cursor.peek_kind() {
        TokenKind::Archetype => ArtefactKind::Archetype,
        TokenKind::Template => ArtefactKind::Template,
        TokenKind::OperationalTemplate => ArtefactKind::OperationalTemplate,
        _ => {
            return Err(cursor.expected("`archetype`, `template`, or `operational_template`"));
        }
    };
    cursor.advance();

    let (adl_version, rm_release) = parse_metadata(&mut cursor)?;

    let mut archetype = Archetype::new(kind, parse_archetype_id(&mut cursor)?);
    archetype.adl_version = adl_version;
    archetype.rm_release = rm_release;

    if cursor.eat(TokenKind::Specialize) {
        archetype.parent_archetype_id = Some(parse_archetype_id(&mut cursor)?);
    }

    let mut warnings = Vec::new();
    loop {
        match cursor.peek_kind() {
            TokenKind::Language => {
                cursor.advance();
                let body = isolate_section(&mut cursor);
                archetype.original_language = Some(parse_odin(body)?);
            }
            TokenKind::Description => {
                cursor.advance();
                let body = isolate_section(&mut cursor);
                archetype.description = Some(parse_odin(body)?);
            }
            TokenKind::Terminology => {
                cursor.advance();
                let body = isolate_section(&mut cursor);
                let value = parse_odin(body)?;
                archetype.terminology = Some(Terminology::from_odin(&value));
            }
            TokenKind::Definition => {
                cursor.advance();
                let body = isolate_section(&mut cursor);
                match parse_definition(body) {
                    Ok(root) => archetype.definition = Some(root),
                    Err(err) => {
                        warnings.push(ParseWarning {
                            section: Some("definition".to_string()),
                            message: format!(
                                "definition failed to parse ({}); substituting an empty placeholder",
                                err
                            ),
                        });
                        archetype.definition = Some(CComplexObject::placeholder());
                    }
                }
            }
            TokenKind::Rules | TokenKind::Annotations | TokenKind::RmOverlay => {
                let section = cursor.advance().text.clone();
                isolate_section(&mut cursor);
                warnings.push(ParseWarning {
                    section: Some(section.clone()),
                    message: format!("unsupported section `{}` skipped", section),
                });
            }
            // Unrecognized keyword or end of input ends section dispatch.
            _ => break,
        }
    }

    Ok(ParseOutcome {
        archetype,
        warnings,
    })
}

/// Optional parenthesized `key=value; ...` header metadata. `adl_version`
/// and `rm_release` are recognized keys; others are consumed and ignored.
fn parse_metadata(cursor: &mut TokenCursor<'_>) -> AdlResult<(Option<String>, Option<String>)> {
    let mut adl_version = None;
    let mut rm_release = None;
    if !cursor.eat(TokenKind::LParen) {
        return Ok((adl_version, rm_release));
    }
    loop {
        if !cursor.peek_kind().is_identifier_like() {
            return Err(cursor.expected("metadata key"));
        }
        let key = cursor.advance().text.clone();
        cursor.expect(TokenKind::Eq)?;
        let value = match cursor.peek_kind() {
            TokenKind::Str
            | TokenKind::Integer
            | TokenKind::Real
            | TokenKind::Identifier => cursor.advance().text.clone(),
            _ => return Err(cursor.expected("metadata value")),
        };
        match key.as_str() {
            "adl_version" => adl_version = Some(value),
            "rm_release" => rm_release = Some(value),
            _ => {}
        }
        if !cursor.eat(TokenKind::Semicolon) {
            break;
        }
    }
    cursor.expect(TokenKind::RParen)?;
    Ok((adl_version, rm_release))
}

/// Dotted/hyphenated identifier assembly, e.g.
/// `openEHR-EHR-OBSERVATION.blood_pressure.v1`.
fn parse_archetype_id(cursor: &mut TokenCursor<'_>) -> AdlResult<String> {
    if !cursor.peek_kind().is_identifier_like() {
        return Err(cursor.expected("archetype identifier"));
    }
    let mut id = cursor.advance().text.clone();
    while cursor.eat(TokenKind::Dot) {
        let fragment = match cursor.peek_kind() {
            TokenKind::Integer | TokenKind::Real => cursor.advance().text.clone(),
            kind if kind.is_identifier_like() => cursor.advance().text.clone(),
            _ => return Err(cursor.expected("archetype identifier fragment")),
        };
        id.push('.');
        id.push_str(&fragment);
    }
    Ok(id)
}

/// Carves out one section's token range: everything up to the first sibling
/// section keyword seen at delimiter depth zero, or end of input.
///
/// Both angle and brace depth are tracked so the same scan serves ODIN
/// sections, the cADL definition, and skipped `rules` bodies. Angle tokens
/// inside `|...|` interval delimiters are ignored, since exclusive-bound
/// markers there are not block delimiters.
fn isolate_section<'t>(cursor: &mut TokenCursor<'t>) -> &'t [Token] {
    let remaining = cursor.remaining();
    let mut angle_depth = 0u32;
    let mut brace_depth = 0u32;
    let mut in_pipe = false;
    let mut end = remaining.len();

    for (i, token) in remaining.iter().enumerate() {
        if angle_depth == 0
            && brace_depth == 0
            && !in_pipe
            && (token.kind.is_section_keyword() || token.kind == TokenKind::Eof)
        {
            end = i;
            break;
        }
        match token.kind {
            TokenKind::Pipe => in_pipe = !in_pipe,
            TokenKind::LAngle if !in_pipe => angle_depth += 1,
            TokenKind::RAngle if !in_pipe => angle_depth = angle_depth.saturating_sub(1),
            TokenKind::LBrace => brace_depth += 1,
            TokenKind::RBrace => brace_depth = brace_depth.saturating_sub(1),
            _ => {}
        }
    }

    cursor.skip(end);
    &remaining[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CObject;
    use crate::odin::OdinValue;

    const BLOOD_PRESSURE: &str = r#"
archetype (adl_version=2.0.5; rm_release=1.0.4)
    openEHR-EHR-OBSERVATION.blood_pressure.v1

language
    <original_language = [ISO_639-1::en]>

description
    <details = <purpose = "Recording of blood pressure.">>

definition
    OBSERVATION[id1] matches {
        data matches {
            HISTORY[id2] matches {
                events matches {
                    EVENT[id3] occurrences matches {0..*} matches {
                        data matches {
                            ITEM_TREE[id4] matches {
                                items matches {
                                    ELEMENT[id5] occurrences matches {0..1}
                                }
                            }
                        }
                    }
                }
            }
        }
    }

terminology
    <term_definitions = <["en"] = <
        ["id1"] = <text = "Blood pressure" description = "The local measurement.">
        ["id5"] = <text = "Systolic">
    >>>
"#;

    #[test]
    fn full_archetype() {
        let outcome = parse(BLOOD_PRESSURE).unwrap();
        let archetype = &outcome.archetype;
        assert_eq!(archetype.kind, ArtefactKind::Archetype);
        assert_eq!(
            archetype.archetype_id,
            "openEHR-EHR-OBSERVATION.blood_pressure.v1"
        );
        assert_eq!(archetype.adl_version.as_deref(), Some("2.0.5"));
        assert_eq!(archetype.rm_release.as_deref(), Some("1.0.4"));
        assert_eq!(archetype.root_rm_type(), Some("OBSERVATION"));
        assert!(outcome.warnings.is_empty());

        let language = archetype.original_language.as_ref().unwrap();
        assert_eq!(
            language.get("original_language").and_then(OdinValue::as_str),
            Some("ISO_639-1::en")
        );

        let term = archetype.term("en", "id1").unwrap();
        assert_eq!(term.text, "Blood pressure");
        assert_eq!(term.description.as_deref(), Some("The local measurement."));
        assert_eq!(archetype.term("en", "id5").unwrap().text, "Systolic");
        assert!(archetype.term("de", "id1").is_none());
    }

    #[test]
    fn definition_tree_shape() {
        let outcome = parse(BLOOD_PRESSURE).unwrap();
        let root = outcome.archetype.definition.unwrap();
        let data = root.attribute("data").unwrap();
        let CObject::Complex(history) = &data.children()[0] else {
            panic!("expected complex child");
        };
        assert_eq!(history.node_id.as_deref(), Some("id2"));
    }

    #[test]
    fn specialization_clause() {
        let outcome = parse(
            "archetype openEHR-EHR-OBSERVATION.special.v1 \
             specialize openEHR-EHR-OBSERVATION.base.v1",
        )
        .unwrap();
        assert_eq!(
            outcome.archetype.parent_archetype_id.as_deref(),
            Some("openEHR-EHR-OBSERVATION.base.v1")
        );
    }

    #[test]
    fn template_and_operational_template_headers() {
        let outcome = parse("template openEHR-EHR-COMPOSITION.report.v1").unwrap();
        assert_eq!(outcome.archetype.kind, ArtefactKind::Template);
        let outcome = parse("operational_template openEHR-EHR-COMPOSITION.report.v1").unwrap();
        assert_eq!(outcome.archetype.kind, ArtefactKind::OperationalTemplate);
    }

    #[test]
    fn unknown_metadata_keys_are_ignored() {
        let outcome = parse(
            "archetype (adl_version=2.0.5; generated=true; uid=something) \
             openEHR-EHR-OBSERVATION.test.v1",
        )
        .unwrap();
        assert_eq!(outcome.archetype.adl_version.as_deref(), Some("2.0.5"));
    }

    #[test]
    fn unsupported_sections_warn_but_do_not_fail() {
        let outcome = parse(
            r#"
archetype openEHR-EHR-OBSERVATION.test.v1

rules
    volume: /data[id2]/items[id3]/value/magnitude

annotations
    <items = <["/data[id2]"] = <["design note"] = "internal">>>

definition
    OBSERVATION[id1]
"#,
        )
        .unwrap();
        let sections: Vec<_> = outcome
            .warnings
            .iter()
            .filter_map(|w| w.section.as_deref())
            .collect();
        assert_eq!(sections, vec!["rules", "annotations"]);
        assert_eq!(outcome.archetype.root_rm_type(), Some("OBSERVATION"));
    }

    #[test]
    fn rm_overlay_is_skipped_with_warning() {
        let outcome = parse(
            r#"
archetype openEHR-EHR-OBSERVATION.test.v1

definition
    OBSERVATION[id1]

rm_overlay
    <rm_visibility = <["/data[id2]"] = <visibility = "hidden">>>
"#,
        )
        .unwrap();
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.section.as_deref() == Some("rm_overlay")));
    }

    #[test]
    fn malformed_definition_degrades_to_placeholder() {
        let outcome = parse(
            r#"
archetype openEHR-EHR-OBSERVATION.broken.v1

definition
    OBSERVATION[id1] matches { data matches }

terminology
    <term_definitions = <["en"] = <["id1"] = <text = "Still extracted">>>>
"#,
        )
        .unwrap();
        assert_eq!(outcome.archetype.root_rm_type(), Some("ANY"));
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.section.as_deref() == Some("definition")));
        // The rest of the file is still extracted.
        assert_eq!(
            outcome.archetype.term("en", "id1").unwrap().text,
            "Still extracted"
        );
    }

    #[test]
    fn section_with_multiple_top_level_values_keeps_boundary() {
        // The boundary scan must not stop after the first balanced value:
        // the terminology keyword, not the first `>`, ends the description.
        let outcome = parse(
            r#"
archetype openEHR-EHR-OBSERVATION.test.v1

description
    <lifecycle_state = "unmanaged">

terminology
    <term_definitions = <["en"] = <["id1"] = <text = "After">>>>
"#,
        )
        .unwrap();
        assert!(outcome.archetype.description.is_some());
        assert_eq!(outcome.archetype.term("en", "id1").unwrap().text, "After");
    }

    #[test]
    fn missing_header_keyword_is_fatal() {
        assert!(matches!(
            parse("observation openEHR-EHR-OBSERVATION.test.v1"),
            Err(AdlError::Syntax { .. })
        ));
    }

    #[test]
    fn missing_identifier_is_fatal() {
        assert!(parse("archetype specialize x.y.v1").is_err());
        assert!(parse("archetype openEHR-EHR-OBSERVATION.test.v1 specialize 42").is_err());
    }

    #[test]
    fn empty_source_is_reported() {
        assert_eq!(parse(""), Err(AdlError::EmptySource));
        assert_eq!(parse("  -- just a comment\n"), Err(AdlError::EmptySource));
    }
}
