//! ADL2 text rendering.
//!
//! [`serialize`] renders an [`Archetype`] back into ADL2 text sufficient for
//! re-parsing into an equivalent tree. Output is normalized, not
//! byte-faithful: re-parsing preserves the archetype id, ADL version, and
//! root RM type rather than the original formatting.

use std::fmt::Write as _;

use crate::ast::{
    Archetype, CAttribute, CComplexObject, CObject, CPrimitive, Interval, Terminology,
};
use crate::odin::OdinValue;

/// Rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeConfig {
    /// Spaces per nesting level.
    pub indent_width: usize,
}

impl Default for SerializeConfig {
    fn default() -> Self {
        SerializeConfig { indent_width: 4 }
    }
}

/// Renders an archetype as ADL2 text.
///
/// # Examples
///
/// ```rust
/// use adl2::{parse, serialize, SerializeConfig};
///
/// let source = "archetype (adl_version=2.0.5)\n    openEHR-EHR-OBSERVATION.demo.v1\n\ndefinition\n    OBSERVATION[id1]\n";
/// let first = parse(source).unwrap().archetype;
/// let second = parse(&serialize(&first, &SerializeConfig::default()))
///     .unwrap()
///     .archetype;
/// assert_eq!(first.archetype_id, second.archetype_id);
/// assert_eq!(first.root_rm_type(), second.root_rm_type());
/// ```
pub fn serialize(archetype: &Archetype, config: &SerializeConfig) -> String {
    let mut out = String::new();

    write!(out, "{}", archetype.kind).ok();
    let mut metadata = Vec::new();
    if let Some(version) = &archetype.adl_version {
        metadata.push(format!("adl_version={}", version));
    }
    if let Some(release) = &archetype.rm_release {
        metadata.push(format!("rm_release={}", release));
    }
    if !metadata.is_empty() {
        write!(out, " ({})", metadata.join("; ")).ok();
    }
    out.push('\n');
    indent(&mut out, config, 1);
    out.push_str(&archetype.archetype_id);
    out.push('\n');

    if let Some(parent) = &archetype.parent_archetype_id {
        out.push_str("\nspecialize\n");
        indent(&mut out, config, 1);
        out.push_str(parent);
        out.push('\n');
    }

    if let Some(language) = &archetype.original_language {
        out.push_str("\nlanguage\n");
        indent(&mut out, config, 1);
        write_odin(&mut out, language, config, 1);
        out.push('\n');
    }

    if let Some(description) = &archetype.description {
        out.push_str("\ndescription\n");
        indent(&mut out, config, 1);
        write_odin(&mut out, description, config, 1);
        out.push('\n');
    }

    if let Some(definition) = &archetype.definition {
        out.push_str("\ndefinition\n");
        indent(&mut out, config, 1);
        write_complex(&mut out, definition, config, 1);
        out.push('\n');
    }

    if let Some(terminology) = &archetype.terminology {
        out.push_str("\nterminology\n");
        write_terminology(&mut out, terminology, config);
    }

    out
}

fn indent(out: &mut String, config: &SerializeConfig, level: usize) {
    for _ in 0..config.indent_width * level {
        out.push(' ');
    }
}

// =============================================================================
// ODIN rendering
// =============================================================================

fn write_odin(out: &mut String, value: &OdinValue, config: &SerializeConfig, level: usize) {
    match value {
        OdinValue::String(s) => {
            out.push('"');
            out.push_str(&escape(s));
            out.push('"');
        }
        OdinValue::Integer(i) => {
            write!(out, "{}", i).ok();
        }
        OdinValue::Real(r) => {
            write!(out, "{:?}", r).ok();
        }
        OdinValue::Boolean(true) => out.push_str("True"),
        OdinValue::Boolean(false) => out.push_str("False"),
        OdinValue::Object(fields) if fields.is_empty() => out.push_str("<>"),
        OdinValue::Object(fields) => {
            out.push_str("<\n");
            for (key, field) in fields {
                indent(out, config, level + 1);
                write_odin_key(out, key);
                out.push_str(" = ");
                write_odin(out, field, config, level + 1);
                out.push('\n');
            }
            indent(out, config, level);
            out.push('>');
        }
        OdinValue::List(items) => {
            out.push('<');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_odin(out, item, config, level);
            }
            out.push('>');
        }
        OdinValue::Interval(interval) => write_interval(out, interval),
    }
}

/// Keys that re-lex as a single identifier render bare; everything else
/// (codes like `at0000`, locale tags like `en-GB` split by the lexer, keys
/// with other characters) uses the quoted keyed-entry form.
fn write_odin_key(out: &mut String, key: &str) {
    if is_bare_key(key) {
        out.push_str(key);
    } else {
        out.push_str("[\"");
        out.push_str(&escape(key));
        out.push_str("\"]");
    }
}

fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    let leading_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if !leading_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }
    // Code-shaped keys would re-lex as code tokens, not identifiers.
    for prefix in ["id", "at", "ac"] {
        if let Some(rest) = key.strip_prefix(prefix) {
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                return false;
            }
        }
    }
    true
}

fn write_interval(out: &mut String, interval: &Interval<f64>) {
    out.push('|');
    if !interval.lower_included && interval.lower.is_some() {
        out.push('<');
    }
    match interval.lower {
        Some(lower) => {
            write!(out, "{}", trim_real(lower)).ok();
        }
        None => out.push_str("undefined"),
    }
    out.push_str("..");
    match interval.upper {
        Some(upper) => {
            write!(out, "{}", trim_real(upper)).ok();
        }
        None => out.push_str("undefined"),
    }
    if !interval.upper_included && interval.upper.is_some() {
        out.push('>');
    }
    out.push('|');
}

/// Whole-valued reals render without a fractional part so integer intervals
/// survive a round trip.
fn trim_real(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:?}", value)
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

// =============================================================================
// cADL rendering
// =============================================================================

fn write_complex(out: &mut String, object: &CComplexObject, config: &SerializeConfig, level: usize) {
    out.push_str(&object.rm_type);
    if let Some(node_id) = &object.node_id {
        write!(out, "[{}]", node_id).ok();
    }
    if let Some(occurrences) = &object.occurrences {
        write!(out, " occurrences matches {{{}}}", occurrences).ok();
    }
    if !object.attributes.is_empty() {
        out.push_str(" matches {\n");
        for attribute in &object.attributes {
            indent(out, config, level + 1);
            write_attribute(out, attribute, config, level + 1);
            out.push('\n');
        }
        indent(out, config, level);
        out.push('}');
    }
}

fn write_attribute(out: &mut String, attribute: &CAttribute, config: &SerializeConfig, level: usize) {
    out.push_str(attribute.rm_attribute());
    if let CAttribute::Multiple { cardinality, .. } = attribute {
        write!(out, " cardinality matches {{{}}}", cardinality).ok();
    }
    out.push_str(" matches {");
    let children = attribute.children();
    if let [CObject::Primitive(primitive)] = children {
        write_primitive(out, &primitive.constraint);
        out.push('}');
        return;
    }
    out.push('\n');
    for child in children {
        indent(out, config, level + 1);
        write_object(out, child, config, level + 1);
        out.push('\n');
    }
    indent(out, config, level);
    out.push('}');
}

fn write_object(out: &mut String, object: &CObject, config: &SerializeConfig, level: usize) {
    match object {
        CObject::Complex(complex) => write_complex(out, complex, config, level),
        CObject::Primitive(primitive) => write_primitive(out, &primitive.constraint),
        CObject::Slot(slot) => {
            out.push_str("allow_archetype ");
            out.push_str(&slot.rm_type);
            if let Some(node_id) = &slot.node_id {
                write!(out, "[{}]", node_id).ok();
            }
            if let Some(occurrences) = &slot.occurrences {
                write!(out, " occurrences matches {{{}}}", occurrences).ok();
            }
        }
        CObject::Proxy(proxy) => {
            out.push_str("use_node ");
            out.push_str(&proxy.rm_type);
            if let Some(node_id) = &proxy.node_id {
                write!(out, "[{}]", node_id).ok();
            }
            if let Some(occurrences) = &proxy.occurrences {
                write!(out, " occurrences matches {{{}}}", occurrences).ok();
            }
            out.push(' ');
            out.push_str(&proxy.target_path);
        }
    }
}

fn write_primitive(out: &mut String, constraint: &CPrimitive) {
    match constraint {
        CPrimitive::String(c) => {
            if let Some(pattern) = &c.pattern {
                write!(out, "\"/{}/\"", escape(pattern)).ok();
            } else {
                for (i, value) in c.list.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write!(out, "\"{}\"", escape(value)).ok();
                }
            }
            if let Some(assumed) = &c.assumed {
                write!(out, "; \"{}\"", escape(assumed)).ok();
            }
        }
        CPrimitive::Integer(c) => {
            if let Some(range) = &c.range {
                write_numeric_range(
                    out,
                    &Interval {
                        lower: range.lower.map(|v| v as f64),
                        upper: range.upper.map(|v| v as f64),
                        lower_included: range.lower_included,
                        upper_included: range.upper_included,
                    },
                );
            } else {
                for (i, value) in c.list.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write!(out, "{}", value).ok();
                }
            }
            if let Some(assumed) = c.assumed {
                write!(out, "; {}", assumed).ok();
            }
        }
        CPrimitive::Real(c) => {
            if let Some(range) = &c.range {
                write_real_range(out, range);
            } else {
                for (i, value) in c.list.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write!(out, "{:?}", value).ok();
                }
            }
            if let Some(assumed) = c.assumed {
                write!(out, "; {:?}", assumed).ok();
            }
        }
        CPrimitive::Boolean(c) => {
            let mut values = Vec::new();
            if c.true_valid {
                values.push("True");
            }
            if c.false_valid {
                values.push("False");
            }
            out.push_str(&values.join(", "));
        }
        CPrimitive::Temporal(c) => {
            if let Some(pattern) = &c.pattern {
                out.push_str(pattern);
            } else {
                for (i, value) in c.list.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(value);
                }
            }
        }
        CPrimitive::TerminologyCode(c) => {
            out.push('[');
            out.push_str(&c.codes.join(", "));
            out.push(']');
        }
    }
}

/// An all-inclusive bounded range renders as bare `l..u`; anything with
/// exclusive or unbounded sides needs the pipe form.
fn write_numeric_range(out: &mut String, range: &Interval<f64>) {
    let plain = range.lower_included
        && range.upper_included
        && range.lower.is_some()
        && range.upper.is_some();
    if plain {
        write!(
            out,
            "{}..{}",
            trim_real(range.lower.unwrap_or(0.0)),
            trim_real(range.upper.unwrap_or(0.0))
        )
        .ok();
    } else {
        write_interval(out, range);
    }
}

/// Real-constraint ranges keep the fractional form on whole-valued bounds
/// so the text re-lexes as real literals, not integers.
fn write_real_range(out: &mut String, range: &Interval<f64>) {
    out.push('|');
    if !range.lower_included && range.lower.is_some() {
        out.push('<');
    }
    match range.lower {
        Some(lower) => {
            write!(out, "{:?}", lower).ok();
        }
        None => out.push_str("undefined"),
    }
    out.push_str("..");
    match range.upper {
        Some(upper) => {
            write!(out, "{:?}", upper).ok();
        }
        None => out.push_str("undefined"),
    }
    if !range.upper_included && range.upper.is_some() {
        out.push('>');
    }
    out.push('|');
}

// =============================================================================
// Terminology rendering
// =============================================================================

fn write_terminology(out: &mut String, terminology: &Terminology, config: &SerializeConfig) {
    indent(out, config, 1);
    out.push_str("<\n");
    indent(out, config, 2);
    out.push_str("term_definitions = <\n");
    for (language, terms) in &terminology.term_definitions {
        indent(out, config, 3);
        write_odin_key(out, language);
        out.push_str(" = <\n");
        for (code, term) in terms {
            indent(out, config, 4);
            write_odin_key(out, code);
            write!(out, " = <text = \"{}\"", escape(&term.text)).ok();
            if let Some(description) = &term.description {
                write!(out, " description = \"{}\"", escape(description)).ok();
            }
            out.push_str(">\n");
        }
        indent(out, config, 3);
        out.push_str(">\n");
    }
    indent(out, config, 2);
    out.push_str(">\n");
    indent(out, config, 1);
    out.push_str(">\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::parse;

    #[test]
    fn bare_and_keyed_odin_keys() {
        assert!(is_bare_key("purpose"));
        assert!(is_bare_key("en"));
        assert!(is_bare_key("idiom"));
        assert!(!is_bare_key("at0000"));
        assert!(!is_bare_key("id1"));
        assert!(!is_bare_key("en-GB"));
        assert!(!is_bare_key("design note"));
    }

    #[test]
    fn integer_interval_renders_without_fraction() {
        let mut out = String::new();
        write_interval(&mut out, &Interval::bounded(0.0, 100.0));
        assert_eq!(out, "|0..100|");
    }

    #[test]
    fn exclusive_and_unbounded_interval_markers() {
        let mut out = String::new();
        write_interval(
            &mut out,
            &Interval {
                lower: Some(0.5),
                upper: None,
                lower_included: false,
                upper_included: true,
            },
        );
        assert_eq!(out, "|<0.5..undefined|");
    }

    #[test]
    fn real_range_bounds_keep_their_fraction() {
        let source = "archetype openEHR-EHR-OBSERVATION.qty.v1\n\ndefinition\n    DV_QUANTITY[id1] matches { magnitude matches {|0.0..1000.0|} }";
        let first = parse(source).unwrap().archetype;
        let rendered = serialize(&first, &SerializeConfig::default());
        // A `|0..1000|` rendering would re-parse as an integer constraint.
        assert!(rendered.contains("|0.0..1000.0|"), "rendered:\n{}", rendered);
        let second = parse(&rendered).unwrap().archetype;
        assert_eq!(first.definition, second.definition);
    }

    #[test]
    fn indent_width_is_honored() {
        let source = "archetype openEHR-EHR-OBSERVATION.demo.v1\n\ndefinition\n    OBSERVATION[id1] matches { data matches { HISTORY[id2] } }";
        let archetype = parse(source).unwrap().archetype;
        let two = serialize(&archetype, &SerializeConfig { indent_width: 2 });
        assert!(two.contains("\n  OBSERVATION[id1]"));
        let eight = serialize(&archetype, &SerializeConfig { indent_width: 8 });
        assert!(eight.contains("\n        OBSERVATION[id1]"));
    }
}
