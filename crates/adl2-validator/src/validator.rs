//! The validation engine.
//!
//! Depth-first, lock-step traversal of a data instance against a parsed
//! constraint tree, keyed by attribute name. Every data/constraint mismatch
//! becomes a [`ValidationMessage`]; the engine never panics and never
//! returns an error for bad data. Only a missing root definition produces a
//! top-level `structure` error.

use adl2::{
    Archetype, CAttribute, CComplexObject, CObject, CPrimitive, CPrimitiveObject, Interval,
};
use regex::Regex;

use crate::config::ValidatorConfig;
use crate::data::{DataObject, DataValue};
use crate::report::{ConstraintKind, Severity, ValidationMessage, ValidationReport};
use crate::rm::{rules_for, terse_matches, RmRule};
use crate::traits::{RmTypeRegistry, UnitService, UnitStatus};
use crate::units::FallbackUnitService;

/// Validates data instances against parsed archetypes.
///
/// Construction wires in the external dependencies once; `validate` is then
/// free of shared mutable state and may be called repeatedly.
///
/// # Example
///
/// ```rust
/// use adl2::parse;
/// use adl2_validator::{ArchetypeValidator, DataObject, DataValue, ValidatorConfig};
///
/// let source = "archetype openEHR-EHR-OBSERVATION.demo.v1\n\
///               definition\n    ELEMENT[id1] matches { value matches {0..100} }";
/// let archetype = parse(source).unwrap().archetype;
///
/// let instance = DataValue::Object(
///     DataObject::typed("ELEMENT").with_field("value", DataValue::Integer(42)),
/// );
/// let validator = ArchetypeValidator::new(ValidatorConfig::default());
/// assert!(validator.validate(&instance, &archetype).valid());
/// ```
pub struct ArchetypeValidator {
    config: ValidatorConfig,
    unit_service: Box<dyn UnitService>,
    type_registry: Option<Box<dyn RmTypeRegistry>>,
}

impl ArchetypeValidator {
    /// Creates a validator with the built-in fallback unit service.
    pub fn new(config: ValidatorConfig) -> Self {
        ArchetypeValidator {
            config,
            unit_service: Box::new(FallbackUnitService::new()),
            type_registry: None,
        }
    }

    /// Replaces the unit service. The host is expected to have
    /// `initialize`d it already.
    pub fn with_unit_service(mut self, service: Box<dyn UnitService>) -> Self {
        self.unit_service = service;
        self
    }

    /// Wires in a reference-model type registry.
    pub fn with_type_registry(mut self, registry: Box<dyn RmTypeRegistry>) -> Self {
        self.type_registry = Some(registry);
        self
    }

    /// Validates one data instance against an archetype's definition.
    pub fn validate(&self, instance: &DataValue, archetype: &Archetype) -> ValidationReport {
        let mut walk = Walk {
            config: &self.config,
            unit_service: self.unit_service.as_ref(),
            type_registry: self.type_registry.as_deref(),
            report: ValidationReport::new(),
            depth_warned: false,
            halted: false,
        };

        match &archetype.definition {
            Some(definition) => walk.complex(instance, definition, "/", 0),
            None => walk.push(
                Severity::Error,
                ConstraintKind::Structure,
                "/",
                "archetype has no definition to validate against".to_string(),
            ),
        }

        walk.report
    }
}

/// One traversal: owns the message bundle being built.
struct Walk<'a> {
    config: &'a ValidatorConfig,
    unit_service: &'a dyn UnitService,
    type_registry: Option<&'a dyn RmTypeRegistry>,
    report: ValidationReport,
    depth_warned: bool,
    halted: bool,
}

impl Walk<'_> {
    fn push(&mut self, severity: Severity, kind: ConstraintKind, path: &str, text: String) {
        self.report.push(ValidationMessage {
            path: path.to_string(),
            text,
            severity,
            kind,
        });
        if severity == Severity::Error && self.config.fail_fast {
            self.halted = true;
        }
    }

    fn error(&mut self, kind: ConstraintKind, path: &str, text: String) {
        self.push(Severity::Error, kind, path, text);
    }

    fn warning(&mut self, kind: ConstraintKind, path: &str, text: String) {
        self.push(Severity::Warning, kind, path, text);
    }

    fn object(&mut self, data: &DataValue, constraint: &CObject, path: &str, depth: usize) {
        if self.halted {
            return;
        }
        if depth > self.config.max_depth {
            if !self.depth_warned {
                self.warning(
                    ConstraintKind::Depth,
                    path,
                    format!("traversal aborted beyond depth {}", self.config.max_depth),
                );
            }
            self.depth_warned = true;
            return;
        }
        match constraint {
            CObject::Complex(complex) => self.complex(data, complex, path, depth),
            CObject::Primitive(primitive) => {
                if !self.config.required_only {
                    self.primitive(data, primitive, path);
                }
            }
            // Slot fillers are governed by their own archetypes, and proxy
            // targets are validated where they are defined.
            CObject::Slot(_) | CObject::Proxy(_) => {}
        }
    }

    fn complex(&mut self, data: &DataValue, constraint: &CComplexObject, path: &str, depth: usize) {
        // The parser's recovery placeholder matches any instance.
        if constraint.rm_type == "ANY" {
            return;
        }

        if self.config.check_rm_types && !self.config.required_only {
            if let Some(actual) = data.as_object().and_then(|o| o.rm_type.as_deref()) {
                let assignable = match self.type_registry {
                    Some(registry) => registry.is_assignable(actual, &constraint.rm_type),
                    None => actual == constraint.rm_type,
                };
                if !assignable {
                    self.error(
                        ConstraintKind::RmType,
                        path,
                        format!(
                            "type {} does not satisfy constrained type {}",
                            actual, constraint.rm_type
                        ),
                    );
                }
            }
        }

        if let Some(object) = data.as_object() {
            if is_interval_shaped(object) {
                self.interval_shape(object, path);
            }
            if !self.config.required_only {
                if self.config.check_units {
                    self.units(object, path);
                }
                if self.config.check_terminology {
                    self.coded_text(object, path);
                }
            }
            self.rm_invariants(object, &constraint.rm_type, path);
        }

        if !constraint.attributes.is_empty() && data.as_object().is_none() {
            self.error(
                ConstraintKind::Structure,
                path,
                format!(
                    "expected an object with fields, found {}",
                    data.type_name()
                ),
            );
            return;
        }

        for attribute in &constraint.attributes {
            if self.halted {
                return;
            }
            let field = data.get(attribute.rm_attribute());
            self.attribute(field, attribute, path, depth);
        }
    }

    fn attribute(
        &mut self,
        field: Option<&DataValue>,
        attribute: &CAttribute,
        parent_path: &str,
        depth: usize,
    ) {
        let path = child_path(parent_path, attribute.rm_attribute());
        let count = match field {
            None => 0,
            Some(DataValue::List(items)) => items.len() as u32,
            Some(_) => 1,
        };

        if let CAttribute::Multiple { cardinality, .. } = attribute {
            if !cardinality.contains(count) {
                self.error(
                    ConstraintKind::Cardinality,
                    &path,
                    format!("{} members violate cardinality {}", count, cardinality),
                );
            }
        }

        let children = attribute.children();
        let single_alternative = children.len() == 1;
        for child in children {
            let Some(occurrences) = child.occurrences() else {
                continue;
            };
            if count == 0 && occurrences.is_mandatory() {
                self.error(
                    ConstraintKind::Occurrences,
                    &path,
                    format!(
                        "required node{} is missing (occurrences {})",
                        node_label(child),
                        occurrences
                    ),
                );
            } else if count > 0 && occurrences.is_prohibited() {
                self.error(
                    ConstraintKind::Occurrences,
                    &path,
                    format!("prohibited node{} is present", node_label(child)),
                );
            } else if single_alternative && !occurrences.contains(count) {
                self.error(
                    ConstraintKind::Occurrences,
                    &path,
                    format!(
                        "{} occurrence(s) violate the permitted interval {}",
                        count, occurrences
                    ),
                );
            }
        }

        match field {
            None => {}
            Some(DataValue::List(items)) => {
                for (index, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, index);
                    for child in children {
                        self.object(item, child, &item_path, depth + 1);
                    }
                }
            }
            Some(value) => {
                for child in children {
                    self.object(value, child, &path, depth + 1);
                }
            }
        }
    }

    // === Node-level checkers ===

    fn units(&mut self, object: &DataObject, path: &str) {
        let Some(unit) = object.get("units").and_then(DataValue::as_str) else {
            return;
        };
        let verdict = self.unit_service.validate(unit);
        let detail = verdict.message.unwrap_or_default();
        match verdict.status {
            UnitStatus::Valid => {}
            UnitStatus::Invalid => self.error(
                ConstraintKind::Units,
                &child_path(path, "units"),
                format!("unit `{}` rejected: {}", unit, detail),
            ),
            UnitStatus::Error => self.warning(
                ConstraintKind::Units,
                &child_path(path, "units"),
                format!("unit `{}` could not be checked: {}", unit, detail),
            ),
        }
    }

    /// Any coded-text-shaped value must carry a defining code with both a
    /// terminology id and a code string.
    fn coded_text(&mut self, object: &DataObject, path: &str) {
        let coded = object.rm_type.as_deref() == Some("DV_CODED_TEXT")
            || object.get("defining_code").is_some();
        if !coded {
            return;
        }
        let code_path = child_path(path, "defining_code");
        let Some(defining_code) = object.get("defining_code").and_then(DataValue::as_object)
        else {
            self.error(
                ConstraintKind::Terminology,
                &code_path,
                "coded text carries no defining code object".to_string(),
            );
            return;
        };
        let terminology_id = defining_code
            .get("terminology_id")
            .and_then(DataValue::as_str)
            .filter(|s| !s.is_empty());
        let code_string = defining_code
            .get("code_string")
            .and_then(DataValue::as_str)
            .filter(|s| !s.is_empty());
        if terminology_id.is_none() || code_string.is_none() {
            self.error(
                ConstraintKind::Terminology,
                &code_path,
                "defining code must carry both terminology_id and code_string".to_string(),
            );
        }
    }

    fn rm_invariants(&mut self, object: &DataObject, rm_type: &str, path: &str) {
        let actual = object.rm_type.as_deref().unwrap_or(rm_type);
        for (attr, rule) in rules_for(actual) {
            match rule {
                RmRule::Mandatory => {
                    if object.get(attr).is_none() {
                        self.error(
                            ConstraintKind::RmInvariant,
                            &child_path(path, attr),
                            format!("{}.{} is mandatory", actual, attr),
                        );
                    }
                }
                RmRule::CodeSet(entries) => {
                    if self.config.required_only {
                        continue;
                    }
                    let Some(value) = object.get(attr) else {
                        continue;
                    };
                    if !code_set_admits(entries, value) {
                        self.error(
                            ConstraintKind::RmInvariant,
                            &child_path(path, attr),
                            format!(
                                "{}.{} must come from the openEHR code set",
                                actual, attr
                            ),
                        );
                    }
                }
            }
        }
    }

    /// Shape check for interval-valued data, orthogonal to any archetype
    /// constraint.
    fn interval_shape(&mut self, object: &DataObject, path: &str) {
        let lower = object.get("lower");
        let upper = object.get("upper");

        for (side, bound) in [("lower", lower), ("upper", upper)] {
            let unbounded = object
                .get(&format!("{}_unbounded", side))
                .and_then(DataValue::as_bool);
            if unbounded == Some(true) && bound.is_some() {
                self.error(
                    ConstraintKind::Interval,
                    path,
                    format!("{} bound present despite {}_unbounded", side, side),
                );
            }
            if bound.is_some() && object.get(&format!("{}_included", side)).is_none() {
                self.warning(
                    ConstraintKind::Interval,
                    path,
                    format!("interval is missing its {}_included flag", side),
                );
            }
        }

        if let (Some(lower), Some(upper)) = (
            lower.and_then(DataValue::as_f64),
            upper.and_then(DataValue::as_f64),
        ) {
            if lower > upper {
                self.error(
                    ConstraintKind::Interval,
                    path,
                    format!(
                        "lower bound {} exceeds upper bound {}",
                        trim_number(lower),
                        trim_number(upper)
                    ),
                );
            }
        }
    }

    // === Primitive checkers ===

    fn primitive(&mut self, data: &DataValue, node: &CPrimitiveObject, path: &str) {
        match &node.constraint {
            CPrimitive::String(c) => {
                let DataValue::String(value) = data else {
                    self.error(
                        ConstraintKind::StringValue,
                        path,
                        format!("expected string, found {}", data.type_name()),
                    );
                    return;
                };
                if let Some(pattern) = &c.pattern {
                    match Regex::new(pattern) {
                        Ok(re) => {
                            if !re.is_match(value) {
                                self.error(
                                    ConstraintKind::StringPattern,
                                    path,
                                    format!("value `{}` does not match /{}/", value, pattern),
                                );
                            }
                        }
                        Err(_) => self.warning(
                            ConstraintKind::StringPattern,
                            path,
                            format!("unusable pattern /{}/", pattern),
                        ),
                    }
                }
                if !c.list.is_empty() && !c.list.iter().any(|v| v == value) {
                    self.error(
                        ConstraintKind::StringValue,
                        path,
                        format!("value `{}` is not one of the permitted values", value),
                    );
                }
            }
            CPrimitive::Integer(c) => {
                let value = match data {
                    DataValue::Integer(i) => *i,
                    DataValue::Real(r) if r.fract() == 0.0 => *r as i64,
                    DataValue::Real(r) => {
                        self.error(
                            ConstraintKind::IntegerValue,
                            path,
                            format!("expected a whole value, found {}", r),
                        );
                        return;
                    }
                    other => {
                        self.error(
                            ConstraintKind::IntegerValue,
                            path,
                            format!("expected integer, found {}", other.type_name()),
                        );
                        return;
                    }
                };
                if let Some(range) = &c.range {
                    if !range.contains(value) {
                        self.error(
                            ConstraintKind::IntegerRange,
                            path,
                            format!(
                                "value {} is outside the permitted range {}",
                                value,
                                range_text(range)
                            ),
                        );
                    }
                }
                if !c.list.is_empty() && !c.list.contains(&value) {
                    self.error(
                        ConstraintKind::IntegerValue,
                        path,
                        format!("value {} is not one of the permitted values", value),
                    );
                }
            }
            CPrimitive::Real(c) => {
                let Some(value) = data.as_f64() else {
                    self.error(
                        ConstraintKind::RealValue,
                        path,
                        format!("expected real, found {}", data.type_name()),
                    );
                    return;
                };
                if let Some(range) = &c.range {
                    if !range.contains(value) {
                        self.error(
                            ConstraintKind::RealRange,
                            path,
                            format!(
                                "value {} is outside the permitted range {}",
                                trim_number(value),
                                range_text(range)
                            ),
                        );
                    }
                }
                if !c.list.is_empty() && !c.list.iter().any(|v| *v == value) {
                    self.error(
                        ConstraintKind::RealValue,
                        path,
                        format!("value {} is not one of the permitted values", value),
                    );
                }
            }
            CPrimitive::Boolean(c) => {
                let DataValue::Boolean(value) = data else {
                    self.error(
                        ConstraintKind::BooleanValue,
                        path,
                        format!("expected boolean, found {}", data.type_name()),
                    );
                    return;
                };
                if *value && !c.true_valid {
                    self.error(
                        ConstraintKind::BooleanValue,
                        path,
                        "value true is explicitly disallowed".to_string(),
                    );
                }
                if !*value && !c.false_valid {
                    self.error(
                        ConstraintKind::BooleanValue,
                        path,
                        "value false is explicitly disallowed".to_string(),
                    );
                }
            }
            CPrimitive::Temporal(_) => {
                if !matches!(data, DataValue::String(_)) {
                    self.error(
                        ConstraintKind::StringValue,
                        path,
                        format!("expected temporal text, found {}", data.type_name()),
                    );
                }
            }
            CPrimitive::TerminologyCode(c) => {
                if !self.config.check_terminology {
                    return;
                }
                let Some(code) = extract_code(data) else {
                    self.error(
                        ConstraintKind::Terminology,
                        path,
                        format!("expected a coded value, found {}", data.type_name()),
                    );
                    return;
                };
                // Value-set (`ac`) references need a terminology service to
                // expand; only direct `at` code lists are checked here.
                let direct: Vec<_> = c
                    .codes
                    .iter()
                    .filter(|c| c.starts_with("at"))
                    .collect();
                if !direct.is_empty()
                    && c.codes.iter().all(|c| c.starts_with("at"))
                    && !direct.iter().any(|c| c.as_str() == code)
                {
                    self.error(
                        ConstraintKind::Terminology,
                        path,
                        format!("code {} is not in the permitted code list", code),
                    );
                }
            }
        }
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

fn node_label(object: &CObject) -> String {
    match object.node_id() {
        Some(node_id) => format!(" [{}]", node_id),
        None => String::new(),
    }
}

fn is_interval_shaped(object: &DataObject) -> bool {
    if let Some(rm_type) = &object.rm_type {
        if rm_type.contains("INTERVAL") {
            return true;
        }
    }
    ["lower", "upper", "lower_unbounded", "upper_unbounded"]
        .iter()
        .any(|field| object.get(field).is_some())
}

/// Local code carried by a data value: terse `terminology::code|label|`
/// strings, bare code strings, and structured coded-text objects.
fn extract_code(data: &DataValue) -> Option<String> {
    match data {
        DataValue::String(s) => {
            let code = s.split('|').next().unwrap_or(s).trim();
            let code = code.rsplit("::").next().unwrap_or(code);
            (!code.is_empty()).then(|| code.to_string())
        }
        DataValue::Object(object) => {
            let source = object
                .get("defining_code")
                .and_then(DataValue::as_object)
                .unwrap_or(object);
            source
                .get("code_string")
                .and_then(DataValue::as_str)
                .map(str::to_string)
        }
        _ => None,
    }
}

fn code_set_admits(entries: &[&str], value: &DataValue) -> bool {
    match value {
        DataValue::String(s) => entries.iter().any(|entry| terse_matches(entry, s)),
        DataValue::Object(object) => {
            let source = object
                .get("defining_code")
                .and_then(DataValue::as_object)
                .unwrap_or(object);
            let (Some(terminology_id), Some(code_string)) = (
                source.get("terminology_id").and_then(DataValue::as_str),
                source.get("code_string").and_then(DataValue::as_str),
            ) else {
                return false;
            };
            let terse = format!("{}::{}", terminology_id, code_string);
            entries.iter().any(|entry| *entry == terse)
        }
        _ => false,
    }
}

fn range_text<T: std::fmt::Display>(range: &Interval<T>) -> String {
    let lower = match &range.lower {
        Some(lower) => lower.to_string(),
        None => "*".to_string(),
    };
    let upper = match &range.upper {
        Some(upper) => upper.to_string(),
        None => "*".to_string(),
    };
    format!("{}..{}", lower, upper)
}

fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_joining() {
        assert_eq!(child_path("/", "data"), "/data");
        assert_eq!(child_path("/data", "events"), "/data/events");
    }

    #[test]
    fn code_extraction_forms() {
        assert_eq!(
            extract_code(&DataValue::String("local::at5|Sitting|".to_string())),
            Some("at5".to_string())
        );
        assert_eq!(
            extract_code(&DataValue::String("at5".to_string())),
            Some("at5".to_string())
        );
        let coded = DataValue::Object(
            DataObject::typed("DV_CODED_TEXT").with_field(
                "defining_code",
                DataValue::Object(
                    DataObject::typed("CODE_PHRASE")
                        .with_field("terminology_id", DataValue::String("local".to_string()))
                        .with_field("code_string", DataValue::String("at5".to_string())),
                ),
            ),
        );
        assert_eq!(extract_code(&coded), Some("at5".to_string()));
        assert_eq!(extract_code(&DataValue::Integer(5)), None);
    }

    #[test]
    fn interval_shape_detection() {
        assert!(is_interval_shaped(
            &DataObject::default().with_field("lower", DataValue::Integer(0))
        ));
        assert!(is_interval_shaped(&DataObject::typed("DV_INTERVAL")));
        assert!(!is_interval_shaped(&DataObject::typed("DV_QUANTITY")));
    }
}
