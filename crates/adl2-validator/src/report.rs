//! Validation findings and the report bundle.

use std::fmt;

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// The instance violates a constraint.
    Error,
    /// Suspicious but not a violation.
    Warning,
    /// Informational only.
    Info,
}

/// Which constraint family produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstraintKind {
    /// Occurrence interval violated.
    Occurrences,
    /// Collection cardinality violated.
    Cardinality,
    /// Dynamic type does not match the constrained RM type.
    RmType,
    /// String type or enumerated-value violation.
    StringValue,
    /// String pattern violation.
    StringPattern,
    /// Integer type or enumerated-value violation.
    IntegerValue,
    /// Integer range violation.
    IntegerRange,
    /// Real type or enumerated-value violation.
    RealValue,
    /// Real range violation.
    RealRange,
    /// Boolean type or permitted-value violation.
    BooleanValue,
    /// Malformed interval-shaped value.
    Interval,
    /// Coded-text / terminology violation.
    Terminology,
    /// Reference-model base rule violated.
    RmInvariant,
    /// Unit string rejected by the unit service.
    Units,
    /// Traversal aborted past the configured depth.
    Depth,
    /// The data shape does not fit the constraint tree at all.
    Structure,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ConstraintKind::Occurrences => "occurrences",
            ConstraintKind::Cardinality => "cardinality",
            ConstraintKind::RmType => "rm_type",
            ConstraintKind::StringValue => "string_value",
            ConstraintKind::StringPattern => "string_pattern",
            ConstraintKind::IntegerValue => "integer_value",
            ConstraintKind::IntegerRange => "integer_range",
            ConstraintKind::RealValue => "real_value",
            ConstraintKind::RealRange => "real_range",
            ConstraintKind::BooleanValue => "boolean_value",
            ConstraintKind::Interval => "interval",
            ConstraintKind::Terminology => "terminology",
            ConstraintKind::RmInvariant => "rm_invariant",
            ConstraintKind::Units => "units",
            ConstraintKind::Depth => "depth",
            ConstraintKind::Structure => "structure",
        };
        f.write_str(tag)
    }
}

/// One path-addressed finding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationMessage {
    /// Forward-slash path with array indices, e.g. `/data/events[0]/value`.
    pub path: String,
    /// Human-readable description of the finding.
    pub text: String,
    /// Severity of the finding.
    pub severity: Severity,
    /// Constraint family that produced the finding.
    pub kind: ConstraintKind,
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.path, self.text)
    }
}

/// Result bundle of one `validate` call.
///
/// Errors make the instance invalid; warnings and info findings do not.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationReport {
    /// Constraint violations.
    pub errors: Vec<ValidationMessage>,
    /// Non-fatal findings, including info-severity messages.
    pub warnings: Vec<ValidationMessage>,
}

impl ValidationReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no errors were recorded.
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records a finding under the list matching its severity.
    pub fn push(&mut self, message: ValidationMessage) {
        match message.severity {
            Severity::Error => self.errors.push(message),
            Severity::Warning | Severity::Info => self.warnings.push(message),
        }
    }

    /// Errors carrying the given constraint kind.
    pub fn errors_of_kind(&self, kind: ConstraintKind) -> impl Iterator<Item = &ValidationMessage> {
        self.errors.iter().filter(move |m| m.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags() {
        assert_eq!(ConstraintKind::IntegerRange.to_string(), "integer_range");
        assert_eq!(ConstraintKind::Interval.to_string(), "interval");
        assert_eq!(ConstraintKind::RmInvariant.to_string(), "rm_invariant");
    }

    #[test]
    fn push_routes_by_severity() {
        let mut report = ValidationReport::new();
        report.push(ValidationMessage {
            path: "/value".to_string(),
            text: "out of range".to_string(),
            severity: Severity::Error,
            kind: ConstraintKind::IntegerRange,
        });
        report.push(ValidationMessage {
            path: "/".to_string(),
            text: "deep tree".to_string(),
            severity: Severity::Warning,
            kind: ConstraintKind::Depth,
        });
        assert!(!report.valid());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.warnings.len(), 1);
    }
}
