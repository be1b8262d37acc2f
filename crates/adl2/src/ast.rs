//! Constraint-tree types for parsed ADL2 archetypes.
//!
//! The node families are closed enums: every variant the grammar can produce
//! is listed here, so the validator dispatches by exhaustive match rather
//! than dynamic type tests.

use crate::odin::OdinValue;

// =============================================================================
// Intervals
// =============================================================================

/// A general interval over an ordered value type.
///
/// `None` on either side means that side is unbounded. Inclusion flags
/// default to inclusive; ODIN `|>0..<100|` notation produces exclusive
/// bounds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval<T> {
    /// Lower bound (None = unbounded below).
    pub lower: Option<T>,
    /// Upper bound (None = unbounded above).
    pub upper: Option<T>,
    /// Whether the lower bound itself is admitted.
    pub lower_included: bool,
    /// Whether the upper bound itself is admitted.
    pub upper_included: bool,
}

impl<T: PartialOrd + Copy> Interval<T> {
    /// Closed interval `|lower..upper|`.
    pub fn bounded(lower: T, upper: T) -> Self {
        Interval {
            lower: Some(lower),
            upper: Some(upper),
            lower_included: true,
            upper_included: true,
        }
    }

    /// Single-point interval `|v|`.
    pub fn point(value: T) -> Self {
        Self::bounded(value, value)
    }

    /// Interval unbounded above, `|>= lower|`.
    pub fn at_least(lower: T) -> Self {
        Interval {
            lower: Some(lower),
            upper: None,
            lower_included: true,
            upper_included: true,
        }
    }

    /// True when both bounds are present and inverted.
    pub fn is_inverted(&self) -> bool {
        match (self.lower, self.upper) {
            (Some(l), Some(u)) => l > u,
            _ => false,
        }
    }

    /// True when the value lies inside the interval, honoring inclusion
    /// flags and unbounded sides.
    pub fn contains(&self, value: T) -> bool {
        if let Some(l) = self.lower {
            if value < l || (value == l && !self.lower_included) {
                return false;
            }
        }
        if let Some(u) = self.upper {
            if value > u || (value == u && !self.upper_included) {
                return false;
            }
        }
        true
    }
}

/// Occurrence/cardinality interval: `lower..upper` with `*` for an
/// unbounded upper side.
///
/// Invariant: `lower <= upper` when the upper side is bounded. The parsers
/// enforce this at construction; [`MultiplicityInterval::is_valid`] re-checks
/// it for programmatically built trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultiplicityInterval {
    /// Minimum occurrences; never negative by construction.
    pub lower: u32,
    /// Maximum occurrences (None = unbounded `*`).
    pub upper: Option<u32>,
}

impl MultiplicityInterval {
    /// Creates an interval.
    pub fn new(lower: u32, upper: Option<u32>) -> Self {
        Self { lower, upper }
    }

    /// `0..1`
    pub fn optional() -> Self {
        Self { lower: 0, upper: Some(1) }
    }

    /// `1..1`
    pub fn mandatory() -> Self {
        Self { lower: 1, upper: Some(1) }
    }

    /// `0..0`
    pub fn prohibited() -> Self {
        Self { lower: 0, upper: Some(0) }
    }

    /// `0..*`
    pub fn unbounded() -> Self {
        Self { lower: 0, upper: None }
    }

    /// True when a count satisfies this interval.
    pub fn contains(&self, count: u32) -> bool {
        if count < self.lower {
            return false;
        }
        match self.upper {
            Some(upper) => count <= upper,
            None => true,
        }
    }

    /// True when at least one occurrence is required.
    pub fn is_mandatory(&self) -> bool {
        self.lower >= 1
    }

    /// True when no occurrence is permitted.
    pub fn is_prohibited(&self) -> bool {
        self.upper == Some(0)
    }

    /// True when `lower <= upper` (or the upper side is unbounded).
    pub fn is_valid(&self) -> bool {
        match self.upper {
            Some(upper) => self.lower <= upper,
            None => true,
        }
    }
}

impl std::fmt::Display for MultiplicityInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upper {
            Some(upper) => write!(f, "{}..{}", self.lower, upper),
            None => write!(f, "{}..*", self.lower),
        }
    }
}

// =============================================================================
// Primitive constraints
// =============================================================================

/// Constraint on a string value.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CString {
    /// Regex pattern the value must match (`/pattern/` form in cADL).
    pub pattern: Option<String>,
    /// Enumerated permitted values; empty = unconstrained.
    pub list: Vec<String>,
    /// Assumed value used when the data carries none.
    pub assumed: Option<String>,
}

/// Constraint on an integer value.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CInteger {
    /// Enumerated permitted values; empty = unconstrained.
    pub list: Vec<i64>,
    /// Permitted range.
    pub range: Option<Interval<i64>>,
    /// Assumed value used when the data carries none.
    pub assumed: Option<i64>,
}

/// Constraint on a real value.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CReal {
    /// Enumerated permitted values; empty = unconstrained.
    pub list: Vec<f64>,
    /// Permitted range.
    pub range: Option<Interval<f64>>,
    /// Assumed value used when the data carries none.
    pub assumed: Option<f64>,
}

/// Constraint on a boolean value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CBoolean {
    /// Whether `true` is permitted.
    pub true_valid: bool,
    /// Whether `false` is permitted.
    pub false_valid: bool,
}

impl Default for CBoolean {
    fn default() -> Self {
        CBoolean {
            true_valid: true,
            false_valid: true,
        }
    }
}

/// Constraint on a date/time value, kept as ISO 8601 pattern text.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CTemporal {
    /// ISO 8601 pattern, e.g. `yyyy-mm-dd`.
    pub pattern: Option<String>,
    /// Enumerated permitted values; empty = unconstrained.
    pub list: Vec<String>,
}

/// Constraint binding a node to terminology codes (`[ac3]`, `[at5]`,
/// `[at1, at2, at3]` blocks).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CTerminologyCode {
    /// Value-set code (`ac` code) or single value code (`at` code), plus any
    /// listed alternatives.
    pub codes: Vec<String>,
}

/// One primitive constraint, closed over the value kinds cADL can express.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CPrimitive {
    /// String constraint.
    String(CString),
    /// Integer constraint.
    Integer(CInteger),
    /// Real constraint.
    Real(CReal),
    /// Boolean constraint.
    Boolean(CBoolean),
    /// Temporal constraint.
    Temporal(CTemporal),
    /// Terminology-code constraint.
    TerminologyCode(CTerminologyCode),
}

impl CPrimitive {
    /// RM type name this primitive constrains.
    pub fn rm_type(&self) -> &'static str {
        match self {
            CPrimitive::String(_) => "String",
            CPrimitive::Integer(_) => "Integer",
            CPrimitive::Real(_) => "Real",
            CPrimitive::Boolean(_) => "Boolean",
            CPrimitive::Temporal(_) => "Temporal",
            CPrimitive::TerminologyCode(_) => "Terminology_code",
        }
    }
}

// =============================================================================
// Object and attribute nodes
// =============================================================================

/// Complex object constraint: one RM type at one structural position, owning
/// attribute constraints.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CComplexObject {
    /// Constrained RM type name, e.g. `OBSERVATION`.
    pub rm_type: String,
    /// Semantic node id (`idN` or `atN`), absent on anonymous nodes.
    pub node_id: Option<String>,
    /// Permitted occurrences under the owning attribute.
    pub occurrences: Option<MultiplicityInterval>,
    /// Attribute constraints, in source order.
    pub attributes: Vec<CAttribute>,
}

impl CComplexObject {
    /// Creates a child-less complex object constraint.
    pub fn new(rm_type: impl Into<String>, node_id: Option<String>) -> Self {
        CComplexObject {
            rm_type: rm_type.into(),
            node_id,
            occurrences: None,
            attributes: Vec::new(),
        }
    }

    /// The placeholder substituted when a definition section fails to parse.
    /// Matches any instance.
    pub fn placeholder() -> Self {
        Self::new("ANY", None)
    }

    /// Looks up an attribute constraint by RM attribute name.
    pub fn attribute(&self, name: &str) -> Option<&CAttribute> {
        self.attributes.iter().find(|a| a.rm_attribute() == name)
    }
}

/// Primitive object constraint: a leaf wrapping one [`CPrimitive`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CPrimitiveObject {
    /// Constrained RM type name.
    pub rm_type: String,
    /// Semantic node id, usually absent on primitive leaves.
    pub node_id: Option<String>,
    /// Permitted occurrences under the owning attribute.
    pub occurrences: Option<MultiplicityInterval>,
    /// The primitive constraint itself.
    pub constraint: CPrimitive,
}

/// Archetype slot: a position fillable by another archetype. Slots own no
/// children of their own.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CArchetypeSlot {
    /// Constrained RM type name.
    pub rm_type: String,
    /// Semantic node id.
    pub node_id: Option<String>,
    /// Permitted occurrences under the owning attribute.
    pub occurrences: Option<MultiplicityInterval>,
}

/// Proxy node referencing a constraint defined elsewhere in the same tree.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CComplexObjectProxy {
    /// Constrained RM type name.
    pub rm_type: String,
    /// Semantic node id.
    pub node_id: Option<String>,
    /// Permitted occurrences under the owning attribute.
    pub occurrences: Option<MultiplicityInterval>,
    /// Path to the referenced node, e.g. `/data[id2]/events[id3]`.
    pub target_path: String,
}

/// Constraint on one object position: the closed variant family.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CObject {
    /// Complex object with attribute children.
    Complex(CComplexObject),
    /// Primitive leaf.
    Primitive(CPrimitiveObject),
    /// Archetype slot.
    Slot(CArchetypeSlot),
    /// Proxy/reference node.
    Proxy(CComplexObjectProxy),
}

impl CObject {
    /// Constrained RM type name.
    pub fn rm_type(&self) -> &str {
        match self {
            CObject::Complex(o) => &o.rm_type,
            CObject::Primitive(o) => &o.rm_type,
            CObject::Slot(o) => &o.rm_type,
            CObject::Proxy(o) => &o.rm_type,
        }
    }

    /// Semantic node id, if any.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            CObject::Complex(o) => o.node_id.as_deref(),
            CObject::Primitive(o) => o.node_id.as_deref(),
            CObject::Slot(o) => o.node_id.as_deref(),
            CObject::Proxy(o) => o.node_id.as_deref(),
        }
    }

    /// Occurrence interval, if constrained.
    pub fn occurrences(&self) -> Option<&MultiplicityInterval> {
        match self {
            CObject::Complex(o) => o.occurrences.as_ref(),
            CObject::Primitive(o) => o.occurrences.as_ref(),
            CObject::Slot(o) => o.occurrences.as_ref(),
            CObject::Proxy(o) => o.occurrences.as_ref(),
        }
    }
}

/// Constraint on one RM attribute of the enclosing object.
///
/// The cADL parser always emits `Single`; `Multiple` exists for
/// programmatically built trees and is honored by the validator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CAttribute {
    /// Single-valued attribute; children are mutually exclusive alternatives.
    Single {
        /// Constrained RM attribute name.
        rm_attribute: String,
        /// Alternative child constraints, non-empty.
        children: Vec<CObject>,
    },
    /// Multiple-valued attribute; children are collection members.
    Multiple {
        /// Constrained RM attribute name.
        rm_attribute: String,
        /// Member child constraints, non-empty.
        children: Vec<CObject>,
        /// Permitted member count.
        cardinality: MultiplicityInterval,
    },
}

impl CAttribute {
    /// Constrained RM attribute name.
    pub fn rm_attribute(&self) -> &str {
        match self {
            CAttribute::Single { rm_attribute, .. } => rm_attribute,
            CAttribute::Multiple { rm_attribute, .. } => rm_attribute,
        }
    }

    /// Child object constraints.
    pub fn children(&self) -> &[CObject] {
        match self {
            CAttribute::Single { children, .. } => children,
            CAttribute::Multiple { children, .. } => children,
        }
    }
}

// =============================================================================
// Terminology
// =============================================================================

/// One term record in the terminology section.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TermDefinition {
    /// Display text.
    pub text: String,
    /// Longer description, if given.
    pub description: Option<String>,
}

/// Language-keyed table of code-keyed term records, built by partial copy
/// from the terminology section's ODIN value.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Terminology {
    /// `language -> (code -> term)`, in source order.
    pub term_definitions: Vec<(String, Vec<(String, TermDefinition)>)>,
}

impl Terminology {
    /// Builds a terminology table from the parsed ODIN value of a
    /// `terminology` section. Entries that do not look like term definitions
    /// are skipped rather than treated as errors.
    pub fn from_odin(value: &OdinValue) -> Self {
        let mut terminology = Terminology::default();
        let Some(languages) = value.get("term_definitions").and_then(OdinValue::as_object)
        else {
            return terminology;
        };
        for (language, codes) in languages {
            let mut terms = Vec::new();
            if let Some(codes) = codes.as_object() {
                for (code, fields) in codes {
                    let Some(text) = fields.get("text").and_then(OdinValue::as_str) else {
                        continue;
                    };
                    terms.push((
                        code.clone(),
                        TermDefinition {
                            text: text.to_string(),
                            description: fields
                                .get("description")
                                .and_then(OdinValue::as_str)
                                .map(str::to_string),
                        },
                    ));
                }
            }
            terminology.term_definitions.push((language.clone(), terms));
        }
        terminology
    }

    /// Looks up one term record.
    pub fn term(&self, language: &str, code: &str) -> Option<&TermDefinition> {
        self.term_definitions
            .iter()
            .find(|(lang, _)| lang == language)
            .and_then(|(_, terms)| {
                terms.iter().find(|(c, _)| c == code).map(|(_, t)| t)
            })
    }

    /// Languages present in the table, in source order.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.term_definitions.iter().map(|(lang, _)| lang.as_str())
    }
}

// =============================================================================
// Archetype record
// =============================================================================

/// Kind of ADL2 artefact, from the header keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArtefactKind {
    /// `archetype`
    Archetype,
    /// `template`
    Template,
    /// `operational_template`
    OperationalTemplate,
}

impl std::fmt::Display for ArtefactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtefactKind::Archetype => f.write_str("archetype"),
            ArtefactKind::Template => f.write_str("template"),
            ArtefactKind::OperationalTemplate => f.write_str("operational_template"),
        }
    }
}

/// One parsed ADL2 artefact.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Archetype {
    /// Artefact kind from the header keyword.
    pub kind: ArtefactKind,
    /// Full archetype identifier, e.g.
    /// `openEHR-EHR-OBSERVATION.blood_pressure.v1`.
    pub archetype_id: String,
    /// Parent identifier from a `specialize` clause.
    pub parent_archetype_id: Option<String>,
    /// `adl_version` header metadata.
    pub adl_version: Option<String>,
    /// `rm_release` header metadata.
    pub rm_release: Option<String>,
    /// Raw ODIN value of the `language` section.
    pub original_language: Option<OdinValue>,
    /// Raw ODIN value of the `description` section.
    pub description: Option<OdinValue>,
    /// Root of the constraint tree from the `definition` section.
    pub definition: Option<CComplexObject>,
    /// Terminology table from the `terminology` section.
    pub terminology: Option<Terminology>,
}

impl Archetype {
    /// Creates an empty record for the given header.
    pub fn new(kind: ArtefactKind, archetype_id: impl Into<String>) -> Self {
        Archetype {
            kind,
            archetype_id: archetype_id.into(),
            parent_archetype_id: None,
            adl_version: None,
            rm_release: None,
            original_language: None,
            description: None,
            definition: None,
            terminology: None,
        }
    }

    /// RM type constrained at the definition root.
    pub fn root_rm_type(&self) -> Option<&str> {
        self.definition.as_ref().map(|d| d.rm_type.as_str())
    }

    /// Convenience lookup into the terminology table.
    pub fn term(&self, language: &str, code: &str) -> Option<&TermDefinition> {
        self.terminology.as_ref()?.term(language, code)
    }
}

/// One non-fatal finding produced while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseWarning {
    /// Section the warning concerns, when it is section-specific.
    pub section: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.section {
            Some(section) => write!(f, "[{}] {}", section, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Result bundle of a successful archetype parse: the extracted record plus
/// any warnings accumulated along the way.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseOutcome {
    /// The parsed artefact.
    pub archetype: Archetype,
    /// Non-fatal findings, in the order encountered.
    pub warnings: Vec<ParseWarning>,
}
