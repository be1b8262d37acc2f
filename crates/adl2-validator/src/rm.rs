//! Reference-model base rules.
//!
//! A fixed table keyed `"TYPE.attribute"` encoding rules that hold for
//! every archetype: an attribute is unconditionally mandatory, or its value
//! must come from an enumerated, terminology-qualified code set. The
//! checker accepts both the terse `terminology::code|label|` string form
//! and structured coded-text objects.

/// One base-specification rule.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RmRule {
    /// The attribute must be present.
    Mandatory,
    /// The attribute's coded value must come from this set, each entry
    /// `terminology::code`.
    CodeSet(&'static [&'static str]),
}

/// openEHR ISM transition states.
static ISM_STATES: &[&str] = &[
    "openehr::524", // initial
    "openehr::526", // planned
    "openehr::527", // postponed
    "openehr::528", // cancelled
    "openehr::529", // scheduled
    "openehr::245", // active
    "openehr::530", // suspended
    "openehr::531", // aborted
    "openehr::532", // completed
    "openehr::533", // expired
];

/// openEHR composition categories.
static COMPOSITION_CATEGORIES: &[&str] = &[
    "openehr::431", // persistent
    "openehr::451", // episodic
    "openehr::433", // event
];

/// openEHR null flavours.
static NULL_FLAVOURS: &[&str] = &[
    "openehr::271", // no information
    "openehr::253", // unknown
    "openehr::272", // masked
    "openehr::273", // not applicable
];

pub(crate) static RM_RULES: &[(&str, RmRule)] = &[
    ("DV_QUANTITY.magnitude", RmRule::Mandatory),
    ("DV_QUANTITY.units", RmRule::Mandatory),
    ("DV_PROPORTION.numerator", RmRule::Mandatory),
    ("DV_PROPORTION.denominator", RmRule::Mandatory),
    ("DV_CODED_TEXT.defining_code", RmRule::Mandatory),
    ("DV_TEXT.value", RmRule::Mandatory),
    ("CODE_PHRASE.terminology_id", RmRule::Mandatory),
    ("CODE_PHRASE.code_string", RmRule::Mandatory),
    ("ELEMENT.null_flavour", RmRule::CodeSet(NULL_FLAVOURS)),
    ("ISM_TRANSITION.current_state", RmRule::CodeSet(ISM_STATES)),
    ("COMPOSITION.category", RmRule::CodeSet(COMPOSITION_CATEGORIES)),
];

/// Rules that apply to one RM type.
pub(crate) fn rules_for(rm_type: &str) -> impl Iterator<Item = (&'static str, &'static RmRule)> {
    let prefix = format!("{}.", rm_type);
    RM_RULES.iter().filter_map(move |(key, rule)| {
        key.strip_prefix(prefix.as_str()).map(|attr| (attr, rule))
    })
}

/// True when a terse `terminology::code|label|` or `terminology::code`
/// string refers to the given set entry.
pub(crate) fn terse_matches(entry: &str, value: &str) -> bool {
    let value = value.split('|').next().unwrap_or(value).trim();
    value == entry
}
