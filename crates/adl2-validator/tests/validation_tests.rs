//! End-to-end validation tests over parsed archetypes.
//!
//! Fixtures are parsed from ADL2 source so the whole pipeline is exercised;
//! instances are built with the explicit data model.

use adl2::parse;
use adl2_validator::{
    ArchetypeValidator, ConstraintKind, DataObject, DataValue, RmTypeRegistry, Severity,
    UnitConversion, UnitService, UnitValidation, ValidatorConfig,
};

fn archetype(source: &str) -> adl2::Archetype {
    parse(source).unwrap().archetype
}

fn validator() -> ArchetypeValidator {
    ArchetypeValidator::new(ValidatorConfig::default())
}

const RANGE_ELEMENT: &str = "archetype openEHR-EHR-OBSERVATION.range.v1\n\
     definition\n    ELEMENT[id1] matches { value matches {0..100} }";

fn element_with_value(value: DataValue) -> DataValue {
    DataValue::Object(DataObject::typed("ELEMENT").with_field("value", value))
}

#[test]
fn in_range_value_is_valid() {
    let report = validator().validate(&element_with_value(DataValue::Integer(42)), &archetype(RANGE_ELEMENT));
    assert!(report.valid());
    assert!(report.warnings.is_empty());
}

#[test]
fn out_of_range_value_yields_one_integer_range_error() {
    let report = validator().validate(&element_with_value(DataValue::Integer(150)), &archetype(RANGE_ELEMENT));
    assert_eq!(report.errors.len(), 1);
    let error = &report.errors[0];
    assert_eq!(error.kind, ConstraintKind::IntegerRange);
    assert_eq!(error.path, "/value");
    assert!(error.text.contains("150"));
    assert!(error.text.contains("100"));
}

#[test]
fn non_whole_value_is_rejected_by_integer_constraint() {
    let report = validator().validate(&element_with_value(DataValue::Real(42.5)), &archetype(RANGE_ELEMENT));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ConstraintKind::IntegerValue);

    // A whole-valued real passes.
    let report = validator().validate(&element_with_value(DataValue::Real(42.0)), &archetype(RANGE_ELEMENT));
    assert!(report.valid());
}

#[test]
fn inverted_interval_yields_one_interval_error() {
    let source = "archetype openEHR-EHR-OBSERVATION.ivl.v1\n\
         definition\n    DV_INTERVAL[id1]";
    let instance = DataValue::Object(
        DataObject::typed("DV_INTERVAL")
            .with_field("lower", DataValue::Integer(100))
            .with_field("upper", DataValue::Integer(10))
            .with_field("lower_included", DataValue::Boolean(true))
            .with_field("upper_included", DataValue::Boolean(true)),
    );
    let report = validator().validate(&instance, &archetype(source));
    assert_eq!(report.errors.len(), 1);
    let error = &report.errors[0];
    assert_eq!(error.kind, ConstraintKind::Interval);
    assert!(error.text.contains("lower bound 100 exceeds upper bound 10"));
}

#[test]
fn missing_inclusion_flags_warn_but_do_not_invalidate() {
    let source = "archetype openEHR-EHR-OBSERVATION.ivl.v1\n\
         definition\n    DV_INTERVAL[id1]";
    let instance = DataValue::Object(
        DataObject::typed("DV_INTERVAL")
            .with_field("lower", DataValue::Integer(0))
            .with_field("upper", DataValue::Integer(10)),
    );
    let report = validator().validate(&instance, &archetype(source));
    assert!(report.valid());
    assert_eq!(report.warnings.len(), 2);
    assert!(report
        .warnings
        .iter()
        .all(|w| w.kind == ConstraintKind::Interval && w.severity == Severity::Warning));
}

#[test]
fn unbounded_flag_conflicts_with_present_bound() {
    let source = "archetype openEHR-EHR-OBSERVATION.ivl.v1\n\
         definition\n    DV_INTERVAL[id1]";
    let instance = DataValue::Object(
        DataObject::typed("DV_INTERVAL")
            .with_field("lower", DataValue::Integer(5))
            .with_field("lower_unbounded", DataValue::Boolean(true))
            .with_field("lower_included", DataValue::Boolean(true)),
    );
    let report = validator().validate(&instance, &archetype(source));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ConstraintKind::Interval);
}

#[test]
fn narrowing_a_constraint_never_validates_an_invalid_instance() {
    // 150 is invalid against 0..100; it must stay invalid against every
    // narrower range.
    let wide = archetype(RANGE_ELEMENT);
    let narrow = archetype(
        "archetype openEHR-EHR-OBSERVATION.range.v1\n\
         definition\n    ELEMENT[id1] matches { value matches {0..50} }",
    );
    let narrower = archetype(
        "archetype openEHR-EHR-OBSERVATION.range.v1\n\
         definition\n    ELEMENT[id1] matches { value matches {40..42} }",
    );
    let instance = element_with_value(DataValue::Integer(150));
    let v = validator();
    assert!(!v.validate(&instance, &wide).valid());
    assert!(!v.validate(&instance, &narrow).valid());
    assert!(!v.validate(&instance, &narrower).valid());
}

#[test]
fn missing_mandatory_node_is_an_occurrences_error() {
    let source = "archetype openEHR-EHR-OBSERVATION.req.v1\n\
         definition\n    ITEM_TREE[id1] matches {
            items matches {
                ELEMENT[id2] occurrences matches {1..1}
            }
        }";
    let instance = DataValue::Object(DataObject::typed("ITEM_TREE"));
    let report = validator().validate(&instance, &archetype(source));
    assert_eq!(report.errors.len(), 1);
    let error = &report.errors[0];
    assert_eq!(error.kind, ConstraintKind::Occurrences);
    assert_eq!(error.path, "/items");
    assert!(error.text.contains("id2"));
}

#[test]
fn collection_counts_are_checked_against_occurrences() {
    let source = "archetype openEHR-EHR-OBSERVATION.coll.v1\n\
         definition\n    ITEM_TREE[id1] matches {
            items matches {
                ELEMENT[id2] occurrences matches {0..2}
            }
        }";
    let items: Vec<DataValue> = (0..3)
        .map(|_| DataValue::Object(DataObject::typed("ELEMENT")))
        .collect();
    let instance = DataValue::Object(
        DataObject::typed("ITEM_TREE").with_field("items", DataValue::List(items)),
    );
    let report = validator().validate(&instance, &archetype(source));
    assert!(report
        .errors
        .iter()
        .any(|e| e.kind == ConstraintKind::Occurrences && e.text.contains("0..2")));
}

#[test]
fn rm_type_mismatch_is_reported() {
    let instance = DataValue::Object(DataObject::typed("CLUSTER").with_field("value", DataValue::Integer(1)));
    let report = validator().validate(&instance, &archetype(RANGE_ELEMENT));
    assert!(report
        .errors
        .iter()
        .any(|e| e.kind == ConstraintKind::RmType && e.text.contains("CLUSTER")));
}

#[test]
fn type_registry_can_widen_assignability() {
    struct SubtypeRegistry;
    impl RmTypeRegistry for SubtypeRegistry {
        fn has_type(&self, name: &str) -> bool {
            matches!(name, "ELEMENT" | "POINT_EVENT" | "EVENT")
        }
        fn is_assignable(&self, actual: &str, declared: &str) -> bool {
            actual == declared || (actual == "POINT_EVENT" && declared == "EVENT")
        }
    }

    let source = "archetype openEHR-EHR-OBSERVATION.ev.v1\n\
         definition\n    EVENT[id1]";
    let instance = DataValue::Object(DataObject::typed("POINT_EVENT"));

    let report = validator().validate(&instance, &archetype(source));
    assert!(!report.valid());

    let report = ArchetypeValidator::new(ValidatorConfig::default())
        .with_type_registry(Box::new(SubtypeRegistry))
        .validate(&instance, &archetype(source));
    assert!(report.valid());
}

#[test]
fn fallback_unit_service_rejects_unknown_units() {
    let source = "archetype openEHR-EHR-OBSERVATION.qty.v1\n\
         definition\n    DV_QUANTITY[id1]";
    let good = DataValue::Object(
        DataObject::typed("DV_QUANTITY")
            .with_field("magnitude", DataValue::Real(120.0))
            .with_field("units", DataValue::String("mm[Hg]".to_string())),
    );
    assert!(validator().validate(&good, &archetype(source)).valid());

    let bad = DataValue::Object(
        DataObject::typed("DV_QUANTITY")
            .with_field("magnitude", DataValue::Real(120.0))
            .with_field("units", DataValue::String("smoots".to_string())),
    );
    let report = validator().validate(&bad, &archetype(source));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ConstraintKind::Units);
    assert_eq!(report.errors[0].path, "/units");
}

#[test]
fn undecidable_unit_service_outcome_downgrades_to_warning() {
    struct FlakyUnitService;
    impl UnitService for FlakyUnitService {
        fn validate(&self, _unit: &str) -> UnitValidation {
            UnitValidation {
                status: adl2_validator::UnitStatus::Error,
                message: Some("service unavailable".to_string()),
            }
        }
        fn convert(&self, _value: f64, _from: &str, _to: &str) -> UnitConversion {
            UnitConversion::failed()
        }
        fn are_compatible(&self, _a: &str, _b: &str) -> bool {
            false
        }
    }

    let source = "archetype openEHR-EHR-OBSERVATION.qty.v1\n\
         definition\n    DV_QUANTITY[id1]";
    let instance = DataValue::Object(
        DataObject::typed("DV_QUANTITY")
            .with_field("magnitude", DataValue::Real(1.0))
            .with_field("units", DataValue::String("mm[Hg]".to_string())),
    );
    let report = ArchetypeValidator::new(ValidatorConfig::default())
        .with_unit_service(Box::new(FlakyUnitService))
        .validate(&instance, &archetype(source));
    assert!(report.valid());
    assert!(report
        .warnings
        .iter()
        .any(|w| w.kind == ConstraintKind::Units));
}

#[test]
fn missing_mandatory_rm_attribute_is_an_invariant_error() {
    let source = "archetype openEHR-EHR-OBSERVATION.qty.v1\n\
         definition\n    DV_QUANTITY[id1]";
    let instance = DataValue::Object(
        DataObject::typed("DV_QUANTITY").with_field("magnitude", DataValue::Real(1.0)),
    );
    let report = validator().validate(&instance, &archetype(source));
    assert!(report
        .errors
        .iter()
        .any(|e| e.kind == ConstraintKind::RmInvariant && e.text.contains("DV_QUANTITY.units")));
}

#[test]
fn coded_text_must_carry_a_complete_defining_code() {
    let source = "archetype openEHR-EHR-OBSERVATION.coded.v1\n\
         definition\n    DV_CODED_TEXT[id1]";
    let incomplete = DataValue::Object(
        DataObject::typed("DV_CODED_TEXT")
            .with_field("value", DataValue::String("Sitting".to_string()))
            .with_field(
                "defining_code",
                DataValue::Object(
                    DataObject::typed("CODE_PHRASE")
                        .with_field("code_string", DataValue::String("at5".to_string())),
                ),
            ),
    );
    let report = validator().validate(&incomplete, &archetype(source));
    assert!(report
        .errors
        .iter()
        .any(|e| e.kind == ConstraintKind::Terminology));
}

#[test]
fn composition_category_code_set_is_enforced() {
    let source = "archetype openEHR-EHR-COMPOSITION.encounter.v1\n\
         definition\n    COMPOSITION[id1]";
    let event = DataValue::Object(
        DataObject::typed("COMPOSITION")
            .with_field("category", DataValue::String("openehr::433|event|".to_string())),
    );
    assert!(validator().validate(&event, &archetype(source)).valid());

    let bogus = DataValue::Object(
        DataObject::typed("COMPOSITION")
            .with_field("category", DataValue::String("openehr::999|made up|".to_string())),
    );
    let report = validator().validate(&bogus, &archetype(source));
    assert!(report
        .errors
        .iter()
        .any(|e| e.kind == ConstraintKind::RmInvariant));
}

#[test]
fn local_code_lists_are_enforced() {
    let source = "archetype openEHR-EHR-OBSERVATION.pos.v1\n\
         definition\n    ELEMENT[id1] matches { value matches {[at1, at2, at3]} }";
    let ok = element_with_value(DataValue::String("local::at2|Standing|".to_string()));
    assert!(validator().validate(&ok, &archetype(source)).valid());

    let bad = element_with_value(DataValue::String("local::at9".to_string()));
    let report = validator().validate(&bad, &archetype(source));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ConstraintKind::Terminology);
}

#[test]
fn fail_fast_stops_after_the_first_error() {
    let source = "archetype openEHR-EHR-OBSERVATION.two.v1\n\
         definition\n    ITEM_TREE[id1] matches {
            items matches {
                ELEMENT[id2] occurrences matches {1..1}
            }
            other matches {
                ELEMENT[id3] occurrences matches {1..1}
            }
        }";
    let instance = DataValue::Object(DataObject::typed("ITEM_TREE"));

    let full = validator().validate(&instance, &archetype(source));
    assert_eq!(full.errors.len(), 2);

    let fast = ArchetypeValidator::new(
        ValidatorConfig::builder().with_fail_fast(true).build(),
    )
    .validate(&instance, &archetype(source));
    assert_eq!(fast.errors.len(), 1);
}

#[test]
fn required_only_skips_value_checks_but_keeps_presence_checks() {
    let source = "archetype openEHR-EHR-OBSERVATION.req.v1\n\
         definition\n    ITEM_TREE[id1] matches {
            items matches {
                ELEMENT[id2] occurrences matches {1..1} matches {
                    value matches {0..100}
                }
            }
        }";
    let config = ValidatorConfig::builder().with_required_only(true).build();

    // Out-of-range value: ignored in required-only mode.
    let present = DataValue::Object(DataObject::typed("ITEM_TREE").with_field(
        "items",
        element_with_value(DataValue::Integer(150)),
    ));
    let report = ArchetypeValidator::new(config.clone()).validate(&present, &archetype(source));
    assert!(report.valid());

    // A missing mandatory node is still an error.
    let missing = DataValue::Object(DataObject::typed("ITEM_TREE"));
    let report = ArchetypeValidator::new(config).validate(&missing, &archetype(source));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ConstraintKind::Occurrences);
}

#[test]
fn depth_guard_warns_instead_of_overflowing() {
    use adl2::{CAttribute, CComplexObject, CObject};

    // Build a constraint chain and a matching data chain much deeper than
    // the configured limit.
    let mut constraint = CComplexObject::new("CLUSTER", Some("id1".to_string()));
    let mut data = DataObject::typed("CLUSTER");
    for _ in 0..200 {
        let child = std::mem::replace(
            &mut constraint,
            CComplexObject::new("CLUSTER", Some("id1".to_string())),
        );
        constraint.attributes.push(CAttribute::Single {
            rm_attribute: "items".to_string(),
            children: vec![CObject::Complex(child)],
        });
        let inner = std::mem::replace(&mut data, DataObject::typed("CLUSTER"));
        data = data.with_field("items", DataValue::Object(inner));
    }
    let mut archetype = archetype("archetype openEHR-EHR-CLUSTER.deep.v1\n\ndefinition\n    CLUSTER[id1]");
    archetype.definition = Some(constraint);

    for fail_fast in [false, true] {
        let config = ValidatorConfig::builder()
            .with_fail_fast(fail_fast)
            .with_max_depth(16)
            .build();
        let report = ArchetypeValidator::new(config).validate(
            &DataValue::Object(data.clone()),
            &archetype,
        );
        assert!(report
            .warnings
            .iter()
            .any(|w| w.kind == ConstraintKind::Depth));
    }
}

#[test]
fn missing_definition_is_a_structure_error() {
    let archetype = archetype("archetype openEHR-EHR-OBSERVATION.empty.v1");
    let report = validator().validate(&DataValue::Integer(1), &archetype);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ConstraintKind::Structure);
    assert_eq!(report.errors[0].path, "/");
}

#[test]
fn placeholder_definition_accepts_anything() {
    // A broken definition section degrades to a placeholder that matches
    // any instance, so validation reports no errors.
    let outcome = parse(
        "archetype openEHR-EHR-OBSERVATION.broken.v1\n\
         definition\n    OBSERVATION[id1] matches { data matches }",
    )
    .unwrap();
    assert!(!outcome.warnings.is_empty());
    let report = validator().validate(&DataValue::Integer(7), &outcome.archetype);
    assert!(report.valid());
}

#[cfg(feature = "json")]
#[test]
fn json_instances_flow_through_the_engine() {
    let source = "archetype openEHR-EHR-OBSERVATION.qty.v1\n\
         definition\n    DV_QUANTITY[id1] matches { magnitude matches {|0.0..300.0|} }";
    let json = serde_json::json!({
        "_type": "DV_QUANTITY",
        "magnitude": 500.0,
        "units": "mm[Hg]"
    });
    let instance = DataValue::from_json(&json).unwrap();
    let report = validator().validate(&instance, &archetype(source));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ConstraintKind::RealRange);
    assert_eq!(report.errors[0].path, "/magnitude");
}
