//! # adl2-validator
//!
//! Validation of data instances against parsed ADL2 archetypes from the
//! `adl2` crate.
//!
//! The engine walks a data instance depth-first in lock-step with the
//! archetype's constraint tree and reports every mismatch as a typed,
//! path-addressed message. It never panics and never returns an error for
//! bad data: a failed validation is a structured, non-fatal report.
//!
//! ## Usage
//!
//! ```rust
//! use adl2::parse;
//! use adl2_validator::{ArchetypeValidator, DataObject, DataValue, ValidatorConfig};
//!
//! let source = "archetype openEHR-EHR-OBSERVATION.demo.v1\n\
//!               definition\n    ELEMENT[id1] matches { value matches {0..100} }";
//! let archetype = parse(source).unwrap().archetype;
//!
//! let instance = DataValue::Object(
//!     DataObject::typed("ELEMENT").with_field("value", DataValue::Integer(150)),
//! );
//! let validator = ArchetypeValidator::new(ValidatorConfig::default());
//! let report = validator.validate(&instance, &archetype);
//!
//! assert!(!report.valid());
//! assert_eq!(report.errors[0].kind.to_string(), "integer_range");
//! ```
//!
//! ## External dependencies
//!
//! Unit strings are judged through the [`UnitService`] contract; the
//! built-in [`FallbackUnitService`] covers common clinical UCUM units and
//! is the degrade target when a richer service fails to initialize. An
//! optional [`RmTypeRegistry`] refines type-name checks; without one,
//! assignability is name equality.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod config;
mod data;
mod error;
mod report;
mod rm;
mod traits;
mod units;
mod validator;

pub use config::{ValidatorConfig, ValidatorConfigBuilder};
pub use data::{DataObject, DataValue};
pub use error::{ValidatorError, ValidatorResult};
pub use report::{ConstraintKind, Severity, ValidationMessage, ValidationReport};
pub use traits::{RmTypeRegistry, UnitConversion, UnitService, UnitStatus, UnitValidation};
pub use units::FallbackUnitService;
pub use validator::ArchetypeValidator;
