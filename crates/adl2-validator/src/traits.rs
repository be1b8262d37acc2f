//! External contracts the engine consults.
//!
//! Both services are explicit dependencies passed to the validator at
//! construction: built once by the host, initialized once, shared read-only
//! thereafter. The engine carries no unit or type-system knowledge itself.

use crate::error::ValidatorResult;

/// Outcome category of a unit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnitStatus {
    /// The unit string is known and well-formed.
    Valid,
    /// The unit string is rejected.
    Invalid,
    /// The service could not decide.
    Error,
}

/// Result of validating one unit string.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitValidation {
    /// Outcome category.
    pub status: UnitStatus,
    /// Service-supplied detail, if any.
    pub message: Option<String>,
}

impl UnitValidation {
    /// A plain valid outcome.
    pub fn valid() -> Self {
        UnitValidation {
            status: UnitStatus::Valid,
            message: None,
        }
    }

    /// An invalid outcome with a reason.
    pub fn invalid(message: impl Into<String>) -> Self {
        UnitValidation {
            status: UnitStatus::Invalid,
            message: Some(message.into()),
        }
    }
}

/// Result of converting a value between units.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitConversion {
    /// Outcome category.
    pub status: UnitStatus,
    /// Converted magnitude, when successful.
    pub value: Option<f64>,
    /// Target unit, when successful.
    pub unit: Option<String>,
}

impl UnitConversion {
    /// A failed conversion.
    pub fn failed() -> Self {
        UnitConversion {
            status: UnitStatus::Error,
            value: None,
            unit: None,
        }
    }
}

/// Contract for an external unit-of-measure service.
///
/// The engine depends only on [`UnitService::validate`]; conversion and
/// compatibility exist for hosts that need them.
pub trait UnitService {
    /// Prepares the service for use. Idempotent; called once by the host
    /// before the first validation. A failure is expected to be downgraded
    /// by the host to [`crate::FallbackUnitService`], not treated as fatal.
    fn initialize(&mut self) -> ValidatorResult<()> {
        Ok(())
    }

    /// Judges one unit string.
    fn validate(&self, unit: &str) -> UnitValidation;

    /// Converts a magnitude between units.
    fn convert(&self, value: f64, from: &str, to: &str) -> UnitConversion;

    /// True when two units measure the same dimension.
    fn are_compatible(&self, a: &str, b: &str) -> bool;
}

/// Catalog of reference-model type descriptors, consulted only by name.
pub trait RmTypeRegistry {
    /// True when the registry knows the type.
    fn has_type(&self, name: &str) -> bool;

    /// True when a value of dynamic type `actual` may stand where
    /// `declared` is constrained. Defaults to name equality.
    fn is_assignable(&self, actual: &str, declared: &str) -> bool {
        actual == declared
    }
}
