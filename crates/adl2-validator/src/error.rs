//! Error types for the validation engine.
//!
//! Data/constraint mismatches are never errors here — they become
//! [`crate::ValidationMessage`]s. This type covers only failures of the
//! machinery around the engine: ingesting a data instance or initializing
//! an external unit service.

use thiserror::Error;

/// Errors that can occur around (not during) validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidatorError {
    /// A data value that cannot be represented as a [`crate::DataValue`].
    #[error("unsupported data value: {0}")]
    UnsupportedData(String),

    /// A unit service failed to initialize.
    #[error("unit service initialization failed: {0}")]
    UnitService(String),
}

/// Result type for validator operations.
pub type ValidatorResult<T> = std::result::Result<T, ValidatorError>;
