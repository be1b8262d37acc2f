//! Configuration for the validation engine.

/// Configuration for an [`crate::ArchetypeValidator`].
///
/// # Example
///
/// ```rust
/// use adl2_validator::ValidatorConfig;
///
/// let config = ValidatorConfig::builder()
///     .with_fail_fast(true)
///     .with_max_depth(32)
///     .with_units(false)
///     .build();
/// assert!(config.fail_fast);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Stop traversal after the first error.
    pub fail_fast: bool,
    /// Report only presence/multiplicity and mandatory reference-model
    /// violations; skip primitive value checks.
    pub required_only: bool,
    /// Maximum traversal depth before the guard aborts with a warning.
    pub max_depth: usize,
    /// Run unit-string validation through the configured unit service.
    pub check_units: bool,
    /// Run coded-text and terminology-code checks.
    pub check_terminology: bool,
    /// Check dynamic data type names against constrained RM types.
    pub check_rm_types: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            fail_fast: false,
            required_only: false,
            max_depth: 64,
            check_units: true,
            check_terminology: true,
            check_rm_types: true,
        }
    }
}

impl ValidatorConfig {
    /// Creates a new builder for ValidatorConfig.
    pub fn builder() -> ValidatorConfigBuilder {
        ValidatorConfigBuilder::default()
    }
}

/// Builder for ValidatorConfig.
#[derive(Debug, Clone)]
pub struct ValidatorConfigBuilder {
    config: ValidatorConfig,
}

impl Default for ValidatorConfigBuilder {
    fn default() -> Self {
        ValidatorConfigBuilder {
            config: ValidatorConfig::default(),
        }
    }
}

impl ValidatorConfigBuilder {
    /// Stops traversal after the first error.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.config.fail_fast = fail_fast;
        self
    }

    /// Restricts reporting to presence/multiplicity and mandatory
    /// reference-model checks.
    pub fn with_required_only(mut self, required_only: bool) -> Self {
        self.config.required_only = required_only;
        self
    }

    /// Sets the maximum traversal depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Enables or disables unit-string validation.
    pub fn with_units(mut self, check_units: bool) -> Self {
        self.config.check_units = check_units;
        self
    }

    /// Enables or disables terminology checks.
    pub fn with_terminology(mut self, check_terminology: bool) -> Self {
        self.config.check_terminology = check_terminology;
        self
    }

    /// Enables or disables RM type-name checks.
    pub fn with_rm_types(mut self, check_rm_types: bool) -> Self {
        self.config.check_rm_types = check_rm_types;
        self
    }

    /// Builds the ValidatorConfig.
    pub fn build(self) -> ValidatorConfig {
        self.config
    }
}
