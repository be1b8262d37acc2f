//! Built-in fallback unit service.
//!
//! A small table of common clinical UCUM units grouped by dimension, used
//! when no richer external service is configured or when one fails to
//! initialize. Linear factors convert within a group; Celsius/Kelvin is the
//! one affine pair handled specially.

use crate::traits::{UnitConversion, UnitService, UnitStatus, UnitValidation};

/// `(unit, dimension group, factor to the group's base unit)`.
///
/// Common clinical UCUM units. `1` is the UCUM dimensionless unity.
static UNIT_TABLE: &[(&str, &str, f64)] = &[
    // pressure (base Pa)
    ("Pa", "pressure", 1.0),
    ("kPa", "pressure", 1000.0),
    ("mm[Hg]", "pressure", 133.322),
    // mass (base g)
    ("g", "mass", 1.0),
    ("kg", "mass", 1000.0),
    ("mg", "mass", 0.001),
    ("ug", "mass", 1e-6),
    // length (base m)
    ("m", "length", 1.0),
    ("cm", "length", 0.01),
    ("mm", "length", 0.001),
    ("[in_i]", "length", 0.0254),
    // time (base s)
    ("s", "time", 1.0),
    ("min", "time", 60.0),
    ("h", "time", 3600.0),
    ("d", "time", 86400.0),
    ("wk", "time", 604800.0),
    ("mo", "time", 2_629_800.0),
    ("a", "time", 31_557_600.0),
    // volume (base l)
    ("l", "volume", 1.0),
    ("dl", "volume", 0.1),
    ("ml", "volume", 0.001),
    // temperature (base Cel; affine K handled in convert)
    ("Cel", "temperature", 1.0),
    ("K", "temperature", 1.0),
    ("[degF]", "temperature", 1.0),
    // frequency (base /s)
    ("/s", "frequency", 1.0),
    ("/min", "frequency", 1.0 / 60.0),
    ("/h", "frequency", 1.0 / 3600.0),
    ("/d", "frequency", 1.0 / 86400.0),
    // substance concentration (base mmol/l)
    ("mmol/l", "concentration", 1.0),
    ("umol/l", "concentration", 0.001),
    // mass concentration (base g/l)
    ("g/l", "mass_concentration", 1.0),
    ("mg/dl", "mass_concentration", 0.01),
    ("g/dl", "mass_concentration", 10.0),
    // dimensionless
    ("1", "dimensionless", 1.0),
    ("%", "dimensionless", 0.01),
];

fn lookup(unit: &str) -> Option<(&'static str, f64)> {
    UNIT_TABLE
        .iter()
        .find(|(u, _, _)| *u == unit)
        .map(|(_, group, factor)| (*group, *factor))
}

/// Unit service backed by the built-in table.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackUnitService;

impl FallbackUnitService {
    /// Creates the service. No initialization is needed.
    pub fn new() -> Self {
        FallbackUnitService
    }
}

impl UnitService for FallbackUnitService {
    fn validate(&self, unit: &str) -> UnitValidation {
        if unit.is_empty() {
            return UnitValidation::invalid("empty unit string");
        }
        if lookup(unit).is_some() {
            UnitValidation::valid()
        } else {
            UnitValidation::invalid(format!("unknown unit `{}`", unit))
        }
    }

    fn convert(&self, value: f64, from: &str, to: &str) -> UnitConversion {
        let (Some((from_group, from_factor)), Some((to_group, to_factor))) =
            (lookup(from), lookup(to))
        else {
            return UnitConversion::failed();
        };
        if from_group != to_group {
            return UnitConversion::failed();
        }
        let converted = if from_group == "temperature" {
            convert_temperature(value, from, to)
        } else {
            Some(value * from_factor / to_factor)
        };
        match converted {
            Some(converted) => UnitConversion {
                status: UnitStatus::Valid,
                value: Some(converted),
                unit: Some(to.to_string()),
            },
            None => UnitConversion::failed(),
        }
    }

    fn are_compatible(&self, a: &str, b: &str) -> bool {
        match (lookup(a), lookup(b)) {
            (Some((group_a, _)), Some((group_b, _))) => group_a == group_b,
            _ => false,
        }
    }
}

fn convert_temperature(value: f64, from: &str, to: &str) -> Option<f64> {
    let celsius = match from {
        "Cel" => value,
        "K" => value - 273.15,
        "[degF]" => (value - 32.0) / 1.8,
        _ => return None,
    };
    match to {
        "Cel" => Some(celsius),
        "K" => Some(celsius + 273.15),
        "[degF]" => Some(celsius * 1.8 + 32.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_units_validate() {
        let service = FallbackUnitService::new();
        assert_eq!(service.validate("mm[Hg]").status, UnitStatus::Valid);
        assert_eq!(service.validate("kPa").status, UnitStatus::Valid);
        assert_eq!(service.validate("furlong").status, UnitStatus::Invalid);
        assert_eq!(service.validate("").status, UnitStatus::Invalid);
    }

    #[test]
    fn linear_conversion() {
        let service = FallbackUnitService::new();
        let result = service.convert(1.0, "kPa", "mm[Hg]");
        assert_eq!(result.status, UnitStatus::Valid);
        let value = result.value.unwrap();
        assert!((value - 7.5006).abs() < 0.001, "got {}", value);

        let result = service.convert(2.0, "kg", "g");
        assert_eq!(result.value, Some(2000.0));
    }

    #[test]
    fn affine_temperature_conversion() {
        let service = FallbackUnitService::new();
        let result = service.convert(0.0, "Cel", "K");
        assert_eq!(result.value, Some(273.15));
        let result = service.convert(98.6, "[degF]", "Cel");
        assert!((result.value.unwrap() - 37.0).abs() < 0.01);
    }

    #[test]
    fn incompatible_dimensions_fail() {
        let service = FallbackUnitService::new();
        assert!(!service.are_compatible("kg", "mm[Hg]"));
        assert!(service.are_compatible("mg/dl", "g/l"));
        assert_eq!(service.convert(1.0, "kg", "s").status, UnitStatus::Error);
    }
}
