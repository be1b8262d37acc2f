//! The data-instance side of validation.
//!
//! The engine never duck-types its input: a data instance is an explicit
//! small variant of primitives, named-field objects, and collections, with
//! explicit field lookup.

use crate::error::{ValidatorError, ValidatorResult};

/// One node of a data instance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataValue {
    /// Boolean primitive.
    Boolean(bool),
    /// Integer primitive.
    Integer(i64),
    /// Real primitive.
    Real(f64),
    /// String primitive.
    String(String),
    /// Named-field object.
    Object(DataObject),
    /// Collection of values.
    List(Vec<DataValue>),
}

/// A named-field object node, optionally carrying its dynamic RM type name.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataObject {
    /// Dynamic type name, e.g. `DV_QUANTITY`, if the instance carries one.
    pub rm_type: Option<String>,
    /// Fields in insertion order.
    pub fields: Vec<(String, DataValue)>,
}

impl DataObject {
    /// Creates an empty object with the given dynamic type name.
    pub fn typed(rm_type: impl Into<String>) -> Self {
        DataObject {
            rm_type: Some(rm_type.into()),
            fields: Vec::new(),
        }
    }

    /// Adds a field, builder style.
    pub fn with_field(mut self, name: impl Into<String>, value: DataValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&DataValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

impl DataValue {
    /// The fields of an object value.
    pub fn as_object(&self) -> Option<&DataObject> {
        match self {
            DataValue::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Real(r) => Some(*r),
            DataValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The value of a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Field lookup that tolerates non-object values.
    pub fn get(&self, name: &str) -> Option<&DataValue> {
        self.as_object().and_then(|o| o.get(name))
    }

    /// Short description of the value's own type, for messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            DataValue::Boolean(_) => "boolean",
            DataValue::Integer(_) => "integer",
            DataValue::Real(_) => "real",
            DataValue::String(_) => "string",
            DataValue::Object(_) => "object",
            DataValue::List(_) => "list",
        }
    }
}

#[cfg(feature = "json")]
impl DataValue {
    /// Converts a JSON value into a data instance.
    ///
    /// A `_type` or `@type` string field becomes the object's dynamic RM
    /// type name. JSON `null` has no counterpart and is rejected.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use adl2_validator::DataValue;
    ///
    /// let json = serde_json::json!({
    ///     "_type": "DV_QUANTITY",
    ///     "magnitude": 120.0,
    ///     "units": "mm[Hg]"
    /// });
    /// let value = DataValue::from_json(&json).unwrap();
    /// assert_eq!(
    ///     value.as_object().and_then(|o| o.rm_type.as_deref()),
    ///     Some("DV_QUANTITY")
    /// );
    /// ```
    pub fn from_json(json: &serde_json::Value) -> ValidatorResult<DataValue> {
        match json {
            serde_json::Value::Null => {
                Err(ValidatorError::UnsupportedData("null".to_string()))
            }
            serde_json::Value::Bool(b) => Ok(DataValue::Boolean(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(DataValue::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(DataValue::Real(f))
                } else {
                    Err(ValidatorError::UnsupportedData(n.to_string()))
                }
            }
            serde_json::Value::String(s) => Ok(DataValue::String(s.clone())),
            serde_json::Value::Array(items) => {
                let values = items
                    .iter()
                    .map(DataValue::from_json)
                    .collect::<ValidatorResult<Vec<_>>>()?;
                Ok(DataValue::List(values))
            }
            serde_json::Value::Object(map) => {
                let mut object = DataObject::default();
                for (key, value) in map {
                    if key == "_type" || key == "@type" {
                        if let Some(name) = value.as_str() {
                            object.rm_type = Some(name.to_string());
                            continue;
                        }
                    }
                    object.fields.push((key.clone(), DataValue::from_json(value)?));
                }
                Ok(DataValue::Object(object))
            }
        }
    }
}
