//! Output schemas and their parsers.
//!
//! Every stage pairs a schema descriptor (shipped to the LLM capability) with
//! a total parser: `Value -> Ok(payload) | SchemaError(path, reason)`. The
//! parser, not the provider, is the source of truth for conformance.

use serde_json::Value;

#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    pub name: &'static str,
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    pub path: String,
    pub reason: String,
}

impl SchemaError {
    pub fn new<P: Into<String>, R: Into<String>>(path: P, reason: R) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

/// Field extraction helpers shared by the stage parsers.
pub mod fields {
    use super::{SchemaError, SchemaResult};
    use serde_json::Value;

    pub fn require_str<'a>(value: &'a Value, path: &str) -> SchemaResult<&'a str> {
        value
            .get(path)
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::new(path, "expected a string"))
    }

    pub fn optional_str(value: &Value, path: &str) -> Option<String> {
        value
            .get(path)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn require_bool(value: &Value, path: &str) -> SchemaResult<bool> {
        value
            .get(path)
            .and_then(Value::as_bool)
            .ok_or_else(|| SchemaError::new(path, "expected a boolean"))
    }

    pub fn require_confidence(value: &Value, path: &str) -> SchemaResult<f64> {
        let confidence = value
            .get(path)
            .and_then(Value::as_f64)
            .ok_or_else(|| SchemaError::new(path, "expected a number"))?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(SchemaError::new(
                path,
                format!("confidence {confidence} outside [0,1]"),
            ));
        }
        Ok(confidence)
    }

    pub fn string_list(value: &Value, path: &str) -> SchemaResult<Vec<String>> {
        match value.get(path) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        SchemaError::new(format!("{path}[{i}]"), "expected a string")
                    })
                })
                .collect(),
            Some(_) => Err(SchemaError::new(path, "expected an array of strings")),
        }
    }

    pub fn string_map(
        value: &Value,
        path: &str,
    ) -> SchemaResult<std::collections::BTreeMap<String, String>> {
        match value.get(path) {
            None | Some(Value::Null) => Ok(Default::default()),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| {
                    v.as_str().map(|s| (k.clone(), s.to_string())).ok_or_else(|| {
                        SchemaError::new(format!("{path}.{k}"), "expected a string value")
                    })
                })
                .collect(),
            Some(_) => Err(SchemaError::new(path, "expected an object of strings")),
        }
    }

    /// Parse an enum field through its serde representation.
    pub fn enum_value<T: serde::de::DeserializeOwned>(
        value: &Value,
        path: &str,
    ) -> SchemaResult<T> {
        let raw = require_str(value, path)?;
        serde_json::from_value(Value::String(raw.to_string()))
            .map_err(|_| SchemaError::new(path, format!("unrecognized value \"{raw}\"")))
    }
}

#[cfg(test)]
mod tests {
    use super::fields::*;
    use crate::domain::IndicatorFamily;
    use serde_json::json;

    #[test]
    fn test_require_confidence_bounds() {
        let value = json!({"confidence": 1.4});
        assert!(require_confidence(&value, "confidence").is_err());
        let value = json!({"confidence": 0.8});
        assert_eq!(require_confidence(&value, "confidence").unwrap(), 0.8);
    }

    #[test]
    fn test_enum_value_uses_serde_form() {
        let value = json!({"family": "price-value"});
        let family: IndicatorFamily = enum_value(&value, "family").unwrap();
        assert_eq!(family, IndicatorFamily::PriceValue);

        let bad = json!({"family": "price_value"});
        let err = enum_value::<IndicatorFamily>(&bad, "family").unwrap_err();
        assert_eq!(err.path, "family");
    }

    #[test]
    fn test_string_list_tolerates_absence() {
        let value = json!({});
        assert!(string_list(&value, "incorrectFields").unwrap().is_empty());

        let value = json!({"incorrectFields": ["scale", 3]});
        assert!(string_list(&value, "incorrectFields").is_err());
    }
}
