//! JSON <-> sheet Value conversion utilities

use std::collections::HashMap;

use super::CliError;
use crate::{Record, Row, Value};

/// Convert serde_json::Value to a sheet Value
pub fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(obj) => {
            Value::Object(obj.into_iter().map(|(k, v)| (k, json_to_value(v))).collect())
        }
    }
}

/// Convert a sheet Value to serde_json::Value
pub fn value_to_json(v: Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(b),
        Value::Integer(i) => serde_json::Value::Number(i.into()),
        Value::Float(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s),
        Value::Array(arr) => serde_json::Value::Array(arr.into_iter().map(value_to_json).collect()),
        Value::Object(obj) => {
            serde_json::Value::Object(obj.into_iter().map(|(k, v)| (k, value_to_json(v))).collect())
        }
    }
}

/// Cell values from a JSON object. Bare names are placed in `scope`.
pub fn json_to_vars(json: &str, scope: &str) -> Result<HashMap<String, Value>, CliError> {
    let serde_json::Value::Object(obj) = serde_json::from_str(json)? else {
        return Err(CliError::InvalidInput {
            what: "vars",
            message: "expected a JSON object of cell names".to_string(),
        });
    };
    Ok(obj
        .into_iter()
        .map(|(name, v)| {
            let name = if name.contains('!') {
                name
            } else {
                format!("{}!{}", scope, name)
            };
            (name, json_to_value(v))
        })
        .collect())
}

/// A query result row from a JSON object, or from an array of column values.
pub fn json_to_row(v: serde_json::Value) -> Result<Row, CliError> {
    match v {
        serde_json::Value::Object(obj) => Ok(Row(obj.into_iter().map(|(k, v)| (k, json_to_value(v))).collect())),
        serde_json::Value::Array(values) => Ok(Row(values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), json_to_value(v)))
            .collect())),
        other => Err(CliError::InvalidInput {
            what: "row",
            message: format!("expected an object or array, got {}", other),
        }),
    }
}

/// A stored table row from a JSON object.
pub fn json_to_record(json: &str) -> Result<Record, CliError> {
    match json_to_value(serde_json::from_str(json)?) {
        Value::Object(record) => Ok(record),
        other => Err(CliError::InvalidInput {
            what: "row",
            message: format!("expected a JSON object, got {}", other.type_name()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vars_are_namespaced() {
        let vars = json_to_vars(r#"{ "x": 1, "budget!total": 2.5 }"#, "sheet").unwrap();
        assert_eq!(vars["sheet!x"], Value::Integer(1));
        assert_eq!(vars["budget!total"], Value::Float(2.5));
        assert!(json_to_vars("[1]", "sheet").is_err());
    }

    #[test]
    fn test_array_rows() {
        let row = json_to_row(serde_json::json!([3, "a"])).unwrap();
        assert_eq!(row.first(), Some(&Value::Integer(3)));
        assert_eq!(row.get("1"), Some(&Value::String("a".into())));
    }
}
