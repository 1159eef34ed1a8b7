//! JSON <-> SQLite value conversion
//!
//! Parameters arrive as JSON scalars; result cells leave as JSON scalars.

use base64::Engine;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};

use crate::error::{GatewayError, GatewayResult};

/// Convert one JSON parameter into a bindable SQLite value.
///
/// Arrays and objects are rejected; booleans bind as 0/1.
pub fn json_to_sql(value: &Value) -> GatewayResult<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::Real(f))
            } else {
                Err(GatewayError::invalid_request(format!(
                    "Unsupported numeric parameter: {}",
                    n
                )))
            }
        }
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(GatewayError::invalid_request(
            "Query parameters must be scalars (string, number, bool or null).",
        )),
    }
}

/// Convert a parameter list, keeping order.
pub fn json_params(values: &[Value]) -> GatewayResult<Vec<SqlValue>> {
    values.iter().map(json_to_sql).collect()
}

/// Convert one result cell into JSON. Blobs become base64 strings.
pub fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(base64::engine::general_purpose::STANDARD.encode(b)),
    }
}
