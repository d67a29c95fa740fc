//! Translation between plain JSON values and Firestore's typed value wrappers.
//!
//! Firestore's REST API wraps every field value in a single-key object naming
//! its type, e.g. `{"stringValue": "milk"}` or `{"integerValue": "42"}`
//! (64-bit integers travel as decimal strings). Types with no JSON
//! counterpart decode to the closest plain shape: timestamps, references and
//! bytes become strings, geo points become `{latitude, longitude}`.

use serde_json::{json, Map, Number, Value};

use crate::error::StoreError;
use crate::types::Fields;

/// Wrap a plain JSON value as a Firestore value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Wrap every field of a document.
pub fn encode_fields(fields: &Fields) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect()
}

/// Unwrap a Firestore value into plain JSON.
pub fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let wrapper = value
        .as_object()
        .ok_or_else(|| StoreError::Decode(format!("expected a typed value, got {value}")))?;
    let (kind, inner) = wrapper
        .iter()
        .next()
        .ok_or_else(|| StoreError::Decode("empty typed value".to_string()))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" | "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => {
            Ok(inner.clone())
        }
        "integerValue" => decode_integer(inner),
        "doubleValue" => decode_double(inner),
        "geoPointValue" => Ok(json!({
            "latitude": inner.get("latitude").cloned().unwrap_or(json!(0.0)),
            "longitude": inner.get("longitude").cloned().unwrap_or(json!(0.0)),
        })),
        "arrayValue" => {
            let values = match inner.get("values") {
                Some(Value::Array(values)) => values
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>, _>>()?,
                _ => Vec::new(),
            };
            Ok(Value::Array(values))
        }
        "mapValue" => {
            let fields = match inner.get("fields") {
                Some(Value::Object(fields)) => decode_fields(fields)?,
                _ => Fields::new(),
            };
            Ok(Value::Object(fields))
        }
        other => Err(StoreError::Decode(format!("unsupported value type {other}"))),
    }
}

/// Unwrap every field of a document.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Fields, StoreError> {
    fields
        .iter()
        .map(|(name, value)| Ok((name.clone(), decode_value(value)?)))
        .collect()
}

fn decode_integer(inner: &Value) -> Result<Value, StoreError> {
    let parsed = match inner {
        Value::String(s) => s.parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };
    parsed
        .map(|i| Value::Number(i.into()))
        .ok_or_else(|| StoreError::Decode(format!("bad integerValue {inner}")))
}

fn decode_double(inner: &Value) -> Result<Value, StoreError> {
    match inner {
        Value::Number(_) => Ok(inner.clone()),
        // NaN and infinities arrive as strings and have no JSON form.
        Value::String(s) => s
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| StoreError::Decode(format!("unrepresentable doubleValue {s}"))),
        _ => Err(StoreError::Decode(format!("bad doubleValue {inner}"))),
    }
}
