//! Conversion between plain JSON and Firestore typed values.
//!
//! Firestore REST wraps every value in a single-key object naming its type
//! (`{"stringValue": "x"}`, `{"integerValue": "1"}`, ...). Documents are
//! encoded and decoded here so schema structs can use ordinary serde.

use serde_json::{Map, Number, Value, json};

/// Encode a JSON value as a Firestore value.
#[must_use]
pub fn to_firestore(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(values) => json!({
            "arrayValue": { "values": values.iter().map(to_firestore).collect::<Vec<_>>() }
        }),
        Value::Object(fields) => json!({ "mapValue": { "fields": to_firestore_fields(fields) } }),
    }
}

/// Encode a JSON object as a Firestore `fields` map.
#[must_use]
pub fn to_firestore_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), to_firestore(value)))
        .collect()
}

/// Decode a Firestore value into plain JSON.
///
/// Timestamps and references decode to their string form.
///
/// # Errors
///
/// Returns a message if the value is not a recognized typed value.
pub fn from_firestore(value: &Value) -> Result<Value, String> {
    let Some(object) = value.as_object() else {
        return Err(format!("expected a typed value, found {value}"));
    };
    let Some((kind, inner)) = object.iter().next() else {
        return Err("empty typed value".to_string());
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| format!("malformed booleanValue {inner}")),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .or_else(|| inner.as_i64())
            .map(|i| Value::Number(i.into()))
            .ok_or_else(|| format!("malformed integerValue {inner}")),
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("malformed doubleValue {inner}")),
        "stringValue" | "timestampValue" | "referenceValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| format!("malformed {kind} {inner}")),
        "arrayValue" => {
            let values = inner.get("values").and_then(Value::as_array);
            values
                .map_or(&[][..], Vec::as_slice)
                .iter()
                .map(from_firestore)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "mapValue" => {
            let empty = Map::new();
            let fields = inner.get("fields").and_then(Value::as_object).unwrap_or(&empty);
            from_firestore_fields(fields).map(Value::Object)
        }
        other => Err(format!("unsupported value type `{other}`")),
    }
}

/// Decode a Firestore `fields` map into a JSON object.
///
/// # Errors
///
/// Returns a message naming the first field that fails to decode.
pub fn from_firestore_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, String> {
    fields
        .iter()
        .map(|(key, value)| {
            from_firestore(value)
                .map(|decoded| (key.clone(), decoded))
                .map_err(|reason| format!("{key}: {reason}"))
        })
        .collect()
}
