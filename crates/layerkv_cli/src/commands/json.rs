//! Conversion between JSON text and stored values.

use crate::error::CliResult;
use layerkv_core::Value;
use serde_json::{Map, Number, Value as Json};

/// Parses JSON text into a stored value.
pub fn parse_value(text: &str) -> CliResult<Value> {
    let json: Json = serde_json::from_str(text)?;
    Ok(from_json(json))
}

/// Converts a JSON document into a stored value.
///
/// Integers that fit in `i64` stay integers; other numbers become floats.
pub fn from_json(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::Text(s),
        Json::Array(items) => Value::Array(items.into_iter().map(from_json).collect()),
        Json::Object(fields) => {
            Value::Map(fields.into_iter().map(|(k, v)| (k, from_json(v))).collect())
        }
    }
}

/// Converts a stored value into JSON.
///
/// Bytes become an array of numbers and non-finite floats become `null`,
/// since JSON has no form for either.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(i) => Json::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(fields) => Json::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect::<Map<String, Json>>(),
        ),
    }
}

/// Renders a stored value as compact JSON text.
pub fn render(value: &Value) -> String {
    to_json(value).to_string()
}
