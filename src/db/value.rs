//! Firestore typed values.
//!
//! The REST API wraps every field in a typed envelope (`{"stringValue": "..."}`).
//! Decoding unwraps them into plain JSON. Timestamps, geo points and bytes keep the
//! serialized shape of the Firebase admin objects (`{"_seconds", "_nanoseconds"}` etc.)
//! that clients of the posts feed already parse.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::DateTime;
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::{json, Number, Value};

use crate::errors::AppError;
use crate::models::{Payload, Record};

/// Marker between the database name and the document path in resource names.
const DOCUMENTS_SEGMENT: &str = "/documents/";

/// Numeric field that may arrive as a JSON number or as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberRepr {
    Number(Number),
    Text(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LatLng {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<FirestoreValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, FirestoreValue>,
}

/// A single Firestore value in its REST encoding.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FirestoreValue {
    NullValue(IgnoredAny),
    BooleanValue(bool),
    IntegerValue(NumberRepr),
    DoubleValue(NumberRepr),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(LatLng),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

impl FirestoreValue {
    /// Unwrap into plain JSON.
    pub fn into_json(self) -> Result<Value, AppError> {
        match self {
            FirestoreValue::NullValue(_) => Ok(Value::Null),
            FirestoreValue::BooleanValue(b) => Ok(Value::Bool(b)),
            FirestoreValue::IntegerValue(n) => decode_integer(n),
            FirestoreValue::DoubleValue(n) => Ok(decode_double(n)),
            FirestoreValue::TimestampValue(ts) => decode_timestamp(&ts),
            FirestoreValue::StringValue(s) => Ok(Value::String(s)),
            FirestoreValue::BytesValue(b64) => decode_bytes(&b64),
            FirestoreValue::ReferenceValue(name) => {
                Ok(Value::String(relative_path(&name).to_string()))
            }
            FirestoreValue::GeoPointValue(point) => Ok(json!({
                "_latitude": point.latitude,
                "_longitude": point.longitude,
            })),
            FirestoreValue::ArrayValue(array) => array
                .values
                .into_iter()
                .map(FirestoreValue::into_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            FirestoreValue::MapValue(map) => decode_fields(map.fields).map(Value::Object),
        }
    }
}

/// Document resource as returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct FirestoreDocument {
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FirestoreValue>,
}

impl FirestoreDocument {
    pub fn into_record(self) -> Result<Record, AppError> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(Record::new(id, decode_fields(self.fields)?))
    }
}

/// Unwrap every field of a document or map value.
pub fn decode_fields(fields: BTreeMap<String, FirestoreValue>) -> Result<Payload, AppError> {
    fields
        .into_iter()
        .map(|(key, value)| value.into_json().map(|v| (key, v)))
        .collect()
}

fn decode_integer(n: NumberRepr) -> Result<Value, AppError> {
    match n {
        NumberRepr::Number(n) => Ok(Value::Number(n)),
        NumberRepr::Text(s) => s
            .parse::<i64>()
            .map(|i| Value::Number(i.into()))
            .map_err(|_| AppError::Database(format!("Invalid integerValue: {}", s))),
    }
}

// NaN and infinities have no JSON form and serialize as null.
fn decode_double(n: NumberRepr) -> Value {
    let f = match n {
        NumberRepr::Number(n) => n.as_f64(),
        NumberRepr::Text(s) => s.parse::<f64>().ok(),
    };
    f.and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn decode_timestamp(ts: &str) -> Result<Value, AppError> {
    let parsed = DateTime::parse_from_rfc3339(ts)
        .map_err(|e| AppError::Database(format!("Invalid timestampValue {}: {}", ts, e)))?;
    Ok(json!({
        "_seconds": parsed.timestamp(),
        "_nanoseconds": parsed.timestamp_subsec_nanos(),
    }))
}

fn decode_bytes(b64: &str) -> Result<Value, AppError> {
    let bytes = STANDARD
        .decode(b64)
        .map_err(|e| AppError::Database(format!("Invalid bytesValue: {}", e)))?;
    Ok(json!({ "type": "Buffer", "data": bytes }))
}

/// `projects/p/databases/d/documents/posts/abc` -> `posts/abc`
fn relative_path(name: &str) -> &str {
    match name.find(DOCUMENTS_SEGMENT) {
        Some(idx) => &name[idx + DOCUMENTS_SEGMENT.len()..],
        None => name,
    }
}
