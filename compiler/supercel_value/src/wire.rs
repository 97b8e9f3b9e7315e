//! JSON wire encoding of values.
//!
//! Every value is an object `{"type": <tag>, "value": <payload>}`:
//!
//! | tag      | payload                                  |
//! |----------|------------------------------------------|
//! | `null`   | `null` (may be omitted on input)         |
//! | `bool`   | JSON boolean                             |
//! | `int`    | JSON integer in `i64` range              |
//! | `uint`   | non-negative JSON integer in `u64` range |
//! | `double` | any JSON number (`float` accepted too)   |
//! | `string` | JSON string                              |
//! | `list`   | array of wire values                     |
//! | `map`    | object of key -> wire value              |
//!
//! Unknown extra fields next to `type`/`value` are ignored on input.
//! Encoding always emits exactly the two fields.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map as JsonMap, Number, Value as Json};

use crate::{Value, ValueKind, ValueMap};

/// Malformed wire input. `path` locates the offending value, e.g.
/// `$.user.tags[2]`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("{path}: expected a {{\"type\", \"value\"}} object")]
    NotAnObject { path: String },
    #[error("{path}: missing \"type\" tag")]
    MissingType { path: String },
    #[error("{path}: unknown type tag {tag:?}")]
    UnknownType { path: String, tag: String },
    #[error("{path}: missing \"value\" for type {tag}")]
    MissingValue { path: String, tag: ValueKind },
    #[error("{path}: {tag} payload must be {expected}")]
    PayloadMismatch {
        path: String,
        tag: ValueKind,
        expected: &'static str,
    },
    #[error("invalid JSON: {0}")]
    Syntax(String),
}

impl DecodeError {
    /// Location of the bad value; empty for JSON syntax errors.
    pub fn path(&self) -> &str {
        match self {
            DecodeError::NotAnObject { path }
            | DecodeError::MissingType { path }
            | DecodeError::UnknownType { path, .. }
            | DecodeError::MissingValue { path, .. }
            | DecodeError::PayloadMismatch { path, .. } => path,
            DecodeError::Syntax(_) => "",
        }
    }
}

/// Encode a value to its wire form. Total.
///
/// A non-finite `Double` (never produced by the evaluator) encodes with a
/// `null` payload, which `decode` rejects.
pub fn encode(value: &Value) -> Json {
    let payload = match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(n) => Json::from(*n),
        Value::Uint(n) => Json::from(*n),
        Value::Double(d) => Number::from_f64(*d).map_or(Json::Null, Json::Number),
        Value::String(s) => Json::String(s.clone()),
        Value::List(items) => Json::Array(items.iter().map(encode).collect()),
        Value::Map(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), encode(v)))
                .collect::<JsonMap<String, Json>>(),
        ),
    };
    json!({ "type": value.kind().as_str(), "value": payload })
}

/// Encode a value to JSON text.
pub fn encode_string(value: &Value) -> String {
    encode(value).to_string()
}

/// Decode a wire value.
pub fn decode(wire: &Json) -> Result<Value, DecodeError> {
    decode_at(wire, &mut String::from("$"))
}

/// Parse JSON text and decode it as a wire value.
pub fn decode_str(text: &str) -> Result<Value, DecodeError> {
    let json: Json =
        serde_json::from_str(text).map_err(|e| DecodeError::Syntax(e.to_string()))?;
    decode(&json)
}

/// Decode with `path` naming the current position. `path` is restored
/// before returning so siblings can reuse the buffer.
fn decode_at(wire: &Json, path: &mut String) -> Result<Value, DecodeError> {
    let Json::Object(record) = wire else {
        return Err(DecodeError::NotAnObject { path: path.clone() });
    };
    let tag = match record.get("type") {
        Some(Json::String(tag)) => tag,
        Some(_) | None => return Err(DecodeError::MissingType { path: path.clone() }),
    };
    let Some(kind) = ValueKind::from_tag(tag) else {
        return Err(DecodeError::UnknownType {
            path: path.clone(),
            tag: tag.clone(),
        });
    };

    let payload = match (kind, record.get("value")) {
        (ValueKind::Null, None | Some(Json::Null)) => return Ok(Value::Null),
        (_, None) => {
            return Err(DecodeError::MissingValue {
                path: path.clone(),
                tag: kind,
            })
        }
        (_, Some(payload)) => payload,
    };

    match kind {
        ValueKind::Null => Err(mismatch(path, kind, "null")),
        ValueKind::Bool => payload
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| mismatch(path, kind, "a boolean")),
        ValueKind::Int => payload
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| mismatch(path, kind, "an integer in i64 range")),
        ValueKind::Uint => payload
            .as_u64()
            .map(Value::Uint)
            .ok_or_else(|| mismatch(path, kind, "a non-negative integer in u64 range")),
        ValueKind::Double => payload
            .as_f64()
            .map(Value::Double)
            .ok_or_else(|| mismatch(path, kind, "a number")),
        ValueKind::String => payload
            .as_str()
            .map(|s| Value::String(s.to_owned()))
            .ok_or_else(|| mismatch(path, kind, "a string")),
        ValueKind::List => {
            let Json::Array(items) = payload else {
                return Err(mismatch(path, kind, "an array"));
            };
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let len = path.len();
                path.push_str(&format!("[{i}]"));
                let decoded = decode_at(item, path);
                path.truncate(len);
                out.push(decoded?);
            }
            Ok(Value::List(out))
        }
        ValueKind::Map => {
            let Json::Object(entries) = payload else {
                return Err(mismatch(path, kind, "an object"));
            };
            let mut out = ValueMap::default();
            out.reserve(entries.len());
            for (key, item) in entries {
                let len = path.len();
                path.push('.');
                path.push_str(key);
                let decoded = decode_at(item, path);
                path.truncate(len);
                out.insert(key.clone(), decoded?);
            }
            Ok(Value::Map(out))
        }
    }
}

#[cold]
fn mismatch(path: &str, tag: ValueKind, expected: &'static str) -> DecodeError {
    DecodeError::PayloadMismatch {
        path: path.to_owned(),
        tag,
        expected,
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        encode(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = Json::deserialize(deserializer)?;
        decode(&wire).map_err(D::Error::custom)
    }
}
