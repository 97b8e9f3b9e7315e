//! Evaluation responses in JSON form.
//!
//! `{"ok": <wire value>}` or
//! `{"error": {"kind": "type_mismatch", "message": "...", "position": 12}}`.

use serde::{Deserialize, Serialize};
use supercel_value::Value;

use crate::ContextError;

/// Structured error payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// snake_case error kind, e.g. `syntax_error` or `undefined_reference`.
    pub kind: String,
    pub message: String,
    /// Byte offset into the expression text, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

impl From<&ContextError> for ErrorBody {
    fn from(err: &ContextError) -> Self {
        ErrorBody {
            kind: err.kind().to_string(),
            message: err.to_string(),
            position: err.position(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
    Ok(Value),
    Error(ErrorBody),
}

impl Response {
    pub fn from_result(result: Result<Value, ContextError>) -> Self {
        match result {
            Ok(value) => Response::Ok(value),
            Err(err) => Response::Error(ErrorBody::from(&err)),
        }
    }

    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(err) => unreachable!("response serialization cannot fail: {err}"),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok(_))
    }
}
