//! Evaluation requests in JSON form.
//!
//! ```json
//! {
//!   "variables":  {"user": {"type": "map", "value": {...}}},
//!   "platform":   {"daysSinceEvent": [{"type": "string", "value": "test"}]},
//!   "device":     {"timeSinceEvent": []},
//!   "expression": "platform.daysSinceEvent(\"test\") == user.some_value",
//!   "limits":     {"max_steps": 10000}
//! }
//! ```
//!
//! `variables` may also be a wire `map` record, or the older
//! `{"map": {name: wire}}` shape. `computed` is accepted as another name for
//! `platform`; `device` declares device properties the same way.
//! `expression` is either source text or a pre-parsed AST.
//! Unknown top-level fields are ignored.

use std::borrow::Cow;

use serde::Deserialize;
use serde_json::{Map as JsonMap, Value as Json};
use supercel_eval::{EvalLimits, Environment, HostNamespace, PlatformDeclarations};
use supercel_ir::Expr;
use supercel_parse::{parse, ParseError};
use supercel_value::{decode, DecodeError, Value, ValueMap};

/// Why a request could not be decoded.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("invalid request: {0}")]
    Json(String),
    #[error("invalid variables: {0}")]
    Variables(DecodeError),
    #[error("invalid {namespace} declaration `{name}`: {message}")]
    Declaration {
        namespace: HostNamespace,
        name: String,
        message: String,
    },
}

/// The expression to evaluate.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExpressionSource {
    Text(String),
    Ast(Expr),
}

impl ExpressionSource {
    /// The tree to evaluate, parsing text on the way.
    pub fn to_ast(&self) -> Result<Cow<'_, Expr>, ParseError> {
        match self {
            ExpressionSource::Text(text) => parse(text).map(Cow::Owned),
            ExpressionSource::Ast(ast) => Ok(Cow::Borrowed(ast)),
        }
    }

    /// Source text, if the request carried text.
    pub fn text(&self) -> Option<&str> {
        match self {
            ExpressionSource::Text(text) => Some(text),
            ExpressionSource::Ast(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct RawRequest {
    #[serde(default)]
    variables: Json,
    #[serde(default, alias = "computed")]
    platform: Json,
    #[serde(default)]
    device: Json,
    expression: ExpressionSource,
    #[serde(default)]
    limits: EvalLimits,
}

/// A decoded evaluation request.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalRequest {
    pub environment: Environment,
    pub expression: ExpressionSource,
    pub limits: EvalLimits,
}

impl EvalRequest {
    pub fn new(environment: Environment, expression: ExpressionSource) -> Self {
        EvalRequest {
            environment,
            expression,
            limits: EvalLimits::default(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, RequestError> {
        let raw: RawRequest =
            serde_json::from_str(text).map_err(|e| RequestError::Json(e.to_string()))?;
        let variables = decode_variables(&raw.variables).map_err(RequestError::Variables)?;
        let platform = decode_declarations(HostNamespace::Computed, &raw.platform)?;
        let device = decode_declarations(HostNamespace::Device, &raw.device)?;
        Ok(EvalRequest {
            environment: Environment::new(variables)
                .with_platform(platform)
                .with_device(device),
            expression: raw.expression,
            limits: raw.limits,
        })
    }
}

fn decode_variables(json: &Json) -> Result<ValueMap, DecodeError> {
    let entries = match json {
        Json::Null => return Ok(ValueMap::default()),
        Json::Object(obj) if is_wire_record(obj) => {
            return match decode(json)? {
                Value::Map(map) => Ok(map),
                other => Err(DecodeError::PayloadMismatch {
                    path: "$".into(),
                    tag: other.kind(),
                    expected: "a map of variables",
                }),
            };
        }
        Json::Object(obj) => match legacy_map(obj) {
            Some(inner) => inner,
            None => obj,
        },
        _ => return Err(DecodeError::NotAnObject { path: "$".into() }),
    };

    let mut variables = ValueMap::default();
    variables.reserve(entries.len());
    for (name, wire) in entries {
        let value = decode(wire).map_err(|err| prefix_path(err, name))?;
        variables.insert(name.clone(), value);
    }
    Ok(variables)
}

/// `{"type": "...", "value": ...}` and nothing else.
fn is_wire_record(obj: &JsonMap<String, Json>) -> bool {
    obj.len() == 2 && matches!(obj.get("type"), Some(Json::String(_))) && obj.contains_key("value")
}

/// `{"map": {name: wire}}`, unless `map` is itself a variable holding a
/// wire value.
fn legacy_map(obj: &JsonMap<String, Json>) -> Option<&JsonMap<String, Json>> {
    if obj.len() != 1 {
        return None;
    }
    match obj.get("map") {
        Some(Json::Object(inner)) if !inner.contains_key("type") => Some(inner),
        _ => None,
    }
}

/// Re-root a decode error path from `$` to `$.name`.
fn prefix_path(err: DecodeError, name: &str) -> DecodeError {
    let reroot = |path: String| format!("$.{name}{}", path.strip_prefix('$').unwrap_or(&path));
    match err {
        DecodeError::NotAnObject { path } => DecodeError::NotAnObject { path: reroot(path) },
        DecodeError::MissingType { path } => DecodeError::MissingType { path: reroot(path) },
        DecodeError::UnknownType { path, tag } => DecodeError::UnknownType {
            path: reroot(path),
            tag,
        },
        DecodeError::MissingValue { path, tag } => DecodeError::MissingValue {
            path: reroot(path),
            tag,
        },
        DecodeError::PayloadMismatch {
            path,
            tag,
            expected,
        } => DecodeError::PayloadMismatch {
            path: reroot(path),
            tag,
            expected,
        },
        DecodeError::Syntax(message) => DecodeError::Syntax(message),
    }
}

fn decode_declarations(
    namespace: HostNamespace,
    json: &Json,
) -> Result<PlatformDeclarations, RequestError> {
    let entries = match json {
        Json::Null => return Ok(PlatformDeclarations::new()),
        Json::Object(entries) => entries,
        other => {
            return Err(RequestError::Declaration {
                namespace,
                name: String::new(),
                message: format!("expected an object of declarations, found {other}"),
            })
        }
    };
    let mut declarations = PlatformDeclarations::new();
    for (name, args) in entries {
        let args = match args {
            Json::Null => Vec::new(),
            Json::Array(items) => items
                .iter()
                .map(decode)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| RequestError::Declaration {
                    namespace,
                    name: name.clone(),
                    message: err.to_string(),
                })?,
            _ => {
                return Err(RequestError::Declaration {
                    namespace,
                    name: name.clone(),
                    message: "expected an array of wire values".into(),
                })
            }
        };
        declarations.declare(name.clone(), args);
    }
    Ok(declarations)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use supercel_ir::ExprKind;

    #[test]
    fn full_request() {
        let request = EvalRequest::from_json(
            r#"{
                "variables": {"user": {"type": "map", "value": {
                    "some_value": {"type": "uint", "value": 7}
                }}},
                "platform": {"daysSinceEvent": [{"type": "string", "value": "test"}]},
                "expression": "user.some_value",
                "limits": {"max_steps": 100}
            }"#,
        )
        .unwrap();
        assert_eq!(
            request.environment.resolve(&["user", "some_value"]).unwrap(),
            &Value::Uint(7)
        );
        assert_eq!(
            request.environment.platform().get("daysSinceEvent"),
            Some(&[Value::string("test")][..])
        );
        assert_eq!(request.expression.text(), Some("user.some_value"));
        assert_eq!(request.limits.max_steps, Some(100));
        assert_eq!(request.limits.max_host_calls, None);
    }

    #[test]
    fn variables_shapes() {
        let wire = r#"{"variables": {"type": "map", "value": {"x": {"type": "int", "value": 1}}},
                       "expression": "x"}"#;
        let legacy = r#"{"variables": {"map": {"x": {"type": "int", "value": 1}}},
                         "expression": "x"}"#;
        let plain = r#"{"variables": {"x": {"type": "int", "value": 1}}, "expression": "x"}"#;
        for text in [wire, legacy, plain] {
            let request = EvalRequest::from_json(text).unwrap();
            assert_eq!(request.environment.resolve(&["x"]).unwrap(), &Value::Int(1), "{text}");
        }

        // A variable that happens to be called `map`.
        let named_map = r#"{"variables": {"map": {"type": "bool", "value": true}},
                            "expression": "map"}"#;
        let request = EvalRequest::from_json(named_map).unwrap();
        assert_eq!(request.environment.resolve(&["map"]).unwrap(), &Value::Bool(true));
    }

    #[test]
    fn computed_is_an_alias_for_platform() {
        let request =
            EvalRequest::from_json(r#"{"computed": {"f": []}, "expression": "1"}"#).unwrap();
        assert!(request.environment.platform().contains("f"));
        assert!(request.environment.variables().is_empty());
    }

    #[test]
    fn device_declarations() {
        let request = EvalRequest::from_json(
            r#"{"computed": {"daysSinceEvent": []},
                "device": {"timeSinceEvent": [{"type": "string", "value": "e"}]},
                "expression": "1"}"#,
        )
        .unwrap();
        assert!(request.environment.platform().contains("daysSinceEvent"));
        assert_eq!(
            request.environment.device().get("timeSinceEvent"),
            Some(&[Value::string("e")][..])
        );
    }

    #[test]
    fn pre_parsed_expression() {
        let request = EvalRequest::from_json(
            r#"{"expression": {"kind": {"type": "Ident", "value": "x"}}}"#,
        )
        .unwrap();
        assert_eq!(request.expression.text(), None);
        let ast = request.expression.to_ast().unwrap();
        assert_eq!(ast.kind, ExprKind::Ident("x".into()));
    }

    #[test]
    fn bad_variable_reports_path() {
        let err = EvalRequest::from_json(
            r#"{"variables": {"user": {"type": "map", "value": {"age": {"type": "int", "value": "x"}}}},
                "expression": "1"}"#,
        )
        .unwrap_err();
        let RequestError::Variables(decode_err) = err else {
            panic!("expected a variables error, got {err}");
        };
        assert_eq!(decode_err.path(), "$.user.age");
    }

    #[test]
    fn malformed_requests() {
        assert!(matches!(
            EvalRequest::from_json("{"),
            Err(RequestError::Json(_))
        ));
        assert!(matches!(
            EvalRequest::from_json(r#"{"variables": {}}"#),
            Err(RequestError::Json(_))
        ));
        assert!(matches!(
            EvalRequest::from_json(r#"{"platform": {"f": 1}, "expression": "1"}"#),
            Err(RequestError::Declaration {
                namespace: HostNamespace::Computed,
                ..
            })
        ));
        assert!(matches!(
            EvalRequest::from_json(r#"{"device": [], "expression": "1"}"#),
            Err(RequestError::Declaration {
                namespace: HostNamespace::Device,
                ..
            })
        ));
        assert!(matches!(
            EvalRequest::from_json(r#"{"limits": {"max_stepz": 1}, "expression": "1"}"#),
            Err(RequestError::Json(_))
        ));
    }
}
