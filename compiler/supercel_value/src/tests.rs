use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn encode_scalars() {
    assert_eq!(encode(&Value::Null), json!({"type": "null", "value": null}));
    assert_eq!(encode(&Value::Bool(true)), json!({"type": "bool", "value": true}));
    assert_eq!(encode(&Value::Int(-3)), json!({"type": "int", "value": -3}));
    assert_eq!(encode(&Value::Uint(7)), json!({"type": "uint", "value": 7}));
    assert_eq!(encode(&Value::Double(1.5)), json!({"type": "double", "value": 1.5}));
    assert_eq!(
        encode(&Value::string("hi")),
        json!({"type": "string", "value": "hi"})
    );
}

#[test]
fn encode_nested_map() {
    let value = Value::map([(
        "user",
        Value::map([("some_value", Value::Uint(7))]),
    )]);
    assert_eq!(
        encode(&value),
        json!({
            "type": "map",
            "value": {
                "user": {"type": "map", "value": {
                    "some_value": {"type": "uint", "value": 7}
                }}
            }
        })
    );
}

#[test]
fn decode_nested_list() {
    let wire = json!({"type": "list", "value": [
        {"type": "int", "value": 1},
        {"type": "string", "value": "two"},
        {"type": "list", "value": []}
    ]});
    assert_eq!(
        decode(&wire).unwrap(),
        Value::List(vec![
            Value::Int(1),
            Value::string("two"),
            Value::List(vec![]),
        ])
    );
}

#[test]
fn decode_null_without_value() {
    assert_eq!(decode(&json!({"type": "null"})).unwrap(), Value::Null);
}

#[test]
fn decode_legacy_tags() {
    assert_eq!(
        decode(&json!({"type": "float", "value": 2.5})).unwrap(),
        Value::Double(2.5)
    );
    assert_eq!(
        decode(&json!({"type": "timestamp", "value": 1_700_000_000})).unwrap(),
        Value::Int(1_700_000_000)
    );
    // Re-encoding uses the canonical tag.
    assert_eq!(
        encode(&decode(&json!({"type": "float", "value": 2})).unwrap()),
        json!({"type": "double", "value": 2.0})
    );
}

#[test]
fn decode_ignores_extra_fields() {
    let wire = json!({"type": "bool", "value": false, "note": "from host"});
    assert_eq!(decode(&wire).unwrap(), Value::Bool(false));
}

#[test]
fn decode_rejects_unknown_tag() {
    let err = decode(&json!({"type": "bytes", "value": []})).unwrap_err();
    assert_eq!(
        err,
        DecodeError::UnknownType {
            path: "$".into(),
            tag: "bytes".into()
        }
    );
}

#[test]
fn decode_rejects_bytes_and_function_tags() {
    let payloads = [
        ("bytes", json!("aGk=")),
        ("function", json!({"name": "f", "args": []})),
    ];
    for (tag, value) in payloads {
        let wire = json!({"type": "list", "value": [{"type": tag, "value": value}]});
        let err = decode(&wire).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownType {
                path: "$[0]".into(),
                tag: tag.into()
            }
        );
    }
}

#[test]
fn decode_rejects_missing_type() {
    assert!(matches!(
        decode(&json!({"value": 1})),
        Err(DecodeError::MissingType { .. })
    ));
    assert!(matches!(
        decode(&json!(7)),
        Err(DecodeError::NotAnObject { .. })
    ));
}

#[test]
fn decode_rejects_payload_mismatch() {
    let err = decode(&json!({"type": "int", "value": "7"})).unwrap_err();
    assert!(matches!(err, DecodeError::PayloadMismatch { tag: ValueKind::Int, .. }));

    // Negative numbers are not uints, fractions are not ints.
    assert!(decode(&json!({"type": "uint", "value": -1})).is_err());
    assert!(decode(&json!({"type": "int", "value": 1.5})).is_err());
    assert!(decode(&json!({"type": "bool"})).is_err());
}

#[test]
fn decode_error_reports_nested_path() {
    let wire = json!({"type": "map", "value": {
        "user": {"type": "map", "value": {
            "tags": {"type": "list", "value": [
                {"type": "string", "value": "a"},
                {"type": "strnig", "value": "b"}
            ]}
        }}
    }});
    let err = decode(&wire).unwrap_err();
    assert_eq!(err.path(), "$.user.tags[1]");
    assert_eq!(err.to_string(), "$.user.tags[1]: unknown type tag \"strnig\"");
}

#[test]
fn decode_str_reports_json_syntax() {
    assert!(matches!(decode_str("{not json"), Err(DecodeError::Syntax(_))));
    assert_eq!(
        decode_str(r#"{"type":"uint","value":8}"#).unwrap(),
        Value::Uint(8)
    );
}

#[test]
fn uint_and_int_stay_distinct() {
    let uint = decode(&json!({"type": "uint", "value": 7})).unwrap();
    let int = decode(&json!({"type": "int", "value": 7})).unwrap();
    assert_ne!(uint, int);
    assert_eq!(uint.kind(), ValueKind::Uint);
}

#[test]
fn serde_impls_use_wire_form() {
    let value = Value::List(vec![Value::Uint(1), Value::Null]);
    let text = serde_json::to_string(&value).unwrap();
    let back: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(back, value);

    let bad: Result<Value, _> = serde_json::from_str(r#"{"type":"nope"}"#);
    assert!(bad.is_err());
}

#[test]
fn display_is_source_like() {
    let value = Value::map([
        ("b", Value::List(vec![Value::Uint(1), Value::Double(2.0)])),
        ("a", Value::string("x")),
    ]);
    assert_eq!(value.to_string(), r#"{"a": "x", "b": [1u, 2.0]}"#);
}

#[test]
fn kind_tags_round_trip() {
    for kind in [
        ValueKind::Null,
        ValueKind::Bool,
        ValueKind::Int,
        ValueKind::Uint,
        ValueKind::Double,
        ValueKind::String,
        ValueKind::List,
        ValueKind::Map,
    ] {
        assert_eq!(ValueKind::from_tag(kind.as_str()), Some(kind));
    }
}
