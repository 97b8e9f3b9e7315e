//! Builtin functions and methods.
//!
//! The set is fixed, so dispatch is a plain `match` on the name. `maybe` is
//! not here: it needs lazy arguments and lives in the evaluation loop.

use std::num::IntErrorKind;

use supercel_value::Value;

use crate::errors::{
    overflow, type_mismatch, undefined_reference, wrong_arg_count, EvalError, EvalResult,
};
use crate::operators::contains;

/// Name of the lazy fallback builtin handled by the evaluator.
pub const MAYBE: &str = "maybe";

fn require_args(name: &str, expected: usize, actual: usize) -> Result<(), EvalError> {
    if actual == expected {
        Ok(())
    } else {
        Err(wrong_arg_count(name, expected, actual))
    }
}

fn require_str_arg<'a>(name: &str, args: &'a [Value], index: usize) -> Result<&'a str, EvalError> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(type_mismatch(
            format!("string argument to {name}"),
            other.type_name(),
        )),
        None => Err(wrong_arg_count(name, index + 1, args.len())),
    }
}

/// Call a global builtin function with evaluated arguments.
pub fn call_function(name: &str, args: Vec<Value>) -> EvalResult {
    match name {
        "size" => {
            require_args(name, 1, args.len())?;
            size_of(&args[0])
        }
        "int" | "uint" | "double" | "string" => {
            let [arg]: [Value; 1] = args
                .try_into()
                .map_err(|args: Vec<Value>| wrong_arg_count(name, 1, args.len()))?;
            convert(name, arg)
        }
        _ => Err(undefined_reference(name)),
    }
}

/// Call a builtin method on an evaluated receiver.
pub fn call_method(receiver: &Value, name: &str, args: &[Value]) -> EvalResult {
    match name {
        "size" => {
            require_args(name, 0, args.len())?;
            size_of(receiver)
        }
        "contains" => {
            require_args(name, 1, args.len())?;
            match receiver {
                Value::List(_) => contains(receiver, &args[0]).map(Value::Bool),
                Value::String(s) => {
                    let needle = require_str_arg(name, args, 0)?;
                    Ok(Value::Bool(s.contains(needle)))
                }
                other => Err(type_mismatch("list or string receiver for contains", other.type_name())),
            }
        }
        "startsWith" | "endsWith" => {
            require_args(name, 1, args.len())?;
            let Value::String(s) = receiver else {
                return Err(type_mismatch(
                    format!("string receiver for {name}"),
                    receiver.type_name(),
                ));
            };
            let affix = require_str_arg(name, args, 0)?;
            Ok(Value::Bool(if name == "startsWith" {
                s.starts_with(affix)
            } else {
                s.ends_with(affix)
            }))
        }
        _ => Err(undefined_reference(format!(
            "{}.{name}",
            receiver.type_name()
        ))),
    }
}

fn size_of(value: &Value) -> EvalResult {
    let len = match value {
        Value::String(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        other => return Err(type_mismatch("string, list or map for size", other.type_name())),
    };
    i64::try_from(len)
        .map(Value::Int)
        .map_err(|_| overflow("size"))
}

// i64::MAX + 1 and u64::MAX + 1, both exact in f64.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;

fn convert(name: &str, arg: Value) -> EvalResult {
    match (name, arg) {
        ("int", Value::Int(n)) => Ok(Value::Int(n)),
        ("int", Value::Uint(n)) => i64::try_from(n)
            .map(Value::Int)
            .map_err(|_| overflow("uint to int conversion")),
        ("int", Value::Double(d)) => {
            let t = d.trunc();
            if t.is_finite() && (-I64_BOUND..I64_BOUND).contains(&t) {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "range checked above, fraction already truncated"
                )]
                let n = t as i64;
                Ok(Value::Int(n))
            } else {
                Err(overflow("double to int conversion"))
            }
        }
        ("int", Value::String(s)) => s.trim().parse::<i64>().map(Value::Int).map_err(|e| {
            match e.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                    overflow("string to int conversion")
                }
                _ => type_mismatch("integer text", format!("string {s:?}")),
            }
        }),

        ("uint", Value::Uint(n)) => Ok(Value::Uint(n)),
        ("uint", Value::Int(n)) => u64::try_from(n)
            .map(Value::Uint)
            .map_err(|_| overflow("int to uint conversion")),
        ("uint", Value::Double(d)) => {
            let t = d.trunc();
            if t.is_finite() && (0.0..U64_BOUND).contains(&t) {
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    reason = "range checked above, fraction already truncated"
                )]
                let n = t as u64;
                Ok(Value::Uint(n))
            } else {
                Err(overflow("double to uint conversion"))
            }
        }
        ("uint", Value::String(s)) => s.trim().parse::<u64>().map(Value::Uint).map_err(|e| {
            match e.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                    overflow("string to uint conversion")
                }
                _ => type_mismatch("unsigned integer text", format!("string {s:?}")),
            }
        }),

        ("double", Value::Double(d)) => Ok(Value::Double(d)),
        #[allow(clippy::cast_precision_loss, reason = "int to double rounds to nearest")]
        ("double", Value::Int(n)) => Ok(Value::Double(n as f64)),
        #[allow(clippy::cast_precision_loss, reason = "uint to double rounds to nearest")]
        ("double", Value::Uint(n)) => Ok(Value::Double(n as f64)),
        ("double", Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(d) if d.is_finite() => Ok(Value::Double(d)),
            Ok(_) => Err(overflow("string to double conversion")),
            Err(_) => Err(type_mismatch("numeric text", format!("string {s:?}"))),
        },

        ("string", Value::String(s)) => Ok(Value::String(s)),
        ("string", Value::Bool(b)) => Ok(Value::String(b.to_string())),
        ("string", Value::Int(n)) => Ok(Value::String(n.to_string())),
        ("string", Value::Uint(n)) => Ok(Value::String(n.to_string())),
        ("string", Value::Double(d)) => Ok(Value::String(d.to_string())),

        (name, other) => Err(type_mismatch(
            format!("convertible argument to {name}"),
            other.type_name(),
        )),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(name: &str, arg: Value) -> EvalResult {
        call_function(name, vec![arg])
    }

    #[test]
    fn size_counts_chars() {
        assert_eq!(call("size", Value::string("héllo")).unwrap(), Value::Int(5));
        assert_eq!(
            call("size", Value::List(vec![Value::Null, Value::Null])).unwrap(),
            Value::Int(2)
        );
        assert_eq!(call("size", Value::Int(3)).unwrap_err().code(), "type_mismatch");
    }

    #[test]
    fn int_conversions_are_range_checked() {
        assert_eq!(call("int", Value::Uint(7)).unwrap(), Value::Int(7));
        assert_eq!(call("int", Value::Double(-2.9)).unwrap(), Value::Int(-2));
        assert_eq!(call("int", Value::string(" 42 ")).unwrap(), Value::Int(42));
        assert_eq!(call("int", Value::Uint(u64::MAX)).unwrap_err().code(), "overflow");
        assert_eq!(call("int", Value::Double(1e19)).unwrap_err().code(), "overflow");
        assert_eq!(
            call("int", Value::string("99999999999999999999")).unwrap_err().code(),
            "overflow"
        );
        assert_eq!(call("int", Value::string("abc")).unwrap_err().code(), "type_mismatch");
        assert_eq!(call("int", Value::Null).unwrap_err().code(), "type_mismatch");
    }

    #[test]
    fn uint_conversions_are_range_checked() {
        assert_eq!(call("uint", Value::Int(7)).unwrap(), Value::Uint(7));
        assert_eq!(call("uint", Value::Int(-1)).unwrap_err().code(), "overflow");
        assert_eq!(call("uint", Value::Double(-0.5)).unwrap(), Value::Uint(0));
        assert_eq!(call("uint", Value::Double(-1.5)).unwrap_err().code(), "overflow");
    }

    #[test]
    fn double_and_string_conversions() {
        assert_eq!(call("double", Value::Int(2)).unwrap(), Value::Double(2.0));
        assert_eq!(call("double", Value::string("2.5")).unwrap(), Value::Double(2.5));
        assert_eq!(call("double", Value::string("inf")).unwrap_err().code(), "overflow");
        assert_eq!(call("string", Value::Uint(7)).unwrap(), Value::string("7"));
        assert_eq!(call("string", Value::Bool(true)).unwrap(), Value::string("true"));
        assert_eq!(
            call("string", Value::List(vec![])).unwrap_err().code(),
            "type_mismatch"
        );
    }

    #[test]
    fn unknown_function_and_arity() {
        assert_eq!(
            call_function("nope", vec![]).unwrap_err().to_string(),
            "undefined reference: nope"
        );
        assert_eq!(
            call_function("size", vec![]).unwrap_err().to_string(),
            "size expects 1 argument, got 0"
        );
    }

    #[test]
    fn string_methods() {
        let s = Value::string("hello world");
        let arg = [Value::string("hello")];
        assert_eq!(call_method(&s, "startsWith", &arg).unwrap(), Value::Bool(true));
        assert_eq!(call_method(&s, "endsWith", &arg).unwrap(), Value::Bool(false));
        assert_eq!(call_method(&s, "contains", &[Value::string("o w")]).unwrap(), Value::Bool(true));
        assert_eq!(call_method(&s, "size", &[]).unwrap(), Value::Int(11));
        assert_eq!(
            call_method(&s, "contains", &[Value::Int(1)]).unwrap_err().code(),
            "type_mismatch"
        );
    }

    #[test]
    fn list_contains_uses_strict_equality() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(call_method(&list, "contains", &[Value::Int(2)]).unwrap(), Value::Bool(true));
        assert_eq!(
            call_method(&list, "contains", &[Value::Uint(2)]).unwrap_err().code(),
            "type_mismatch"
        );
    }

    #[test]
    fn unknown_method_and_bad_receiver() {
        assert_eq!(
            call_method(&Value::Int(1), "frobnicate", &[]).unwrap_err().to_string(),
            "undefined reference: int.frobnicate"
        );
        assert_eq!(
            call_method(&Value::Int(1), "startsWith", &[Value::string("1")])
                .unwrap_err()
                .code(),
            "type_mismatch"
        );
    }
}
