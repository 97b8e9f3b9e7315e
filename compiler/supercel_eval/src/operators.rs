//! Binary operator implementations.
//!
//! Direct pattern matching on `(left, right)` pairs. Operands must have the
//! same variant; there is no numeric promotion, so `7u + 1` and `1 == 1.0`
//! are type errors.

use std::cmp::Ordering;

use supercel_ir::BinaryOp;
use supercel_value::Value;

use crate::errors::{
    binary_type_mismatch, division_by_zero, invalid_binary_op, overflow, type_mismatch,
    EvalError,
};

/// Evaluate a binary operation on two evaluated operands.
pub fn evaluate_binary(left: Value, right: Value, op: BinaryOp) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Eq => strict_equals(&left, &right).map(Value::Bool),
        BinaryOp::NotEq => strict_equals(&left, &right).map(|eq| Value::Bool(!eq)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = compare(&left, &right, op)?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::LtEq => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::In => contains(&right, &left).map(Value::Bool),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(left, right, op)
        }
    }
}

fn arithmetic(left: Value, right: Value, op: BinaryOp) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => eval_int_binary(a, b, op),
        (Value::Uint(a), Value::Uint(b)) => eval_uint_binary(a, b, op),
        (Value::Double(a), Value::Double(b)) => eval_double_binary(a, b, op),
        (Value::String(a), Value::String(b)) if op == BinaryOp::Add => {
            let mut joined = a;
            joined.push_str(&b);
            Ok(Value::String(joined))
        }
        (Value::List(a), Value::List(b)) if op == BinaryOp::Add => {
            let mut joined = a;
            joined.extend(b);
            Ok(Value::List(joined))
        }
        (left, right) if left.kind() != right.kind() => {
            Err(binary_type_mismatch(left.kind(), right.kind()))
        }
        (left, _) => {
            let expected = if op == BinaryOp::Add {
                "int, uint, double, string or list"
            } else {
                "int, uint or double"
            };
            Err(invalid_binary_op(op, expected, left.kind()))
        }
    }
}

fn eval_int_binary(a: i64, b: i64, op: BinaryOp) -> Result<Value, EvalError> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(division_by_zero());
            }
            a.checked_div(b)
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(division_by_zero());
            }
            a.checked_rem(b)
        }
        _ => unreachable!("non-arithmetic operator {op} routed to integer arithmetic"),
    };
    result
        .map(Value::Int)
        .ok_or_else(|| overflow(&format!("int {}", op_name(op))))
}

fn eval_uint_binary(a: u64, b: u64, op: BinaryOp) -> Result<Value, EvalError> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(division_by_zero());
            }
            a.checked_div(b)
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(division_by_zero());
            }
            a.checked_rem(b)
        }
        _ => unreachable!("non-arithmetic operator {op} routed to uint arithmetic"),
    };
    result
        .map(Value::Uint)
        .ok_or_else(|| overflow(&format!("uint {}", op_name(op))))
}

fn eval_double_binary(a: f64, b: f64, op: BinaryOp) -> Result<Value, EvalError> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::Mod if b == 0.0 => return Err(division_by_zero()),
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => unreachable!("non-arithmetic operator {op} routed to double arithmetic"),
    };
    if result.is_finite() {
        Ok(Value::Double(result))
    } else {
        Err(overflow(&format!("double {}", op_name(op))))
    }
}

fn op_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "addition",
        BinaryOp::Sub => "subtraction",
        BinaryOp::Mul => "multiplication",
        BinaryOp::Div => "division",
        BinaryOp::Mod => "remainder",
        _ => op.as_symbol(),
    }
}

/// Strict structural equality.
///
/// `Null == Null` holds; lists compare element-wise and maps by key set
/// and value. Comparing different variants anywhere in the structure is a
/// `TypeMismatch`, not `false`. Every overlapping element pair and shared key
/// is compared, even once lengths or key sets already differ.
pub fn strict_equals(left: &Value, right: &Value) -> Result<bool, EvalError> {
    match (left, right) {
        (Value::Null, Value::Null) => Ok(true),
        (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
        (Value::Int(a), Value::Int(b)) => Ok(a == b),
        (Value::Uint(a), Value::Uint(b)) => Ok(a == b),
        #[allow(clippy::float_cmp, reason = "IEEE equality is the language semantics")]
        (Value::Double(a), Value::Double(b)) => Ok(a == b),
        (Value::String(a), Value::String(b)) => Ok(a == b),
        (Value::List(a), Value::List(b)) => {
            let mut equal = a.len() == b.len();
            for (x, y) in a.iter().zip(b) {
                equal &= strict_equals(x, y)?;
            }
            Ok(equal)
        }
        (Value::Map(a), Value::Map(b)) => {
            let mut equal = a.len() == b.len();
            for (key, x) in a {
                match b.get(key) {
                    Some(y) => equal &= strict_equals(x, y)?,
                    None => equal = false,
                }
            }
            Ok(equal)
        }
        _ => Err(binary_type_mismatch(left.kind(), right.kind())),
    }
}

fn compare(left: &Value, right: &Value, op: BinaryOp) -> Result<Ordering, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Uint(a), Value::Uint(b)) => Ok(a.cmp(b)),
        (Value::Double(a), Value::Double(b)) => a
            .partial_cmp(b)
            .ok_or_else(|| type_mismatch("comparable double", "NaN")),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ if left.kind() != right.kind() => Err(binary_type_mismatch(left.kind(), right.kind())),
        _ => Err(invalid_binary_op(op, "int, uint, double or string", left.kind())),
    }
}

/// `needle in container`.
pub fn contains(container: &Value, needle: &Value) -> Result<bool, EvalError> {
    match container {
        Value::List(items) => {
            for item in items {
                if strict_equals(needle, item)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::Map(map) => match needle {
            Value::String(key) => Ok(map.contains_key(key)),
            other => Err(type_mismatch(
                "string key for `in` on map",
                other.type_name(),
            )),
        },
        other => Err(type_mismatch("list or map for `in`", other.type_name())),
    }
}
