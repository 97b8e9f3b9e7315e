//! Unary operator implementations.

use supercel_ir::UnaryOp;
use supercel_value::Value;

use crate::errors::{invalid_unary_op, overflow, EvalError};

/// Evaluate a unary operation.
pub fn evaluate_unary(value: Value, op: UnaryOp) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| overflow("int negation")),
        (UnaryOp::Neg, Value::Double(d)) => Ok(Value::Double(-d)),
        (UnaryOp::Not, other) => Err(invalid_unary_op(op, "bool", other.kind())),
        // Unsigned values have no negation.
        (UnaryOp::Neg, other) => Err(invalid_unary_op(op, "int or double", other.kind())),
    }
}
