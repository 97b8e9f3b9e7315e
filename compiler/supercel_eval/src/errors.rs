//! Evaluation error types.
//!
//! `EvalErrorKind` carries the structured category; `EvalError` adds the
//! span of the node that failed. Factory functions are the way to build
//! errors; the evaluator attaches spans with [`EvalError::with_span`].
//!
//! Every kind is fatal to the evaluation that produced it and to nothing
//! else, unless a `maybe(...)` guard recovers it (see
//! [`EvalError::is_recoverable`]). Nothing is retried inside the evaluator.

use std::fmt;

use supercel_ir::{BinaryOp, Span, UnaryOp};
use supercel_value::ValueKind;

use crate::bridge::HostError;
use crate::environment::HostNamespace;
use crate::evaluation::EvalState;

/// Result of evaluation.
pub type EvalResult<T = supercel_value::Value> = Result<T, EvalError>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// Operand or operator variant conflict, including the numeric
    /// coercions that are deliberately not performed (`7u == 7`).
    TypeMismatch { expected: String, actual: String },
    /// Unknown variable, path segment, map key, function, or method.
    UndefinedReference { path: String },
    /// Integer or double division or modulo by zero.
    DivisionByZero,
    /// Wrong number of arguments to a builtin function or method.
    ArityError {
        name: String,
        expected: usize,
        got: usize,
    },
    /// The host bridge failed or answered with something undecodable.
    HostCallback {
        namespace: HostNamespace,
        name: String,
        cause: HostError,
    },
    /// Checked arithmetic or conversion went out of range, or a double
    /// operation produced a non-finite result.
    Overflow { operation: String },
    /// List index outside `0..len`.
    IndexOutOfBounds { index: i128, len: usize },
    /// `EvalLimits::max_steps` exhausted.
    StepLimitExceeded { limit: u64 },
    /// `EvalLimits::max_host_calls` exhausted.
    HostCallLimitExceeded { limit: u32 },
    /// The evaluation was cancelled; it will not run again.
    Cancelled,
    /// `run`/`resume` called in a state that does not accept it.
    InvalidState { state: EvalState, operation: &'static str },
}

impl EvalErrorKind {
    /// Stable snake_case identifier, used in JSON error responses.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::UndefinedReference { .. } => "undefined_reference",
            Self::DivisionByZero => "division_by_zero",
            Self::ArityError { .. } => "arity_error",
            Self::HostCallback { .. } => "host_callback_error",
            Self::Overflow { .. } => "overflow",
            Self::IndexOutOfBounds { .. } => "index_out_of_bounds",
            Self::StepLimitExceeded { .. } => "step_limit_exceeded",
            Self::HostCallLimitExceeded { .. } => "host_call_limit_exceeded",
            Self::Cancelled => "cancelled",
            Self::InvalidState { .. } => "invalid_state",
        }
    }
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch: expected {expected}, found {actual}")
            }
            Self::UndefinedReference { path } => write!(f, "undefined reference: {path}"),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::ArityError {
                name,
                expected,
                got,
            } => {
                let arg_word = if *expected == 1 {
                    "argument"
                } else {
                    "arguments"
                };
                write!(f, "{name} expects {expected} {arg_word}, got {got}")
            }
            Self::HostCallback {
                namespace,
                name,
                cause,
            } => write!(f, "host callback `{namespace}.{name}` failed: {cause}"),
            Self::Overflow { operation } => write!(f, "overflow in {operation}"),
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for list of length {len}")
            }
            Self::StepLimitExceeded { limit } => {
                write!(f, "evaluation step limit exceeded (limit: {limit})")
            }
            Self::HostCallLimitExceeded { limit } => {
                write!(f, "host call limit exceeded (limit: {limit})")
            }
            Self::Cancelled => write!(f, "evaluation cancelled"),
            Self::InvalidState { state, operation } => {
                write!(f, "cannot {operation} an evaluation that is {state}")
            }
        }
    }
}

/// Evaluation error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Source location of the failing node, when known.
    pub span: Option<Span>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind) -> Self {
        EvalError { kind, span: None }
    }

    /// Attach a span unless one is already set (the innermost span wins).
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    #[inline]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[inline]
    pub fn is_undefined_reference(&self) -> bool {
        matches!(self.kind, EvalErrorKind::UndefinedReference { .. })
    }

    /// Errors a `maybe(a, b)` guard turns into its fallback: a missing
    /// value, whether absent from the environment or not produced by the
    /// host.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        self.is_undefined_reference() || matches!(self.kind, EvalErrorKind::HostCallback { .. })
    }
}

// Factory functions

#[cold]
pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::TypeMismatch {
        expected: expected.into(),
        actual: actual.into(),
    })
}

/// Operands of a binary operator have different variants.
#[cold]
pub fn binary_type_mismatch(left: ValueKind, right: ValueKind) -> EvalError {
    type_mismatch(left.as_str(), right.as_str())
}

/// Operator not defined for this operand variant.
#[cold]
pub fn invalid_binary_op(op: BinaryOp, expected: &str, actual: ValueKind) -> EvalError {
    type_mismatch(format!("{expected} for `{op}`"), actual.as_str())
}

#[cold]
pub fn invalid_unary_op(op: UnaryOp, expected: &str, actual: ValueKind) -> EvalError {
    type_mismatch(format!("{expected} for unary `{op}`"), actual.as_str())
}

#[cold]
pub fn undefined_reference(path: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::UndefinedReference { path: path.into() })
}

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::new(EvalErrorKind::DivisionByZero)
}

#[cold]
pub fn wrong_arg_count(name: &str, expected: usize, got: usize) -> EvalError {
    EvalError::new(EvalErrorKind::ArityError {
        name: name.to_string(),
        expected,
        got,
    })
}

#[cold]
pub fn host_callback_failed(namespace: HostNamespace, name: &str, cause: HostError) -> EvalError {
    EvalError::new(EvalErrorKind::HostCallback {
        namespace,
        name: name.to_string(),
        cause,
    })
}

#[cold]
pub fn overflow(operation: &str) -> EvalError {
    EvalError::new(EvalErrorKind::Overflow {
        operation: operation.to_string(),
    })
}

#[cold]
pub fn index_out_of_bounds(index: i128, len: usize) -> EvalError {
    EvalError::new(EvalErrorKind::IndexOutOfBounds { index, len })
}

#[cold]
pub fn step_limit_exceeded(limit: u64) -> EvalError {
    EvalError::new(EvalErrorKind::StepLimitExceeded { limit })
}

#[cold]
pub fn host_call_limit_exceeded(limit: u32) -> EvalError {
    EvalError::new(EvalErrorKind::HostCallLimitExceeded { limit })
}

#[cold]
pub fn cancelled() -> EvalError {
    EvalError::new(EvalErrorKind::Cancelled)
}

#[cold]
pub fn invalid_state(state: EvalState, operation: &'static str) -> EvalError {
    EvalError::new(EvalErrorKind::InvalidState { state, operation })
}
