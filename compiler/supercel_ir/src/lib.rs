//! Supercel IR - syntax tree types shared by the parser and the evaluator.
//!
//! This crate has no knowledge of runtime values; literals are kept in their
//! source form ([`Literal`]) and the evaluator converts them.

mod ast;
mod operators;
mod span;

pub use ast::{Expr, ExprKind, Literal, MapEntry};
pub use operators::{BinaryOp, LogicalOp, UnaryOp};
pub use span::{Span, SpanError};
