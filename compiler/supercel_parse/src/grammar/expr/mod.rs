//! Expression parsing.
//!
//! # Module Structure
//!
//! - `mod.rs`: Entry point (`parse_expr`) and the binary precedence chain
//! - `operators.rs`: Operator matching helpers
//! - `postfix.rs`: Call, member access, index
//! - `primary.rs`: Literals, identifiers, groupings, list and map literals
//!
//! Precedence, lowest first: `?:`, `||`, `&&`, `== !=`, `< <= > >= in`,
//! `+ -`, `* / %`, unary `! -`, postfix `. [] ()`, primary.

mod operators;
mod postfix;
mod primary;

use supercel_ir::{BinaryOp, Expr, ExprKind, Literal, LogicalOp, UnaryOp};
use supercel_lexer::TokenKind;

use crate::{check_height, ParseError, Parser};

/// Absolute value of `i64::MIN` as `u64` (for negation folding).
const I64_MIN_ABS: u64 = 9_223_372_036_854_775_808;

impl Parser<'_> {
    /// Parse an expression, one nesting level deeper than the caller.
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_conditional)
    }

    /// Parse `cond ? a : b` (right-associative, lowest precedence).
    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let condition = self.parse_logical_or()?;

        if !self.check(&TokenKind::Question) {
            return Ok(condition);
        }
        self.advance();
        let then_branch = self.parse_expr()?;
        self.expect(&TokenKind::Colon)?;
        let else_branch = self.parse_expr()?;

        let span = condition.span.merge(else_branch.span);
        Ok(Expr::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            span,
        ))
    }

    /// Parse `||`.
    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        self.parse_chain(Self::parse_logical_and, Self::match_or_op, logical)
    }

    /// Parse `&&`.
    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        self.parse_chain(Self::parse_equality, Self::match_and_op, logical)
    }

    /// Parse `==` and `!=`.
    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        self.parse_chain(Self::parse_comparison, Self::match_equality_op, binary)
    }

    /// Parse `<`, `<=`, `>`, `>=`, and `in`.
    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        self.parse_chain(Self::parse_additive, Self::match_comparison_op, binary)
    }

    /// Parse `+` and `-`.
    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        self.parse_chain(Self::parse_multiplicative, Self::match_additive_op, binary)
    }

    /// Parse `*`, `/`, `%`.
    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.parse_chain(Self::parse_unary, Self::match_multiplicative_op, binary)
    }

    /// Parse a left-associative chain `operand (op operand)*`.
    ///
    /// Each operator adds a level to the tree without recursing, so the
    /// height is checked as the chain grows.
    fn parse_chain<Op>(
        &mut self,
        operand: impl Fn(&mut Self) -> Result<Expr, ParseError>,
        next_op: impl Fn(&Self) -> Option<Op>,
        combine: impl Fn(Op, Expr, Expr) -> Expr,
    ) -> Result<Expr, ParseError> {
        let mut left = operand(self)?;
        let mut height = None;

        while let Some(op) = next_op(self) {
            let op_span = self.advance();
            let right = operand(self)?;
            let left_height = *height.get_or_insert_with(|| left.height());
            let grown = 1 + left_height.max(right.height());
            check_height(grown, op_span)?;
            height = Some(grown);
            left = combine(op, left, right);
        }

        Ok(left)
    }

    /// Parse unary operators.
    ///
    /// When the operator is `-` and the next token is an integer literal,
    /// folds them into a single literal node so that `-9223372036854775808`
    /// (`i64::MIN`) is representable.
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let Some(op) = self.match_unary_op() else {
            return self.parse_postfix();
        };
        let start = self.current_span();

        if op == UnaryOp::Neg {
            if let TokenKind::Int(n) = *self.peek_next_kind() {
                self.advance(); // `-`
                let lit_span = self.advance();
                let span = start.merge(lit_span);

                let value = if let Ok(signed) = i64::try_from(n) {
                    -signed
                } else if n == I64_MIN_ABS {
                    i64::MIN
                } else {
                    return Err(ParseError::new(span, "integer literal out of range for int"));
                };
                let literal = Expr::literal(Literal::Int(value), span);
                return self.apply_postfix_ops(literal);
            }
        }

        self.advance();
        let operand = self.nested(Self::parse_unary)?;
        let span = start.merge(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}
