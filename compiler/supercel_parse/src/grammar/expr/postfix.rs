//! Postfix expression parsing: call, member access, index.

use supercel_ir::{Expr, ExprKind};
use supercel_lexer::TokenKind;

use crate::{check_height, ParseError, Parser};

impl Parser<'_> {
    /// Parse a primary expression followed by any postfix operators.
    #[inline]
    pub(crate) fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_primary()?;
        self.apply_postfix_ops(expr)
    }

    /// Apply postfix operators to an expression.
    ///
    /// Shared with `parse_unary`, whose folded negative literals may still
    /// carry postfix operators.
    ///
    /// Like the binary chains, `a.b.c...` grows the tree without recursing,
    /// so its height is tracked here.
    pub(crate) fn apply_postfix_ops(&mut self, mut expr: Expr) -> Result<Expr, ParseError> {
        let mut height = None;
        loop {
            let op_span = self.current_span();
            let mut child_height = 0;
            if self.check(&TokenKind::LParen) {
                self.advance();
                let args = self.parse_comma_separated(&TokenKind::RParen, Self::parse_expr)?;
                child_height = args.iter().map(Expr::height).max().unwrap_or(0);
                let span = expr.span.merge(self.previous_span());
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    span,
                );
            } else if self.check(&TokenKind::Dot) {
                self.advance();
                let (field, field_span) = self.expect_ident()?;
                let span = expr.span.merge(field_span);
                expr = Expr::new(
                    ExprKind::Member {
                        target: Box::new(expr),
                        field,
                    },
                    span,
                );
            } else if self.check(&TokenKind::LBracket) {
                self.advance();
                let index = self.parse_expr()?;
                self.expect(&TokenKind::RBracket)?;
                child_height = index.height();
                let span = expr.span.merge(self.previous_span());
                expr = Expr::new(
                    ExprKind::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else {
                return Ok(expr);
            }

            let target_height = *height.get_or_insert_with(|| match &expr.kind {
                ExprKind::Call { callee, .. } => callee.height(),
                ExprKind::Member { target, .. } | ExprKind::Index { target, .. } => {
                    target.height()
                }
                _ => 0,
            });
            let grown = 1 + target_height.max(child_height);
            check_height(grown, op_span)?;
            height = Some(grown);
        }
    }

    /// Parse `item, item, ...` up to and including `close`, allowing a
    /// trailing comma. The opening delimiter has already been consumed.
    pub(crate) fn parse_comma_separated<T>(
        &mut self,
        close: &TokenKind,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(item(self)?);
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(close)?;
        Ok(items)
    }
}
