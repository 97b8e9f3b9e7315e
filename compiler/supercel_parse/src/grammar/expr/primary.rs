//! Primary expressions: literals, identifiers, parenthesized expressions,
//! list and map literals.

use supercel_ir::{Expr, ExprKind, Literal, MapEntry};
use supercel_lexer::TokenKind;

use crate::{ParseError, Parser};

impl Parser<'_> {
    pub(crate) fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let span = self.current_span();
        let literal = match self.current_kind() {
            TokenKind::Int(n) => {
                let value = i64::try_from(*n)
                    .map_err(|_| ParseError::new(span, "integer literal out of range for int"))?;
                Literal::Int(value)
            }
            TokenKind::Uint(n) => Literal::Uint(*n),
            TokenKind::Double(d) => Literal::Double(*d),
            TokenKind::String(s) => Literal::String(s.clone()),
            TokenKind::True => Literal::Bool(true),
            TokenKind::False => Literal::Bool(false),
            TokenKind::Null => Literal::Null,
            TokenKind::Ident(name) => {
                self.advance();
                return Ok(Expr::ident(name.clone(), span));
            }
            TokenKind::LParen => return self.parse_grouping(),
            TokenKind::LBracket => return self.parse_list_literal(),
            TokenKind::LBrace => return self.parse_map_literal(),
            _ => return Err(self.error_expected("expression")),
        };
        self.advance();
        Ok(Expr::literal(literal, span))
    }

    /// `( expr )`
    fn parse_grouping(&mut self) -> Result<Expr, ParseError> {
        let start = self.advance();
        let inner = self.parse_expr()?;
        let end = self.expect(&TokenKind::RParen)?;
        Ok(Expr::new(
            ExprKind::Grouping(Box::new(inner)),
            start.merge(end),
        ))
    }

    /// `[a, b, ...]`
    fn parse_list_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.advance();
        let items =
            self.nested(|p| p.parse_comma_separated(&TokenKind::RBracket, Self::parse_expr))?;
        let span = start.merge(self.previous_span());
        Ok(Expr::new(ExprKind::List(items), span))
    }

    /// `{key: value, ...}`
    fn parse_map_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.advance();
        let entries =
            self.nested(|p| p.parse_comma_separated(&TokenKind::RBrace, Self::parse_map_entry))?;
        let span = start.merge(self.previous_span());
        Ok(Expr::new(ExprKind::Map(entries), span))
    }

    fn parse_map_entry(&mut self) -> Result<MapEntry, ParseError> {
        let key = self.parse_expr()?;
        self.expect(&TokenKind::Colon)?;
        let value = self.parse_expr()?;
        Ok(MapEntry { key, value })
    }
}
