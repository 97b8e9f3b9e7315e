//! Recursive descent parser for supercel expressions.
//!
//! Produces an owned [`Expr`] tree. The parser reports the first error it
//! meets and does not attempt recovery.

mod cursor;
mod error;
mod grammar;

use supercel_ir::{Expr, Span};
use supercel_lexer::{TokenKind, TokenList};

use crate::cursor::Cursor;
pub use crate::error::ParseError;

/// Maximum expression nesting (parentheses, unary chains, call arguments,
/// collection literals, conditional branches).
///
/// Operator and postfix chains such as `1 + 1 + ...` or `a.b.c...` build
/// trees of the same height without nesting, so they are held to this
/// limit by tree height.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parse a complete expression.
///
/// Empty or whitespace-only input is an error, as is anything left over
/// after the expression.
#[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = supercel_lexer::lex(source);
    let mut parser = Parser::new(&tokens, source);
    let expr = parser.parse_expr()?;
    parser.expect_end()?;
    tracing::debug!(nodes = expr.node_count(), "parsed expression");
    Ok(expr)
}

/// Parser state.
pub(crate) struct Parser<'a> {
    cursor: Cursor<'a>,
    source: &'a str,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a TokenList, source: &'a str) -> Self {
        Parser {
            cursor: Cursor::new(tokens),
            source,
            depth: 0,
        }
    }

    // Cursor delegation

    #[inline]
    fn current_kind(&self) -> &'a TokenKind {
        self.cursor.current_kind()
    }

    #[inline]
    fn current_span(&self) -> Span {
        self.cursor.current_span()
    }

    #[inline]
    fn previous_span(&self) -> Span {
        self.cursor.previous_span()
    }

    #[inline]
    fn peek_next_kind(&self) -> &'a TokenKind {
        self.cursor.peek_next_kind()
    }

    #[inline]
    fn check(&self, kind: &TokenKind) -> bool {
        self.cursor.check(kind)
    }

    #[inline]
    fn advance(&mut self) -> Span {
        self.cursor.advance()
    }

    /// Error for the current token. Lexer error tokens report their own
    /// problem instead of a generic "expected" message.
    #[cold]
    fn error_expected(&self, what: &str) -> ParseError {
        let token = self.cursor.current();
        match &token.kind {
            TokenKind::Error(err) => ParseError::from_lex(&err.kind, err.span, self.source),
            other => ParseError::expected(what, other, token.span),
        }
    }

    /// Consume a token of the given kind or fail.
    fn expect(&mut self, kind: &TokenKind) -> Result<Span, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_expected(&format!("`{}`", kind.symbol())))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), ParseError> {
        if let TokenKind::Ident(name) = self.current_kind() {
            let span = self.advance();
            Ok((name.clone(), span))
        } else {
            Err(self.error_expected("identifier"))
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        if self.cursor.is_at_end() {
            return Ok(());
        }
        let token = self.cursor.current();
        match &token.kind {
            TokenKind::Error(err) => Err(ParseError::from_lex(&err.kind, err.span, self.source)),
            other => Err(ParseError::new(
                token.span,
                format!("unexpected {} after expression", other.describe()),
            )),
        }
    }

    /// Run `f` one nesting level deeper, failing past [`MAX_NESTING_DEPTH`].
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(too_deep(self.current_span()));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

/// Fail when a chain has grown past [`MAX_NESTING_DEPTH`].
pub(crate) fn check_height(height: usize, span: Span) -> Result<(), ParseError> {
    if height > MAX_NESTING_DEPTH {
        Err(too_deep(span))
    } else {
        Ok(())
    }
}

#[cold]
fn too_deep(span: Span) -> ParseError {
    ParseError::new(
        span,
        format!("expression nested too deeply (limit {MAX_NESTING_DEPTH})"),
    )
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
