//! Parse error type.
//!
//! The parser stops at the first problem, so a single error with a location
//! and a message is all there is to report.

use supercel_ir::Span;
use supercel_lexer::{LexErrorKind, TokenKind};

/// A syntax error: where parsing stopped and why.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("syntax error at offset {}: {message}", .span.start)]
pub struct ParseError {
    pub span: Span,
    pub message: String,
}

impl ParseError {
    #[cold]
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        ParseError {
            span,
            message: message.into(),
        }
    }

    /// Byte offset of the error in the expression text.
    #[inline]
    pub fn position(&self) -> u32 {
        self.span.start
    }

    #[cold]
    pub(crate) fn expected(what: &str, found: &TokenKind, span: Span) -> Self {
        ParseError::new(span, format!("expected {what}, found {}", found.describe()))
    }

    /// Turn a lexer error token into a parse error.
    #[cold]
    pub(crate) fn from_lex(kind: &LexErrorKind, span: Span, source: &str) -> Self {
        let message = match kind {
            LexErrorKind::UnexpectedCharacter => match source.get(span.to_range()) {
                Some(text) if !text.is_empty() => format!("unexpected character `{text}`"),
                _ => kind.to_string(),
            },
            other => other.to_string(),
        };
        ParseError::new(span, message)
    }
}
