//! Lexer error types.
//!
//! The lexer never stops at a bad token: it records an
//! [`TokenKind::Error`](crate::TokenKind::Error) carrying a [`LexError`] and
//! keeps going. The parser reports the first error token it reaches, which
//! keeps "first error wins" ordering across lexing and parsing.

use supercel_ir::Span;

/// What went wrong while lexing.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, thiserror::Error)]
pub enum LexErrorKind {
    /// A character that starts no token (e.g. `#`, a lone `=`).
    #[default]
    #[error("unexpected character")]
    UnexpectedCharacter,
    /// Missing closing `"`.
    #[error("unterminated string literal")]
    UnterminatedString,
    /// Unknown escape such as `\q`.
    #[error("invalid escape sequence `\\{0}`")]
    InvalidEscape(char),
    /// `\u` not followed by four hex digits, or naming a surrogate.
    #[error("invalid unicode escape; expected `\\u` followed by 4 hex digits")]
    InvalidUnicodeEscape,
    /// Integer literal does not fit in 64 bits.
    #[error("integer literal out of range")]
    IntegerOutOfRange,
    /// Float literal that parses to infinity.
    #[error("floating-point literal out of range")]
    FloatOutOfRange,
}

/// A lexer error with its location.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct LexError {
    pub span: Span,
    pub kind: LexErrorKind,
}

impl LexError {
    #[cold]
    pub fn new(kind: LexErrorKind, span: Span) -> Self {
        LexError { span, kind }
    }
}
