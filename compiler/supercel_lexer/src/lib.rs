//! Lexer for supercel expressions, built on logos.
//!
//! Produces a [`TokenList`] with cooked literals: integer magnitudes,
//! doubles, and unescaped strings. Lexing never fails outright; bad input
//! becomes a [`TokenKind::Error`] token for the parser to report.

mod cook_escape;
mod lex_error;
mod token;

use logos::Logos;
use supercel_ir::Span;

pub use lex_error::{LexError, LexErrorKind};
pub use token::{Token, TokenKind, TokenList};

/// Raw token from logos (before cooking).
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
enum RawToken {
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("in")]
    In,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,

    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token("<")]
    Lt,
    #[token(">=")]
    GtEq,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,

    #[regex(r"[0-9]+", |lex| parse_radix(lex.slice(), 10))]
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| parse_radix(&lex.slice()[2..], 16))]
    Int(u64),

    #[regex(r"[0-9]+[uU]", |lex| {
        let s = lex.slice();
        parse_radix(&s[..s.len() - 1], 10)
    })]
    #[regex(r"0[xX][0-9a-fA-F]+[uU]", |lex| {
        let s = lex.slice();
        parse_radix(&s[2..s.len() - 1], 16)
    })]
    Uint(u64),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| parse_double(lex.slice()))]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| parse_double(lex.slice()))]
    Double(f64),

    #[regex(r#""([^"\\]|\\.)*""#)]
    String,

    // Same body without the closing quote; only wins when `String` cannot match.
    #[regex(r#""([^"\\]|\\.)*"#)]
    UnterminatedString,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

fn parse_radix(digits: &str, radix: u32) -> Result<u64, LexErrorKind> {
    u64::from_str_radix(digits, radix).map_err(|_| LexErrorKind::IntegerOutOfRange)
}

fn parse_double(text: &str) -> Result<f64, LexErrorKind> {
    match text.parse::<f64>() {
        Ok(d) if d.is_finite() => Ok(d),
        _ => Err(LexErrorKind::FloatOutOfRange),
    }
}

/// Convert a byte range to a span, saturating offsets past `u32::MAX`.
fn to_span(range: std::ops::Range<usize>) -> Span {
    Span::try_from_range(range.clone()).unwrap_or_else(|_| {
        let start = u32::try_from(range.start).unwrap_or(u32::MAX);
        Span::new(start, u32::MAX)
    })
}

/// Lex the whole source into a token list terminated by `Eof`.
pub fn lex(source: &str) -> TokenList {
    let mut result = TokenList::new();
    let mut logos = RawToken::lexer(source);

    while let Some(token_result) = logos.next() {
        let span = to_span(logos.span());
        let kind = match token_result {
            Ok(raw) => convert_token(raw, logos.slice(), span),
            Err(kind) => TokenKind::Error(LexError::new(kind, span)),
        };
        tracing::trace!(?kind, %span, "token");
        result.push(Token::new(kind, span));
    }

    let eof = to_span(source.len()..source.len());
    result.push(Token::new(TokenKind::Eof, eof));
    result
}

fn convert_token(raw: RawToken, slice: &str, span: Span) -> TokenKind {
    match raw {
        RawToken::Int(n) => TokenKind::Int(n),
        RawToken::Uint(n) => TokenKind::Uint(n),
        RawToken::Double(d) => TokenKind::Double(d),
        RawToken::String => {
            let content = &slice[1..slice.len() - 1];
            match cook_escape::unescape_string(content, span.start + 1) {
                Ok(s) => TokenKind::String(s),
                Err(err) => TokenKind::Error(err),
            }
        }
        RawToken::UnterminatedString => {
            TokenKind::Error(LexError::new(LexErrorKind::UnterminatedString, span))
        }
        RawToken::Ident => TokenKind::Ident(slice.to_owned()),

        RawToken::True => TokenKind::True,
        RawToken::False => TokenKind::False,
        RawToken::Null => TokenKind::Null,
        RawToken::In => TokenKind::In,

        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::Dot => TokenKind::Dot,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Colon => TokenKind::Colon,
        RawToken::Question => TokenKind::Question,

        RawToken::EqEq => TokenKind::EqEq,
        RawToken::NotEq => TokenKind::NotEq,
        RawToken::LtEq => TokenKind::LtEq,
        RawToken::Lt => TokenKind::Lt,
        RawToken::GtEq => TokenKind::GtEq,
        RawToken::Gt => TokenKind::Gt,
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Percent => TokenKind::Percent,
        RawToken::Bang => TokenKind::Bang,
        RawToken::AmpAmp => TokenKind::AmpAmp,
        RawToken::PipePipe => TokenKind::PipePipe,
    }
}
