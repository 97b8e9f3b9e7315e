use super::*;
use pretty_assertions::assert_eq;

#[test]
fn no_escapes_passes_through() {
    assert_eq!(unescape_string("hello world", 0), Ok("hello world".to_string()));
}

#[test]
fn all_simple_escapes() {
    let result = unescape_string(r#"\"\\\'\/\n\t\r\0"#, 0);
    assert_eq!(result, Ok("\"\\'/\n\t\r\0".to_string()));
}

#[test]
fn unicode_escape() {
    assert_eq!(unescape_string(r"caf\u00e9", 0), Ok("caf\u{e9}".to_string()));
    assert_eq!(unescape_string(r"\u0041\u0042C", 0), Ok("ABC".to_string()));
}

#[test]
fn unicode_escape_too_short() {
    let err = unescape_string(r"\u12", 10).unwrap_err();
    assert_eq!(err.kind, LexErrorKind::InvalidUnicodeEscape);
    assert_eq!(err.span, Span::new(10, 14));
}

#[test]
fn unicode_escape_rejects_sign_and_surrogates() {
    assert_eq!(
        unescape_string(r"\u+123", 0).unwrap_err().kind,
        LexErrorKind::InvalidUnicodeEscape
    );
    assert_eq!(
        unescape_string(r"\ud800", 0).unwrap_err().kind,
        LexErrorKind::InvalidUnicodeEscape
    );
}

#[test]
fn invalid_escape_reports_position() {
    // `\q` starts at content offset 5; content begins at source offset 1.
    let err = unescape_string(r"hello\qworld", 1).unwrap_err();
    assert_eq!(err.kind, LexErrorKind::InvalidEscape('q'));
    assert_eq!(err.span, Span::new(6, 8));
}

#[test]
fn trailing_backslash() {
    let err = unescape_string("abc\\", 0).unwrap_err();
    assert_eq!(err.kind, LexErrorKind::InvalidEscape('\\'));
    assert_eq!(err.span, Span::new(3, 4));
}
