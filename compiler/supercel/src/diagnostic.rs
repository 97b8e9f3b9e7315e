//! Terminal rendering of syntax errors.

use std::ops::Range;

use ariadne::{Config, Label, Report, ReportKind, Source};
use supercel_parse::ParseError;

/// Render `err` against the expression text with a source snippet.
///
/// Falls back to the plain message if the report cannot be written.
pub fn render_parse_error(source: &str, err: &ParseError, color: bool) -> String {
    let range = label_range(err.span.to_range(), source.len());
    let report = Report::<Range<usize>>::build(ReportKind::Error, (), range.start)
        .with_config(Config::default().with_color(color))
        .with_message("syntax error")
        .with_label(Label::new(range).with_message(&err.message))
        .finish();

    let mut out = Vec::new();
    match report.write(Source::from(source), &mut out) {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        Err(_) => err.to_string(),
    }
}

/// Keep the label inside the text; widen an empty span by one character
/// where there is one to point at.
fn label_range(range: Range<usize>, len: usize) -> Range<usize> {
    let start = range.start.min(len);
    let end = range.end.clamp(start, len);
    if start == end && end < len {
        start..end + 1
    } else {
        start..end
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests {
    use super::*;
    use supercel_parse::parse;

    #[test]
    fn renders_message_and_snippet() {
        let source = "user.age > ";
        let err = parse(source).unwrap_err();
        let rendered = render_parse_error(source, &err, false);
        assert!(rendered.contains("syntax error"), "{rendered}");
        assert!(rendered.contains(&err.message), "{rendered}");
        assert!(rendered.contains("user.age >"), "{rendered}");
    }

    #[test]
    fn label_stays_in_bounds() {
        assert_eq!(label_range(3..3, 10), 3..4);
        assert_eq!(label_range(10..10, 10), 10..10);
        assert_eq!(label_range(8..20, 10), 8..10);
    }
}
