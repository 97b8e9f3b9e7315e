//! Escape processing for string literal bodies.
//!
//! Valid escapes: `\"` `\\` `\'` `\/` `\n` `\t` `\r` `\0` and `\uXXXX`.
//! The first invalid escape is returned as an error; there is no recovery.

use supercel_ir::Span;

use crate::lex_error::{LexError, LexErrorKind};

#[inline]
fn resolve_simple_escape(c: char) -> Option<char> {
    match c {
        '"' => Some('"'),
        '\\' => Some('\\'),
        '\'' => Some('\''),
        '/' => Some('/'),
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        '0' => Some('\0'),
        _ => None,
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "offsets inside a literal whose span already fit in u32"
)]
fn offset(base: u32, i: usize) -> u32 {
    base.saturating_add(i as u32)
}

/// Unescape a string literal's content (between the quotes).
///
/// `base_offset` is the byte offset of `content` in the source, used to
/// point error spans at the offending escape.
pub(crate) fn unescape_string(content: &str, base_offset: u32) -> Result<String, LexError> {
    if !content.contains('\\') {
        return Ok(content.to_owned());
    }

    let mut result = String::with_capacity(content.len());
    let mut chars = content.char_indices();

    while let Some((i, c)) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        let start = offset(base_offset, i);
        match chars.next() {
            Some((_, 'u')) => {
                let digits: String = chars.by_ref().take(4).map(|(_, d)| d).collect();
                let end = offset(base_offset, i + 2 + digits.len());
                let well_formed =
                    digits.len() == 4 && digits.chars().all(|d| d.is_ascii_hexdigit());
                let decoded = well_formed
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(ch) => result.push(ch),
                    None => {
                        return Err(LexError::new(
                            LexErrorKind::InvalidUnicodeEscape,
                            Span::new(start, end),
                        ))
                    }
                }
            }
            Some((j, esc)) => match resolve_simple_escape(esc) {
                Some(resolved) => result.push(resolved),
                None => {
                    let end = offset(base_offset, j + esc.len_utf8());
                    return Err(LexError::new(
                        LexErrorKind::InvalidEscape(esc),
                        Span::new(start, end),
                    ));
                }
            },
            // The raw string pattern never ends on a lone backslash, but a
            // hand-built body might.
            None => {
                return Err(LexError::new(
                    LexErrorKind::InvalidEscape('\\'),
                    Span::new(start, start + 1),
                ))
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap to panic on unexpected state")]
mod tests;
