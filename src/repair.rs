use crate::error::{Result, ScrapeError};

/// Best-effort recovery of JSON text containing unescaped double quotes
/// inside string values, the most common formatting defect in generated
/// output.
///
/// Each pass asks the parser where it choked, escapes the nearest quote
/// before that position (presumed to open an embedded quotation inside an
/// already-open string) and the next quote after it (presumed to close the
/// same quotation), then re-parses. Every pass escapes two previously
/// unescaped quotes, so the quote count of the input bounds the loop.
pub fn repair_json(input: &str) -> Result<serde_json::Value> {
    let mut text = input.to_string();
    let max_passes = input.matches('"').count() + 1;

    for _ in 0..max_passes {
        let err = match serde_json::from_str(&text) {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let offset = error_offset(&text, &err).ok_or(ScrapeError::UnrecoverableFormat(
            "parse error carries no usable position",
        ))?;

        let open = quote_before(&text, offset).ok_or(ScrapeError::UnrecoverableFormat(
            "no quote found before the parse error",
        ))?;
        text.insert(open, '\\');

        // +2 skips the inserted escape and the quote it protects.
        let close = quote_from(&text, open + 2).ok_or(ScrapeError::UnrecoverableFormat(
            "no closing quote found after the repaired one",
        ))?;
        text.insert(close, '\\');
    }

    Err(ScrapeError::UnrecoverableFormat("repair passes exhausted"))
}

/// Byte offset of the parser's reported error position.
fn error_offset(text: &str, err: &serde_json::Error) -> Option<usize> {
    if err.line() == 0 || err.column() == 0 {
        return None;
    }
    let line_start: usize = text
        .split_inclusive('\n')
        .take(err.line() - 1)
        .map(str::len)
        .sum();
    let mut offset = (line_start + err.column() - 1).min(text.len());
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    Some(offset)
}

/// Nearest unescaped `"` strictly before `offset`.
fn quote_before(text: &str, offset: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..offset.min(bytes.len()))
        .rev()
        .find(|&i| bytes[i] == b'"' && (i == 0 || bytes[i - 1] != b'\\'))
}

/// First unescaped `"` at or after `from`.
fn quote_from(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    (from.min(bytes.len())..bytes.len())
        .find(|&i| bytes[i] == b'"' && (i == 0 || bytes[i - 1] != b'\\'))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_json_passes_through() {
        let parsed = repair_json(r#"{"a": 1, "b": "two"}"#).unwrap();
        assert_eq!(parsed, serde_json::json!({"a": 1, "b": "two"}));
    }

    #[test]
    fn embedded_quotes_are_escaped() {
        let parsed = repair_json(r#"{"note": "she said "hi" to him"}"#).unwrap();
        assert_eq!(parsed, serde_json::json!({"note": "she said \"hi\" to him"}));
    }

    #[test]
    fn multiple_embedded_quote_pairs() {
        let parsed = repair_json(r#"{"a": "x "q" y", "b": "m "n" o"}"#).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!({"a": "x \"q\" y", "b": "m \"n\" o"})
        );
    }

    #[test]
    fn no_quote_before_error_is_unrecoverable() {
        let err = repair_json("not json at all").unwrap_err();
        assert!(matches!(err, ScrapeError::UnrecoverableFormat(_)));
    }

    #[test]
    fn broken_structure_without_quotes_is_unrecoverable() {
        let err = repair_json("[1, 2,").unwrap_err();
        assert!(matches!(err, ScrapeError::UnrecoverableFormat(_)));
    }

    #[test]
    fn pathological_quote_soup_terminates() {
        // Nothing here can be repaired into valid JSON; the loop must stop
        // with an error instead of spinning.
        let err = repair_json(r#"{"""""""}"#).unwrap_err();
        assert!(matches!(err, ScrapeError::UnrecoverableFormat(_)));
    }
}
