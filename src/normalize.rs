use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, ScrapeError};
use crate::record::{Field, Value};

static SCORE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\d+ / \d+$").unwrap());
static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+(,\d+)*$").unwrap());

/// Convert a raw value to its typed form by format sniffing: score strings
/// (`4.5 / 5`) become the float numerator, comma-grouped counts (`1,234`)
/// become integers, any other text keeps its content with non-breaking
/// spaces replaced. Absent and already-numeric values pass through, which
/// makes the function idempotent.
pub fn normalize(field: Field, value: Value) -> Result<Value> {
    let raw = match value {
        Value::Text(s) => s,
        passthrough => return Ok(passthrough),
    };
    let raw = raw.trim();

    if SCORE_RE.is_match(raw) {
        let numerator = raw.split('/').next().unwrap_or("").trim();
        return numerator
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| ScrapeError::Normalization {
                field: field.name(),
                raw: raw.to_string(),
            });
    }

    if COUNT_RE.is_match(raw) {
        return raw
            .replace(',', "")
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| ScrapeError::Normalization {
                field: field.name(),
                raw: raw.to_string(),
            });
    }

    Ok(Value::Text(raw.replace('\u{a0}', " ")))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_becomes_left_hand_float() {
        let v = normalize(Field::OverallScore, Value::Text("4.5 / 5".into())).unwrap();
        assert_eq!(v, Value::Float(4.5));
        let v = normalize(Field::OverallScore, Value::Text("3.71 / 5".into())).unwrap();
        assert_eq!(v, Value::Float(3.71));
    }

    #[test]
    fn count_strips_commas() {
        let v = normalize(Field::Followers, Value::Text("1,234".into())).unwrap();
        assert_eq!(v, Value::Int(1234));
        let v = normalize(Field::Pages, Value::Text("12".into())).unwrap();
        assert_eq!(v, Value::Int(12));
        let v = normalize(Field::TotalViews, Value::Text("12,345,678".into())).unwrap();
        assert_eq!(v, Value::Int(12_345_678));
    }

    #[test]
    fn near_miss_shapes_stay_text() {
        // Integer without a decimal part is not a score.
        let v = normalize(Field::OverallScore, Value::Text("4 / 5".into())).unwrap();
        assert_eq!(v, Value::Text("4 / 5".into()));
        // Dot-separated groups are not a count.
        let v = normalize(Field::Followers, Value::Text("1.234".into())).unwrap();
        assert_eq!(v, Value::Text("1.234".into()));
    }

    #[test]
    fn plain_text_replaces_non_breaking_spaces() {
        let v = normalize(Field::Blurb, Value::Text("a\u{a0}story".into())).unwrap();
        assert_eq!(v, Value::Text("a story".into()));
    }

    #[test]
    fn absent_and_numeric_pass_through() {
        assert_eq!(normalize(Field::Subgenre, Value::Absent).unwrap(), Value::Absent);
        assert_eq!(
            normalize(Field::Followers, Value::Int(1234)).unwrap(),
            Value::Int(1234)
        );
        assert_eq!(
            normalize(Field::OverallScore, Value::Float(4.5)).unwrap(),
            Value::Float(4.5)
        );
    }

    #[test]
    fn normalizing_twice_equals_normalizing_once() {
        for raw in ["4.5 / 5", "1,234", "plain text"] {
            let once = normalize(Field::Tags, Value::Text(raw.into())).unwrap();
            let twice = normalize(Field::Tags, once.clone()).unwrap();
            assert_eq!(once, twice);
        }
    }
}
