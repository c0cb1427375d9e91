use tracing::{info, warn};

use crate::error::Result;
use crate::fill;
use crate::llm::LlmClient;
use crate::normalize;
use crate::record::{Field, Record};
use crate::scrape;

/// Fields the gap-filler sees: the inferred group plus the narrative fields
/// the model reasons from. Statistic fields stay out; an absent statistics
/// block must not be "filled in" by guesswork.
pub const INFERENCE_SCOPE: [Field; 10] = [
    Field::PublishedBooks,
    Field::StorySetting,
    Field::McGender,
    Field::Steamy,
    Field::McSexualOrientation,
    Field::Subgenre,
    Field::Blurb,
    Field::Tags,
    Field::Warnings,
    Field::Title,
];

/// End-to-end record build for one story page: fetch, extract, gap-fill the
/// inference scope, normalize every field. Errors from any stage are logged
/// with their context and re-raised; there is no partial recovery here.
pub async fn build_record(
    http: &reqwest::Client,
    llm: &LlmClient,
    url: &str,
    model: &str,
    attempts: u32,
) -> Result<Record> {
    let html = scrape::fetch(http, url).await?;
    let record = scrape::extract(&html, url)?;
    info!("Extracted {} from {}", record.get(Field::Title), url);

    let filled = fill::fill_missing(llm, &record, &INFERENCE_SCOPE, model, attempts)
        .await
        .map_err(|e| {
            warn!("Gap fill failed for {}: {}", url, e);
            e
        })?;

    finalize(filled)
}

/// Final pipeline stage: normalize each field independently. The record is
/// immutable once this returns.
pub fn finalize(record: Record) -> Result<Record> {
    let mut out = Record::new();
    for (field, value) in record.iter() {
        let normalized = normalize::normalize(*field, value.clone()).map_err(|e| {
            warn!("Normalization failed for {}: {}", field.name(), e);
            e
        })?;
        out.set(*field, normalized);
    }
    Ok(out)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    #[test]
    fn finalize_normalizes_every_field_independently() {
        let mut record = Record::new();
        record.set(Field::Title, Value::Text("Ultimate Level 1".into()));
        record.set(Field::OverallScore, Value::Text("4.5 / 5".into()));
        record.set(Field::Followers, Value::Text("1,234".into()));
        record.set(Field::Pages, Value::Text("12".into()));

        let finalized = finalize(record).unwrap();
        assert_eq!(*finalized.get(Field::Title), Value::Text("Ultimate Level 1".into()));
        assert_eq!(*finalized.get(Field::OverallScore), Value::Float(4.5));
        assert_eq!(*finalized.get(Field::Followers), Value::Int(1234));
        assert_eq!(*finalized.get(Field::Pages), Value::Int(12));
        assert!(finalized.get(Field::Subgenre).is_absent());
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut record = Record::new();
        record.set(Field::OverallScore, Value::Text("3.9 / 5".into()));
        record.set(Field::Ratings, Value::Text("2,000".into()));

        let once = finalize(record).unwrap();
        let twice = finalize(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn inference_scope_excludes_statistic_fields() {
        for field in [
            Field::TotalViews,
            Field::AverageViews,
            Field::Followers,
            Field::Favorites,
            Field::Ratings,
            Field::Pages,
            Field::OverallScore,
        ] {
            assert!(!INFERENCE_SCOPE.contains(&field));
        }
    }
}
