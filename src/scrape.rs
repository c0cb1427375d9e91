use std::sync::LazyLock;
use std::time::Duration;

use chrono::Local;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::error::{Result, ScrapeError};
use crate::record::{Field, Record, Value};

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.row.fic-header h1").unwrap());
static AUTHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.row.fic-header a").unwrap());
static THUMB_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img.thumbnail.inline-block").unwrap());
static STATS_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.stats-content").unwrap());
static STAR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span.star").unwrap());
static STAT_ITEM_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.bold.uppercase.font-red-sunglo").unwrap());
static INFO_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.fiction-info").unwrap());
static TAG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span.tags a").unwrap());
static WARNING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul.list-inline li").unwrap());
static DESC_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.description").unwrap());

/// Statistics list positions as the site renders them. A reordering upstream
/// would silently land values in the wrong columns; no self-check exists.
const STAT_ORDER: [Field; 6] = [
    Field::TotalViews,
    Field::AverageViews,
    Field::Followers,
    Field::Favorites,
    Field::Ratings,
    Field::Pages,
];

pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
}

/// Fetch a story page; network failures and non-2xx statuses are fatal for
/// the record.
pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|source| ScrapeError::Fetch {
            url: url.to_string(),
            source,
        })?;

    response.text().await.map_err(|source| ScrapeError::Fetch {
        url: url.to_string(),
        source,
    })
}

/// Walk a story page and produce a record with every locatable field
/// resolved. Inferred fields are always left absent here; the statistics
/// block and fiction-info block are optional, everything else in the header
/// is mandatory.
pub fn extract(html: &str, url: &str) -> Result<Record> {
    let doc = Html::parse_document(html);
    let mut record = Record::new();

    record.set(
        Field::RetrievedAt,
        Value::Text(Local::now().format("%Y-%m-%d").to_string()),
    );
    record.set(Field::Url, Value::Text(url.to_string()));

    let title = doc
        .select(&TITLE_SEL)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .ok_or(ScrapeError::RequiredFieldMissing("RR Title"))?;
    record.set(Field::Title, Value::Text(title));

    let author = doc
        .select(&AUTHOR_SEL)
        .next()
        .map(element_text)
        .filter(|a| !a.is_empty())
        .ok_or(ScrapeError::RequiredFieldMissing("RR Author"))?;
    record.set(Field::Author, Value::Text(author));

    let thumbnail = doc
        .select(&THUMB_SEL)
        .next()
        .and_then(|el| el.value().attr("src"))
        .map(|src| src.split('?').next().unwrap_or(src).to_string())
        .ok_or(ScrapeError::RequiredFieldMissing("RR Thumbnail URL"))?;
    record.set(Field::ThumbnailUrl, Value::Text(thumbnail));

    match doc.select(&STATS_SEL).next() {
        Some(stats) => extract_stats(stats, &mut record),
        None => warn!("Statistics block not found on {}; fields left unset", url),
    }

    match doc.select(&INFO_SEL).next() {
        Some(info) => extract_info(info, &mut record),
        None => warn!("Fiction info block not found on {}; fields left unset", url),
    }

    Ok(record)
}

/// Score badges carry their column name in a title attribute; the remaining
/// stats are read positionally from the ordered list.
fn extract_stats(stats: ElementRef, record: &mut Record) {
    for star in stats.select(&STAR_SEL) {
        let (Some(label), Some(content)) = (
            star.value().attr("data-original-title"),
            star.value().attr("data-content"),
        ) else {
            continue;
        };
        if let Some(field) = Field::from_name(&format!("RR {label}")) {
            record.set(field, Value::Text(content.trim().to_string()));
        }
    }

    let items: Vec<String> = stats.select(&STAT_ITEM_SEL).map(element_text).collect();
    if items.len() != STAT_ORDER.len() {
        warn!(
            "Statistics list has {} items, expected {}",
            items.len(),
            STAT_ORDER.len()
        );
    }
    for (field, text) in STAT_ORDER.iter().zip(&items) {
        record.set(*field, Value::Text(text.clone()));
    }
}

fn extract_info(info: ElementRef, record: &mut Record) {
    let tags: Vec<String> = info.select(&TAG_SEL).map(element_text).collect();
    record.set(Field::Tags, Value::Text(tags.join(", ")));

    let warnings: Vec<String> = info.select(&WARNING_SEL).map(element_text).collect();
    record.set(Field::Warnings, Value::Text(warnings.join(", ")));

    if let Some(desc) = info.select(&DESC_SEL).next() {
        let blurb = desc
            .children()
            .filter_map(ElementRef::wrap)
            .map(|p| element_text(p))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        record.set(Field::Blurb, Value::Text(blurb));
    }
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().replace('\u{a0}', " ")
}

// ── Tests ──
