use tracing::{debug, warn};

use crate::error::{Result, ScrapeError};
use crate::llm::{ChatRequest, LlmClient, Message, ResponseFormat};
use crate::record::{Field, Record, Value};
use crate::repair;

pub const DEFAULT_ATTEMPTS: u32 = 2;

const MAX_TOKENS: u32 = 200;
const TEMPERATURE: f32 = 0.25;

/// Ask the completion service to infer values for the absent fields of
/// `scope`, leaving every already-resolved field untouched. Returns a new
/// record; the input is never mutated. If nothing in `scope` is absent the
/// input is returned as-is and no request is issued.
pub async fn fill_missing(
    llm: &LlmClient,
    record: &Record,
    scope: &[Field],
    model: &str,
    attempts: u32,
) -> Result<Record> {
    let missing = record.missing_in(scope);
    if missing.is_empty() {
        return Ok(record.clone());
    }

    let prompt = build_prompt(&record.resolved_in(scope), &missing);
    let request = ChatRequest {
        model: model.to_string(),
        messages: vec![Message::system(prompt)],
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
        response_format: ResponseFormat::json_object(),
    };

    for attempt in 1..=attempts {
        let text = llm.complete(&request).await?;
        match parse_response(&text) {
            Ok(values) => {
                debug!("Gap fill succeeded on attempt {}/{}", attempt, attempts);
                return Ok(apply_response(record, &missing, &values));
            }
            Err(e) => warn!(
                "Unparseable completion on attempt {}/{}: {} (response: {:?})",
                attempt, attempts, e, text
            ),
        }
    }

    Err(ScrapeError::GapFillExhausted { attempts })
}

/// Single natural-language prompt embedding the resolved pairs and the keys
/// to infer.
fn build_prompt(resolved: &[(Field, &Value)], missing: &[Field]) -> String {
    let collected = resolved
        .iter()
        .map(|(f, v)| format!("{}: {}", f.name(), v))
        .collect::<Vec<_>>()
        .join("\n");
    let keys = missing
        .iter()
        .map(|f| f.name())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are working on a project to analyze web serial stories from RoyalRoad. \
You have collected some data from a story, but some values are missing.\n\
Below is data collected from a RoyalRoad story. RoyalRoad stories are mostly Progression Fantasy. \
MC means Main Character.\n\
Please use it to try to fill in the missing values listed at the end of this message.\n\n\
===COLLECTED DATA===\n{collected}\n===END COLLECTED DATA===\n\n\
===KEYS FOR MISSING VALUES===\n{keys}\n===END KEYS FOR MISSING VALUES===\n\
If you cannot be reasonably sure of a value with the given data, put in null instead.\n\
Output: json-format response of the keys and filled values. Format it in one line, no linebreaks, \
no preamble - straight to the json! Only fill in missing values. Do not return any of the existing data."
    )
}

/// Strip any conversational preamble before the first `{`, then parse,
/// repairing unescaped quotes if the first parse fails.
fn parse_response(text: &str) -> Result<serde_json::Map<String, serde_json::Value>> {
    let start = text.find('{').ok_or(ScrapeError::UnrecoverableFormat(
        "no JSON object in completion response",
    ))?;
    let body = &text[start..];

    let value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => repair::repair_json(body)?,
    };

    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(ScrapeError::UnrecoverableFormat(
            "completion response is not a JSON object",
        )),
    }
}

/// Merge inferred values into a copy of `record`. Only keys from the missing
/// set are considered; a JSON `null` or the literal string `"null"` leaves
/// the field absent.
fn apply_response(
    record: &Record,
    missing: &[Field],
    values: &serde_json::Map<String, serde_json::Value>,
) -> Record {
    let mut out = record.clone();
    for field in missing {
        match values.get(field.name()) {
            None => {}
            Some(v) if v.is_null() || v.as_str() == Some("null") => {}
            Some(v) => out.set(*field, Value::from_json(v)),
        }
    }
    out
}

// ── Tests ──
